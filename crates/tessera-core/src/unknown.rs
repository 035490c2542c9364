//! Storage for fields the schema does not declare.
//!
//! Each unknown field keeps the exact bytes it was read from, tag included,
//! so re-serializing an unmodified message reproduces its input. A decoded
//! view ([`UnknownValue`]) is available for inspection.

use crate::error::{Error, Result};
use crate::wire::{CodedInput, Tag, WireType, DEFAULT_RECURSION_LIMIT};
use bytes::Bytes;

/// One unknown field, stored verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField {
    tag: Tag,
    raw: Bytes,
}

/// Decoded payload of an unknown field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnknownValue {
    /// Wire type 0
    Varint(u64),
    /// Wire type 1
    Fixed64(u64),
    /// Wire type 2, payload without its length prefix
    LengthDelimited(Bytes),
    /// Wire types 3..4, the fields between the delimiters
    Group(UnknownFieldSet),
    /// Wire type 5
    Fixed32(u32),
}

impl UnknownField {
    /// Field number
    pub fn number(&self) -> u32 {
        self.tag.number()
    }

    /// Wire type
    pub fn wire_type(&self) -> WireType {
        self.tag.wire_type()
    }

    /// Tag and payload exactly as they appeared in the input
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Decodes the payload with the default nesting limit
    pub fn value(&self) -> Result<UnknownValue> {
        self.value_with_limit(DEFAULT_RECURSION_LIMIT)
    }

    /// Decodes the payload, allowing groups nested up to `recursion_limit`
    /// deep
    pub fn value_with_limit(&self, recursion_limit: u32) -> Result<UnknownValue> {
        let mut input = CodedInput::new(&self.raw).with_recursion_limit(recursion_limit);
        let tag = input.read_tag()?.ok_or_else(|| Error::truncated(0, 1))?;
        let value = match tag.wire_type() {
            WireType::Varint => UnknownValue::Varint(input.read_varint()?),
            WireType::I64 => UnknownValue::Fixed64(input.read_fixed64()?),
            WireType::I32 => UnknownValue::Fixed32(input.read_fixed32()?),
            WireType::Len => {
                let len = input.read_length()?;
                let start = input.position();
                UnknownValue::LengthDelimited(self.raw.slice(start..start + len))
            }
            WireType::StartGroup => {
                UnknownValue::Group(UnknownFieldSet::read_group(&mut input, tag.number())?)
            }
            WireType::EndGroup => {
                return Err(Error::UnexpectedEndGroup {
                    offset: 0,
                    number: tag.number(),
                })
            }
        };
        Ok(value)
    }
}

/// Ordered collection of unknown fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnknownFieldSet {
    fields: Vec<UnknownField>,
}

impl UnknownFieldSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a whole buffer as unknown fields
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with_limit(data, DEFAULT_RECURSION_LIMIT)
    }

    /// Parses a whole buffer, allowing groups nested up to `recursion_limit`
    /// deep
    pub fn parse_with_limit(data: &[u8], recursion_limit: u32) -> Result<Self> {
        let mut input = CodedInput::new(data).with_recursion_limit(recursion_limit);
        let mut set = Self::new();
        loop {
            let start = input.position();
            let Some(tag) = input.read_tag()? else {
                return Ok(set);
            };
            if tag.wire_type() == WireType::EndGroup {
                return Err(Error::UnexpectedEndGroup {
                    offset: start,
                    number: tag.number(),
                });
            }
            set.read_one(&mut input, tag, start)?;
        }
    }

    fn read_group(input: &mut CodedInput<'_>, number: u32) -> Result<Self> {
        let mut set = Self::new();
        loop {
            let start = input.position();
            let Some(tag) = input.read_tag()? else {
                return Err(Error::truncated(start, 1));
            };
            if tag.wire_type() == WireType::EndGroup {
                if tag.number() != number {
                    return Err(Error::MismatchedEndGroup {
                        expected: number,
                        found: tag.number(),
                    });
                }
                return Ok(set);
            }
            set.read_one(input, tag, start)?;
        }
    }

    /// Skips the value after `tag`, whose bytes began at `start`
    fn read_one(&mut self, input: &mut CodedInput<'_>, tag: Tag, start: usize) -> Result<()> {
        input.skip_field(tag)?;
        self.push_raw(tag, input.bytes_since(start));
        Ok(())
    }

    /// Records a field whose tag and payload span `raw`
    pub fn push_raw(&mut self, tag: Tag, raw: &[u8]) {
        self.fields.push(UnknownField {
            tag,
            raw: Bytes::copy_from_slice(raw),
        });
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no fields are stored
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in input order
    pub fn iter(&self) -> impl Iterator<Item = &UnknownField> {
        self.fields.iter()
    }

    /// Fields carrying `number`, in input order
    pub fn with_number(&self, number: u32) -> impl Iterator<Item = &UnknownField> {
        self.fields.iter().filter(move |f| f.number() == number)
    }

    /// Removes every field
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Appends all of `other`'s fields
    pub fn merge_from(&mut self, other: &UnknownFieldSet) {
        self.fields.extend(other.fields.iter().cloned());
    }

    /// Total encoded length
    pub fn encoded_len(&self) -> usize {
        self.fields.iter().map(|f| f.raw.len()).sum()
    }

    /// Writes every field back verbatim
    pub fn encode(&self, out: &mut Vec<u8>) {
        for field in &self.fields {
            out.extend_from_slice(&field.raw);
        }
    }
}

impl<'a> IntoIterator for &'a UnknownFieldSet {
    type Item = &'a UnknownField;
    type IntoIter = std::slice::Iter<'a, UnknownField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // field 1 varint 150, field 2 "hi", group 3 { field 1 fixed32 }, field 4 fixed64
    const SAMPLE: &[u8] = &[
        0x08, 0x96, 0x01, //
        0x12, 0x02, b'h', b'i', //
        0x1B, 0x0D, 0x01, 0x00, 0x00, 0x00, 0x1C, //
        0x21, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn test_parse_and_reencode_verbatim() {
        let set = UnknownFieldSet::parse(SAMPLE).unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(set.encoded_len(), SAMPLE.len());

        let mut out = Vec::new();
        set.encode(&mut out);
        assert_eq!(out, SAMPLE);
    }

    #[test]
    fn test_decoded_values() {
        let set = UnknownFieldSet::parse(SAMPLE).unwrap();
        let values: Vec<_> = set.iter().map(|f| f.value().unwrap()).collect();

        let mut group = UnknownFieldSet::new();
        group.push_raw(Tag::new(1, WireType::I32), &[0x0D, 0x01, 0x00, 0x00, 0x00]);

        assert_eq!(
            values,
            vec![
                UnknownValue::Varint(150),
                UnknownValue::LengthDelimited(Bytes::from_static(b"hi")),
                UnknownValue::Group(group),
                UnknownValue::Fixed64(2),
            ]
        );
    }

    #[test]
    fn test_non_minimal_varint_survives() {
        // Field 1 with a padded varint encoding of 1
        let data = [0x08, 0x81, 0x80, 0x00];
        let set = UnknownFieldSet::parse(&data).unwrap();
        let mut out = Vec::new();
        set.encode(&mut out);
        assert_eq!(out, data);
        assert_eq!(set.iter().next().unwrap().value().unwrap(), UnknownValue::Varint(1));
    }

    #[test]
    fn test_stray_end_group() {
        assert!(matches!(
            UnknownFieldSet::parse(&[0x0C]).unwrap_err(),
            Error::UnexpectedEndGroup { number: 1, .. }
        ));
    }

    fn nested_groups(depth: usize) -> Vec<u8> {
        let mut data = vec![0x0B; depth];
        data.extend(std::iter::repeat(0x0C).take(depth));
        data
    }

    #[test]
    fn test_deep_groups_follow_given_limit() {
        let data = nested_groups(150);
        assert!(matches!(
            UnknownFieldSet::parse(&data).unwrap_err(),
            Error::RecursionLimitExceeded { limit: 100 }
        ));

        let set = UnknownFieldSet::parse_with_limit(&data, 500).unwrap();
        assert_eq!(set.len(), 1);
        let field = set.iter().next().unwrap();
        assert!(field.value().is_err());
        assert!(matches!(field.value_with_limit(500).unwrap(), UnknownValue::Group(ref g) if g.len() == 1));
    }

    #[test]
    fn test_merge_and_filter() {
        let mut a = UnknownFieldSet::parse(&[0x08, 0x01]).unwrap();
        let b = UnknownFieldSet::parse(&[0x08, 0x02, 0x10, 0x03]).unwrap();
        a.merge_from(&b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.with_number(1).count(), 2);
        a.clear();
        assert!(a.is_empty());
    }
}
