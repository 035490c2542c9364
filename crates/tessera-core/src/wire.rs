//! Low-level protobuf wire format primitives.
//!
//! Varint encoding is delegated to `prost::encoding`; this module adds the
//! tag model, a bounded reader with a limit stack for length-delimited
//! nesting, and the output helpers generated code writes through.
//!
//! ## Wire Format Overview
//!
//! Each protobuf field is encoded as:
//! - A varint "tag" containing the field number and wire type
//! - The field data (format depends on wire type)
//!
//! Wire types:
//! - 0: VARINT (int32, int64, uint32, uint64, sint32, sint64, bool, enum)
//! - 1: I64 (fixed64, sfixed64, double)
//! - 2: LEN (string, bytes, embedded messages, packed repeated fields)
//! - 3/4: SGROUP/EGROUP (group delimiters)
//! - 5: I32 (fixed32, sfixed32, float)

use crate::error::{Error, Result};
use prost::encoding::{decode_varint, encode_varint, encoded_len_varint};

/// Protobuf wire types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width
    I64 = 1,
    /// Length-delimited (strings, bytes, embedded messages)
    Len = 2,
    /// Start group
    StartGroup = 3,
    /// End group
    EndGroup = 4,
    /// 32-bit fixed-width
    I32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::I32),
            _ => Err(Error::invalid_tag(
                0,
                value as u64,
                format!("unknown wire type: {}", value),
            )),
        }
    }
}

/// Maximum valid protobuf field number (2^29 - 1)
pub const MAX_FIELD_NUMBER: u32 = 536_870_911;

/// A decoded field tag: field number plus wire type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    number: u32,
    wire_type: WireType,
}

impl Tag {
    /// Creates a tag from its parts
    pub fn new(number: u32, wire_type: WireType) -> Self {
        Self { number, wire_type }
    }

    /// Decodes a raw tag varint read at `offset`
    pub fn from_raw(raw: u64, offset: usize) -> Result<Self> {
        let wire_type = WireType::try_from((raw & 0x07) as u8)
            .map_err(|_| Error::invalid_tag(offset, raw, format!("reserved wire type {}", raw & 0x07)))?;
        let number = raw >> 3;

        if number == 0 || number > MAX_FIELD_NUMBER as u64 {
            return Err(Error::invalid_tag(
                offset,
                raw,
                format!("field number {} outside 1..={}", number, MAX_FIELD_NUMBER),
            ));
        }

        Ok(Self {
            number: number as u32,
            wire_type,
        })
    }

    /// Field number
    pub fn number(self) -> u32 {
        self.number
    }

    /// Wire type
    pub fn wire_type(self) -> WireType {
        self.wire_type
    }

    /// Encodes the tag back into its varint value
    pub fn to_raw(self) -> u64 {
        ((self.number as u64) << 3) | self.wire_type as u64
    }
}

/// Default nesting depth for messages and groups
pub const DEFAULT_RECURSION_LIMIT: u32 = 100;

/// Bounded reader over a borrowed byte slice.
///
/// Offsets reported in errors are absolute positions in the original slice.
/// `push_limit`/`pop_limit` narrow the readable window while a
/// length-delimited value is being consumed.
#[derive(Debug, Clone)]
pub struct CodedInput<'a> {
    data: &'a [u8],
    pos: usize,
    limit: usize,
    depth: u32,
    recursion_limit: u32,
}

impl<'a> CodedInput<'a> {
    /// Creates a reader over the whole slice
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            limit: data.len(),
            depth: 0,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Sets the maximum nesting depth
    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Current absolute position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left before the current limit
    pub fn remaining(&self) -> usize {
        self.limit - self.pos
    }

    /// True once the current limit has been reached
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.limit
    }

    /// Reads the next tag, or `None` at the end of the current limit
    pub fn read_tag(&mut self) -> Result<Option<Tag>> {
        if self.is_at_end() {
            return Ok(None);
        }
        let offset = self.pos;
        let raw = self.read_varint()?;
        Tag::from_raw(raw, offset).map(Some)
    }

    /// Reads a base-128 varint
    pub fn read_varint(&mut self) -> Result<u64> {
        let mut rest = &self.data[self.pos..self.limit];
        let before = rest.len();
        let value = decode_varint(&mut rest)?;
        self.pos += before - rest.len();
        Ok(value)
    }

    /// Reads a little-endian 32-bit value
    pub fn read_fixed32(&mut self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.read_raw(4)?);
        Ok(u32::from_le_bytes(bytes))
    }

    /// Reads a little-endian 64-bit value
    pub fn read_fixed64(&mut self) -> Result<u64> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.read_raw(8)?);
        Ok(u64::from_le_bytes(bytes))
    }

    /// Reads `len` raw bytes
    pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::truncated(self.pos, len - self.remaining()));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Reads a length prefix and checks it against the remaining input
    pub fn read_length(&mut self) -> Result<usize> {
        let offset = self.pos;
        let len = self.read_varint()?;
        let remaining = self.remaining() as u64;
        if len > remaining {
            return Err(Error::truncated(offset, (len - remaining) as usize));
        }
        Ok(len as usize)
    }

    /// Reads a length-prefixed block
    pub fn read_length_delimited(&mut self) -> Result<&'a [u8]> {
        let len = self.read_length()?;
        self.read_raw(len)
    }

    /// Restricts reading to the next `len` bytes, returning the previous limit
    pub fn push_limit(&mut self, len: usize) -> Result<usize> {
        if len > self.remaining() {
            return Err(Error::truncated(self.pos, len - self.remaining()));
        }
        let previous = self.limit;
        self.limit = self.pos + len;
        Ok(previous)
    }

    /// Restores a limit returned by [`push_limit`](Self::push_limit)
    pub fn pop_limit(&mut self, previous: usize) {
        self.limit = previous;
    }

    /// Enters one level of message or group nesting
    pub fn enter(&mut self) -> Result<()> {
        if self.depth >= self.recursion_limit {
            return Err(Error::RecursionLimitExceeded {
                limit: self.recursion_limit,
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Leaves one level of nesting
    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Raw bytes consumed since `start`
    pub fn bytes_since(&self, start: usize) -> &'a [u8] {
        &self.data[start..self.pos]
    }

    /// Consumes the value that follows `tag`.
    ///
    /// Groups are skipped up to and including their matching end-group tag.
    pub fn skip_field(&mut self, tag: Tag) -> Result<()> {
        match tag.wire_type() {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::I64 => {
                self.read_raw(8)?;
            }
            WireType::Len => {
                self.read_length_delimited()?;
            }
            WireType::I32 => {
                self.read_raw(4)?;
            }
            WireType::StartGroup => self.skip_group(tag.number())?,
            WireType::EndGroup => {
                return Err(Error::UnexpectedEndGroup {
                    offset: self.pos,
                    number: tag.number(),
                })
            }
        }
        Ok(())
    }

    fn skip_group(&mut self, number: u32) -> Result<()> {
        self.enter()?;
        loop {
            let Some(tag) = self.read_tag()? else {
                return Err(Error::truncated(self.pos, 1));
            };
            if tag.wire_type() == WireType::EndGroup {
                if tag.number() != number {
                    return Err(Error::MismatchedEndGroup {
                        expected: number,
                        found: tag.number(),
                    });
                }
                break;
            }
            self.skip_field(tag)?;
        }
        self.leave();
        Ok(())
    }
}

/// Appends a tag
pub fn write_tag(out: &mut Vec<u8>, number: u32, wire_type: WireType) {
    encode_varint(Tag::new(number, wire_type).to_raw(), out);
}

/// Encoded length of a tag for `number`
pub fn tag_len(number: u32) -> usize {
    encoded_len_varint((number as u64) << 3)
}

/// Appends a varint
pub fn write_varint(out: &mut Vec<u8>, value: u64) {
    encode_varint(value, out);
}

/// Encoded length of a varint
pub fn varint_len(value: u64) -> usize {
    encoded_len_varint(value)
}

/// Appends a little-endian 32-bit value
pub fn write_fixed32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Appends a little-endian 64-bit value
pub fn write_fixed64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Appends a length prefix followed by `bytes`
pub fn write_length_delimited(out: &mut Vec<u8>, bytes: &[u8]) {
    write_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

/// Encoded length of a length-delimited payload of `len` bytes, prefix included
pub fn length_delimited_len(len: usize) -> usize {
    varint_len(len as u64) + len
}
