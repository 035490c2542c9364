//! Per-field encoding helpers.
//!
//! Generated message code reads and writes its declared fields through the
//! typed helpers in this module (`merge_singular::<scalar::Int32>`, etc.).
//! The extension store uses the same codecs through the [`Value`]-based
//! entry points, selected at runtime from a [`FieldType`].

use crate::error::{Error, Result};
use crate::merge::{self, MergeContext};
use crate::message::{Message, MessageDyn};
use crate::value::Value;
use crate::wire::{self, CodedInput, Tag, WireType};
use std::fmt;

/// Runs `$body` with `$kind` aliased to the scalar codec for `$ty`.
///
/// Message and group types must be handled by the caller before dispatching.
macro_rules! dispatch_scalar {
    ($ty:expr, $kind:ident => $body:expr) => {
        match $ty {
            FieldType::Double => {
                type $kind = scalar::Double;
                $body
            }
            FieldType::Float => {
                type $kind = scalar::Float;
                $body
            }
            FieldType::Int64 => {
                type $kind = scalar::Int64;
                $body
            }
            FieldType::UInt64 => {
                type $kind = scalar::UInt64;
                $body
            }
            FieldType::Int32 => {
                type $kind = scalar::Int32;
                $body
            }
            FieldType::Fixed64 => {
                type $kind = scalar::Fixed64;
                $body
            }
            FieldType::Fixed32 => {
                type $kind = scalar::Fixed32;
                $body
            }
            FieldType::Bool => {
                type $kind = scalar::Bool;
                $body
            }
            FieldType::String => {
                type $kind = scalar::String;
                $body
            }
            FieldType::Bytes => {
                type $kind = scalar::Bytes;
                $body
            }
            FieldType::UInt32 => {
                type $kind = scalar::UInt32;
                $body
            }
            FieldType::SFixed32 => {
                type $kind = scalar::SFixed32;
                $body
            }
            FieldType::SFixed64 => {
                type $kind = scalar::SFixed64;
                $body
            }
            FieldType::SInt32 => {
                type $kind = scalar::SInt32;
                $body
            }
            FieldType::SInt64 => {
                type $kind = scalar::SInt64;
                $body
            }
            FieldType::Enum => {
                type $kind = scalar::Enum;
                $body
            }
            FieldType::Message(_) | FieldType::Group(_) => {
                unreachable!("message types are dispatched by the caller")
            }
        }
    };
}

/// Constructor for a fresh, empty message of a concrete type
pub type MessageFactory = fn() -> Box<dyn MessageDyn>;

/// Declared type of a field or extension
#[derive(Clone, Copy)]
pub enum FieldType {
    /// `double`
    Double,
    /// `float`
    Float,
    /// `int64`
    Int64,
    /// `uint64`
    UInt64,
    /// `int32`
    Int32,
    /// `fixed64`
    Fixed64,
    /// `fixed32`
    Fixed32,
    /// `bool`
    Bool,
    /// `string`
    String,
    /// `bytes`
    Bytes,
    /// `uint32`
    UInt32,
    /// `sfixed32`
    SFixed32,
    /// `sfixed64`
    SFixed64,
    /// `sint32`
    SInt32,
    /// `sint64`
    SInt64,
    /// Any enum type
    Enum,
    /// Embedded message
    Message(MessageFactory),
    /// Group-encoded message
    Group(MessageFactory),
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FieldType {
    /// Proto name of the type
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Double => "double",
            FieldType::Float => "float",
            FieldType::Int64 => "int64",
            FieldType::UInt64 => "uint64",
            FieldType::Int32 => "int32",
            FieldType::Fixed64 => "fixed64",
            FieldType::Fixed32 => "fixed32",
            FieldType::Bool => "bool",
            FieldType::String => "string",
            FieldType::Bytes => "bytes",
            FieldType::UInt32 => "uint32",
            FieldType::SFixed32 => "sfixed32",
            FieldType::SFixed64 => "sfixed64",
            FieldType::SInt32 => "sint32",
            FieldType::SInt64 => "sint64",
            FieldType::Enum => "enum",
            FieldType::Message(_) => "message",
            FieldType::Group(_) => "group",
        }
    }

    /// Wire type a single value of this type is encoded with
    pub fn wire_type(&self) -> WireType {
        match self {
            FieldType::Double | FieldType::Fixed64 | FieldType::SFixed64 => WireType::I64,
            FieldType::Float | FieldType::Fixed32 | FieldType::SFixed32 => WireType::I32,
            FieldType::String | FieldType::Bytes | FieldType::Message(_) => WireType::Len,
            FieldType::Group(_) => WireType::StartGroup,
            _ => WireType::Varint,
        }
    }

    /// True for types that may use packed encoding when repeated
    pub fn is_packable(&self) -> bool {
        matches!(
            self.wire_type(),
            WireType::Varint | WireType::I32 | WireType::I64
        )
    }

    /// True for message and group types
    pub fn is_message(&self) -> bool {
        matches!(self, FieldType::Message(_) | FieldType::Group(_))
    }

    /// Returns true if `value` is a single value of this type
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::Message(factory) | FieldType::Group(factory), Value::Message(m)) => {
                factory().full_name() == m.full_name()
            }
            (FieldType::Message(_) | FieldType::Group(_), _) => false,
            (ty, value) => {
                dispatch_scalar!(*ty, K => <K as ScalarKind>::value_ref(value).is_some())
            }
        }
    }
}

/// Encoding of one scalar proto type onto its Rust representation
pub trait ScalarKind {
    /// Rust type holding the value
    type Native: Clone + PartialEq + Default + fmt::Debug;
    /// Wire type of a single value
    const WIRE_TYPE: WireType;
    /// Whether repeated fields of this type may be packed
    const PACKABLE: bool = true;

    /// Reads one value (without tag)
    fn read(input: &mut CodedInput<'_>) -> Result<Self::Native>;
    /// Writes one value (without tag)
    fn write(value: &Self::Native, out: &mut Vec<u8>);
    /// Encoded length of one value (without tag)
    fn len(value: &Self::Native) -> usize;
    /// Wraps a value for reflection
    fn to_value(value: &Self::Native) -> Value;
    /// Borrows the native value out of a matching [`Value`] variant
    fn value_ref(value: &Value) -> Option<&Self::Native>;
    /// Takes the native value out of a matching [`Value`] variant
    fn from_value(value: Value) -> std::result::Result<Self::Native, Value>;
}

/// Scalar codecs, one marker type per proto scalar type
pub mod scalar {
    use super::ScalarKind;
    use crate::error::{Error, Result};
    use crate::value::Value;
    use crate::wire::{self, CodedInput, WireType};

    macro_rules! scalar_kind {
        (
            $(#[$doc:meta])*
            $name:ident, $native:ty, $wire:ident, $variant:ident,
            read: |$input:ident| $read:expr,
            write: |$wv:ident, $out:ident| $write:expr,
            len: |$lv:ident| $len:expr $(,)?
        ) => {
            $(#[$doc])*
            #[derive(Debug, Clone, Copy)]
            pub struct $name;

            impl ScalarKind for $name {
                type Native = $native;
                const WIRE_TYPE: WireType = WireType::$wire;

                fn read($input: &mut CodedInput<'_>) -> Result<$native> {
                    $read
                }

                fn write($wv: &$native, $out: &mut Vec<u8>) {
                    $write
                }

                fn len($lv: &$native) -> usize {
                    $len
                }

                fn to_value(value: &$native) -> Value {
                    Value::$variant(value.clone())
                }

                fn value_ref(value: &Value) -> Option<&$native> {
                    match value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn from_value(value: Value) -> std::result::Result<$native, Value> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(other),
                    }
                }
            }
        };
    }

    fn zigzag_encode32(v: i32) -> u64 {
        ((v << 1) ^ (v >> 31)) as u32 as u64
    }

    fn zigzag_decode32(v: u64) -> i32 {
        let v = v as u32;
        ((v >> 1) as i32) ^ -((v & 1) as i32)
    }

    fn zigzag_encode64(v: i64) -> u64 {
        ((v << 1) ^ (v >> 63)) as u64
    }

    fn zigzag_decode64(v: u64) -> i64 {
        ((v >> 1) as i64) ^ -((v & 1) as i64)
    }

    scalar_kind! {
        /// `double`
        Double, f64, I64, F64,
        read: |input| Ok(f64::from_bits(input.read_fixed64()?)),
        write: |v, out| wire::write_fixed64(out, v.to_bits()),
        len: |_v| 8,
    }

    scalar_kind! {
        /// `float`
        Float, f32, I32, F32,
        read: |input| Ok(f32::from_bits(input.read_fixed32()?)),
        write: |v, out| wire::write_fixed32(out, v.to_bits()),
        len: |_v| 4,
    }

    scalar_kind! {
        /// `int64`
        Int64, i64, Varint, I64,
        read: |input| Ok(input.read_varint()? as i64),
        write: |v, out| wire::write_varint(out, *v as u64),
        len: |v| wire::varint_len(*v as u64),
    }

    scalar_kind! {
        /// `uint64`
        UInt64, u64, Varint, U64,
        read: |input| input.read_varint(),
        write: |v, out| wire::write_varint(out, *v),
        len: |v| wire::varint_len(*v),
    }

    // Negative int32 values are sign-extended to ten bytes on the wire.
    scalar_kind! {
        /// `int32`
        Int32, i32, Varint, I32,
        read: |input| Ok(input.read_varint()? as i32),
        write: |v, out| wire::write_varint(out, *v as i64 as u64),
        len: |v| wire::varint_len(*v as i64 as u64),
    }

    scalar_kind! {
        /// `fixed64`
        Fixed64, u64, I64, U64,
        read: |input| input.read_fixed64(),
        write: |v, out| wire::write_fixed64(out, *v),
        len: |_v| 8,
    }

    scalar_kind! {
        /// `fixed32`
        Fixed32, u32, I32, U32,
        read: |input| input.read_fixed32(),
        write: |v, out| wire::write_fixed32(out, *v),
        len: |_v| 4,
    }

    scalar_kind! {
        /// `bool`
        Bool, bool, Varint, Bool,
        read: |input| Ok(input.read_varint()? != 0),
        write: |v, out| wire::write_varint(out, *v as u64),
        len: |_v| 1,
    }

    scalar_kind! {
        /// `uint32`
        UInt32, u32, Varint, U32,
        read: |input| Ok(input.read_varint()? as u32),
        write: |v, out| wire::write_varint(out, *v as u64),
        len: |v| wire::varint_len(*v as u64),
    }

    scalar_kind! {
        /// `sfixed32`
        SFixed32, i32, I32, I32,
        read: |input| Ok(input.read_fixed32()? as i32),
        write: |v, out| wire::write_fixed32(out, *v as u32),
        len: |_v| 4,
    }

    scalar_kind! {
        /// `sfixed64`
        SFixed64, i64, I64, I64,
        read: |input| Ok(input.read_fixed64()? as i64),
        write: |v, out| wire::write_fixed64(out, *v as u64),
        len: |_v| 8,
    }

    scalar_kind! {
        /// `sint32`
        SInt32, i32, Varint, I32,
        read: |input| Ok(zigzag_decode32(input.read_varint()?)),
        write: |v, out| wire::write_varint(out, zigzag_encode32(*v)),
        len: |v| wire::varint_len(zigzag_encode32(*v)),
    }

    scalar_kind! {
        /// `sint64`
        SInt64, i64, Varint, I64,
        read: |input| Ok(zigzag_decode64(input.read_varint()?)),
        write: |v, out| wire::write_varint(out, zigzag_encode64(*v)),
        len: |v| wire::varint_len(zigzag_encode64(*v)),
    }

    scalar_kind! {
        /// Enum numbers, encoded like `int32`
        Enum, i32, Varint, Enum,
        read: |input| Ok(input.read_varint()? as i32),
        write: |v, out| wire::write_varint(out, *v as i64 as u64),
        len: |v| wire::varint_len(*v as i64 as u64),
    }

    /// `string`
    #[derive(Debug, Clone, Copy)]
    pub struct String;

    impl ScalarKind for String {
        type Native = std::string::String;
        const WIRE_TYPE: WireType = WireType::Len;
        const PACKABLE: bool = false;

        fn read(input: &mut CodedInput<'_>) -> Result<std::string::String> {
            let offset = input.position();
            let raw = input.read_length_delimited()?;
            std::str::from_utf8(raw)
                .map(str::to_owned)
                .map_err(|_| Error::InvalidUtf8 { offset })
        }

        fn write(value: &std::string::String, out: &mut Vec<u8>) {
            wire::write_length_delimited(out, value.as_bytes());
        }

        fn len(value: &std::string::String) -> usize {
            wire::length_delimited_len(value.len())
        }

        fn to_value(value: &std::string::String) -> Value {
            Value::String(value.clone())
        }

        fn value_ref(value: &Value) -> Option<&std::string::String> {
            match value {
                Value::String(v) => Some(v),
                _ => None,
            }
        }

        fn from_value(value: Value) -> std::result::Result<std::string::String, Value> {
            match value {
                Value::String(v) => Ok(v),
                other => Err(other),
            }
        }
    }

    /// `bytes`
    #[derive(Debug, Clone, Copy)]
    pub struct Bytes;

    impl ScalarKind for Bytes {
        type Native = bytes::Bytes;
        const WIRE_TYPE: WireType = WireType::Len;
        const PACKABLE: bool = false;

        fn read(input: &mut CodedInput<'_>) -> Result<bytes::Bytes> {
            Ok(bytes::Bytes::copy_from_slice(input.read_length_delimited()?))
        }

        fn write(value: &bytes::Bytes, out: &mut Vec<u8>) {
            wire::write_length_delimited(out, value);
        }

        fn len(value: &bytes::Bytes) -> usize {
            wire::length_delimited_len(value.len())
        }

        fn to_value(value: &bytes::Bytes) -> Value {
            Value::Bytes(value.clone())
        }

        fn value_ref(value: &Value) -> Option<&bytes::Bytes> {
            match value {
                Value::Bytes(v) => Some(v),
                _ => None,
            }
        }

        fn from_value(value: Value) -> std::result::Result<bytes::Bytes, Value> {
            match value {
                Value::Bytes(v) => Ok(v),
                other => Err(other),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_zigzag() {
            assert_eq!(zigzag_encode32(0), 0);
            assert_eq!(zigzag_encode32(-1), 1);
            assert_eq!(zigzag_encode32(1), 2);
            assert_eq!(zigzag_encode32(i32::MIN), u32::MAX as u64);
            assert_eq!(zigzag_decode32(u32::MAX as u64), i32::MIN);
            assert_eq!(zigzag_encode64(-2), 3);
            assert_eq!(zigzag_decode64(3), -2);
            assert_eq!(zigzag_decode64(zigzag_encode64(i64::MAX)), i64::MAX);
        }
    }
}

// ---------------------------------------------------------------------------
// Typed helpers for generated code
// ---------------------------------------------------------------------------

/// Merges a singular scalar with explicit presence.
///
/// Returns `Ok(false)` without consuming anything when the wire type does not
/// match, so the caller can keep the data as an unknown field.
pub fn merge_singular<K: ScalarKind>(
    slot: &mut Option<K::Native>,
    tag: Tag,
    input: &mut CodedInput<'_>,
) -> Result<bool> {
    if tag.wire_type() != K::WIRE_TYPE {
        return Ok(false);
    }
    *slot = Some(K::read(input)?);
    Ok(true)
}

/// Merges a singular scalar with implicit presence (proto3 style)
pub fn merge_implicit<K: ScalarKind>(
    slot: &mut K::Native,
    tag: Tag,
    input: &mut CodedInput<'_>,
) -> Result<bool> {
    if tag.wire_type() != K::WIRE_TYPE {
        return Ok(false);
    }
    *slot = K::read(input)?;
    Ok(true)
}

/// Appends to a repeated scalar, accepting both packed and unpacked encodings
pub fn merge_repeated<K: ScalarKind>(
    list: &mut Vec<K::Native>,
    tag: Tag,
    input: &mut CodedInput<'_>,
) -> Result<bool> {
    if tag.wire_type() == K::WIRE_TYPE {
        list.push(K::read(input)?);
        return Ok(true);
    }
    if tag.wire_type() == WireType::Len && K::PACKABLE {
        read_packed::<K>(list, input)?;
        return Ok(true);
    }
    Ok(false)
}

fn read_packed<K: ScalarKind>(list: &mut Vec<K::Native>, input: &mut CodedInput<'_>) -> Result<()> {
    let len = input.read_length()?;
    let previous = input.push_limit(len)?;
    while !input.is_at_end() {
        list.push(K::read(input)?);
    }
    input.pop_limit(previous);
    Ok(())
}

/// Writes a singular scalar if present
pub fn encode_singular<K: ScalarKind>(number: u32, value: &Option<K::Native>, out: &mut Vec<u8>) {
    if let Some(value) = value {
        wire::write_tag(out, number, K::WIRE_TYPE);
        K::write(value, out);
    }
}

/// Encoded length of a singular scalar, tag included
pub fn singular_len<K: ScalarKind>(number: u32, value: &Option<K::Native>) -> usize {
    value
        .as_ref()
        .map_or(0, |value| wire::tag_len(number) + K::len(value))
}

/// Writes an implicit-presence scalar unless it holds the default value
pub fn encode_implicit<K: ScalarKind>(number: u32, value: &K::Native, out: &mut Vec<u8>) {
    if *value != K::Native::default() {
        wire::write_tag(out, number, K::WIRE_TYPE);
        K::write(value, out);
    }
}

/// Encoded length of an implicit-presence scalar, tag included
pub fn implicit_len<K: ScalarKind>(number: u32, value: &K::Native) -> usize {
    if *value == K::Native::default() {
        0
    } else {
        wire::tag_len(number) + K::len(value)
    }
}

/// Writes a repeated scalar, packed when requested and supported
pub fn encode_repeated<K: ScalarKind>(
    number: u32,
    values: &[K::Native],
    packed: bool,
    out: &mut Vec<u8>,
) {
    if values.is_empty() {
        return;
    }
    if packed && K::PACKABLE {
        let payload: usize = values.iter().map(K::len).sum();
        wire::write_tag(out, number, WireType::Len);
        wire::write_varint(out, payload as u64);
        for value in values {
            K::write(value, out);
        }
    } else {
        for value in values {
            wire::write_tag(out, number, K::WIRE_TYPE);
            K::write(value, out);
        }
    }
}

/// Encoded length of a repeated scalar, tags included
pub fn repeated_len<K: ScalarKind>(number: u32, values: &[K::Native], packed: bool) -> usize {
    if values.is_empty() {
        return 0;
    }
    let payload: usize = values.iter().map(K::len).sum();
    if packed && K::PACKABLE {
        wire::tag_len(number) + wire::length_delimited_len(payload)
    } else {
        wire::tag_len(number) * values.len() + payload
    }
}

/// Merges an embedded message.
///
/// A message already present is merged into field by field; an absent one is
/// created first.
pub fn merge_message<M: Message>(
    slot: &mut Option<Box<M>>,
    tag: Tag,
    input: &mut CodedInput<'_>,
    ctx: &MergeContext<'_>,
) -> Result<bool> {
    if tag.wire_type() != WireType::Len {
        return Ok(false);
    }
    let target = slot.get_or_insert_with(Default::default);
    merge::merge_length_delimited(target.as_mut(), input, ctx)?;
    Ok(true)
}

/// Appends an embedded message to a repeated field
pub fn merge_repeated_message<M: Message>(
    list: &mut Vec<M>,
    tag: Tag,
    input: &mut CodedInput<'_>,
    ctx: &MergeContext<'_>,
) -> Result<bool> {
    if tag.wire_type() != WireType::Len {
        return Ok(false);
    }
    let mut message = M::default();
    merge::merge_length_delimited(&mut message, input, ctx)?;
    list.push(message);
    Ok(true)
}

/// Merges a group-encoded message, with the same merge-if-present rule as
/// [`merge_message`]
pub fn merge_group<M: Message>(
    slot: &mut Option<Box<M>>,
    tag: Tag,
    input: &mut CodedInput<'_>,
    ctx: &MergeContext<'_>,
) -> Result<bool> {
    if tag.wire_type() != WireType::StartGroup {
        return Ok(false);
    }
    let target = slot.get_or_insert_with(Default::default);
    merge::merge_group(target.as_mut(), tag.number(), input, ctx)?;
    Ok(true)
}

/// Writes an embedded message already measured by [`message_len`]
pub fn encode_message<M: Message>(number: u32, message: &M, out: &mut Vec<u8>) {
    wire::write_tag(out, number, WireType::Len);
    wire::write_varint(out, message.cached_size().get() as u64);
    message.write_cached(out);
}

/// Encoded length of an embedded message, tag included; records the
/// message's size for [`encode_message`]
pub fn message_len<M: Message>(number: u32, message: &M) -> usize {
    wire::tag_len(number) + wire::length_delimited_len(message.encoded_len())
}

/// Writes a group-encoded message already measured by [`group_len`]
pub fn encode_group<M: Message>(number: u32, message: &M, out: &mut Vec<u8>) {
    wire::write_tag(out, number, WireType::StartGroup);
    message.write_cached(out);
    wire::write_tag(out, number, WireType::EndGroup);
}

/// Encoded length of a group-encoded message, both delimiters included
pub fn group_len<M: Message>(number: u32, message: &M) -> usize {
    2 * wire::tag_len(number) + message.encoded_len()
}

// ---------------------------------------------------------------------------
// Value-based entry points for reflection and extensions
// ---------------------------------------------------------------------------

/// Reads one scalar value of type `ty`
pub fn read_value(ty: FieldType, input: &mut CodedInput<'_>) -> Result<Value> {
    if ty.is_message() {
        return Err(Error::internal("read_value called for a message type"));
    }
    dispatch_scalar!(ty, K => Ok(<K as ScalarKind>::to_value(&<K as ScalarKind>::read(input)?)))
}

/// Reads a packed run of scalar values of type `ty`
pub fn read_packed_values(ty: FieldType, input: &mut CodedInput<'_>) -> Result<Vec<Value>> {
    let len = input.read_length()?;
    let previous = input.push_limit(len)?;
    let mut values = Vec::new();
    while !input.is_at_end() {
        values.push(read_value(ty, input)?);
    }
    input.pop_limit(previous);
    Ok(values)
}

/// Writes a single value of type `ty` under `number`, tag included.
///
/// Values of the wrong kind are skipped; callers type-check on insertion.
/// Message values must have been measured by [`value_len`].
pub fn write_value(ty: FieldType, number: u32, value: &Value, out: &mut Vec<u8>) {
    match (ty, value) {
        (FieldType::Message(_), Value::Message(message)) => {
            wire::write_tag(out, number, WireType::Len);
            wire::write_varint(out, message.cached_size_dyn() as u64);
            message.write_cached_dyn(out);
        }
        (FieldType::Group(_), Value::Message(message)) => {
            wire::write_tag(out, number, WireType::StartGroup);
            message.write_cached_dyn(out);
            wire::write_tag(out, number, WireType::EndGroup);
        }
        (FieldType::Message(_) | FieldType::Group(_), _) => {}
        (other, value) => dispatch_scalar!(other, K => {
            if let Some(native) = <K as ScalarKind>::value_ref(value) {
                wire::write_tag(out, number, <K as ScalarKind>::WIRE_TYPE);
                <K as ScalarKind>::write(native, out);
            }
        }),
    }
}

/// Encoded length of [`write_value`]'s output
pub fn value_len(ty: FieldType, number: u32, value: &Value) -> usize {
    match (ty, value) {
        (FieldType::Message(_), Value::Message(message)) => {
            wire::tag_len(number) + wire::length_delimited_len(message.encoded_len_dyn())
        }
        (FieldType::Group(_), Value::Message(message)) => {
            2 * wire::tag_len(number) + message.encoded_len_dyn()
        }
        (FieldType::Message(_) | FieldType::Group(_), _) => 0,
        (other, value) => dispatch_scalar!(other, K => {
            <K as ScalarKind>::value_ref(value)
                .map_or(0, |native| wire::tag_len(number) + <K as ScalarKind>::len(native))
        }),
    }
}

/// Writes the elements of a repeated value, packed when requested and supported
pub fn write_values(ty: FieldType, number: u32, values: &[Value], packed: bool, out: &mut Vec<u8>) {
    if values.is_empty() {
        return;
    }
    if packed && ty.is_packable() {
        let payload = packed_payload_len(ty, values);
        wire::write_tag(out, number, WireType::Len);
        wire::write_varint(out, payload as u64);
        dispatch_scalar!(ty, K => {
            for native in values.iter().filter_map(<K as ScalarKind>::value_ref) {
                <K as ScalarKind>::write(native, out);
            }
        });
    } else {
        for value in values {
            write_value(ty, number, value, out);
        }
    }
}

/// Encoded length of [`write_values`]' output
pub fn values_len(ty: FieldType, number: u32, values: &[Value], packed: bool) -> usize {
    if values.is_empty() {
        return 0;
    }
    if packed && ty.is_packable() {
        wire::tag_len(number) + wire::length_delimited_len(packed_payload_len(ty, values))
    } else {
        values.iter().map(|value| value_len(ty, number, value)).sum()
    }
}

fn packed_payload_len(ty: FieldType, values: &[Value]) -> usize {
    dispatch_scalar!(ty, K => {
        values
            .iter()
            .filter_map(<K as ScalarKind>::value_ref)
            .map(<K as ScalarKind>::len)
            .sum()
    })
}
