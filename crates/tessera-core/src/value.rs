//! Type-erased field values.
//!
//! [`Value`] is what reflection-style code sees when it reads or writes a
//! field without knowing its Rust type: the field accessors, the extension
//! store and field-wise merging all move data around as `Value`s.

use crate::message::{Message, MessageDyn};
use bytes::Bytes;

/// A single field value, or the whole sequence of a repeated field
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `bool`
    Bool(bool),
    /// `int32`, `sint32`, `sfixed32`
    I32(i32),
    /// `int64`, `sint64`, `sfixed64`
    I64(i64),
    /// `uint32`, `fixed32`
    U32(u32),
    /// `uint64`, `fixed64`
    U64(u64),
    /// `float`
    F32(f32),
    /// `double`
    F64(f64),
    /// `string`
    String(String),
    /// `bytes`
    Bytes(Bytes),
    /// Enum number (open enums keep unrecognised numbers)
    Enum(i32),
    /// Embedded message or group
    Message(Box<dyn MessageDyn>),
    /// Elements of a repeated field, in order
    List(Vec<Value>),
}

impl Value {
    /// Wraps a concrete message
    pub fn message<M: Message>(message: M) -> Self {
        Value::Message(Box::new(message))
    }

    /// Short name of the value's kind, used in type mismatch errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Enum(_) => "enum",
            Value::Message(m) => m.full_name(),
            Value::List(_) => "list",
        }
    }

    /// Borrows the embedded message as `M`, if it is one
    pub fn as_message<M: Message>(&self) -> Option<&M> {
        match self {
            Value::Message(m) => m.as_any().downcast_ref::<M>(),
            _ => None,
        }
    }

    /// Borrows the elements of a list value
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Takes the embedded message out as `M`, handing the value back on mismatch
    pub fn into_message<M: Message>(self) -> Result<M, Value> {
        match self {
            Value::Message(mut m) => match m.as_any_mut().downcast_mut::<M>() {
                Some(message) => Ok(std::mem::take(message)),
                None => Err(Value::Message(m)),
            },
            other => Err(other),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::well_known::{Duration, Timestamp};

    #[test]
    fn test_kind_names() {
        assert_eq!(Value::from(3i32).kind_name(), "i32");
        assert_eq!(Value::from("x").kind_name(), "string");
        assert_eq!(Value::message(Timestamp::default()).kind_name(), "google.protobuf.Timestamp");
    }

    #[test]
    fn test_message_downcast() {
        let ts = Timestamp::new(5, 6);
        let value = Value::message(ts.clone());
        assert_eq!(value.as_message::<Timestamp>(), Some(&ts));
        assert!(value.as_message::<Duration>().is_none());

        let value = value.into_message::<Duration>().unwrap_err();
        assert_eq!(value.into_message::<Timestamp>().unwrap(), ts);
    }

    #[test]
    fn test_message_values_compare_structurally() {
        let a = Value::message(Timestamp::new(1, 2));
        let b = Value::message(Timestamp::new(1, 2));
        let c = Value::message(Duration::new(1, 2));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.clone(), a);
    }
}
