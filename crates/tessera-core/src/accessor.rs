//! Uniform field access.
//!
//! Every message type publishes a static table of [`FieldInfo`] entries, one
//! per declared field, each carrying a [`FieldOps`] record of plain function
//! pointers. A [`FieldAccessor`] binds to one entry once, checks that the
//! operations match the field's cardinality, and from then on exposes the same
//! get/set/add/clear/count surface for any field, singular or repeated.

use crate::codec::FieldType;
use crate::error::{Error, Result};
use crate::message::{Builder, Message};
use crate::value::Value;
use std::fmt;

/// Field cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// Zero or one value, with presence
    Optional,
    /// Exactly one value once the message is built
    Required,
    /// Ordered sequence of values
    Repeated,
}

/// Operation table for one field of `M`.
///
/// Setters hand the value back when it has the wrong kind, so the caller can
/// report what it received.
pub enum FieldOps<M> {
    /// Operations of a singular field
    Singular {
        /// Presence bit
        has: fn(&M) -> bool,
        /// Current value, or the type default when unset
        get: fn(&M) -> Value,
        /// Replaces the value
        set: fn(&mut M, Value) -> std::result::Result<(), Value>,
        /// Resets the field to unset
        clear: fn(&mut M),
    },
    /// Operations of a repeated field
    Repeated {
        /// Number of elements
        len: fn(&M) -> usize,
        /// Element at an index, `None` past the end
        get: fn(&M, usize) -> Option<Value>,
        /// Replaces the element at an in-range index
        set: fn(&mut M, usize, Value) -> std::result::Result<(), Value>,
        /// Appends one element
        push: fn(&mut M, Value) -> std::result::Result<(), Value>,
        /// Removes every element
        clear: fn(&mut M),
    },
}

impl<M> FieldOps<M> {
    fn shape(&self) -> &'static str {
        match self {
            FieldOps::Singular { .. } => "singular",
            FieldOps::Repeated { .. } => "repeated",
        }
    }
}

/// Static description of one declared field
pub struct FieldInfo<M> {
    /// Field name as declared in the schema
    pub name: &'static str,
    /// Field number
    pub number: u32,
    /// Declared value type
    pub field_type: FieldType,
    /// Cardinality
    pub label: Label,
    /// Whether a repeated scalar field serializes packed
    pub packed: bool,
    /// Operation table
    pub ops: FieldOps<M>,
}

impl<M> FieldInfo<M> {
    /// Returns true for repeated fields
    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }
}

impl<M> fmt::Debug for FieldInfo<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInfo")
            .field("name", &self.name)
            .field("number", &self.number)
            .field("field_type", &self.field_type)
            .field("label", &self.label)
            .field("packed", &self.packed)
            .field("ops", &self.ops.shape())
            .finish()
    }
}

/// Accessor bound to one field of message type `M`
pub struct FieldAccessor<M: 'static> {
    info: &'static FieldInfo<M>,
}

impl<M: 'static> Clone for FieldAccessor<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: 'static> Copy for FieldAccessor<M> {}

impl<M: 'static> fmt::Debug for FieldAccessor<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldAccessor").field(self.info).finish()
    }
}

impl<M: Message> FieldAccessor<M> {
    /// Binds to the field called `name`
    pub fn bind(name: &str) -> Result<Self> {
        let info = M::fields()
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| Error::binding(M::FULL_NAME, name, "no such field"))?;
        Self::from_info(info)
    }

    /// Binds to the field with `number`
    pub fn bind_number(number: u32) -> Result<Self> {
        let info = M::fields()
            .iter()
            .find(|f| f.number == number)
            .ok_or_else(|| Error::binding(M::FULL_NAME, number.to_string(), "no such field"))?;
        Self::from_info(info)
    }

    fn from_info(info: &'static FieldInfo<M>) -> Result<Self> {
        let repeated_ops = matches!(info.ops, FieldOps::Repeated { .. });
        if repeated_ops != info.is_repeated() {
            return Err(Error::binding(
                M::FULL_NAME,
                info.name,
                format!("{:?} field carries {} operations", info.label, info.ops.shape()),
            ));
        }
        if info.packed && !(info.is_repeated() && info.field_type.is_packable()) {
            return Err(Error::binding(
                M::FULL_NAME,
                info.name,
                format!("{} field cannot be packed", info.field_type.name()),
            ));
        }
        Ok(Self { info })
    }

    /// The bound field's description
    pub fn info(&self) -> &'static FieldInfo<M> {
        self.info
    }

    /// Presence of a singular field
    pub fn has(&self, message: &M) -> Result<bool> {
        match &self.info.ops {
            FieldOps::Singular { has, .. } => Ok(has(message)),
            FieldOps::Repeated { .. } => Err(Error::unsupported(self.info.name, "has")),
        }
    }

    /// Current value; the whole sequence as a [`Value::List`] for repeated fields
    pub fn get(&self, message: &M) -> Value {
        match &self.info.ops {
            FieldOps::Singular { get, .. } => get(message),
            FieldOps::Repeated { len, get, .. } => {
                Value::List((0..len(message)).filter_map(|i| get(message, i)).collect())
            }
        }
    }

    /// Replaces the field's value.
    ///
    /// A repeated field takes a [`Value::List`]: the field is cleared and each
    /// element appended in order. If an element has the wrong type the field
    /// is left empty and the error returned.
    pub fn set(&self, builder: &mut Builder<M>, value: Value) -> Result<()> {
        if self.info.is_repeated() {
            if !matches!(value, Value::List(_)) {
                return Err(self.mismatch("list", &value));
            }
        } else {
            self.check(&value)?;
        }
        self.set_in(builder.message_mut(), value)
    }

    pub(crate) fn set_in(&self, message: &mut M, value: Value) -> Result<()> {
        match &self.info.ops {
            FieldOps::Singular { set, .. } => {
                self.check(&value)?;
                set(message, value).map_err(|rejected| self.mismatch(self.info.field_type.name(), &rejected))
            }
            FieldOps::Repeated { clear, .. } => {
                let items = match value {
                    Value::List(items) => items,
                    other => return Err(self.mismatch("list", &other)),
                };
                clear(message);
                for item in items {
                    if let Err(err) = self.push_in(message, item) {
                        clear(message);
                        return Err(err);
                    }
                }
                Ok(())
            }
        }
    }

    /// Number of elements of a repeated field
    pub fn count(&self, message: &M) -> Result<usize> {
        match &self.info.ops {
            FieldOps::Repeated { len, .. } => Ok(len(message)),
            FieldOps::Singular { .. } => Err(Error::unsupported(self.info.name, "count")),
        }
    }

    /// Element `index` of a repeated field
    pub fn get_at(&self, message: &M, index: usize) -> Result<Value> {
        match &self.info.ops {
            FieldOps::Repeated { len, get, .. } => get(message, index)
                .ok_or_else(|| Error::index_out_of_range(self.info.name, index, len(message))),
            FieldOps::Singular { .. } => Err(Error::unsupported(self.info.name, "get_at")),
        }
    }

    /// Replaces element `index` of a repeated field
    pub fn set_at(&self, builder: &mut Builder<M>, index: usize, value: Value) -> Result<()> {
        let FieldOps::Repeated { len, set, .. } = &self.info.ops else {
            return Err(Error::unsupported(self.info.name, "set_at"));
        };
        let current = len(builder.as_message());
        if index >= current {
            return Err(Error::index_out_of_range(self.info.name, index, current));
        }
        self.check(&value)?;
        set(builder.message_mut(), index, value)
            .map_err(|rejected| self.mismatch(self.info.field_type.name(), &rejected))
    }

    /// Appends one element to a repeated field
    pub fn add(&self, builder: &mut Builder<M>, value: Value) -> Result<()> {
        if !self.info.is_repeated() {
            return Err(Error::unsupported(self.info.name, "add"));
        }
        self.check(&value)?;
        self.push_in(builder.message_mut(), value)
    }

    pub(crate) fn push_in(&self, message: &mut M, value: Value) -> Result<()> {
        let FieldOps::Repeated { push, .. } = &self.info.ops else {
            return Err(Error::unsupported(self.info.name, "add"));
        };
        self.check(&value)?;
        push(message, value).map_err(|rejected| self.mismatch(self.info.field_type.name(), &rejected))
    }

    /// Unsets a singular field or empties a repeated one
    pub fn clear(&self, builder: &mut Builder<M>) {
        let (present, clear) = match &self.info.ops {
            FieldOps::Singular { has, clear, .. } => (has(builder.as_message()), clear),
            FieldOps::Repeated { len, clear, .. } => (len(builder.as_message()) > 0, clear),
        };
        if present {
            clear(builder.message_mut());
        }
    }

    fn check(&self, value: &Value) -> Result<()> {
        if self.info.field_type.accepts(value) {
            Ok(())
        } else {
            Err(self.mismatch(self.info.field_type.name(), value))
        }
    }

    fn mismatch(&self, expected: &str, found: &Value) -> Error {
        Error::type_mismatch(self.info.name, expected, found.kind_name())
    }
}

/// Appends the dotted paths of unset required fields of `message` to `out`,
/// descending into present sub-messages and message-typed extensions
pub(crate) fn collect_missing<M: Message>(message: &M, prefix: &str, out: &mut Vec<String>) {
    for field in M::fields() {
        match &field.ops {
            FieldOps::Singular { has, get, .. } => {
                let present = has(message);
                if !present {
                    if field.label == Label::Required {
                        out.push(format!("{prefix}{}", field.name));
                    }
                    continue;
                }
                if !field.field_type.is_message() {
                    continue;
                }
                if let Value::Message(sub) = get(message) {
                    sub.missing_fields_dyn(&format!("{prefix}{}.", field.name), out);
                }
            }
            FieldOps::Repeated { len, get, .. } if field.field_type.is_message() => {
                for index in 0..len(message) {
                    if let Some(Value::Message(sub)) = get(message, index) {
                        sub.missing_fields_dyn(&format!("{prefix}{}[{index}].", field.name), out);
                    }
                }
            }
            FieldOps::Repeated { .. } => {}
        }
    }
    for extension in message.extensions().iter() {
        let name = extension.descriptor().name;
        match extension.value() {
            Value::Message(sub) => sub.missing_fields_dyn(&format!("{prefix}({name})."), out),
            Value::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    if let Value::Message(sub) = item {
                        sub.missing_fields_dyn(&format!("{prefix}({name})[{index}]."), out);
                    }
                }
            }
            _ => {}
        }
    }
}
