//! Extension values attached to a message.
//!
//! Values are keyed by field number and remember the descriptor they were
//! decoded or set with. Repeated extensions hold a [`Value::List`].

use crate::codec::{self, FieldType};
use crate::error::{Error, Result};
use crate::merge::MergeContext;
use crate::message::MessageDyn;
use crate::registry::ExtensionDescriptor;
use crate::value::Value;
use crate::wire::{CodedInput, Tag, WireType};
use std::collections::BTreeMap;
use tracing::trace;

/// One extension field's value
#[derive(Debug, Clone)]
pub struct ExtensionValue {
    descriptor: &'static ExtensionDescriptor,
    value: Value,
}

impl ExtensionValue {
    /// Descriptor the value belongs to
    pub fn descriptor(&self) -> &'static ExtensionDescriptor {
        self.descriptor
    }

    /// The value itself
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl PartialEq for ExtensionValue {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.descriptor, other.descriptor) && self.value == other.value
    }
}

/// Extension fields present on a message, ordered by field number
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionSet {
    values: BTreeMap<u32, ExtensionValue>,
}

impl ExtensionSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of extension fields present
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no extension is present
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Present extensions in field number order
    pub fn iter(&self) -> impl Iterator<Item = &ExtensionValue> {
        self.values.values()
    }

    /// Returns true if `descriptor`'s extension is present
    pub fn has(&self, descriptor: &'static ExtensionDescriptor) -> bool {
        self.get(descriptor).is_some()
    }

    /// Value of `descriptor`'s extension, if present
    pub fn get(&self, descriptor: &'static ExtensionDescriptor) -> Option<&Value> {
        self.values
            .get(&descriptor.number)
            .filter(|v| std::ptr::eq(v.descriptor, descriptor))
            .map(|v| &v.value)
    }

    /// Replaces the value of `descriptor`'s extension.
    ///
    /// Repeated extensions take a [`Value::List`] whose elements all match the
    /// declared type; nothing is stored if any of them does not.
    pub fn set(&mut self, descriptor: &'static ExtensionDescriptor, value: Value) -> Result<()> {
        check_value(descriptor, &value)?;
        self.values
            .insert(descriptor.number, ExtensionValue { descriptor, value });
        Ok(())
    }

    /// Appends one element to a repeated extension
    pub fn add(&mut self, descriptor: &'static ExtensionDescriptor, value: Value) -> Result<()> {
        if !descriptor.is_repeated() {
            return Err(Error::unsupported(descriptor.name, "add"));
        }
        check_element(descriptor, &value)?;
        self.list_mut(descriptor).push(value);
        Ok(())
    }

    /// Removes `descriptor`'s extension
    pub fn clear(&mut self, descriptor: &'static ExtensionDescriptor) {
        if self.has(descriptor) {
            self.values.remove(&descriptor.number);
        }
    }

    /// Removes every extension
    pub fn clear_all(&mut self) {
        self.values.clear();
    }

    /// Decodes one occurrence of `descriptor`'s field from `input`.
    ///
    /// Returns `Ok(false)` without consuming anything when the wire type does
    /// not fit the declared type, so the caller can keep the data as unknown.
    pub(crate) fn merge_wire(
        &mut self,
        descriptor: &'static ExtensionDescriptor,
        tag: Tag,
        input: &mut CodedInput<'_>,
        ctx: &MergeContext<'_>,
    ) -> Result<bool> {
        let ty = descriptor.field_type;
        match ty {
            FieldType::Message(factory) | FieldType::Group(factory) => {
                if tag.wire_type() != ty.wire_type() {
                    return Ok(false);
                }
                let group = matches!(ty, FieldType::Group(_));
                if descriptor.is_repeated() {
                    let mut message = factory();
                    read_message(message.as_mut(), group, tag, input, ctx)?;
                    self.list_mut(descriptor).push(Value::Message(message));
                } else {
                    match self.values.get_mut(&descriptor.number) {
                        Some(ExtensionValue {
                            value: Value::Message(existing),
                            ..
                        }) => read_message(existing.as_mut(), group, tag, input, ctx)?,
                        _ => {
                            let mut message = factory();
                            read_message(message.as_mut(), group, tag, input, ctx)?;
                            self.values.insert(
                                descriptor.number,
                                ExtensionValue {
                                    descriptor,
                                    value: Value::Message(message),
                                },
                            );
                        }
                    }
                }
            }
            _ if descriptor.is_repeated()
                && ty.is_packable()
                && tag.wire_type() == WireType::Len =>
            {
                let values = codec::read_packed_values(ty, input)?;
                self.list_mut(descriptor).extend(values);
            }
            _ if tag.wire_type() == ty.wire_type() => {
                let value = codec::read_value(ty, input)?;
                if descriptor.is_repeated() {
                    self.list_mut(descriptor).push(value);
                } else {
                    self.values
                        .insert(descriptor.number, ExtensionValue { descriptor, value });
                }
            }
            _ => return Ok(false),
        }

        trace!("Merged extension {} ({:?})", descriptor.name, tag.wire_type());
        Ok(true)
    }

    /// Appends `other`'s extensions: repeated values are concatenated,
    /// singular messages merged, other singular values replaced
    pub fn merge_from(&mut self, other: &ExtensionSet) {
        for (number, incoming) in &other.values {
            match self.values.get_mut(number) {
                Some(current) if std::ptr::eq(current.descriptor, incoming.descriptor) => {
                    match (&mut current.value, &incoming.value) {
                        (Value::List(items), Value::List(more)) => items.extend(more.iter().cloned()),
                        (Value::Message(mine), Value::Message(theirs)) => {
                            if !mine.merge_from_dyn(&**theirs) {
                                *mine = theirs.clone();
                            }
                        }
                        (slot, value) => *slot = value.clone(),
                    }
                }
                _ => {
                    self.values.insert(*number, incoming.clone());
                }
            }
        }
    }

    /// Encoded length of every extension, tags included
    pub fn encoded_len(&self) -> usize {
        self.values
            .values()
            .map(|ext| {
                let d = ext.descriptor;
                match &ext.value {
                    Value::List(items) => codec::values_len(d.field_type, d.number, items, d.packed),
                    value => codec::value_len(d.field_type, d.number, value),
                }
            })
            .sum()
    }

    /// Writes every extension in field number order; message values use the
    /// sizes recorded by [`ExtensionSet::encoded_len`]
    pub fn encode(&self, out: &mut Vec<u8>) {
        for ext in self.values.values() {
            let d = ext.descriptor;
            match &ext.value {
                Value::List(items) => codec::write_values(d.field_type, d.number, items, d.packed, out),
                value => codec::write_value(d.field_type, d.number, value, out),
            }
        }
    }

    fn list_mut(&mut self, descriptor: &'static ExtensionDescriptor) -> &mut Vec<Value> {
        let slot = self
            .values
            .entry(descriptor.number)
            .or_insert_with(|| ExtensionValue {
                descriptor,
                value: Value::List(Vec::new()),
            });
        if !matches!(slot.value, Value::List(_)) {
            slot.value = Value::List(Vec::new());
        }
        match &mut slot.value {
            Value::List(items) => items,
            _ => unreachable!("replaced with a list above"),
        }
    }
}

fn read_message(
    message: &mut dyn MessageDyn,
    group: bool,
    tag: Tag,
    input: &mut CodedInput<'_>,
    ctx: &MergeContext<'_>,
) -> Result<()> {
    if group {
        message.merge_group_dyn(tag.number(), input, ctx)
    } else {
        message.merge_length_delimited_dyn(input, ctx)
    }
}

fn check_value(descriptor: &'static ExtensionDescriptor, value: &Value) -> Result<()> {
    if !descriptor.is_repeated() {
        return check_element(descriptor, value);
    }
    match value {
        Value::List(items) => items.iter().try_for_each(|item| check_element(descriptor, item)),
        other => Err(Error::type_mismatch(descriptor.name, "list", other.kind_name())),
    }
}

fn check_element(descriptor: &'static ExtensionDescriptor, value: &Value) -> Result<()> {
    if descriptor.field_type.accepts(value) {
        Ok(())
    } else {
        Err(Error::type_mismatch(
            descriptor.name,
            descriptor.field_type.name(),
            value.kind_name(),
        ))
    }
}
