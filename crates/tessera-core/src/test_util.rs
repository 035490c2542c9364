//! Fixture messages shaped like generated code.
//!
//! ```text
//! message Person {
//!   required int32 id = 1;
//!   optional string name = 2;
//!   optional string email = 3;
//!   repeated uint32 scores = 4 [packed = true];
//!   optional Address address = 5;
//!   repeated Phone phones = 6;
//!   optional Kind kind = 7;
//!   optional group Legacy = 8 { optional int64 value = 1; }
//!   extensions 100 to 199;
//! }
//! message Address { optional string street = 1; optional string city = 2; optional uint32 zip = 3; }
//! message Phone { required string number = 1; optional Kind kind = 2; }
//! message Node { optional int32 value = 1; optional Node child = 2; }
//!
//! extend Person {
//!   optional string nickname = 100;
//!   repeated uint32 tags = 101 [packed = true];
//!   optional Address home = 102;
//!   optional Phone work_phone = 103;
//!   repeated Phone spare_phones = 104;
//! }
//! ```

use crate::accessor::{FieldInfo, FieldOps, Label};
use crate::codec::{self, scalar, FieldType, ScalarKind};
use crate::error::Result;
use crate::extension::ExtensionSet;
use crate::merge::MergeContext;
use crate::message::{new_boxed, CachedSize, Message};
use crate::registry::ExtensionDescriptor;
use crate::unknown::UnknownFieldSet;
use crate::value::Value;
use crate::wire::{CodedInput, Tag};
use std::sync::OnceLock;

macro_rules! field_storage {
    () => {
        fn unknown_fields(&self) -> &UnknownFieldSet {
            &self.unknown
        }

        fn unknown_fields_mut(&mut self) -> &mut UnknownFieldSet {
            &mut self.unknown
        }

        fn extensions(&self) -> &ExtensionSet {
            &self.extensions
        }

        fn extensions_mut(&mut self) -> &mut ExtensionSet {
            &mut self.extensions
        }

        fn cached_size(&self) -> &CachedSize {
            &self.size
        }
    };
}

pub(crate) static NICKNAME: ExtensionDescriptor = ExtensionDescriptor::singular(
    "tessera.test.Person",
    100,
    "tessera.test.nickname",
    FieldType::String,
);

pub(crate) static TAGS: ExtensionDescriptor = ExtensionDescriptor::repeated(
    "tessera.test.Person",
    101,
    "tessera.test.tags",
    FieldType::UInt32,
    true,
);

pub(crate) static HOME: ExtensionDescriptor = ExtensionDescriptor::singular(
    "tessera.test.Person",
    102,
    "tessera.test.home",
    FieldType::Message(new_boxed::<Address>),
);

pub(crate) static WORK_PHONE: ExtensionDescriptor = ExtensionDescriptor::singular(
    "tessera.test.Person",
    103,
    "tessera.test.work_phone",
    FieldType::Message(new_boxed::<Phone>),
);

pub(crate) static SPARE_PHONES: ExtensionDescriptor = ExtensionDescriptor::repeated(
    "tessera.test.Person",
    104,
    "tessera.test.spare_phones",
    FieldType::Message(new_boxed::<Phone>),
    false,
);

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Person {
    pub(crate) id: Option<i32>,
    pub(crate) name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) scores: Vec<u32>,
    pub(crate) address: Option<Box<Address>>,
    pub(crate) phones: Vec<Phone>,
    pub(crate) kind: Option<i32>,
    pub(crate) legacy: Option<Box<Legacy>>,
    pub(crate) unknown: UnknownFieldSet,
    pub(crate) extensions: ExtensionSet,
    pub(crate) size: CachedSize,
}

impl Message for Person {
    const FULL_NAME: &'static str = "tessera.test.Person";

    fn fields() -> &'static [FieldInfo<Self>] {
        static FIELDS: OnceLock<Vec<FieldInfo<Person>>> = OnceLock::new();
        FIELDS.get_or_init(|| {
            vec![
                FieldInfo {
                    name: "id",
                    number: 1,
                    field_type: FieldType::Int32,
                    label: Label::Required,
                    packed: false,
                    ops: FieldOps::Singular {
                        has: |m: &Person| m.id.is_some(),
                        get: |m: &Person| Value::I32(m.id.unwrap_or_default()),
                        set: |m: &mut Person, v: Value| {
                            scalar::Int32::from_value(v).map(|v| m.id = Some(v))
                        },
                        clear: |m: &mut Person| m.id = None,
                    },
                },
                FieldInfo {
                    name: "name",
                    number: 2,
                    field_type: FieldType::String,
                    label: Label::Optional,
                    packed: false,
                    ops: FieldOps::Singular {
                        has: |m: &Person| m.name.is_some(),
                        get: |m: &Person| Value::String(m.name.clone().unwrap_or_default()),
                        set: |m: &mut Person, v: Value| {
                            scalar::String::from_value(v).map(|v| m.name = Some(v))
                        },
                        clear: |m: &mut Person| m.name = None,
                    },
                },
                FieldInfo {
                    name: "email",
                    number: 3,
                    field_type: FieldType::String,
                    label: Label::Optional,
                    packed: false,
                    ops: FieldOps::Singular {
                        has: |m: &Person| m.email.is_some(),
                        get: |m: &Person| Value::String(m.email.clone().unwrap_or_default()),
                        set: |m: &mut Person, v: Value| {
                            scalar::String::from_value(v).map(|v| m.email = Some(v))
                        },
                        clear: |m: &mut Person| m.email = None,
                    },
                },
                FieldInfo {
                    name: "scores",
                    number: 4,
                    field_type: FieldType::UInt32,
                    label: Label::Repeated,
                    packed: true,
                    ops: FieldOps::Repeated {
                        len: |m: &Person| m.scores.len(),
                        get: |m: &Person, i: usize| m.scores.get(i).map(|v| Value::U32(*v)),
                        set: |m: &mut Person, i: usize, v: Value| {
                            scalar::UInt32::from_value(v).map(|v| m.scores[i] = v)
                        },
                        push: |m: &mut Person, v: Value| {
                            scalar::UInt32::from_value(v).map(|v| m.scores.push(v))
                        },
                        clear: |m: &mut Person| m.scores.clear(),
                    },
                },
                FieldInfo {
                    name: "address",
                    number: 5,
                    field_type: FieldType::Message(new_boxed::<Address>),
                    label: Label::Optional,
                    packed: false,
                    ops: FieldOps::Singular {
                        has: |m: &Person| m.address.is_some(),
                        get: |m: &Person| {
                            Value::message(m.address.as_deref().cloned().unwrap_or_default())
                        },
                        set: |m: &mut Person, v: Value| {
                            v.into_message::<Address>()
                                .map(|a| m.address = Some(Box::new(a)))
                        },
                        clear: |m: &mut Person| m.address = None,
                    },
                },
                FieldInfo {
                    name: "phones",
                    number: 6,
                    field_type: FieldType::Message(new_boxed::<Phone>),
                    label: Label::Repeated,
                    packed: false,
                    ops: FieldOps::Repeated {
                        len: |m: &Person| m.phones.len(),
                        get: |m: &Person, i: usize| m.phones.get(i).cloned().map(Value::message),
                        set: |m: &mut Person, i: usize, v: Value| {
                            v.into_message::<Phone>().map(|p| m.phones[i] = p)
                        },
                        push: |m: &mut Person, v: Value| {
                            v.into_message::<Phone>().map(|p| m.phones.push(p))
                        },
                        clear: |m: &mut Person| m.phones.clear(),
                    },
                },
                FieldInfo {
                    name: "kind",
                    number: 7,
                    field_type: FieldType::Enum,
                    label: Label::Optional,
                    packed: false,
                    ops: FieldOps::Singular {
                        has: |m: &Person| m.kind.is_some(),
                        get: |m: &Person| Value::Enum(m.kind.unwrap_or_default()),
                        set: |m: &mut Person, v: Value| {
                            scalar::Enum::from_value(v).map(|v| m.kind = Some(v))
                        },
                        clear: |m: &mut Person| m.kind = None,
                    },
                },
                FieldInfo {
                    name: "legacy",
                    number: 8,
                    field_type: FieldType::Group(new_boxed::<Legacy>),
                    label: Label::Optional,
                    packed: false,
                    ops: FieldOps::Singular {
                        has: |m: &Person| m.legacy.is_some(),
                        get: |m: &Person| {
                            Value::message(m.legacy.as_deref().cloned().unwrap_or_default())
                        },
                        set: |m: &mut Person, v: Value| {
                            v.into_message::<Legacy>()
                                .map(|l| m.legacy = Some(Box::new(l)))
                        },
                        clear: |m: &mut Person| m.legacy = None,
                    },
                },
            ]
        })
    }

    fn merge_field(
        &mut self,
        tag: Tag,
        input: &mut CodedInput<'_>,
        ctx: &MergeContext<'_>,
    ) -> Result<bool> {
        match tag.number() {
            1 => codec::merge_singular::<scalar::Int32>(&mut self.id, tag, input),
            2 => codec::merge_singular::<scalar::String>(&mut self.name, tag, input),
            3 => codec::merge_singular::<scalar::String>(&mut self.email, tag, input),
            4 => codec::merge_repeated::<scalar::UInt32>(&mut self.scores, tag, input),
            5 => codec::merge_message(&mut self.address, tag, input, ctx),
            6 => codec::merge_repeated_message(&mut self.phones, tag, input, ctx),
            7 => codec::merge_singular::<scalar::Enum>(&mut self.kind, tag, input),
            8 => codec::merge_group(&mut self.legacy, tag, input, ctx),
            _ => Ok(false),
        }
    }

    fn encode_fields(&self, out: &mut Vec<u8>) {
        codec::encode_singular::<scalar::Int32>(1, &self.id, out);
        codec::encode_singular::<scalar::String>(2, &self.name, out);
        codec::encode_singular::<scalar::String>(3, &self.email, out);
        codec::encode_repeated::<scalar::UInt32>(4, &self.scores, true, out);
        if let Some(address) = self.address.as_deref() {
            codec::encode_message(5, address, out);
        }
        for phone in &self.phones {
            codec::encode_message(6, phone, out);
        }
        codec::encode_singular::<scalar::Enum>(7, &self.kind, out);
        if let Some(legacy) = self.legacy.as_deref() {
            codec::encode_group(8, legacy, out);
        }
    }

    fn fields_len(&self) -> usize {
        codec::singular_len::<scalar::Int32>(1, &self.id)
            + codec::singular_len::<scalar::String>(2, &self.name)
            + codec::singular_len::<scalar::String>(3, &self.email)
            + codec::repeated_len::<scalar::UInt32>(4, &self.scores, true)
            + self
                .address
                .as_deref()
                .map_or(0, |address| codec::message_len(5, address))
            + self
                .phones
                .iter()
                .map(|phone| codec::message_len(6, phone))
                .sum::<usize>()
            + codec::singular_len::<scalar::Enum>(7, &self.kind)
            + self
                .legacy
                .as_deref()
                .map_or(0, |legacy| codec::group_len(8, legacy))
    }

    field_storage!();
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Address {
    pub(crate) street: Option<String>,
    pub(crate) city: Option<String>,
    pub(crate) zip: Option<u32>,
    pub(crate) unknown: UnknownFieldSet,
    pub(crate) extensions: ExtensionSet,
    pub(crate) size: CachedSize,
}

impl Message for Address {
    const FULL_NAME: &'static str = "tessera.test.Address";

    fn fields() -> &'static [FieldInfo<Self>] {
        static FIELDS: OnceLock<Vec<FieldInfo<Address>>> = OnceLock::new();
        FIELDS.get_or_init(|| {
            vec![
                FieldInfo {
                    name: "street",
                    number: 1,
                    field_type: FieldType::String,
                    label: Label::Optional,
                    packed: false,
                    ops: FieldOps::Singular {
                        has: |m: &Address| m.street.is_some(),
                        get: |m: &Address| Value::String(m.street.clone().unwrap_or_default()),
                        set: |m: &mut Address, v: Value| {
                            scalar::String::from_value(v).map(|v| m.street = Some(v))
                        },
                        clear: |m: &mut Address| m.street = None,
                    },
                },
                FieldInfo {
                    name: "city",
                    number: 2,
                    field_type: FieldType::String,
                    label: Label::Optional,
                    packed: false,
                    ops: FieldOps::Singular {
                        has: |m: &Address| m.city.is_some(),
                        get: |m: &Address| Value::String(m.city.clone().unwrap_or_default()),
                        set: |m: &mut Address, v: Value| {
                            scalar::String::from_value(v).map(|v| m.city = Some(v))
                        },
                        clear: |m: &mut Address| m.city = None,
                    },
                },
                FieldInfo {
                    name: "zip",
                    number: 3,
                    field_type: FieldType::UInt32,
                    label: Label::Optional,
                    packed: false,
                    ops: FieldOps::Singular {
                        has: |m: &Address| m.zip.is_some(),
                        get: |m: &Address| Value::U32(m.zip.unwrap_or_default()),
                        set: |m: &mut Address, v: Value| {
                            scalar::UInt32::from_value(v).map(|v| m.zip = Some(v))
                        },
                        clear: |m: &mut Address| m.zip = None,
                    },
                },
            ]
        })
    }

    fn merge_field(
        &mut self,
        tag: Tag,
        input: &mut CodedInput<'_>,
        _ctx: &MergeContext<'_>,
    ) -> Result<bool> {
        match tag.number() {
            1 => codec::merge_singular::<scalar::String>(&mut self.street, tag, input),
            2 => codec::merge_singular::<scalar::String>(&mut self.city, tag, input),
            3 => codec::merge_singular::<scalar::UInt32>(&mut self.zip, tag, input),
            _ => Ok(false),
        }
    }

    fn encode_fields(&self, out: &mut Vec<u8>) {
        codec::encode_singular::<scalar::String>(1, &self.street, out);
        codec::encode_singular::<scalar::String>(2, &self.city, out);
        codec::encode_singular::<scalar::UInt32>(3, &self.zip, out);
    }

    fn fields_len(&self) -> usize {
        codec::singular_len::<scalar::String>(1, &self.street)
            + codec::singular_len::<scalar::String>(2, &self.city)
            + codec::singular_len::<scalar::UInt32>(3, &self.zip)
    }

    field_storage!();
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Phone {
    pub(crate) number: Option<String>,
    pub(crate) kind: Option<i32>,
    pub(crate) unknown: UnknownFieldSet,
    pub(crate) extensions: ExtensionSet,
    pub(crate) size: CachedSize,
}

impl Message for Phone {
    const FULL_NAME: &'static str = "tessera.test.Phone";

    fn fields() -> &'static [FieldInfo<Self>] {
        static FIELDS: OnceLock<Vec<FieldInfo<Phone>>> = OnceLock::new();
        FIELDS.get_or_init(|| {
            vec![
                FieldInfo {
                    name: "number",
                    number: 1,
                    field_type: FieldType::String,
                    label: Label::Required,
                    packed: false,
                    ops: FieldOps::Singular {
                        has: |m: &Phone| m.number.is_some(),
                        get: |m: &Phone| Value::String(m.number.clone().unwrap_or_default()),
                        set: |m: &mut Phone, v: Value| {
                            scalar::String::from_value(v).map(|v| m.number = Some(v))
                        },
                        clear: |m: &mut Phone| m.number = None,
                    },
                },
                FieldInfo {
                    name: "kind",
                    number: 2,
                    field_type: FieldType::Enum,
                    label: Label::Optional,
                    packed: false,
                    ops: FieldOps::Singular {
                        has: |m: &Phone| m.kind.is_some(),
                        get: |m: &Phone| Value::Enum(m.kind.unwrap_or_default()),
                        set: |m: &mut Phone, v: Value| {
                            scalar::Enum::from_value(v).map(|v| m.kind = Some(v))
                        },
                        clear: |m: &mut Phone| m.kind = None,
                    },
                },
            ]
        })
    }

    fn merge_field(
        &mut self,
        tag: Tag,
        input: &mut CodedInput<'_>,
        _ctx: &MergeContext<'_>,
    ) -> Result<bool> {
        match tag.number() {
            1 => codec::merge_singular::<scalar::String>(&mut self.number, tag, input),
            2 => codec::merge_singular::<scalar::Enum>(&mut self.kind, tag, input),
            _ => Ok(false),
        }
    }

    fn encode_fields(&self, out: &mut Vec<u8>) {
        codec::encode_singular::<scalar::String>(1, &self.number, out);
        codec::encode_singular::<scalar::Enum>(2, &self.kind, out);
    }

    fn fields_len(&self) -> usize {
        codec::singular_len::<scalar::String>(1, &self.number)
            + codec::singular_len::<scalar::Enum>(2, &self.kind)
    }

    field_storage!();
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Legacy {
    pub(crate) value: Option<i64>,
    pub(crate) unknown: UnknownFieldSet,
    pub(crate) extensions: ExtensionSet,
    pub(crate) size: CachedSize,
}

impl Message for Legacy {
    const FULL_NAME: &'static str = "tessera.test.Person.Legacy";

    fn fields() -> &'static [FieldInfo<Self>] {
        static FIELDS: OnceLock<Vec<FieldInfo<Legacy>>> = OnceLock::new();
        FIELDS.get_or_init(|| {
            vec![FieldInfo {
                name: "value",
                number: 1,
                field_type: FieldType::Int64,
                label: Label::Optional,
                packed: false,
                ops: FieldOps::Singular {
                    has: |m: &Legacy| m.value.is_some(),
                    get: |m: &Legacy| Value::I64(m.value.unwrap_or_default()),
                    set: |m: &mut Legacy, v: Value| {
                        scalar::Int64::from_value(v).map(|v| m.value = Some(v))
                    },
                    clear: |m: &mut Legacy| m.value = None,
                },
            }]
        })
    }

    fn merge_field(
        &mut self,
        tag: Tag,
        input: &mut CodedInput<'_>,
        _ctx: &MergeContext<'_>,
    ) -> Result<bool> {
        match tag.number() {
            1 => codec::merge_singular::<scalar::Int64>(&mut self.value, tag, input),
            _ => Ok(false),
        }
    }

    fn encode_fields(&self, out: &mut Vec<u8>) {
        codec::encode_singular::<scalar::Int64>(1, &self.value, out);
    }

    fn fields_len(&self) -> usize {
        codec::singular_len::<scalar::Int64>(1, &self.value)
    }

    field_storage!();
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Node {
    pub(crate) value: Option<i32>,
    pub(crate) child: Option<Box<Node>>,
    pub(crate) unknown: UnknownFieldSet,
    pub(crate) extensions: ExtensionSet,
    pub(crate) size: CachedSize,
}

impl Message for Node {
    const FULL_NAME: &'static str = "tessera.test.Node";

    fn fields() -> &'static [FieldInfo<Self>] {
        static FIELDS: OnceLock<Vec<FieldInfo<Node>>> = OnceLock::new();
        FIELDS.get_or_init(|| {
            vec![
                FieldInfo {
                    name: "value",
                    number: 1,
                    field_type: FieldType::Int32,
                    label: Label::Optional,
                    packed: false,
                    ops: FieldOps::Singular {
                        has: |m: &Node| m.value.is_some(),
                        get: |m: &Node| Value::I32(m.value.unwrap_or_default()),
                        set: |m: &mut Node, v: Value| {
                            scalar::Int32::from_value(v).map(|v| m.value = Some(v))
                        },
                        clear: |m: &mut Node| m.value = None,
                    },
                },
                FieldInfo {
                    name: "child",
                    number: 2,
                    field_type: FieldType::Message(new_boxed::<Node>),
                    label: Label::Optional,
                    packed: false,
                    ops: FieldOps::Singular {
                        has: |m: &Node| m.child.is_some(),
                        get: |m: &Node| Value::message(m.child.as_deref().cloned().unwrap_or_default()),
                        set: |m: &mut Node, v: Value| {
                            v.into_message::<Node>().map(|n| m.child = Some(Box::new(n)))
                        },
                        clear: |m: &mut Node| m.child = None,
                    },
                },
            ]
        })
    }

    fn merge_field(
        &mut self,
        tag: Tag,
        input: &mut CodedInput<'_>,
        ctx: &MergeContext<'_>,
    ) -> Result<bool> {
        match tag.number() {
            1 => codec::merge_singular::<scalar::Int32>(&mut self.value, tag, input),
            2 => codec::merge_message(&mut self.child, tag, input, ctx),
            _ => Ok(false),
        }
    }

    fn encode_fields(&self, out: &mut Vec<u8>) {
        codec::encode_singular::<scalar::Int32>(1, &self.value, out);
        if let Some(child) = self.child.as_deref() {
            codec::encode_message(2, child, out);
        }
    }

    fn fields_len(&self) -> usize {
        codec::singular_len::<scalar::Int32>(1, &self.value)
            + self
                .child
                .as_deref()
                .map_or(0, |child| codec::message_len(2, child))
    }

    field_storage!();
}

/// A person with every declared field set
pub(crate) fn sample_person() -> Person {
    Person {
        id: Some(7),
        name: Some("Ada".into()),
        email: Some("ada@example.com".into()),
        scores: vec![1, 300, 2],
        address: Some(Box::new(Address {
            street: Some("Main".into()),
            city: Some("Oslo".into()),
            zip: Some(1234),
            ..Default::default()
        })),
        phones: vec![Phone {
            number: Some("555-0100".into()),
            kind: Some(1),
            ..Default::default()
        }],
        kind: Some(2),
        legacy: Some(Box::new(Legacy {
            value: Some(-3),
            ..Default::default()
        })),
        ..Default::default()
    }
}
