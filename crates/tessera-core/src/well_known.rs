//! Ready-made messages for `google.protobuf.Empty`, `Timestamp` and
//! `Duration`.
//!
//! These follow the same shape as generated code. Their scalar fields use
//! implicit presence: a zero value is "unset" and is not serialized.

use crate::accessor::{FieldInfo, FieldOps, Label};
use crate::codec::{self, scalar, FieldType, ScalarKind};
use crate::error::Result;
use crate::extension::ExtensionSet;
use crate::merge::MergeContext;
use crate::message::{CachedSize, Message};
use crate::unknown::UnknownFieldSet;
use crate::value::Value;
use crate::wire::{CodedInput, Tag};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

const NANOS_PER_SECOND: i32 = 1_000_000_000;

/// `google.protobuf.Empty`.
///
/// Has no declared fields, so everything it is parsed from lands in its
/// unknown field set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Empty {
    unknown: UnknownFieldSet,
    extensions: ExtensionSet,
    size: CachedSize,
}

impl Message for Empty {
    const FULL_NAME: &'static str = "google.protobuf.Empty";

    fn fields() -> &'static [FieldInfo<Self>] {
        &[]
    }

    fn merge_field(
        &mut self,
        _tag: Tag,
        _input: &mut CodedInput<'_>,
        _ctx: &MergeContext<'_>,
    ) -> Result<bool> {
        Ok(false)
    }

    fn encode_fields(&self, _out: &mut Vec<u8>) {}

    fn fields_len(&self) -> usize {
        0
    }

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
}

/// Declares a `{ int64 seconds = 1; int32 nanos = 2; }` message
macro_rules! seconds_nanos_message {
    ($(#[$doc:meta])* $name:ident, $full_name:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            /// Whole seconds
            pub seconds: i64,
            /// Sub-second part in nanoseconds
            pub nanos: i32,
            unknown: UnknownFieldSet,
            extensions: ExtensionSet,
            size: CachedSize,
        }

        impl $name {
            /// Creates a value from seconds and nanoseconds
            pub fn new(seconds: i64, nanos: i32) -> Self {
                Self {
                    seconds,
                    nanos,
                    ..Default::default()
                }
            }
        }

        impl Message for $name {
            const FULL_NAME: &'static str = $full_name;

            fn fields() -> &'static [FieldInfo<Self>] {
                static FIELDS: OnceLock<Vec<FieldInfo<$name>>> = OnceLock::new();
                FIELDS.get_or_init(|| {
                    vec![
                        FieldInfo {
                            name: "seconds",
                            number: 1,
                            field_type: FieldType::Int64,
                            label: Label::Optional,
                            packed: false,
                            ops: FieldOps::Singular {
                                has: |m: &$name| m.seconds != 0,
                                get: |m: &$name| Value::I64(m.seconds),
                                set: |m: &mut $name, v: Value| {
                                    scalar::Int64::from_value(v).map(|v| m.seconds = v)
                                },
                                clear: |m: &mut $name| m.seconds = 0,
                            },
                        },
                        FieldInfo {
                            name: "nanos",
                            number: 2,
                            field_type: FieldType::Int32,
                            label: Label::Optional,
                            packed: false,
                            ops: FieldOps::Singular {
                                has: |m: &$name| m.nanos != 0,
                                get: |m: &$name| Value::I32(m.nanos),
                                set: |m: &mut $name, v: Value| {
                                    scalar::Int32::from_value(v).map(|v| m.nanos = v)
                                },
                                clear: |m: &mut $name| m.nanos = 0,
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
                    1 => codec::merge_implicit::<scalar::Int64>(&mut self.seconds, tag, input),
                    2 => codec::merge_implicit::<scalar::Int32>(&mut self.nanos, tag, input),
                    _ => Ok(false),
                }
            }

            fn encode_fields(&self, out: &mut Vec<u8>) {
                codec::encode_implicit::<scalar::Int64>(1, &self.seconds, out);
                codec::encode_implicit::<scalar::Int32>(2, &self.nanos, out);
            }

            fn fields_len(&self) -> usize {
                codec::implicit_len::<scalar::Int64>(1, &self.seconds)
                    + codec::implicit_len::<scalar::Int32>(2, &self.nanos)
            }

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
        }
    };
}

seconds_nanos_message!(
    /// `google.protobuf.Timestamp`: a point in time relative to the Unix epoch
    Timestamp,
    "google.protobuf.Timestamp"
);

seconds_nanos_message!(
    /// `google.protobuf.Duration`: a signed span of time
    Duration,
    "google.protobuf.Duration"
);

impl Timestamp {
    /// The current time
    pub fn now() -> Self {
        SystemTime::now().into()
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(since) => Self::new(since.as_secs() as i64, since.subsec_nanos() as i32),
            Err(err) => {
                let before = err.duration();
                let mut seconds = -(before.as_secs() as i64);
                let mut nanos = -(before.subsec_nanos() as i32);
                if nanos < 0 {
                    seconds -= 1;
                    nanos += NANOS_PER_SECOND;
                }
                Self::new(seconds, nanos)
            }
        }
    }
}

impl From<std::time::Duration> for Duration {
    fn from(duration: std::time::Duration) -> Self {
        Self::new(duration.as_secs() as i64, duration.subsec_nanos() as i32)
    }
}

impl TryFrom<Duration> for std::time::Duration {
    type Error = Duration;

    /// Fails for negative durations, handing the value back
    fn try_from(duration: Duration) -> std::result::Result<Self, Duration> {
        if duration.seconds < 0 || duration.nanos < 0 {
            return Err(duration);
        }
        Ok(std::time::Duration::new(duration.seconds as u64, duration.nanos as u32))
    }
}
