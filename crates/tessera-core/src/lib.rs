//! # tessera-core
//!
//! A runtime for Protocol Buffer messages: parsing and serializing the binary
//! wire format, extension fields resolved through a registry, and uniform
//! field access without per-field reflection code.
//!
//! This crate provides:
//! - A tag-dispatch merge engine that handles declared fields, registered
//!   extensions and unknown data, with merge-if-present semantics for
//!   embedded messages
//! - An extension registry with a single mutable owner and read-only views
//! - Field accessors driven by a per-type table of field operations
//! - Immutable [`Frozen`] messages and copy-on-write [`Builder`]s
//!
//! ## Architecture
//!
//! - [`wire`]: Tags, varints and the bounded [`CodedInput`] reader
//! - [`codec`]: Per-type field codecs used by generated code and extensions
//! - [`message`]: The [`Message`] trait, [`Frozen`] and [`Builder`]
//! - [`merge`]: The parse engine and [`ParseConfig`]
//! - [`registry`] and [`extension`]: Extension descriptors and values
//! - [`accessor`]: [`FieldAccessor`] and the field operation tables
//! - [`unknown`]: Verbatim storage of unknown fields
//! - [`well_known`]: `Empty`, `Timestamp` and `Duration`
//!
//! ## Example
//!
//! ```
//! use tessera_core::well_known::Timestamp;
//! use tessera_core::{Frozen, Message};
//!
//! let bytes = Timestamp::new(1_700_000_000, 0).encode_to_vec();
//! let frozen = Frozen::<Timestamp>::parse(&bytes)?;
//!
//! // The builder shares `frozen` until its first mutation
//! let mut builder = frozen.to_builder();
//! builder.message_mut().nanos = 500;
//! let updated = builder.build()?;
//!
//! assert_eq!(frozen.nanos, 0);
//! assert_eq!(updated.nanos, 500);
//! # Ok::<(), tessera_core::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod accessor;
pub mod codec;
pub mod error;
pub mod extension;
pub mod merge;
pub mod message;
pub mod registry;
pub mod unknown;
pub mod value;
pub mod well_known;
pub mod wire;

#[cfg(test)]
mod test_util;

// Re-export primary types for convenience
pub use accessor::{FieldAccessor, FieldInfo, FieldOps, Label};
pub use codec::FieldType;
pub use error::{Error, Result};
pub use extension::{ExtensionSet, ExtensionValue};
pub use merge::{MergeContext, ParseConfig};
pub use message::{Builder, CachedSize, Frozen, Message, MessageDyn};
pub use registry::{ExtensionDescriptor, ExtensionKey, ExtensionRegistry, RegistryView};
pub use unknown::{UnknownField, UnknownFieldSet, UnknownValue};
pub use value::Value;
pub use wire::{CodedInput, Tag, WireType, MAX_FIELD_NUMBER};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
