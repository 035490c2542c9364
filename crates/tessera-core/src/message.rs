//! Messages, frozen snapshots and copy-on-write builders.
//!
//! [`Message`] is the boundary with generated code: a message type declares
//! its full name, its field table and a static `merge_field` dispatch, and
//! gets encoding and reflection for free. [`MessageDyn`] is its object-safe
//! counterpart, used wherever the concrete type is only known at runtime
//! (embedded message values, extensions).
//!
//! Each message records its own encoded size in a [`CachedSize`] while it is
//! measured, so encoding sizes every nested message once and then writes.
//!
//! A [`Frozen`] message is an immutable, cheaply cloneable snapshot whose
//! encoded size is computed at most once. A [`Builder`] either shares a
//! frozen snapshot or owns a private copy; the first mutation of a shared
//! builder promotes it to owned storage by cloning the snapshot once.

use crate::accessor::{collect_missing, FieldInfo};
use crate::error::{Error, Result};
use crate::extension::ExtensionSet;
use crate::merge::{self, MergeContext, ParseConfig};
use crate::registry::{ExtensionDescriptor, RegistryView};
use crate::unknown::UnknownFieldSet;
use crate::value::Value;
use crate::wire::{CodedInput, Tag};
use std::any::Any;
use std::fmt;
use std::io::Read;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace};

/// Encoded size of a message as of its last measurement.
///
/// Embedded in every generated message. It is ignored by equality and only
/// read while writing the message that was just measured.
#[derive(Debug, Default)]
pub struct CachedSize(AtomicUsize);

impl CachedSize {
    /// Last recorded size
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    /// Records `size`
    pub fn set(&self, size: usize) {
        self.0.store(size, Ordering::Relaxed);
    }
}

impl Clone for CachedSize {
    fn clone(&self) -> Self {
        Self(AtomicUsize::new(self.get()))
    }
}

impl PartialEq for CachedSize {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for CachedSize {}

/// A statically typed message.
///
/// Implemented by generated code. Encoding writes declared fields first,
/// then extensions in field number order, then unknown fields in input order.
pub trait Message: Default + Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Fully qualified message name, used as the extension registry key
    const FULL_NAME: &'static str;

    /// Field table, built once per type
    fn fields() -> &'static [FieldInfo<Self>];

    /// Merges one occurrence of a declared field.
    ///
    /// Returns `Ok(false)` without consuming input if `tag` is not a declared
    /// field or its wire type does not fit the declared type.
    fn merge_field(
        &mut self,
        tag: Tag,
        input: &mut CodedInput<'_>,
        ctx: &MergeContext<'_>,
    ) -> Result<bool>;

    /// Writes the declared fields, taking nested sizes from their
    /// [`CachedSize`]
    fn encode_fields(&self, out: &mut Vec<u8>);

    /// Encoded length of the declared fields, measuring nested messages
    fn fields_len(&self) -> usize;

    /// Size recorded by the last [`Message::encoded_len`]
    fn cached_size(&self) -> &CachedSize;

    /// Fields the schema does not declare
    fn unknown_fields(&self) -> &UnknownFieldSet;

    /// Mutable access to the unknown fields
    fn unknown_fields_mut(&mut self) -> &mut UnknownFieldSet;

    /// Extension values
    fn extensions(&self) -> &ExtensionSet;

    /// Mutable access to the extension values
    fn extensions_mut(&mut self) -> &mut ExtensionSet;

    /// Total encoded length; records it, and that of every nested message
    fn encoded_len(&self) -> usize {
        let len =
            self.fields_len() + self.extensions().encoded_len() + self.unknown_fields().encoded_len();
        self.cached_size().set(len);
        len
    }

    /// Appends the encoded message to `out`
    fn encode_raw(&self, out: &mut Vec<u8>) {
        self.encoded_len();
        self.write_cached(out);
    }

    /// Appends the encoded message to `out` using the sizes recorded by the
    /// last [`Message::encoded_len`] call, which must follow any mutation
    fn write_cached(&self, out: &mut Vec<u8>) {
        self.encode_fields(out);
        self.extensions().encode(out);
        self.unknown_fields().encode(out);
    }

    /// Encodes the message into a new buffer
    fn encode_to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write_cached(&mut out);
        out
    }

    /// Decodes a message without extensions or required-field checks
    fn decode(data: &[u8]) -> Result<Self> {
        let mut message = Self::default();
        merge::merge(&mut message, data, RegistryView::empty(), &ParseConfig::default())?;
        Ok(message)
    }
}

/// Object-safe view of a [`Message`]
pub trait MessageDyn: Any + fmt::Debug + Send + Sync {
    /// Fully qualified message name
    fn full_name(&self) -> &'static str;

    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Clones into a new box
    fn clone_dyn(&self) -> Box<dyn MessageDyn>;

    /// Structural equality; messages of different types are never equal
    fn eq_dyn(&self, other: &dyn MessageDyn) -> bool;

    /// Total encoded length, recorded as with [`Message::encoded_len`]
    fn encoded_len_dyn(&self) -> usize;

    /// Size recorded by the last measurement
    fn cached_size_dyn(&self) -> usize;

    /// Appends the encoded message using the recorded sizes
    fn write_cached_dyn(&self, out: &mut Vec<u8>);

    /// Merges a length-prefixed encoding read from `input`
    fn merge_length_delimited_dyn(
        &mut self,
        input: &mut CodedInput<'_>,
        ctx: &MergeContext<'_>,
    ) -> Result<()>;

    /// Merges group contents up to the end-group tag of `number`
    fn merge_group_dyn(
        &mut self,
        number: u32,
        input: &mut CodedInput<'_>,
        ctx: &MergeContext<'_>,
    ) -> Result<()>;

    /// Field-wise merge of `other`; false if it is a different message type
    fn merge_from_dyn(&mut self, other: &dyn MessageDyn) -> bool;

    /// Appends the paths of unset required fields, each prefixed with `prefix`
    fn missing_fields_dyn(&self, prefix: &str, out: &mut Vec<String>);
}

impl<M: Message> MessageDyn for M {
    fn full_name(&self) -> &'static str {
        M::FULL_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_dyn(&self) -> Box<dyn MessageDyn> {
        Box::new(self.clone())
    }

    fn eq_dyn(&self, other: &dyn MessageDyn) -> bool {
        other
            .as_any()
            .downcast_ref::<M>()
            .map_or(false, |other| self == other)
    }

    fn encoded_len_dyn(&self) -> usize {
        self.encoded_len()
    }

    fn cached_size_dyn(&self) -> usize {
        self.cached_size().get()
    }

    fn write_cached_dyn(&self, out: &mut Vec<u8>) {
        self.write_cached(out);
    }

    fn merge_length_delimited_dyn(
        &mut self,
        input: &mut CodedInput<'_>,
        ctx: &MergeContext<'_>,
    ) -> Result<()> {
        merge::merge_length_delimited(self, input, ctx)
    }

    fn merge_group_dyn(
        &mut self,
        number: u32,
        input: &mut CodedInput<'_>,
        ctx: &MergeContext<'_>,
    ) -> Result<()> {
        merge::merge_group(self, number, input, ctx)
    }

    fn merge_from_dyn(&mut self, other: &dyn MessageDyn) -> bool {
        match other.as_any().downcast_ref::<M>() {
            Some(other) => {
                merge::merge_from(self, other);
                true
            }
            None => false,
        }
    }

    fn missing_fields_dyn(&self, prefix: &str, out: &mut Vec<String>) {
        collect_missing(self, prefix, out);
    }
}

impl Clone for Box<dyn MessageDyn> {
    fn clone(&self) -> Self {
        (**self).clone_dyn()
    }
}

impl PartialEq for dyn MessageDyn {
    fn eq(&self, other: &Self) -> bool {
        self.eq_dyn(other)
    }
}

/// Boxes a default instance of `M`; usable as a
/// [`MessageFactory`](crate::codec::MessageFactory)
pub fn new_boxed<M: Message>() -> Box<dyn MessageDyn> {
    Box::new(M::default())
}

#[derive(Debug)]
struct FrozenInner<M> {
    message: M,
    cached_len: OnceLock<usize>,
}

impl<M> FrozenInner<M> {
    fn new(message: M) -> Self {
        Self {
            message,
            cached_len: OnceLock::new(),
        }
    }
}

/// Immutable message snapshot.
///
/// Clones share the same storage. The encoded length is computed on first
/// use and cached, which is sound because the message can no longer change.
pub struct Frozen<M: Message> {
    inner: Arc<FrozenInner<M>>,
}

impl<M: Message> Frozen<M> {
    /// Freezes `message`
    pub fn new(message: M) -> Self {
        Self {
            inner: Arc::new(FrozenInner::new(message)),
        }
    }

    /// Parses `data` with no extensions and the default limits, failing if
    /// required fields are missing
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with(data, RegistryView::empty(), &ParseConfig::default())
    }

    /// Parses `data`, resolving extensions through `registry`
    pub fn parse_with(data: &[u8], registry: &RegistryView, config: &ParseConfig) -> Result<Self> {
        let mut builder = Builder::new();
        builder.merge_from_slice(data, registry, config)?;
        builder.build()
    }

    /// The message
    pub fn message(&self) -> &M {
        &self.inner.message
    }

    /// Encoded length, memoized
    pub fn encoded_len(&self) -> usize {
        *self
            .inner
            .cached_len
            .get_or_init(|| self.inner.message.encoded_len())
    }

    /// Encodes the message into a new buffer
    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.inner.message.write_cached(&mut out);
        out
    }

    /// Starts a builder that shares this snapshot until first mutated
    pub fn to_builder(&self) -> Builder<M> {
        Builder {
            storage: Storage::Shared(Arc::clone(&self.inner)),
        }
    }

    /// Returns true if both handles share the same storage
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns true once the encoded length has been computed
    pub fn is_len_cached(&self) -> bool {
        self.inner.cached_len.get().is_some()
    }
}

impl<M: Message> Clone for Frozen<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Message> Default for Frozen<M> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

impl<M: Message> Deref for Frozen<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.inner.message
    }
}

impl<M: Message> PartialEq for Frozen<M> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.inner.message == other.inner.message
    }
}

impl<M: Message> fmt::Debug for Frozen<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Frozen").field(&self.inner.message).finish()
    }
}

impl<M: Message> From<M> for Frozen<M> {
    fn from(message: M) -> Self {
        Self::new(message)
    }
}

enum Storage<M> {
    Shared(Arc<FrozenInner<M>>),
    Owned(M),
}

/// Mutable staging area producing [`Frozen`] messages
pub struct Builder<M: Message> {
    storage: Storage<M>,
}

impl<M: Message> Default for Builder<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message> Builder<M> {
    /// Creates a builder over an empty message
    pub fn new() -> Self {
        Self::from_message(M::default())
    }

    /// Creates a builder that owns `message`
    pub fn from_message(message: M) -> Self {
        Self {
            storage: Storage::Owned(message),
        }
    }

    /// Read access to the message under construction
    pub fn as_message(&self) -> &M {
        match &self.storage {
            Storage::Shared(inner) => &inner.message,
            Storage::Owned(message) => message,
        }
    }

    /// Write access, promoting shared storage to a private copy first
    pub fn message_mut(&mut self) -> &mut M {
        if let Storage::Shared(inner) = &self.storage {
            trace!("Promoting shared {} to owned storage", M::FULL_NAME);
            self.storage = Storage::Owned(inner.message.clone());
        }
        match &mut self.storage {
            Storage::Owned(message) => message,
            Storage::Shared(_) => unreachable!("storage promoted above"),
        }
    }

    /// Returns true while the builder still shares a frozen snapshot
    pub fn is_shared(&self) -> bool {
        matches!(self.storage, Storage::Shared(_))
    }

    /// Resets to an empty message
    pub fn clear(&mut self) {
        self.storage = Storage::Owned(M::default());
    }

    /// Merges the encoded message in `data`
    pub fn merge_from_slice(
        &mut self,
        data: &[u8],
        registry: &RegistryView,
        config: &ParseConfig,
    ) -> Result<()> {
        merge::merge(self.message_mut(), data, registry, config)
    }

    /// Reads `reader` to the end and merges its contents.
    ///
    /// At most one byte past the configured size limit is read.
    pub fn merge_from_reader<R: Read>(
        &mut self,
        reader: R,
        registry: &RegistryView,
        config: &ParseConfig,
    ) -> Result<()> {
        let mut data = Vec::new();
        let cap = u64::try_from(config.size_limit).unwrap_or(u64::MAX).saturating_add(1);
        reader.take(cap).read_to_end(&mut data)?;
        self.merge_from_slice(&data, registry, config)
    }

    /// Field-wise merge of `other` into the message under construction
    pub fn merge_from(&mut self, other: &M) {
        merge::merge_from(self.message_mut(), other);
    }

    /// Value of an extension, if present
    pub fn extension(&self, descriptor: &'static ExtensionDescriptor) -> Option<&Value> {
        self.as_message().extensions().get(descriptor)
    }

    /// Replaces the value of an extension of `M`
    pub fn set_extension(
        &mut self,
        descriptor: &'static ExtensionDescriptor,
        value: Value,
    ) -> Result<()> {
        check_extendee::<M>(descriptor)?;
        self.message_mut().extensions_mut().set(descriptor, value)
    }

    /// Appends to a repeated extension of `M`
    pub fn add_extension(
        &mut self,
        descriptor: &'static ExtensionDescriptor,
        value: Value,
    ) -> Result<()> {
        check_extendee::<M>(descriptor)?;
        self.message_mut().extensions_mut().add(descriptor, value)
    }

    /// Removes an extension
    pub fn clear_extension(&mut self, descriptor: &'static ExtensionDescriptor) {
        if self.as_message().extensions().has(descriptor) {
            self.message_mut().extensions_mut().clear(descriptor);
        }
    }

    /// Freezes the current contents without checking required fields.
    ///
    /// The builder keeps sharing the returned snapshot, so a later mutation
    /// copies it again instead of changing the snapshot.
    pub fn build_partial(&mut self) -> Frozen<M> {
        let inner = match &mut self.storage {
            Storage::Shared(inner) => Arc::clone(inner),
            Storage::Owned(message) => {
                let inner = Arc::new(FrozenInner::new(std::mem::take(message)));
                self.storage = Storage::Shared(Arc::clone(&inner));
                inner
            }
        };
        debug!("Built {}", M::FULL_NAME);
        Frozen { inner }
    }

    /// Freezes the current contents, failing if required fields are unset
    pub fn build(&mut self) -> Result<Frozen<M>> {
        let mut missing = Vec::new();
        collect_missing(self.as_message(), "", &mut missing);
        if !missing.is_empty() {
            return Err(Error::UninitializedMessage { missing });
        }
        Ok(self.build_partial())
    }
}

impl<M: Message> fmt::Debug for Builder<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("shared", &self.is_shared())
            .field("message", self.as_message())
            .finish()
    }
}

fn check_extendee<M: Message>(descriptor: &'static ExtensionDescriptor) -> Result<()> {
    if descriptor.extendee == M::FULL_NAME {
        Ok(())
    } else {
        Err(Error::type_mismatch(
            descriptor.name,
            format!("extension of {}", M::FULL_NAME),
            format!("extension of {}", descriptor.extendee),
        ))
    }
}
