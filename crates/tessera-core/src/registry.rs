//! Extension registry.
//!
//! Maps `(extendee, field number)` to the [`ExtensionDescriptor`] that
//! explains how to decode that field. The parse engine consults it only for
//! tags the message's own schema does not declare.
//!
//! Ownership is split by type:
//!
//! - [`ExtensionRegistry`] is the single owner. Only it can `add`, and adding
//!   takes `&mut self`, so there is never more than one writer.
//! - [`RegistryView`] is a cheap, cloneable read-only handle over the same
//!   backing map. It has no mutating methods at all.
//!
//! Each `add` publishes a new immutable snapshot of the map. Views always
//! observe the latest published snapshot, so entries added after a view was
//! taken are visible through it, and readers on other threads never see a
//! half-applied update.

use crate::accessor::Label;
use crate::codec::FieldType;
use crate::error::{Error, Result};
use arc_swap::ArcSwap;
use rustc_hash::FxHashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Registry key: extended message's full name plus field number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtensionKey {
    /// Full name of the extended message
    pub extendee: &'static str,
    /// Extension field number
    pub number: u32,
}

impl ExtensionKey {
    /// Creates a new key
    pub fn new(extendee: &'static str, number: u32) -> Self {
        Self { extendee, number }
    }
}

/// Static description of an extension field.
///
/// Descriptors are declared once as `static` items and referenced, never
/// copied, by registries and extension values.
#[derive(Debug)]
pub struct ExtensionDescriptor {
    /// Full name of the extended message
    pub extendee: &'static str,
    /// Extension field number
    pub number: u32,
    /// Fully qualified extension name
    pub name: &'static str,
    /// Declared value type
    pub field_type: FieldType,
    /// Cardinality
    pub label: Label,
    /// Whether a repeated scalar extension serializes packed
    pub packed: bool,
}

impl ExtensionDescriptor {
    /// Describes a singular extension
    pub const fn singular(
        extendee: &'static str,
        number: u32,
        name: &'static str,
        field_type: FieldType,
    ) -> Self {
        Self {
            extendee,
            number,
            name,
            field_type,
            label: Label::Optional,
            packed: false,
        }
    }

    /// Describes a repeated extension
    pub const fn repeated(
        extendee: &'static str,
        number: u32,
        name: &'static str,
        field_type: FieldType,
        packed: bool,
    ) -> Self {
        Self {
            extendee,
            number,
            name,
            field_type,
            label: Label::Repeated,
            packed,
        }
    }

    /// Registry key of this extension
    pub fn key(&self) -> ExtensionKey {
        ExtensionKey::new(self.extendee, self.number)
    }

    /// Returns true for repeated extensions
    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }
}

pub(crate) type ExtensionMap = FxHashMap<ExtensionKey, &'static ExtensionDescriptor>;

/// Owning, mutable extension registry
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    entries: Arc<ArcSwap<ExtensionMap>>,
}

impl ExtensionRegistry {
    /// Creates a new registry with no entries
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `descriptor` under its `(extendee, number)` key
    pub fn add(&mut self, descriptor: &'static ExtensionDescriptor) -> Result<()> {
        let key = descriptor.key();
        let current = self.entries.load_full();
        if current.contains_key(&key) {
            return Err(Error::DuplicateExtension {
                extendee: key.extendee,
                number: key.number,
            });
        }

        let mut next = (*current).clone();
        next.insert(key, descriptor);
        self.entries.store(Arc::new(next));

        debug!(
            "Registered extension {} ({}.{})",
            descriptor.name, key.extendee, key.number
        );
        Ok(())
    }

    /// Registers several descriptors, stopping at the first duplicate
    pub fn add_all<I>(&mut self, descriptors: I) -> Result<()>
    where
        I: IntoIterator<Item = &'static ExtensionDescriptor>,
    {
        descriptors.into_iter().try_for_each(|d| self.add(d))
    }

    /// Looks up the extension registered for `(extendee, number)`
    pub fn lookup(&self, extendee: &'static str, number: u32) -> Option<&'static ExtensionDescriptor> {
        lookup_in(&self.entries.load(), extendee, number)
    }

    /// Number of registered extensions
    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    /// Returns true if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a read-only handle over the same backing map
    pub fn as_read_only(&self) -> RegistryView {
        RegistryView {
            entries: Arc::clone(&self.entries),
        }
    }
}

/// Read-only handle over an extension registry
#[derive(Debug, Clone)]
pub struct RegistryView {
    entries: Arc<ArcSwap<ExtensionMap>>,
}

impl RegistryView {
    /// The process-wide empty registry
    pub fn empty() -> &'static RegistryView {
        static EMPTY: OnceLock<RegistryView> = OnceLock::new();
        EMPTY.get_or_init(|| RegistryView {
            entries: Arc::new(ArcSwap::from_pointee(ExtensionMap::default())),
        })
    }

    /// Looks up the extension registered for `(extendee, number)`
    pub fn lookup(&self, extendee: &'static str, number: u32) -> Option<&'static ExtensionDescriptor> {
        lookup_in(&self.entries.load(), extendee, number)
    }

    /// Number of registered extensions
    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    /// Returns true if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current snapshot of the map, held for the duration of one parse
    pub(crate) fn snapshot(&self) -> Arc<ExtensionMap> {
        self.entries.load_full()
    }
}

pub(crate) fn lookup_in(
    map: &ExtensionMap,
    extendee: &'static str,
    number: u32,
) -> Option<&'static ExtensionDescriptor> {
    map.get(&ExtensionKey::new(extendee, number)).copied()
}
