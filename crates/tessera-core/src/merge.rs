//! The tag-dispatch merge engine.
//!
//! For each tag in the input the engine tries, in order:
//!
//! 1. the message's own `merge_field` (declared fields, static dispatch);
//! 2. the extension registry, keyed by the message's full name and the field
//!    number;
//! 3. the unknown field store, which keeps the tag and payload verbatim.
//!
//! Embedded messages that are already present are merged into, not replaced.
//! Groups are parsed in place and end at the matching end-group tag.

use crate::accessor::FieldOps;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::registry::{lookup_in, ExtensionDescriptor, ExtensionMap, RegistryView};
use crate::value::Value;
use crate::wire::{CodedInput, WireType, DEFAULT_RECURSION_LIMIT};
use std::sync::Arc;
use tracing::{debug, trace};

/// Default maximum input size (64 MiB)
pub const DEFAULT_SIZE_LIMIT: usize = 64 * 1024 * 1024;

/// Configuration for parsing
#[derive(Debug, Clone)]
pub struct ParseConfig {
    /// Maximum nesting depth of messages and groups
    pub recursion_limit: u32,
    /// Maximum input size in bytes
    pub size_limit: usize,
    /// Drop unknown fields instead of keeping them
    pub discard_unknown_fields: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            size_limit: DEFAULT_SIZE_LIMIT,
            discard_unknown_fields: false,
        }
    }
}

impl ParseConfig {
    /// Creates a new parse config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting depth
    pub fn recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Sets the maximum input size
    pub fn size_limit(mut self, limit: usize) -> Self {
        self.size_limit = limit;
        self
    }

    /// Sets whether unknown fields are dropped
    pub fn discard_unknown_fields(mut self, discard: bool) -> Self {
        self.discard_unknown_fields = discard;
        self
    }
}

/// State shared by every level of one parse.
///
/// Holds the registry snapshot taken when the parse started, so extensions
/// registered while a parse runs do not affect it.
pub struct MergeContext<'a> {
    extensions: Arc<ExtensionMap>,
    config: &'a ParseConfig,
}

impl<'a> MergeContext<'a> {
    /// Snapshots `registry` for a parse under `config`
    pub fn new(registry: &RegistryView, config: &'a ParseConfig) -> Self {
        Self {
            extensions: registry.snapshot(),
            config,
        }
    }

    /// Looks up a registered extension
    pub fn lookup(&self, extendee: &'static str, number: u32) -> Option<&'static ExtensionDescriptor> {
        lookup_in(&self.extensions, extendee, number)
    }

    /// The active configuration
    pub fn config(&self) -> &ParseConfig {
        self.config
    }
}

/// Merges the encoded message in `data` into `message`
pub fn merge<M: Message>(
    message: &mut M,
    data: &[u8],
    registry: &RegistryView,
    config: &ParseConfig,
) -> Result<()> {
    if data.len() > config.size_limit {
        return Err(Error::SizeLimitExceeded {
            size: data.len(),
            limit: config.size_limit,
        });
    }

    debug!("Merging {} bytes into {}", data.len(), M::FULL_NAME);
    let ctx = MergeContext::new(registry, config);
    let mut input = CodedInput::new(data).with_recursion_limit(config.recursion_limit);
    merge_fields(message, &mut input, &ctx, None)
}

/// Merges a length-prefixed embedded message
pub fn merge_length_delimited<M: Message>(
    message: &mut M,
    input: &mut CodedInput<'_>,
    ctx: &MergeContext<'_>,
) -> Result<()> {
    let len = input.read_length()?;
    let previous = input.push_limit(len)?;
    input.enter()?;
    merge_fields(message, input, ctx, None)?;
    input.leave();
    input.pop_limit(previous);
    Ok(())
}

/// Merges group contents; the start-group tag of `number` has been read
pub fn merge_group<M: Message>(
    message: &mut M,
    number: u32,
    input: &mut CodedInput<'_>,
    ctx: &MergeContext<'_>,
) -> Result<()> {
    input.enter()?;
    merge_fields(message, input, ctx, Some(number))?;
    input.leave();
    Ok(())
}

/// Reads tags until the end of the current limit, or until the end-group
/// tag of `group` when parsing a group
fn merge_fields<M: Message>(
    message: &mut M,
    input: &mut CodedInput<'_>,
    ctx: &MergeContext<'_>,
    group: Option<u32>,
) -> Result<()> {
    loop {
        let start = input.position();
        let Some(tag) = input.read_tag()? else {
            return match group {
                None => Ok(()),
                Some(_) => Err(Error::truncated(start, 1)),
            };
        };

        if tag.wire_type() == WireType::EndGroup {
            return match group {
                Some(number) if number == tag.number() => Ok(()),
                Some(number) => Err(Error::MismatchedEndGroup {
                    expected: number,
                    found: tag.number(),
                }),
                None => Err(Error::UnexpectedEndGroup {
                    offset: start,
                    number: tag.number(),
                }),
            };
        }

        if message.merge_field(tag, input, ctx)? {
            continue;
        }

        if let Some(descriptor) = ctx.lookup(M::FULL_NAME, tag.number()) {
            if message
                .extensions_mut()
                .merge_wire(descriptor, tag, input, ctx)?
            {
                continue;
            }
        }

        input.skip_field(tag)?;
        if ctx.config.discard_unknown_fields {
            trace!("Discarded unknown field {} of {}", tag.number(), M::FULL_NAME);
        } else {
            trace!("Kept unknown field {} of {}", tag.number(), M::FULL_NAME);
            message
                .unknown_fields_mut()
                .push_raw(tag, input.bytes_since(start));
        }
    }
}

/// Field-wise merge of `source` into `target`.
///
/// Set singular fields overwrite, except embedded messages present on both
/// sides, which merge recursively. Repeated fields append. Extensions and
/// unknown fields are merged the same way.
pub fn merge_from<M: Message>(target: &mut M, source: &M) {
    for field in M::fields() {
        match &field.ops {
            FieldOps::Singular { has, get, set, .. } => {
                if !has(source) {
                    continue;
                }
                let merged = match get(source) {
                    Value::Message(theirs) if has(target) => match get(target) {
                        Value::Message(mut mine) => {
                            if mine.merge_from_dyn(&*theirs) {
                                Value::Message(mine)
                            } else {
                                Value::Message(theirs)
                            }
                        }
                        _ => Value::Message(theirs),
                    },
                    value => value,
                };
                if let Err(rejected) = set(target, merged) {
                    debug!(
                        "Field {}.{} rejected a {} during merge",
                        M::FULL_NAME,
                        field.name,
                        rejected.kind_name()
                    );
                }
            }
            FieldOps::Repeated { len, get, push, .. } => {
                for index in 0..len(source) {
                    let Some(value) = get(source, index) else {
                        continue;
                    };
                    if let Err(rejected) = push(target, value) {
                        debug!(
                            "Field {}.{} rejected a {} during merge",
                            M::FULL_NAME,
                            field.name,
                            rejected.kind_name()
                        );
                    }
                }
            }
        }
    }
    target.extensions_mut().merge_from(source.extensions());
    target.unknown_fields_mut().merge_from(source.unknown_fields());
}
