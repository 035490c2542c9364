//! Error types for the tessera-core library.
//!
//! Every failure the runtime reports is a variant of [`Error`]. Unknown fields
//! and unregistered extensions are ordinary data and never surface here.

use thiserror::Error;

/// Result type alias for tessera operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all tessera operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A tag used a reserved wire type or field number zero
    #[error("invalid tag {tag:#x} at offset {offset}: {details}")]
    InvalidTag {
        /// Byte offset of the tag
        offset: usize,
        /// The raw tag value
        tag: u64,
        /// Detailed description of the issue
        details: String,
    },

    /// Input ended in the middle of a value
    #[error("truncated input at offset {offset}: {needed} more bytes required")]
    Truncated {
        /// Byte offset where the value started
        offset: usize,
        /// Bytes missing from the input
        needed: usize,
    },

    /// Malformed varint, as reported by the wire codec
    #[error("failed to decode varint: {0}")]
    Varint(#[from] prost::DecodeError),

    /// A `string` field did not hold valid UTF-8
    #[error("invalid UTF-8 in string field at offset {offset}")]
    InvalidUtf8 {
        /// Byte offset of the string payload
        offset: usize,
    },

    /// An end-group tag appeared while no group was open
    #[error("end-group tag for field {number} at offset {offset} outside of any group")]
    UnexpectedEndGroup {
        /// Byte offset of the tag
        offset: usize,
        /// Field number carried by the tag
        number: u32,
    },

    /// An end-group tag closed a different group than the one open
    #[error("end-group tag for field {found} does not close open group {expected}")]
    MismatchedEndGroup {
        /// Field number of the open group
        expected: u32,
        /// Field number of the end-group tag
        found: u32,
    },

    /// Nested messages and groups went deeper than allowed
    #[error("message nesting exceeds recursion limit of {limit}")]
    RecursionLimitExceeded {
        /// Configured limit
        limit: u32,
    },

    /// Input larger than the configured size limit
    #[error("input of {size} bytes exceeds size limit of {limit}")]
    SizeLimitExceeded {
        /// Input size in bytes
        size: usize,
        /// Configured limit in bytes
        limit: usize,
    },

    /// An extension with the same extendee and number is already registered
    #[error("extension {number} of '{extendee}' is already registered")]
    DuplicateExtension {
        /// Full name of the extended message
        extendee: &'static str,
        /// Extension field number
        number: u32,
    },

    /// A value of the wrong type was supplied to a field
    #[error("type mismatch for field '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Field name
        field: String,
        /// Expected value kind
        expected: String,
        /// Supplied value kind
        found: String,
    },

    /// Repeated field index past the end
    #[error("index {index} out of range for field '{field}' with {len} elements")]
    IndexOutOfRange {
        /// Field name
        field: String,
        /// Requested index
        index: usize,
        /// Current number of elements
        len: usize,
    },

    /// A field accessor could not be bound against the message's field table
    #[error("cannot bind accessor for '{message}.{field}': {details}")]
    Binding {
        /// Full name of the message
        message: &'static str,
        /// Requested field name or number
        field: String,
        /// Detailed description of the mismatch
        details: String,
    },

    /// The operation has no meaning for this kind of field
    #[error("operation '{operation}' is not supported on field '{field}'")]
    UnsupportedOperation {
        /// Field name
        field: String,
        /// Operation name
        operation: &'static str,
    },

    /// `build` was called while required fields were still unset
    #[error("message is missing required fields: {}", missing.join(", "))]
    UninitializedMessage {
        /// Dotted paths of the missing fields
        missing: Vec<String>,
    },

    /// Failed to read the input stream
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a new invalid tag error
    pub fn invalid_tag(offset: usize, tag: u64, details: impl Into<String>) -> Self {
        Self::InvalidTag {
            offset,
            tag,
            details: details.into(),
        }
    }

    /// Creates a new truncation error
    pub fn truncated(offset: usize, needed: usize) -> Self {
        Self::Truncated { offset, needed }
    }

    /// Creates a new type mismatch error
    pub fn type_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Creates a new index out of range error
    pub fn index_out_of_range(field: impl Into<String>, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange {
            field: field.into(),
            index,
            len,
        }
    }

    /// Creates a new binding error
    pub fn binding(
        message: &'static str,
        field: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self::Binding {
            message,
            field: field.into(),
            details: details.into(),
        }
    }

    /// Creates a new unsupported operation error
    pub fn unsupported(field: impl Into<String>, operation: &'static str) -> Self {
        Self::UnsupportedOperation {
            field: field.into(),
            operation,
        }
    }

    /// Creates a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if the error was caused by malformed wire data rather than
    /// by a programming error on the caller's side
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidTag { .. }
                | Self::Truncated { .. }
                | Self::Varint(_)
                | Self::InvalidUtf8 { .. }
                | Self::UnexpectedEndGroup { .. }
                | Self::MismatchedEndGroup { .. }
                | Self::RecursionLimitExceeded { .. }
                | Self::SizeLimitExceeded { .. }
        )
    }
}
