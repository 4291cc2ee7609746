//! Error types for the pbwire-core library.
//!
//! Every failure the codec can produce is a variant of [`Error`]. Input
//! corruption carries the byte offset where it was detected; schema and value
//! misuse carries the field number involved.

use crate::wire::WireType;
use thiserror::Error;

/// Result type alias for pbwire operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all codec operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The input ended in the middle of a field
    #[error("truncated input at offset {offset}: {details}")]
    TruncatedInput {
        /// Byte offset where more data was expected
        offset: usize,
        /// What was being read
        details: &'static str,
    },

    /// A varint ran past 10 bytes, or a value does not fit its target width
    #[error("overflow at offset {offset}: {details}")]
    Overflow {
        /// Byte offset of the offending value
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// The tag's wire type code is not defined by the wire format
    #[error("invalid wire type {code} at offset {offset}")]
    InvalidWireType {
        /// The raw 3-bit wire type code
        code: u8,
        /// Byte offset of the tag
        offset: usize,
    },

    /// The tag uses the deprecated group start/end wire types
    #[error("unsupported wire type {code} (groups) at offset {offset}")]
    UnsupportedWireType {
        /// The raw 3-bit wire type code (3 or 4)
        code: u8,
        /// Byte offset of the tag
        offset: usize,
    },

    /// Field number is zero, too large, or inside the reserved range
    #[error("invalid field number {number}: must be between 1 and {max}, outside 19000..=19999")]
    InvalidFieldNumber {
        /// The invalid field number
        number: u64,
        /// Maximum valid field number
        max: u32,
    },

    /// A tag read from the input names field 0 or a number above the maximum
    #[error("invalid field number {number} in tag at offset {offset}")]
    InvalidTag {
        /// The decoded field number
        number: u64,
        /// Byte offset of the tag
        offset: usize,
    },

    /// A string field holds bytes that are not valid UTF-8
    #[error("field {number} is not valid UTF-8 at offset {offset}: {source}")]
    InvalidEncoding {
        /// Field number of the string field
        number: u32,
        /// Byte offset of the string payload
        offset: usize,
        /// Underlying UTF-8 error
        #[source]
        source: std::str::Utf8Error,
    },

    /// A packed payload was not consumed exactly by its elements
    #[error("packed field {number} has {remaining} trailing bytes at offset {offset}")]
    TrailingBytes {
        /// Field number of the packed field
        number: u32,
        /// Byte offset where the incomplete element starts
        offset: usize,
        /// Number of bytes left over
        remaining: usize,
    },

    /// Embedded messages are nested deeper than the configured limit
    #[error("embedded messages nested deeper than {limit} levels")]
    NestingTooDeep {
        /// The configured recursion limit
        limit: usize,
    },

    /// The wire type on the stream does not match the declared field kind
    #[error("field {number} expected wire type {expected:?}, got {actual:?} at offset {offset}")]
    WireTypeMismatch {
        /// Field number
        number: u32,
        /// Wire type implied by the descriptor
        expected: WireType,
        /// Wire type found in the input
        actual: WireType,
        /// Byte offset of the payload
        offset: usize,
    },

    /// A caller-supplied value does not match the field kind
    #[error("field {number} expects {expected}, got {found}")]
    TypeMismatch {
        /// Field number
        number: u32,
        /// Declared kind of the field
        expected: &'static str,
        /// Kind of the supplied value
        found: &'static str,
    },

    /// The message holds a field number that the descriptor does not declare
    #[error("field {number} is not declared by message '{message}'")]
    UndeclaredField {
        /// Field number
        number: u32,
        /// Message type name
        message: String,
    },

    /// A required field has no value
    #[error("required field '{name}' ({number}) is not set")]
    MissingRequiredField {
        /// Field number
        number: u32,
        /// Field name
        name: String,
    },

    /// More than one member of a oneof has a value
    #[error("oneof '{oneof}' has more than one member set: {first} and {second}")]
    OneofConflict {
        /// Oneof name
        oneof: String,
        /// First member found set
        first: u32,
        /// Second member found set
        second: u32,
    },

    /// The input is larger than the configured cap
    #[error("input of {len} bytes exceeds the limit of {max} bytes")]
    InputTooLarge {
        /// Input length
        len: usize,
        /// Configured maximum
        max: usize,
    },

    /// A message descriptor failed validation at build time
    #[error("invalid descriptor for '{message}': {details}")]
    InvalidDescriptor {
        /// Message type name
        message: String,
        /// Detailed description of the issue
        details: String,
    },
}

impl Error {
    /// Creates a new truncated input error
    pub fn truncated(offset: usize, details: &'static str) -> Self {
        Self::TruncatedInput { offset, details }
    }

    /// Creates a new overflow error
    pub fn overflow(offset: usize, details: impl Into<String>) -> Self {
        Self::Overflow {
            offset,
            details: details.into(),
        }
    }

    /// Creates a new invalid field number error
    pub fn invalid_field_number(number: u64) -> Self {
        Self::InvalidFieldNumber {
            number,
            max: crate::MAX_FIELD_NUMBER,
        }
    }

    /// Creates a new descriptor validation error
    pub fn invalid_descriptor(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            message: message.into(),
            details: details.into(),
        }
    }

    /// Creates a new type mismatch error
    pub fn type_mismatch(number: u32, expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch {
            number,
            expected,
            found,
        }
    }

    /// Returns true if the error was caused by corrupt or hostile input bytes
    /// rather than by the caller's schema or values
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::TruncatedInput { .. }
                | Self::Overflow { .. }
                | Self::InvalidWireType { .. }
                | Self::UnsupportedWireType { .. }
                | Self::InvalidTag { .. }
                | Self::InvalidEncoding { .. }
                | Self::TrailingBytes { .. }
                | Self::NestingTooDeep { .. }
                | Self::WireTypeMismatch { .. }
                | Self::InputTooLarge { .. }
        )
    }

    /// Returns the byte offset the error refers to, if any
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::TruncatedInput { offset, .. }
            | Self::Overflow { offset, .. }
            | Self::InvalidWireType { offset, .. }
            | Self::UnsupportedWireType { offset, .. }
            | Self::InvalidTag { offset, .. }
            | Self::InvalidEncoding { offset, .. }
            | Self::TrailingBytes { offset, .. }
            | Self::WireTypeMismatch { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}
