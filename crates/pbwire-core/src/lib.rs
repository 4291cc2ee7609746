//! # pbwire-core
//!
//! A schema-driven codec for the Protocol Buffers wire format, with no
//! dependency on a protobuf runtime.
//!
//! This crate provides the core functionality for:
//! - Encoding and decoding varints, zigzag integers and field tags
//! - Describing message types with immutable, shareable descriptors
//! - Encoding [`DynamicMessage`] values to bytes and decoding them back,
//!   preserving unknown fields for forward compatibility
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`wire`]: Varints, tags, and the raw [`WireValue`](wire::WireValue) reader
//! - [`schema`]: Message, field and enum descriptors, plus `.proto` rendering
//! - [`value`]: The in-memory message representation
//! - [`unknown`]: Verbatim storage of undeclared fields
//! - [`codec`]: Message encode/decode driven by a descriptor
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use pbwire_core::schema::{FieldDescriptor, FieldKind, MessageDescriptor};
//! use pbwire_core::{decode, encode, DynamicMessage};
//!
//! let descriptor = MessageDescriptor::builder("Test2")
//!     .field(FieldDescriptor::new(2, "b", FieldKind::String))
//!     .build()?;
//!
//! let message = DynamicMessage::new().with(2, "testing");
//! let bytes = encode(&message, &descriptor)?;
//! assert_eq!(bytes, b"\x12\x07testing");
//!
//! let decoded = decode(&bytes, &descriptor)?;
//! assert_eq!(decoded, message);
//! # Ok::<(), pbwire_core::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod codec;
pub mod error;
pub mod schema;
pub mod unknown;
pub mod value;
pub mod wire;

use std::ops::RangeInclusive;

// Re-export primary types for convenience
pub use codec::{decode, encode, CodecConfig, MessageCodec};
pub use error::{Error, Result};
pub use schema::{FieldDescriptor, FieldKind, Label, MessageDescriptor};
pub use unknown::{UnknownField, UnknownFieldSet};
pub use value::{DynamicMessage, FieldValue, Value};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum valid protobuf field number (2^29 - 1)
pub const MAX_FIELD_NUMBER: u32 = 536_870_911;

/// Field numbers reserved for the protobuf implementation
pub const RESERVED_FIELD_NUMBERS: RangeInclusive<u32> = 19_000..=19_999;

/// Default maximum nesting depth of embedded messages
pub const DEFAULT_RECURSION_LIMIT: usize = 100;

/// Default cap on decoder input size (64 MiB)
pub const DEFAULT_MAX_INPUT_LEN: usize = 64 * 1024 * 1024;
