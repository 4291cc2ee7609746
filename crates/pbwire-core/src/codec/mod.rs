//! Message encode and decode.
//!
//! [`MessageCodec`] drives a whole message through the wire format using a
//! [`MessageDescriptor`]. Encoding walks the descriptor's fields in
//! declaration order, so identical input always yields identical bytes.
//! Decoding is a single forward pass that accepts fields in any order.
//!
//! ## Example
//!
//! ```
//! use pbwire_core::codec::{decode, encode};
//! use pbwire_core::schema::{FieldDescriptor, FieldKind, MessageDescriptor};
//! use pbwire_core::DynamicMessage;
//!
//! let descriptor = MessageDescriptor::builder("Test1")
//!     .field(FieldDescriptor::new(1, "a", FieldKind::Int32))
//!     .build()?;
//!
//! let message = DynamicMessage::new().with(1, 150);
//! let bytes = encode(&message, &descriptor)?;
//! assert_eq!(bytes, [0x08, 0x96, 0x01]);
//!
//! assert_eq!(decode(&bytes, &descriptor)?, message);
//! # Ok::<(), pbwire_core::Error>(())
//! ```

mod field;
mod message;

use crate::error::{Error, Result};
use crate::schema::MessageDescriptor;
use crate::value::DynamicMessage;
use crate::{DEFAULT_MAX_INPUT_LEN, DEFAULT_RECURSION_LIMIT};
use bytes::BufMut;
use tracing::debug;

/// Configuration for the codec
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Maximum nesting depth of embedded messages
    pub recursion_limit: usize,
    /// Maximum accepted input size in bytes (0 = unlimited)
    pub max_input_len: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            max_input_len: DEFAULT_MAX_INPUT_LEN,
        }
    }
}

impl CodecConfig {
    /// Creates a new codec config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum embedded message depth
    pub fn recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Sets the maximum input size
    pub fn max_input_len(mut self, len: usize) -> Self {
        self.max_input_len = len;
        self
    }
}

/// Encodes and decodes messages against descriptors
#[derive(Debug, Clone, Default)]
pub struct MessageCodec {
    config: CodecConfig,
}

impl MessageCodec {
    /// Creates a new codec with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new codec with custom configuration
    pub fn with_config(config: CodecConfig) -> Self {
        Self { config }
    }

    /// The active configuration
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode `message` into a new buffer
    pub fn encode(
        &self,
        message: &DynamicMessage,
        descriptor: &MessageDescriptor,
    ) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        message::encode_message(&self.config, message, descriptor, 0, &mut buf)?;

        debug!(
            "Encoded {} ({} bytes, {} unknown fields)",
            descriptor.name(),
            buf.len(),
            message.unknown_fields().len()
        );
        Ok(buf)
    }

    /// Encode `message`, appending to `buf`.
    ///
    /// On error `buf` may hold a partial encoding.
    pub fn encode_to(
        &self,
        message: &DynamicMessage,
        descriptor: &MessageDescriptor,
        buf: &mut impl BufMut,
    ) -> Result<()> {
        message::encode_message(&self.config, message, descriptor, 0, buf)
    }

    /// Decode a complete message.
    ///
    /// Any error discards everything decoded so far.
    pub fn decode(&self, data: &[u8], descriptor: &MessageDescriptor) -> Result<DynamicMessage> {
        if self.config.max_input_len > 0 && data.len() > self.config.max_input_len {
            return Err(Error::InputTooLarge {
                len: data.len(),
                max: self.config.max_input_len,
            });
        }

        let message = message::decode_message(&self.config, data, descriptor, 0, 0)?;

        debug!(
            "Decoded {} ({} bytes, {} fields, {} unknown fields)",
            descriptor.name(),
            data.len(),
            message.len(),
            message.unknown_fields().len()
        );
        Ok(message)
    }

    /// Decode `data` and merge it into `target`.
    ///
    /// `target` is left untouched if decoding fails.
    pub fn merge(
        &self,
        data: &[u8],
        descriptor: &MessageDescriptor,
        target: &mut DynamicMessage,
    ) -> Result<()> {
        let decoded = self.decode(data, descriptor)?;
        target.merge_from(decoded);
        Ok(())
    }
}

/// Encode with the default configuration
pub fn encode(message: &DynamicMessage, descriptor: &MessageDescriptor) -> Result<Vec<u8>> {
    MessageCodec::new().encode(message, descriptor)
}

/// Decode with the default configuration
pub fn decode(data: &[u8], descriptor: &MessageDescriptor) -> Result<DynamicMessage> {
    MessageCodec::new().decode(data, descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescriptor, FieldKind};

    #[test]
    fn test_codec_config_builder() {
        let config = CodecConfig::new().recursion_limit(8).max_input_len(1024);

        assert_eq!(config.recursion_limit, 8);
        assert_eq!(config.max_input_len, 1024);
        assert_eq!(CodecConfig::default().recursion_limit, DEFAULT_RECURSION_LIMIT);
    }

    #[test]
    fn test_input_too_large() {
        let descriptor = MessageDescriptor::builder("Empty").build().unwrap();
        let codec = MessageCodec::with_config(CodecConfig::new().max_input_len(2));

        assert!(matches!(
            codec.decode(&[0x08, 0x96, 0x01], &descriptor),
            Err(Error::InputTooLarge { len: 3, max: 2 })
        ));
    }

    #[test]
    fn test_merge_keeps_target_on_error() {
        let descriptor = MessageDescriptor::builder("Counter")
            .field(FieldDescriptor::new(1, "count", FieldKind::Uint32))
            .build()
            .unwrap();
        let codec = MessageCodec::new();

        let mut target = DynamicMessage::new().with(1, 5u32);
        assert!(codec.merge(&[0x08], &descriptor, &mut target).is_err());
        assert_eq!(target, DynamicMessage::new().with(1, 5u32));

        codec.merge(&[0x08, 0x07], &descriptor, &mut target).unwrap();
        assert_eq!(target, DynamicMessage::new().with(1, 7u32));
    }
}
