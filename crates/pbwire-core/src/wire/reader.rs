//! Positioned read-only cursor over encoded bytes, and the [`WireValue`]
//! produced for each field payload.

use super::tag::{decode_tag, Tag, WireType};
use super::varint::decode_uvarint;
use crate::error::{Error, Result};

/// A single field payload as it appears on the wire, before the schema gives
/// it a meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireValue<'a> {
    /// Raw varint value
    Varint(u64),
    /// Eight little-endian bytes
    Fixed64(u64),
    /// Payload of a length-delimited field, without its length prefix
    LengthDelimited(&'a [u8]),
    /// Four little-endian bytes
    Fixed32(u32),
}

impl WireValue<'_> {
    /// The wire type this value was read as
    pub fn wire_type(&self) -> WireType {
        match self {
            WireValue::Varint(_) => WireType::Varint,
            WireValue::Fixed64(_) => WireType::Fixed64,
            WireValue::LengthDelimited(_) => WireType::LengthDelimited,
            WireValue::Fixed32(_) => WireType::Fixed32,
        }
    }
}

/// Cursor over an input buffer.
///
/// Offsets reported in errors are relative to `base`, so a reader over an
/// embedded message still reports positions in the outermost input.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> WireReader<'a> {
    /// Creates a reader over the whole input
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    /// Creates a reader over a slice that starts at `base` in the original input
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// Position relative to the start of this reader's slice
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Position in the original input, for error reporting
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Number of unread bytes
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True once every byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Bytes between two positions of this reader
    pub fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        &self.data[start..end]
    }

    /// Read a varint
    pub fn read_varint(&mut self) -> Result<u64> {
        let (value, len) = decode_uvarint(self.data, self.pos).map_err(|e| self.rebase(e))?;
        self.pos += len;
        Ok(value)
    }

    /// Read a field tag
    pub fn read_tag(&mut self) -> Result<Tag> {
        let (tag, len) = decode_tag(self.data, self.pos).map_err(|e| self.rebase(e))?;
        self.pos += len;
        Ok(tag)
    }

    /// Read four little-endian bytes
    pub fn read_fixed32(&mut self) -> Result<u32> {
        let bytes = self.take(4, "fixed32")?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(raw))
    }

    /// Read eight little-endian bytes
    pub fn read_fixed64(&mut self) -> Result<u64> {
        let bytes = self.take(8, "fixed64")?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    /// Read a length prefix and return the payload it covers
    pub fn read_length_delimited(&mut self) -> Result<&'a [u8]> {
        let prefix_offset = self.offset();
        let len = self.read_varint()?;
        let len = usize::try_from(len)
            .map_err(|_| Error::overflow(prefix_offset, "length prefix exceeds address space"))?;
        self.take(len, "length-delimited payload")
    }

    /// Read the payload for `wire_type`
    pub fn read_value(&mut self, wire_type: WireType) -> Result<WireValue<'a>> {
        Ok(match wire_type {
            WireType::Varint => WireValue::Varint(self.read_varint()?),
            WireType::Fixed64 => WireValue::Fixed64(self.read_fixed64()?),
            WireType::LengthDelimited => WireValue::LengthDelimited(self.read_length_delimited()?),
            WireType::Fixed32 => WireValue::Fixed32(self.read_fixed32()?),
        })
    }

    fn take(&mut self, len: usize, details: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::truncated(self.offset() + self.remaining(), details));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Shift offsets produced by the slice-relative primitives into input offsets
    fn rebase(&self, err: Error) -> Error {
        if self.base == 0 {
            return err;
        }
        match err {
            Error::TruncatedInput { offset, details } => Error::TruncatedInput {
                offset: offset + self.base,
                details,
            },
            Error::Overflow { offset, details } => Error::Overflow {
                offset: offset + self.base,
                details,
            },
            Error::InvalidWireType { code, offset } => Error::InvalidWireType {
                code,
                offset: offset + self.base,
            },
            Error::UnsupportedWireType { code, offset } => Error::UnsupportedWireType {
                code,
                offset: offset + self.base,
            },
            Error::InvalidTag { number, offset } => Error::InvalidTag {
                number,
                offset: offset + self.base,
            },
            other => other,
        }
    }
}
