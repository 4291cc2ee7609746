//! Field tags: the `(field_number << 3) | wire_type` varint that precedes
//! every field on the wire.

use super::varint::{decode_uvarint, encode_uvarint};
use crate::error::{Error, Result};
use crate::{MAX_FIELD_NUMBER, RESERVED_FIELD_NUMBERS};
use bytes::BufMut;

/// Protobuf wire types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width, little-endian
    Fixed64 = 1,
    /// Length-delimited (strings, bytes, embedded messages, packed repeated fields)
    LengthDelimited = 2,
    /// 32-bit fixed-width, little-endian
    Fixed32 = 5,
}

impl WireType {
    /// Interpret the low three bits of a tag.
    ///
    /// `offset` only feeds the error; group markers (3 and 4) are reported as
    /// unsupported, anything else unknown as invalid.
    pub fn from_code(code: u8, offset: usize) -> Result<Self> {
        match code {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::Fixed32),
            3 | 4 => Err(Error::UnsupportedWireType { code, offset }),
            _ => Err(Error::InvalidWireType { code, offset }),
        }
    }

    /// The 3-bit code stored in a tag
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for WireType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_code(value, 0)
    }
}

/// A decoded field tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    /// Field number, `1..=MAX_FIELD_NUMBER`
    pub number: u32,
    /// Wire type of the payload that follows
    pub wire_type: WireType,
}

impl Tag {
    /// Creates a new tag
    pub fn new(number: u32, wire_type: WireType) -> Self {
        Self { number, wire_type }
    }

    /// The raw varint value of this tag
    pub fn to_raw(self) -> u64 {
        (u64::from(self.number) << 3) | u64::from(self.wire_type.code())
    }
}

/// Returns true if `number` may appear in a schema: inside `1..=2^29-1` and
/// outside the range reserved for the protobuf implementation.
pub fn is_valid_field_number(number: u32) -> bool {
    (1..=MAX_FIELD_NUMBER).contains(&number) && !RESERVED_FIELD_NUMBERS.contains(&number)
}

/// Encode a tag, appending it to `buf`.
///
/// Fails with `InvalidFieldNumber` for 0, numbers above `2^29-1`, and the
/// reserved range `19000..=19999`.
pub fn encode_tag(number: u32, wire_type: WireType, buf: &mut impl BufMut) -> Result<()> {
    if !is_valid_field_number(number) {
        return Err(Error::invalid_field_number(u64::from(number)));
    }
    encode_uvarint(Tag::new(number, wire_type).to_raw(), buf);
    Ok(())
}

/// Split a raw tag value into field number and wire type.
///
/// A field number of 0 or above `2^29-1` is corrupt input and fails with
/// `InvalidTag` at `offset`.
pub fn split_tag(raw: u64, offset: usize) -> Result<Tag> {
    let wire_type = WireType::from_code((raw & 0x07) as u8, offset)?;
    let number = raw >> 3;

    if number == 0 || number > u64::from(MAX_FIELD_NUMBER) {
        return Err(Error::InvalidTag { number, offset });
    }

    Ok(Tag::new(number as u32, wire_type))
}

/// Decode a tag starting at `offset`.
///
/// Returns the tag and the number of bytes consumed. The reserved range is
/// accepted here so that fields written by other implementations survive as
/// unknown fields.
pub fn decode_tag(data: &[u8], offset: usize) -> Result<(Tag, usize)> {
    let (raw, len) = decode_uvarint(data, offset)?;
    Ok((split_tag(raw, offset)?, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_type_conversion() {
        assert_eq!(WireType::try_from(0).unwrap(), WireType::Varint);
        assert_eq!(WireType::try_from(1).unwrap(), WireType::Fixed64);
        assert_eq!(WireType::try_from(2).unwrap(), WireType::LengthDelimited);
        assert_eq!(WireType::try_from(5).unwrap(), WireType::Fixed32);
        assert!(matches!(
            WireType::try_from(3),
            Err(Error::UnsupportedWireType { code: 3, .. })
        ));
        assert!(matches!(
            WireType::try_from(4),
            Err(Error::UnsupportedWireType { code: 4, .. })
        ));
        assert!(matches!(
            WireType::try_from(6),
            Err(Error::InvalidWireType { code: 6, .. })
        ));
    }

    #[test]
    fn test_encode_tag() {
        let mut buf = Vec::new();
        encode_tag(1, WireType::Varint, &mut buf).unwrap();
        encode_tag(2, WireType::LengthDelimited, &mut buf).unwrap();
        encode_tag(16, WireType::Fixed32, &mut buf).unwrap();
        assert_eq!(buf, vec![0x08, 0x12, 0x85, 0x01]);
    }

    #[test]
    fn test_encode_tag_rejects_invalid_numbers() {
        let mut buf = Vec::new();
        for number in [0, 19000, 19500, 19999, MAX_FIELD_NUMBER + 1] {
            assert!(
                matches!(
                    encode_tag(number, WireType::Varint, &mut buf),
                    Err(Error::InvalidFieldNumber { .. })
                ),
                "number {} accepted",
                number
            );
        }
        assert!(buf.is_empty());

        encode_tag(18999, WireType::Varint, &mut buf).unwrap();
        encode_tag(20000, WireType::Varint, &mut buf).unwrap();
        encode_tag(MAX_FIELD_NUMBER, WireType::Varint, &mut buf).unwrap();
    }

    #[test]
    fn test_decode_tag() {
        let (tag, len) = decode_tag(&[0x85, 0x01], 0).unwrap();
        assert_eq!(tag, Tag::new(16, WireType::Fixed32));
        assert_eq!(len, 2);
    }

    #[test]
    fn test_decode_tag_max_number() {
        let mut buf = Vec::new();
        encode_tag(MAX_FIELD_NUMBER, WireType::Fixed64, &mut buf).unwrap();
        let (tag, _) = decode_tag(&buf, 0).unwrap();
        assert_eq!(tag.number, MAX_FIELD_NUMBER);
        assert_eq!(tag.wire_type, WireType::Fixed64);
    }

    #[test]
    fn test_decode_tag_errors() {
        // Field 0 is invalid
        assert!(matches!(
            decode_tag(&[0x00], 0),
            Err(Error::InvalidTag { number: 0, offset: 0 })
        ));
        // Field 2^29, one past the maximum
        let raw = u64::from(MAX_FIELD_NUMBER + 1) << 3;
        assert_eq!(
            split_tag(raw, 4),
            Err(Error::InvalidTag {
                number: u64::from(MAX_FIELD_NUMBER + 1),
                offset: 4,
            })
        );
        // Field 1, start group
        assert!(matches!(
            decode_tag(&[0x0B], 0),
            Err(Error::UnsupportedWireType { code: 3, .. })
        ));
        // Field 1, wire type 7
        assert!(matches!(
            decode_tag(&[0x0F], 0),
            Err(Error::InvalidWireType { code: 7, .. })
        ));
    }

    #[test]
    fn test_decode_tag_accepts_reserved_range() {
        let raw = Tag::new(19500, WireType::Varint).to_raw();
        let tag = split_tag(raw, 0).unwrap();
        assert_eq!(tag.number, 19500);
    }
}
