//! Low-level protobuf wire format primitives.
//!
//! ## Wire Format Overview
//!
//! Each protobuf field is encoded as:
//! - A varint "tag" containing the field number and wire type
//! - The field data (format depends on wire type)
//!
//! Wire types:
//! - 0: VARINT (int32, int64, uint32, uint64, sint32, sint64, bool, enum)
//! - 1: FIXED64 (fixed64, sfixed64, double)
//! - 2: LENGTH_DELIMITED (string, bytes, embedded messages, packed repeated fields)
//! - 5: FIXED32 (fixed32, sfixed32, float)
//!
//! Wire types 3 and 4 (groups) are rejected.

mod reader;
mod tag;
mod varint;

pub use reader::{WireReader, WireValue};
pub use tag::{decode_tag, encode_tag, is_valid_field_number, split_tag, Tag, WireType};
pub use varint::{
    decode_uvarint, encode_uvarint, encoded_len_uvarint, zigzag_decode, zigzag_decode32,
    zigzag_encode, zigzag_encode32, MAX_VARINT_LEN,
};
