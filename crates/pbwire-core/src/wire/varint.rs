//! Base-128 varints and the zigzag mapping used by `sint32`/`sint64`.

use crate::error::{Error, Result};
use bytes::BufMut;

/// Maximum number of bytes a varint may occupy (enough for 64 bits)
pub const MAX_VARINT_LEN: usize = 10;

/// Encode an unsigned value as a varint, appending it to `buf`.
pub fn encode_uvarint(mut value: u64, buf: &mut impl BufMut) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Number of bytes `encode_uvarint` produces for `value`.
pub fn encoded_len_uvarint(value: u64) -> usize {
    // 7 payload bits per byte, at least one byte
    let bits = 64 - (value | 1).leading_zeros() as usize;
    (bits + 6) / 7
}

/// Decode a varint starting at `offset`.
///
/// Returns the decoded value and the number of bytes consumed.
pub fn decode_uvarint(data: &[u8], offset: usize) -> Result<(u64, usize)> {
    let mut result: u64 = 0;

    for i in 0..MAX_VARINT_LEN {
        let Some(&byte) = data.get(offset + i) else {
            return Err(Error::truncated(offset + i, "varint"));
        };

        // The tenth byte may only contribute the top bit of a u64
        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            return Err(Error::overflow(offset, "varint exceeds 64 bits"));
        }

        result |= u64::from(byte & 0x7F) << (7 * i);

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(Error::overflow(offset, "varint longer than 10 bytes"))
}

/// Map a signed value onto an unsigned one so that small magnitudes stay small.
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// 32-bit zigzag, as used by `sint32`.
pub fn zigzag_encode32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`zigzag_encode32`].
pub fn zigzag_decode32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}
