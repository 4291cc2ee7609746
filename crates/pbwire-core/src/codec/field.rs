//! Per-kind value encoding.
//!
//! Every [`FieldKind`] is handled by one arm of an exhaustive match; embedded
//! messages call back into the message codec with the depth increased by one.

use super::message::{decode_message, encode_message};
use super::CodecConfig;
use crate::error::{Error, Result};
use crate::schema::{FieldDescriptor, FieldKind, MessageDescriptor};
use crate::value::{FieldValue, Value};
use crate::wire::{
    encode_tag, encode_uvarint, zigzag_decode, zigzag_encode, zigzag_encode32, WireReader,
    WireType, WireValue,
};
use bytes::{BufMut, Bytes};
use tracing::trace;

/// Write every occurrence of one field: tag(s) and payload(s).
pub(crate) fn encode_field(
    config: &CodecConfig,
    field: &FieldDescriptor,
    owner: &MessageDescriptor,
    value: &FieldValue,
    depth: usize,
    buf: &mut impl BufMut,
) -> Result<()> {
    match (field.is_repeated(), value) {
        (true, FieldValue::List(values)) if field.is_packed() => {
            encode_packed(field, values, buf)
        }
        (true, FieldValue::List(values)) => {
            for value in values {
                encode_tagged(config, field, owner, value, depth, buf)?;
            }
            Ok(())
        }
        (false, FieldValue::Single(value)) => encode_tagged(config, field, owner, value, depth, buf),
        (true, FieldValue::Single(value)) => Err(Error::type_mismatch(
            field.number(),
            "list",
            value.type_name(),
        )),
        (false, FieldValue::List(_)) => Err(Error::type_mismatch(
            field.number(),
            field.kind().name(),
            "list",
        )),
    }
}

fn encode_tagged(
    config: &CodecConfig,
    field: &FieldDescriptor,
    owner: &MessageDescriptor,
    value: &Value,
    depth: usize,
    buf: &mut impl BufMut,
) -> Result<()> {
    let number = field.number();
    let kind = field.kind();

    if !kind.accepts(value) {
        return Err(Error::type_mismatch(number, kind.name(), value.type_name()));
    }

    match (kind, value) {
        (FieldKind::Message(target), Value::Message(message)) => {
            let mut inner = Vec::new();
            encode_message(config, message, target.resolve(owner), depth + 1, &mut inner)?;
            encode_tag(number, WireType::LengthDelimited, buf)?;
            encode_uvarint(inner.len() as u64, buf);
            buf.put_slice(&inner);
            Ok(())
        }
        _ => {
            encode_tag(number, kind.wire_type(), buf)?;
            encode_payload(kind, number, value, buf)
        }
    }
}

fn encode_packed(field: &FieldDescriptor, values: &[Value], buf: &mut impl BufMut) -> Result<()> {
    // An empty packed field is omitted entirely
    if values.is_empty() {
        return Ok(());
    }

    let mut payload = Vec::new();
    for value in values {
        encode_payload(field.kind(), field.number(), value, &mut payload)?;
    }

    encode_tag(field.number(), WireType::LengthDelimited, buf)?;
    encode_uvarint(payload.len() as u64, buf);
    buf.put_slice(&payload);
    Ok(())
}

/// Write the payload of a non-message value, without a tag.
pub(crate) fn encode_payload(
    kind: &FieldKind,
    number: u32,
    value: &Value,
    buf: &mut impl BufMut,
) -> Result<()> {
    match (kind, value) {
        (FieldKind::Bool, Value::Bool(v)) => encode_uvarint(u64::from(*v), buf),
        // Negative int32 is sign-extended and always takes 10 bytes
        (FieldKind::Int32, Value::I32(v)) => encode_uvarint(i64::from(*v) as u64, buf),
        (FieldKind::Int64, Value::I64(v)) => encode_uvarint(*v as u64, buf),
        (FieldKind::Uint32, Value::U32(v)) => encode_uvarint(u64::from(*v), buf),
        (FieldKind::Uint64, Value::U64(v)) => encode_uvarint(*v, buf),
        (FieldKind::Sint32, Value::I32(v)) => encode_uvarint(u64::from(zigzag_encode32(*v)), buf),
        (FieldKind::Sint64, Value::I64(v)) => encode_uvarint(zigzag_encode(*v), buf),
        (FieldKind::Enum(_), Value::EnumNumber(v)) => encode_uvarint(i64::from(*v) as u64, buf),
        (FieldKind::Fixed32, Value::U32(v)) => buf.put_u32_le(*v),
        (FieldKind::Sfixed32, Value::I32(v)) => buf.put_i32_le(*v),
        (FieldKind::Float, Value::F32(v)) => buf.put_u32_le(v.to_bits()),
        (FieldKind::Fixed64, Value::U64(v)) => buf.put_u64_le(*v),
        (FieldKind::Sfixed64, Value::I64(v)) => buf.put_i64_le(*v),
        (FieldKind::Double, Value::F64(v)) => buf.put_u64_le(v.to_bits()),
        (FieldKind::String, Value::String(s)) => {
            encode_uvarint(s.len() as u64, buf);
            buf.put_slice(s.as_bytes());
        }
        (FieldKind::Bytes, Value::Bytes(b)) => {
            encode_uvarint(b.len() as u64, buf);
            buf.put_slice(b);
        }
        (kind, value) => {
            return Err(Error::type_mismatch(number, kind.name(), value.type_name()));
        }
    }
    Ok(())
}

/// Turn one decoded occurrence into a field value.
///
/// `offset` is the input position of the payload (after the length prefix for
/// length-delimited values).
pub(crate) fn decode_field(
    config: &CodecConfig,
    field: &FieldDescriptor,
    owner: &MessageDescriptor,
    wire: WireValue<'_>,
    offset: usize,
    depth: usize,
) -> Result<FieldValue> {
    let number = field.number();
    let kind = field.kind();

    // Packed and unpacked encodings are both accepted for packable kinds
    if field.is_repeated() && kind.is_packable() {
        if let WireValue::LengthDelimited(payload) = wire {
            let values = decode_packed(kind, number, payload, offset)?;
            trace!("Decoded packed field {} ({} elements)", number, values.len());
            return Ok(FieldValue::List(values));
        }
    }

    let value = match (kind, wire) {
        (FieldKind::Message(target), WireValue::LengthDelimited(payload)) => Value::Message(
            decode_message(config, payload, target.resolve(owner), offset, depth + 1)?,
        ),
        (FieldKind::Message(_), wire) => {
            return Err(Error::WireTypeMismatch {
                number,
                expected: WireType::LengthDelimited,
                actual: wire.wire_type(),
                offset,
            });
        }
        (kind, wire) => decode_payload(kind, number, wire, offset)?,
    };

    if field.is_repeated() {
        Ok(FieldValue::List(vec![value]))
    } else {
        Ok(FieldValue::Single(value))
    }
}

/// Interpret a non-message wire value according to `kind`.
pub(crate) fn decode_payload(
    kind: &FieldKind,
    number: u32,
    wire: WireValue<'_>,
    offset: usize,
) -> Result<Value> {
    let value = match (kind, wire) {
        (FieldKind::Bool, WireValue::Varint(v)) => Value::Bool(v != 0),
        // int32 and int64 wrap to the target width
        (FieldKind::Int32, WireValue::Varint(v)) => Value::I32(v as i32),
        (FieldKind::Int64, WireValue::Varint(v)) => Value::I64(v as i64),
        (FieldKind::Uint32, WireValue::Varint(v)) => Value::U32(
            u32::try_from(v)
                .map_err(|_| Error::overflow(offset, format!("field {}: {} exceeds uint32", number, v)))?,
        ),
        (FieldKind::Uint64, WireValue::Varint(v)) => Value::U64(v),
        (FieldKind::Sint32, WireValue::Varint(v)) => {
            let decoded = zigzag_decode(v);
            Value::I32(i32::try_from(decoded).map_err(|_| {
                Error::overflow(offset, format!("field {}: {} exceeds sint32", number, decoded))
            })?)
        }
        (FieldKind::Sint64, WireValue::Varint(v)) => Value::I64(zigzag_decode(v)),
        (FieldKind::Enum(_), WireValue::Varint(v)) => Value::EnumNumber(v as i32),
        (FieldKind::Fixed32, WireValue::Fixed32(v)) => Value::U32(v),
        (FieldKind::Sfixed32, WireValue::Fixed32(v)) => Value::I32(v as i32),
        (FieldKind::Float, WireValue::Fixed32(v)) => Value::F32(f32::from_bits(v)),
        (FieldKind::Fixed64, WireValue::Fixed64(v)) => Value::U64(v),
        (FieldKind::Sfixed64, WireValue::Fixed64(v)) => Value::I64(v as i64),
        (FieldKind::Double, WireValue::Fixed64(v)) => Value::F64(f64::from_bits(v)),
        (FieldKind::String, WireValue::LengthDelimited(bytes)) => {
            let text = std::str::from_utf8(bytes).map_err(|source| Error::InvalidEncoding {
                number,
                offset,
                source,
            })?;
            Value::String(text.to_owned())
        }
        (FieldKind::Bytes, WireValue::LengthDelimited(bytes)) => {
            Value::Bytes(Bytes::copy_from_slice(bytes))
        }
        (kind, wire) => {
            return Err(Error::WireTypeMismatch {
                number,
                expected: kind.wire_type(),
                actual: wire.wire_type(),
                offset,
            });
        }
    };
    Ok(value)
}

/// Decode a packed run; the elements must consume `payload` exactly.
fn decode_packed(
    kind: &FieldKind,
    number: u32,
    payload: &[u8],
    offset: usize,
) -> Result<Vec<Value>> {
    let width = match kind.wire_type() {
        WireType::Fixed32 => Some(4),
        WireType::Fixed64 => Some(8),
        _ => None,
    };

    if let Some(width) = width {
        let remaining = payload.len() % width;
        if remaining != 0 {
            return Err(Error::TrailingBytes {
                number,
                offset: offset + payload.len() - remaining,
                remaining,
            });
        }
    }

    let end = offset + payload.len();
    let mut reader = WireReader::with_base(payload, offset);
    let mut values = Vec::with_capacity(width.map_or(0, |width| payload.len() / width));

    while !reader.is_empty() {
        let start = reader.offset();
        let wire = reader.read_value(kind.wire_type()).map_err(|err| match err {
            Error::TruncatedInput { .. } => Error::TrailingBytes {
                number,
                offset: start,
                remaining: end - start,
            },
            other => other,
        })?;
        values.push(decode_payload(kind, number, wire, start)?);
    }

    Ok(values)
}
