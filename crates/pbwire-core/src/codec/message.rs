//! Whole-message encode and the decode state machine.

use super::field::{decode_field, encode_field};
use super::CodecConfig;
use crate::error::{Error, Result};
use crate::schema::MessageDescriptor;
use crate::unknown::UnknownField;
use crate::value::DynamicMessage;
use crate::wire::{Tag, WireReader, WireValue};
use bytes::{BufMut, Bytes};
use tracing::trace;

/// Decoder position between fields.
///
/// Failure is not a state of its own: any error returns immediately and the
/// partially built message is dropped.
#[derive(Debug, Clone, Copy)]
enum DecodeState {
    /// Expecting a tag, or the end of input
    ReadingTag,
    /// A tag was read; its payload comes next
    ReadingValue { tag: Tag },
    /// Input exhausted at a field boundary
    Done,
}

fn check_depth(config: &CodecConfig, depth: usize) -> Result<()> {
    if depth > config.recursion_limit {
        return Err(Error::NestingTooDeep {
            limit: config.recursion_limit,
        });
    }
    Ok(())
}

/// Encode `message` at nesting level `depth`.
pub(crate) fn encode_message(
    config: &CodecConfig,
    message: &DynamicMessage,
    descriptor: &MessageDescriptor,
    depth: usize,
    buf: &mut impl BufMut,
) -> Result<()> {
    check_depth(config, depth)?;

    if let Some((number, _)) = message.iter().find(|(n, _)| descriptor.field(*n).is_none()) {
        return Err(Error::UndeclaredField {
            number,
            message: descriptor.full_name(),
        });
    }

    for oneof in descriptor.oneofs() {
        let mut set = oneof.fields().iter().filter(|n| message.has(**n));
        if let (Some(&first), Some(&second)) = (set.next(), set.next()) {
            return Err(Error::OneofConflict {
                oneof: oneof.name().to_string(),
                first,
                second,
            });
        }
    }

    for field in descriptor.fields() {
        match message.get(field.number()) {
            Some(value) => encode_field(config, field, descriptor, value, depth, buf)?,
            None if field.is_required() => {
                return Err(Error::MissingRequiredField {
                    number: field.number(),
                    name: field.name().to_string(),
                });
            }
            None => {}
        }
    }

    message.unknown_fields().encode(buf);
    Ok(())
}

/// Decode one message from `data`, which starts at `base` in the outermost
/// input and sits at nesting level `depth`.
pub(crate) fn decode_message(
    config: &CodecConfig,
    data: &[u8],
    descriptor: &MessageDescriptor,
    base: usize,
    depth: usize,
) -> Result<DynamicMessage> {
    check_depth(config, depth)?;

    let mut reader = WireReader::with_base(data, base);
    let mut message = DynamicMessage::new();
    let mut state = DecodeState::ReadingTag;

    loop {
        state = match state {
            DecodeState::ReadingTag if reader.is_empty() => DecodeState::Done,
            DecodeState::ReadingTag => DecodeState::ReadingValue {
                tag: reader.read_tag()?,
            },
            DecodeState::ReadingValue { tag } => {
                let value_start = reader.position();
                let wire = reader.read_value(tag.wire_type)?;

                match descriptor.field(tag.number) {
                    Some(field) => {
                        let offset = match wire {
                            WireValue::LengthDelimited(payload) => reader.offset() - payload.len(),
                            _ => base + value_start,
                        };
                        let value = decode_field(config, field, descriptor, wire, offset, depth)?;

                        if let Some(oneof) = descriptor.oneof_of(tag.number) {
                            for &sibling in oneof.fields() {
                                if sibling != tag.number && message.has(sibling) {
                                    trace!(
                                        "Field {} replaces field {} in oneof '{}'",
                                        tag.number,
                                        sibling,
                                        oneof.name()
                                    );
                                    message.clear(sibling);
                                }
                            }
                        }

                        message.merge_field(tag.number, value);
                    }
                    None => {
                        trace!(
                            "Preserving unknown field {} ({:?}) at offset {}",
                            tag.number,
                            tag.wire_type,
                            base + value_start
                        );
                        let raw = reader.slice(value_start, reader.position());
                        message.unknown_fields_mut().push(UnknownField::new(
                            tag.number,
                            tag.wire_type,
                            Bytes::copy_from_slice(raw),
                        ));
                    }
                }

                DecodeState::ReadingTag
            }
            DecodeState::Done => break,
        };
    }

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescriptor, FieldKind};
    use crate::value::Value;
    use crate::wire::WireType;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn decode(data: &[u8], descriptor: &MessageDescriptor) -> Result<DynamicMessage> {
        decode_message(&CodecConfig::default(), data, descriptor, 0, 0)
    }

    fn encode(message: &DynamicMessage, descriptor: &MessageDescriptor) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        encode_message(&CodecConfig::default(), message, descriptor, 0, &mut buf)?;
        Ok(buf)
    }

    fn scalar_message() -> Arc<MessageDescriptor> {
        MessageDescriptor::builder("Scalar")
            .field(FieldDescriptor::new(1, "a", FieldKind::Int32))
            .field(FieldDescriptor::new(2, "b", FieldKind::String))
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_input_is_empty_message() {
        let message = decode(&[], &scalar_message()).unwrap();
        assert!(message.is_empty());
    }

    #[test]
    fn test_fields_in_any_order() {
        let data = [0x12, 0x01, b'x', 0x08, 0x05];
        let message = decode(&data, &scalar_message()).unwrap();
        assert_eq!(message, DynamicMessage::new().with(1, 5).with(2, "x"));
    }

    #[test]
    fn test_last_scalar_wins() {
        let data = [0x08, 0x01, 0x08, 0x02];
        let message = decode(&data, &scalar_message()).unwrap();
        assert_eq!(message.get_single(1), Some(&Value::I32(2)));
    }

    #[test]
    fn test_tag_without_payload_is_truncated() {
        assert!(matches!(
            decode(&[0x08], &scalar_message()),
            Err(Error::TruncatedInput { offset: 1, .. })
        ));
        assert!(matches!(
            decode(&[0x12, 0x05, b'a'], &scalar_message()),
            Err(Error::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_wire_type_mismatch_aborts() {
        // Field 1 declared int32, sent as fixed32
        let data = [0x0D, 0x01, 0x00, 0x00, 0x00];
        assert!(matches!(
            decode(&data, &scalar_message()),
            Err(Error::WireTypeMismatch {
                number: 1,
                expected: WireType::Varint,
                actual: WireType::Fixed32,
                offset: 1,
            })
        ));
    }

    #[test]
    fn test_unknown_fields_preserved_in_order() {
        let data = [
            0x08, 0x01, // field 1
            0x1D, 0x01, 0x02, 0x03, 0x04, // field 3, fixed32 (unknown)
            0x22, 0x02, b'h', b'i', // field 4, len (unknown)
        ];
        let message = decode(&data, &scalar_message()).unwrap();

        let unknown: Vec<_> = message
            .unknown_fields()
            .iter()
            .map(|f| (f.number(), f.wire_type(), f.data().to_vec()))
            .collect();
        assert_eq!(
            unknown,
            vec![
                (3, WireType::Fixed32, vec![0x01, 0x02, 0x03, 0x04]),
                (4, WireType::LengthDelimited, vec![0x02, b'h', b'i']),
            ]
        );

        assert_eq!(encode(&message, &scalar_message()).unwrap(), data.to_vec());
    }

    #[test]
    fn test_encode_follows_declaration_order() {
        let descriptor = MessageDescriptor::builder("Ordered")
            .field(FieldDescriptor::new(2, "b", FieldKind::Bool))
            .field(FieldDescriptor::new(1, "a", FieldKind::Bool))
            .build()
            .unwrap();
        let message = DynamicMessage::new().with(1, true).with(2, false);
        assert_eq!(
            encode(&message, &descriptor).unwrap(),
            vec![0x10, 0x00, 0x08, 0x01]
        );
    }

    #[test]
    fn test_encode_errors() {
        let descriptor = MessageDescriptor::builder("Strict")
            .field(FieldDescriptor::new(1, "id", FieldKind::Uint64).required())
            .field(FieldDescriptor::new(2, "x", FieldKind::Int32))
            .field(FieldDescriptor::new(3, "y", FieldKind::Int32))
            .oneof("coord", &[2, 3])
            .build()
            .unwrap();

        assert!(matches!(
            encode(&DynamicMessage::new(), &descriptor),
            Err(Error::MissingRequiredField { number: 1, .. })
        ));
        assert!(matches!(
            encode(&DynamicMessage::new().with(1, 1u64).with(9, 1), &descriptor),
            Err(Error::UndeclaredField { number: 9, .. })
        ));
        assert!(matches!(
            encode(&DynamicMessage::new().with(1, 1u64).with(2, 1).with(3, 1), &descriptor),
            Err(Error::OneofConflict { first: 2, second: 3, .. })
        ));
        assert!(matches!(
            encode(&DynamicMessage::new().with(1, -1), &descriptor),
            Err(Error::TypeMismatch { number: 1, .. })
        ));
    }

    #[test]
    fn test_decode_clears_oneof_siblings() {
        let descriptor = MessageDescriptor::builder("Choice")
            .field(FieldDescriptor::new(1, "number", FieldKind::Int32))
            .field(FieldDescriptor::new(2, "text", FieldKind::String))
            .oneof("value", &[1, 2])
            .build()
            .unwrap();

        let data = [0x08, 0x07, 0x12, 0x01, b'z'];
        let message = decode(&data, &descriptor).unwrap();
        assert!(!message.has(1));
        assert_eq!(
            descriptor.which_oneof(&message, "value"),
            Some((2, &Value::String("z".into())))
        );
    }

    #[test]
    fn test_singular_message_occurrences_merge() {
        let inner = scalar_message();
        let descriptor = MessageDescriptor::builder("Outer")
            .field(FieldDescriptor::new(3, "inner", FieldKind::message(inner)))
            .build()
            .unwrap();

        // Two occurrences of field 3: {a: 1} then {b: "q"}
        let data = [0x1A, 0x02, 0x08, 0x01, 0x1A, 0x03, 0x12, 0x01, b'q'];
        let message = decode(&data, &descriptor).unwrap();
        assert_eq!(
            message.get_single(3).and_then(Value::as_message),
            Some(&DynamicMessage::new().with(1, 1).with(2, "q"))
        );
    }

    #[test]
    fn test_nested_error_offsets_are_absolute() {
        let descriptor = MessageDescriptor::builder("Outer")
            .field(FieldDescriptor::new(3, "inner", FieldKind::message(scalar_message())))
            .build()
            .unwrap();

        // Inner message holds a string with invalid UTF-8 at absolute offset 4
        let data = [0x1A, 0x04, 0x12, 0x02, 0xC3, 0x28];
        let err = decode(&data, &descriptor).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidEncoding {
                number: 2,
                offset: 4,
                ..
            }
        ));
    }
}
