//! Byte-level compatibility with prost-generated code.

use pbwire_core::schema::{FieldDescriptor, FieldKind, MessageDescriptor};
use pbwire_core::{decode, encode, DynamicMessage, Value};
use pretty_assertions::assert_eq;
use prost::Message;
use std::sync::Arc;

#[derive(Clone, PartialEq, prost::Message)]
struct Inner {
    #[prost(string, tag = "1")]
    label: String,
}

#[derive(Clone, PartialEq, prost::Message)]
struct Sample {
    #[prost(int32, tag = "1")]
    id: i32,
    #[prost(string, tag = "2")]
    name: String,
    #[prost(sint64, repeated, tag = "3")]
    deltas: Vec<i64>,
    #[prost(message, optional, tag = "4")]
    inner: Option<Inner>,
    #[prost(bytes = "vec", tag = "5")]
    blob: Vec<u8>,
    #[prost(double, tag = "6")]
    ratio: f64,
    #[prost(fixed32, repeated, packed = "false", tag = "7")]
    codes: Vec<u32>,
    #[prost(bool, tag = "8")]
    enabled: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
struct SampleV2 {
    #[prost(int32, tag = "1")]
    id: i32,
    #[prost(string, tag = "2")]
    name: String,
    #[prost(uint64, tag = "9")]
    revision: u64,
    #[prost(string, repeated, tag = "10")]
    tags: Vec<String>,
}

fn inner_descriptor() -> Arc<MessageDescriptor> {
    MessageDescriptor::builder("Inner")
        .field(FieldDescriptor::new(1, "label", FieldKind::String))
        .build()
        .unwrap()
}

fn sample_descriptor() -> Arc<MessageDescriptor> {
    MessageDescriptor::builder("Sample")
        .field(FieldDescriptor::new(1, "id", FieldKind::Int32))
        .field(FieldDescriptor::new(2, "name", FieldKind::String))
        .field(FieldDescriptor::new(3, "deltas", FieldKind::Sint64).repeated())
        .field(FieldDescriptor::new(4, "inner", FieldKind::message(inner_descriptor())))
        .field(FieldDescriptor::new(5, "blob", FieldKind::Bytes))
        .field(FieldDescriptor::new(6, "ratio", FieldKind::Double))
        .field(FieldDescriptor::new(7, "codes", FieldKind::Fixed32).repeated().unpacked())
        .field(FieldDescriptor::new(8, "enabled", FieldKind::Bool))
        .build()
        .unwrap()
}

fn prost_sample() -> Sample {
    Sample {
        id: -42,
        name: "wire".to_string(),
        deltas: vec![-1, 0, 1, i64::MIN],
        inner: Some(Inner {
            label: "nested".to_string(),
        }),
        blob: vec![0xCA, 0xFE],
        ratio: 0.125,
        codes: vec![7, 0xFFFF_FFFF],
        enabled: true,
    }
}

fn dynamic_sample() -> DynamicMessage {
    let mut message = DynamicMessage::new()
        .with(1, -42)
        .with(2, "wire")
        .with(4, DynamicMessage::new().with(1, "nested"))
        .with(5, vec![0xCAu8, 0xFE])
        .with(6, 0.125f64)
        .with(8, true);
    message.set_list(3, [-1i64, 0, 1, i64::MIN]);
    message.set_list(7, [7u32, 0xFFFF_FFFF]);
    message
}

#[test]
fn test_encode_matches_prost() {
    let ours = encode(&dynamic_sample(), &sample_descriptor()).unwrap();
    assert_eq!(ours, prost_sample().encode_to_vec());
}

#[test]
fn test_decode_prost_output() {
    let bytes = prost_sample().encode_to_vec();
    let message = decode(&bytes, &sample_descriptor()).unwrap();
    assert_eq!(message, dynamic_sample());
}

#[test]
fn test_prost_decodes_our_output() {
    let bytes = encode(&dynamic_sample(), &sample_descriptor()).unwrap();
    assert_eq!(Sample::decode(bytes.as_slice()).unwrap(), prost_sample());
}

#[test]
fn test_prost_unknown_fields_round_trip() {
    let newer = SampleV2 {
        id: 7,
        name: "v2".to_string(),
        revision: 1 << 40,
        tags: vec!["a".to_string(), "b".to_string()],
    };
    let bytes = newer.encode_to_vec();

    let message = decode(&bytes, &sample_descriptor()).unwrap();
    assert_eq!(message.get_single(1), Some(&Value::I32(7)));
    assert_eq!(message.unknown_fields().len(), 3);

    let reencoded = encode(&message, &sample_descriptor()).unwrap();
    assert_eq!(SampleV2::decode(reencoded.as_slice()).unwrap(), newer);
}

fn timestamp_descriptor() -> Arc<MessageDescriptor> {
    MessageDescriptor::builder("Timestamp")
        .package("google.protobuf")
        .field(FieldDescriptor::new(1, "seconds", FieldKind::Int64))
        .field(FieldDescriptor::new(2, "nanos", FieldKind::Int32))
        .build()
        .unwrap()
}

#[test]
fn test_well_known_timestamp() {
    let timestamp = prost_types::Timestamp {
        seconds: 1_700_000_000,
        nanos: 250,
    };
    let descriptor = timestamp_descriptor();
    assert_eq!(
        descriptor.type_url(),
        "type.googleapis.com/google.protobuf.Timestamp"
    );

    let message = decode(&timestamp.encode_to_vec(), &descriptor).unwrap();
    assert_eq!(message, DynamicMessage::new().with(1, 1_700_000_000i64).with(2, 250));

    let bytes = encode(&message, &descriptor).unwrap();
    assert_eq!(prost_types::Timestamp::decode(bytes.as_slice()).unwrap(), timestamp);
}

#[test]
fn test_negative_duration_interop() {
    let duration = prost_types::Duration {
        seconds: -3,
        nanos: -500_000_000,
    };
    let descriptor = MessageDescriptor::builder("Duration")
        .package("google.protobuf")
        .field(FieldDescriptor::new(1, "seconds", FieldKind::Int64))
        .field(FieldDescriptor::new(2, "nanos", FieldKind::Int32))
        .build()
        .unwrap();

    let bytes = duration.encode_to_vec();
    // Both negative values are sign-extended to ten-byte varints
    assert_eq!(bytes.len(), 2 * (1 + 10));

    let message = decode(&bytes, &descriptor).unwrap();
    assert_eq!(message.get_single(2), Some(&Value::I32(-500_000_000)));
    assert_eq!(encode(&message, &descriptor).unwrap(), bytes);
}
