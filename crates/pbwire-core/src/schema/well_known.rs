//! Wrapper messages from `google/protobuf/wrappers.proto`.
//!
//! Each wrapper has a single field `value = 1`. Every call builds a fresh
//! descriptor; callers that encode many messages should build once and share
//! the returned [`Arc`].

use super::{FieldDescriptor, FieldKind, MessageDescriptor};
use crate::value::{DynamicMessage, Value};
use std::sync::Arc;

/// Package of the well-known types
pub const PACKAGE: &str = "google.protobuf";

fn wrapper(name: &str, kind: FieldKind) -> Arc<MessageDescriptor> {
    MessageDescriptor::builder(name)
        .package(PACKAGE)
        .field(FieldDescriptor::new(1, "value", kind))
        .build_unchecked()
}

/// `google.protobuf.BoolValue`
pub fn bool_value() -> Arc<MessageDescriptor> {
    wrapper("BoolValue", FieldKind::Bool)
}

/// `google.protobuf.Int32Value`
pub fn int32_value() -> Arc<MessageDescriptor> {
    wrapper("Int32Value", FieldKind::Int32)
}

/// `google.protobuf.Int64Value`
pub fn int64_value() -> Arc<MessageDescriptor> {
    wrapper("Int64Value", FieldKind::Int64)
}

/// `google.protobuf.UInt32Value`
pub fn uint32_value() -> Arc<MessageDescriptor> {
    wrapper("UInt32Value", FieldKind::Uint32)
}

/// `google.protobuf.UInt64Value`
pub fn uint64_value() -> Arc<MessageDescriptor> {
    wrapper("UInt64Value", FieldKind::Uint64)
}

/// `google.protobuf.FloatValue`
pub fn float_value() -> Arc<MessageDescriptor> {
    wrapper("FloatValue", FieldKind::Float)
}

/// `google.protobuf.DoubleValue`
pub fn double_value() -> Arc<MessageDescriptor> {
    wrapper("DoubleValue", FieldKind::Double)
}

/// `google.protobuf.StringValue`
pub fn string_value() -> Arc<MessageDescriptor> {
    wrapper("StringValue", FieldKind::String)
}

/// `google.protobuf.BytesValue`
pub fn bytes_value() -> Arc<MessageDescriptor> {
    wrapper("BytesValue", FieldKind::Bytes)
}

/// Builds a wrapper message holding `value`
pub fn wrap(value: impl Into<Value>) -> DynamicMessage {
    DynamicMessage::new().with(1, value)
}

/// The wrapped value, if set
pub fn unwrap(message: &DynamicMessage) -> Option<&Value> {
    message.get_single(1)
}
