//! In-memory message values.
//!
//! A [`DynamicMessage`] maps field numbers to values and carries the unknown
//! fields seen while decoding. Presence is explicit: a field is set exactly
//! when it has an entry, so an explicitly sent zero is distinguishable from
//! an absent field.

use crate::schema::FieldDescriptor;
use crate::unknown::UnknownFieldSet;
use bytes::Bytes;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// A single typed field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `bool`
    Bool(bool),
    /// `int32`, `sint32`, `sfixed32`
    I32(i32),
    /// `int64`, `sint64`, `sfixed64`
    I64(i64),
    /// `uint32`, `fixed32`
    U32(u32),
    /// `uint64`, `fixed64`
    U64(u64),
    /// `float`
    F32(f32),
    /// `double`
    F64(f64),
    /// `string`
    String(String),
    /// `bytes`
    Bytes(Bytes),
    /// Enum number; values outside the declared set are kept as-is
    EnumNumber(i32),
    /// Embedded message
    Message(DynamicMessage),
}

impl Value {
    /// Short name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::EnumNumber(_) => "enum",
            Value::Message(_) => "message",
        }
    }

    /// The embedded message, if this is one
    pub fn as_message(&self) -> Option<&DynamicMessage> {
        match self {
            Value::Message(message) => Some(message),
            _ => None,
        }
    }

    /// The string, if this is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value.into())
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => Bool,
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    &str => String,
    Bytes => Bytes,
    Vec<u8> => Bytes,
    DynamicMessage => Message,
}

/// Value of one field: a single value, or the list of a repeated field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Singular field
    Single(Value),
    /// Repeated field, in wire order
    List(Vec<Value>),
}

impl FieldValue {
    /// Values as a slice; a singular value is a one-element slice
    pub fn as_slice(&self) -> &[Value] {
        match self {
            FieldValue::Single(value) => std::slice::from_ref(value),
            FieldValue::List(values) => values,
        }
    }
}

/// A decoded (or caller-built) message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicMessage {
    fields: BTreeMap<u32, FieldValue>,
    unknown: UnknownFieldSet,
}

impl DynamicMessage {
    /// Creates an empty message
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a singular field, replacing any previous value
    pub fn set(&mut self, number: u32, value: impl Into<Value>) {
        self.fields.insert(number, FieldValue::Single(value.into()));
    }

    /// Builder-style [`set`](Self::set)
    pub fn with(mut self, number: u32, value: impl Into<Value>) -> Self {
        self.set(number, value);
        self
    }

    /// Appends one element to a repeated field
    pub fn push(&mut self, number: u32, value: impl Into<Value>) {
        let value = value.into();
        let values = match self.fields.remove(&number) {
            Some(FieldValue::List(mut values)) => {
                values.push(value);
                values
            }
            Some(FieldValue::Single(existing)) => vec![existing, value],
            None => vec![value],
        };
        self.fields.insert(number, FieldValue::List(values));
    }

    /// Replaces a repeated field with `values`.
    ///
    /// An empty list leaves the field unset, matching what decoding its
    /// encoding yields.
    pub fn set_list<V: Into<Value>>(&mut self, number: u32, values: impl IntoIterator<Item = V>) {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.fields.remove(&number);
        } else {
            self.fields.insert(number, FieldValue::List(values));
        }
    }

    /// Raw field entry
    pub fn get(&self, number: u32) -> Option<&FieldValue> {
        self.fields.get(&number)
    }

    /// Value of a singular field
    pub fn get_single(&self, number: u32) -> Option<&Value> {
        match self.fields.get(&number)? {
            FieldValue::Single(value) => Some(value),
            FieldValue::List(_) => None,
        }
    }

    /// Elements of a repeated field; empty when unset
    pub fn get_list(&self, number: u32) -> &[Value] {
        self.fields.get(&number).map_or(&[][..], FieldValue::as_slice)
    }

    /// Value of a singular field, falling back to the declared default and
    /// then to the kind's zero value
    pub fn get_or_default(&self, field: &FieldDescriptor) -> Cow<'_, Value> {
        match self.get_single(field.number()) {
            Some(value) => Cow::Borrowed(value),
            None => Cow::Owned(field.default_value()),
        }
    }

    /// True if the field has a value
    pub fn has(&self, number: u32) -> bool {
        self.fields.contains_key(&number)
    }

    /// Unsets a field
    pub fn clear(&mut self, number: u32) {
        self.fields.remove(&number);
    }

    /// Unsets a field and returns what it held
    pub fn take(&mut self, number: u32) -> Option<FieldValue> {
        self.fields.remove(&number)
    }

    /// Set fields in ascending number order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &FieldValue)> + '_ {
        self.fields.iter().map(|(number, value)| (*number, value))
    }

    /// Number of set fields, unknown fields excluded
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if no field is set and no unknown field was captured
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.unknown.is_empty()
    }

    /// Fields whose numbers the descriptor did not declare
    pub fn unknown_fields(&self) -> &UnknownFieldSet {
        &self.unknown
    }

    /// Mutable access to the unknown fields
    pub fn unknown_fields_mut(&mut self) -> &mut UnknownFieldSet {
        &mut self.unknown
    }

    /// Splits the message into its known values and its unknown fields
    pub fn into_parts(self) -> (BTreeMap<u32, FieldValue>, UnknownFieldSet) {
        (self.fields, self.unknown)
    }

    /// Merges one field occurrence using protobuf merge rules:
    /// lists concatenate, singular messages merge recursively, and any other
    /// value replaces the previous one. Merging an empty list changes nothing.
    pub fn merge_field(&mut self, number: u32, value: FieldValue) {
        if matches!(&value, FieldValue::List(values) if values.is_empty()) {
            return;
        }
        let merged = match (self.fields.remove(&number), value) {
            (Some(FieldValue::List(mut existing)), FieldValue::List(more)) => {
                existing.extend(more);
                FieldValue::List(existing)
            }
            (
                Some(FieldValue::Single(Value::Message(mut existing))),
                FieldValue::Single(Value::Message(more)),
            ) => {
                existing.merge_from(more);
                FieldValue::Single(Value::Message(existing))
            }
            (_, value) => value,
        };
        self.fields.insert(number, merged);
    }

    /// Merges every field of `other` into `self`, then appends its unknown
    /// fields
    pub fn merge_from(&mut self, other: DynamicMessage) {
        let (fields, unknown) = other.into_parts();
        for (number, value) in fields {
            self.merge_field(number, value);
        }
        self.unknown.extend(unknown);
    }
}
