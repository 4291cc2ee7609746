//! Message schemas.
//!
//! A [`MessageDescriptor`] is built once per message type and shared behind
//! an [`Arc`] by every encode and decode call that uses it. Descriptors are
//! immutable after [`MessageDescriptorBuilder::build`] and safe to read from
//! many threads at once.
//!
//! ## Example
//!
//! ```
//! use pbwire_core::schema::{FieldDescriptor, FieldKind, MessageDescriptor};
//!
//! let descriptor = MessageDescriptor::builder("Test")
//!     .field(FieldDescriptor::new(1, "id", FieldKind::Int32))
//!     .field(FieldDescriptor::new(2, "tags", FieldKind::String).repeated())
//!     .build()?;
//!
//! assert_eq!(descriptor.field(1).map(|f| f.name()), Some("id"));
//! # Ok::<(), pbwire_core::Error>(())
//! ```

mod render;
pub mod well_known;

use crate::error::{Error, Result};
use crate::value::{DynamicMessage, Value};
use crate::wire::{is_valid_field_number, WireType};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub use render::{render_proto, ProtoRenderer, RenderConfig};

/// Logical field kinds
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// `bool`
    Bool,
    /// `int32`
    Int32,
    /// `int64`
    Int64,
    /// `uint32`
    Uint32,
    /// `uint64`
    Uint64,
    /// `sint32` (zigzag)
    Sint32,
    /// `sint64` (zigzag)
    Sint64,
    /// `fixed32`
    Fixed32,
    /// `fixed64`
    Fixed64,
    /// `sfixed32`
    Sfixed32,
    /// `sfixed64`
    Sfixed64,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `string`
    String,
    /// `bytes`
    Bytes,
    /// Open enum
    Enum(Arc<EnumDescriptor>),
    /// Embedded message
    Message(MessageRef),
}

impl FieldKind {
    /// Embedded message of the given type
    pub fn message(descriptor: Arc<MessageDescriptor>) -> Self {
        FieldKind::Message(MessageRef::Type(descriptor))
    }

    /// Embedded message of the enclosing type
    pub fn recursive() -> Self {
        FieldKind::Message(MessageRef::Recursive)
    }

    /// Enum of the given type
    pub fn enumeration(descriptor: Arc<EnumDescriptor>) -> Self {
        FieldKind::Enum(descriptor)
    }

    /// Wire type of a single, unpacked value of this kind
    pub fn wire_type(&self) -> WireType {
        match self {
            FieldKind::Bool
            | FieldKind::Int32
            | FieldKind::Int64
            | FieldKind::Uint32
            | FieldKind::Uint64
            | FieldKind::Sint32
            | FieldKind::Sint64
            | FieldKind::Enum(_) => WireType::Varint,
            FieldKind::Fixed64 | FieldKind::Sfixed64 | FieldKind::Double => WireType::Fixed64,
            FieldKind::Fixed32 | FieldKind::Sfixed32 | FieldKind::Float => WireType::Fixed32,
            FieldKind::String | FieldKind::Bytes | FieldKind::Message(_) => {
                WireType::LengthDelimited
            }
        }
    }

    /// True for kinds that may use packed encoding when repeated
    pub fn is_packable(&self) -> bool {
        self.wire_type() != WireType::LengthDelimited
    }

    /// The `.proto` keyword for scalar kinds; `enum` and `message` otherwise
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::Int32 => "int32",
            FieldKind::Int64 => "int64",
            FieldKind::Uint32 => "uint32",
            FieldKind::Uint64 => "uint64",
            FieldKind::Sint32 => "sint32",
            FieldKind::Sint64 => "sint64",
            FieldKind::Fixed32 => "fixed32",
            FieldKind::Fixed64 => "fixed64",
            FieldKind::Sfixed32 => "sfixed32",
            FieldKind::Sfixed64 => "sfixed64",
            FieldKind::Float => "float",
            FieldKind::Double => "double",
            FieldKind::String => "string",
            FieldKind::Bytes => "bytes",
            FieldKind::Enum(_) => "enum",
            FieldKind::Message(_) => "message",
        }
    }

    /// True if `value` has the variant this kind encodes
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldKind::Bool, Value::Bool(_))
                | (
                    FieldKind::Int32 | FieldKind::Sint32 | FieldKind::Sfixed32,
                    Value::I32(_)
                )
                | (
                    FieldKind::Int64 | FieldKind::Sint64 | FieldKind::Sfixed64,
                    Value::I64(_)
                )
                | (FieldKind::Uint32 | FieldKind::Fixed32, Value::U32(_))
                | (FieldKind::Uint64 | FieldKind::Fixed64, Value::U64(_))
                | (FieldKind::Float, Value::F32(_))
                | (FieldKind::Double, Value::F64(_))
                | (FieldKind::String, Value::String(_))
                | (FieldKind::Bytes, Value::Bytes(_))
                | (FieldKind::Enum(_), Value::EnumNumber(_))
                | (FieldKind::Message(_), Value::Message(_))
        )
    }

    /// The proto3 zero value of this kind
    pub fn zero_value(&self) -> Value {
        match self {
            FieldKind::Bool => Value::Bool(false),
            FieldKind::Int32 | FieldKind::Sint32 | FieldKind::Sfixed32 => Value::I32(0),
            FieldKind::Int64 | FieldKind::Sint64 | FieldKind::Sfixed64 => Value::I64(0),
            FieldKind::Uint32 | FieldKind::Fixed32 => Value::U32(0),
            FieldKind::Uint64 | FieldKind::Fixed64 => Value::U64(0),
            FieldKind::Float => Value::F32(0.0),
            FieldKind::Double => Value::F64(0.0),
            FieldKind::String => Value::String(String::new()),
            FieldKind::Bytes => Value::Bytes(Bytes::new()),
            FieldKind::Enum(descriptor) => Value::EnumNumber(descriptor.first_number()),
            FieldKind::Message(_) => Value::Message(DynamicMessage::new()),
        }
    }
}

/// Target type of an embedded message field
#[derive(Debug, Clone)]
pub enum MessageRef {
    /// A separately built message type
    Type(Arc<MessageDescriptor>),
    /// The message type that declares the field
    Recursive,
}

impl MessageRef {
    /// Resolve against the descriptor that owns the field
    pub fn resolve<'a>(&'a self, owner: &'a MessageDescriptor) -> &'a MessageDescriptor {
        match self {
            MessageRef::Type(descriptor) => descriptor,
            MessageRef::Recursive => owner,
        }
    }
}

/// Field cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// May be unset; presence is tracked
    Optional,
    /// Must be set when encoding
    Required,
    /// Zero or more values
    Repeated,
}

/// Describes one field of a message
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    number: u32,
    name: String,
    kind: FieldKind,
    label: Label,
    packed: Option<bool>,
    default: Option<Value>,
}

impl FieldDescriptor {
    /// Creates an optional field
    pub fn new(number: u32, name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            number,
            name: name.into(),
            kind,
            label: Label::Optional,
            packed: None,
            default: None,
        }
    }

    /// Makes the field repeated.
    ///
    /// Numeric kinds are packed unless [`packed`](Self::packed) says
    /// otherwise, in either call order. `repeated` and `required` each set
    /// the label, so the last one called wins.
    pub fn repeated(mut self) -> Self {
        self.label = Label::Repeated;
        self
    }

    /// Makes the field required; replaces a previous `repeated`
    pub fn required(mut self) -> Self {
        self.label = Label::Required;
        self
    }

    /// Sets packed encoding explicitly.
    ///
    /// `packed(true)` on a field that does not end up repeated is rejected
    /// when the message is built.
    pub fn packed(mut self, packed: bool) -> Self {
        self.packed = Some(packed);
        self
    }

    /// Emits one tagged occurrence per element
    pub fn unpacked(self) -> Self {
        self.packed(false)
    }

    /// Value reported by [`DynamicMessage::get_or_default`] when unset
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Field number
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical kind
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Cardinality
    pub fn label(&self) -> Label {
        self.label
    }

    /// True for repeated fields
    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }

    /// True for required fields
    pub fn is_required(&self) -> bool {
        self.label == Label::Required
    }

    /// True if repeated values are written as one packed run
    pub fn is_packed(&self) -> bool {
        self.is_repeated() && self.packed.unwrap_or_else(|| self.kind.is_packable())
    }

    /// Declared default, if any
    pub fn declared_default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Declared default, or the kind's zero value
    pub fn default_value(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| self.kind.zero_value())
    }
}

/// Describes an enum type
#[derive(Debug, Clone)]
pub struct EnumDescriptor {
    name: String,
    package: Option<String>,
    values: Vec<(String, i32)>,
}

impl EnumDescriptor {
    /// Creates an enum with no values
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: None,
            values: Vec::new(),
        }
    }

    /// Sets the package
    pub fn package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Adds a named value
    pub fn value(mut self, name: impl Into<String>, number: i32) -> Self {
        self.values.push((name.into(), number));
        self
    }

    /// Short name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package-qualified name
    pub fn full_name(&self) -> String {
        qualify(self.package.as_deref(), &self.name)
    }

    /// Declared values in order
    pub fn values(&self) -> impl Iterator<Item = (&str, i32)> + '_ {
        self.values.iter().map(|(name, number)| (name.as_str(), *number))
    }

    /// Name of a number, if declared
    pub fn name_of(&self, number: i32) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, n)| *n == number)
            .map(|(name, _)| name.as_str())
    }

    /// Number of a name, if declared
    pub fn number_of(&self, name: &str) -> Option<i32> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, number)| *number)
    }

    /// The first declared number, which is the enum's default
    pub fn first_number(&self) -> i32 {
        self.values.first().map_or(0, |(_, number)| *number)
    }
}

/// A set of fields of which at most one is set
#[derive(Debug, Clone)]
pub struct OneofDescriptor {
    name: String,
    fields: Vec<u32>,
}

impl OneofDescriptor {
    /// Oneof name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member field numbers
    pub fn fields(&self) -> &[u32] {
        &self.fields
    }

    /// True if `number` is a member
    pub fn contains(&self, number: u32) -> bool {
        self.fields.contains(&number)
    }
}

/// Describes a message type: its fields in declaration order
#[derive(Debug, Clone)]
pub struct MessageDescriptor {
    name: String,
    package: Option<String>,
    fields: Vec<FieldDescriptor>,
    by_number: HashMap<u32, usize>,
    oneofs: Vec<OneofDescriptor>,
    oneof_by_number: HashMap<u32, usize>,
    nested: Vec<Arc<MessageDescriptor>>,
    nested_enums: Vec<Arc<EnumDescriptor>>,
}

impl MessageDescriptor {
    /// Starts a new descriptor
    pub fn builder(name: impl Into<String>) -> MessageDescriptorBuilder {
        MessageDescriptorBuilder::new(name)
    }

    /// Short name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package, if any
    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    /// Package-qualified name
    pub fn full_name(&self) -> String {
        qualify(self.package.as_deref(), &self.name)
    }

    /// Type URL used by `google.protobuf.Any`
    pub fn type_url(&self) -> String {
        format!("type.googleapis.com/{}", self.full_name())
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Looks up a field by number
    pub fn field(&self, number: u32) -> Option<&FieldDescriptor> {
        self.by_number.get(&number).map(|&i| &self.fields[i])
    }

    /// Looks up a field by name
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Oneof groups in declaration order
    pub fn oneofs(&self) -> &[OneofDescriptor] {
        &self.oneofs
    }

    /// The oneof containing field `number`, if any
    pub fn oneof_of(&self, number: u32) -> Option<&OneofDescriptor> {
        self.oneof_by_number.get(&number).map(|&i| &self.oneofs[i])
    }

    /// The member of oneof `name` that is set in `message`
    pub fn which_oneof<'m>(
        &self,
        message: &'m DynamicMessage,
        name: &str,
    ) -> Option<(u32, &'m Value)> {
        let oneof = self.oneofs.iter().find(|o| o.name == name)?;
        oneof
            .fields
            .iter()
            .find_map(|&number| message.get_single(number).map(|value| (number, value)))
    }

    /// Nested message declarations
    pub fn nested(&self) -> &[Arc<MessageDescriptor>] {
        &self.nested
    }

    /// Nested enum declarations
    pub fn nested_enums(&self) -> &[Arc<EnumDescriptor>] {
        &self.nested_enums
    }

    /// Renders the `.proto` definition of this message
    pub fn to_proto(&self) -> String {
        render_proto(self)
    }
}

/// Builder for [`MessageDescriptor`]
#[derive(Debug, Clone)]
pub struct MessageDescriptorBuilder {
    name: String,
    package: Option<String>,
    fields: Vec<FieldDescriptor>,
    oneofs: Vec<OneofDescriptor>,
    nested: Vec<Arc<MessageDescriptor>>,
    nested_enums: Vec<Arc<EnumDescriptor>>,
}

impl MessageDescriptorBuilder {
    /// Creates a builder for a message named `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: None,
            fields: Vec::new(),
            oneofs: Vec::new(),
            nested: Vec::new(),
            nested_enums: Vec::new(),
        }
    }

    /// Sets the package
    pub fn package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Declares a field; encode order follows declaration order
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Declares a oneof over already or later declared fields
    pub fn oneof(mut self, name: impl Into<String>, fields: &[u32]) -> Self {
        self.oneofs.push(OneofDescriptor {
            name: name.into(),
            fields: fields.to_vec(),
        });
        self
    }

    /// Records a nested message declaration
    pub fn nested(mut self, descriptor: Arc<MessageDescriptor>) -> Self {
        self.nested.push(descriptor);
        self
    }

    /// Records a nested enum declaration
    pub fn nested_enum(mut self, descriptor: Arc<EnumDescriptor>) -> Self {
        self.nested_enums.push(descriptor);
        self
    }

    /// Validates and freezes the descriptor
    pub fn build(self) -> Result<Arc<MessageDescriptor>> {
        self.validate()?;
        Ok(self.build_unchecked())
    }

    /// Freezes without validation, for descriptors known to be well formed
    pub(crate) fn build_unchecked(self) -> Arc<MessageDescriptor> {
        let by_number = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.number, i))
            .collect();
        let oneof_by_number = self
            .oneofs
            .iter()
            .enumerate()
            .flat_map(|(i, o)| o.fields.iter().map(move |&number| (number, i)))
            .collect();

        Arc::new(MessageDescriptor {
            name: self.name,
            package: self.package,
            fields: self.fields,
            by_number,
            oneofs: self.oneofs,
            oneof_by_number,
            nested: self.nested,
            nested_enums: self.nested_enums,
        })
    }

    fn validate(&self) -> Result<()> {
        let invalid = |details: String| Error::invalid_descriptor(&self.name, details);

        if self.name.is_empty() {
            return Err(invalid("message name is empty".to_string()));
        }

        let mut numbers = HashSet::new();
        let mut names = HashSet::new();

        for field in &self.fields {
            if !is_valid_field_number(field.number) {
                return Err(Error::invalid_field_number(u64::from(field.number)));
            }
            if !numbers.insert(field.number) {
                return Err(invalid(format!("duplicate field number {}", field.number)));
            }
            if field.name.is_empty() {
                return Err(invalid(format!("field {} has no name", field.number)));
            }
            if !names.insert(field.name.as_str()) {
                return Err(invalid(format!("duplicate field name '{}'", field.name)));
            }
            if field.packed == Some(true) && !field.is_repeated() {
                return Err(invalid(format!(
                    "field '{}' is packed but not repeated",
                    field.name
                )));
            }
            if field.packed == Some(true) && !field.kind.is_packable() {
                return Err(invalid(format!(
                    "field '{}' of kind {} cannot be packed",
                    field.name,
                    field.kind.name()
                )));
            }
            if let Some(default) = &field.default {
                if field.is_repeated() {
                    return Err(invalid(format!(
                        "repeated field '{}' cannot have a default",
                        field.name
                    )));
                }
                if !field.kind.accepts(default) {
                    return Err(invalid(format!(
                        "default of field '{}' is {}, expected {}",
                        field.name,
                        default.type_name(),
                        field.kind.name()
                    )));
                }
            }
        }

        let mut oneof_names = HashSet::new();
        let mut oneof_members = HashSet::new();

        for oneof in &self.oneofs {
            if !oneof_names.insert(oneof.name.as_str()) {
                return Err(invalid(format!("duplicate oneof '{}'", oneof.name)));
            }
            for &number in &oneof.fields {
                let Some(field) = self.fields.iter().find(|f| f.number == number) else {
                    return Err(invalid(format!(
                        "oneof '{}' names undeclared field {}",
                        oneof.name, number
                    )));
                };
                if field.label != Label::Optional {
                    return Err(invalid(format!(
                        "oneof member '{}' must be optional and singular",
                        field.name
                    )));
                }
                if !oneof_members.insert(number) {
                    return Err(invalid(format!(
                        "field {} belongs to more than one oneof",
                        number
                    )));
                }
            }
        }

        Ok(())
    }
}

fn qualify(package: Option<&str>, name: &str) -> String {
    match package {
        Some(package) if !package.is_empty() => format!("{}.{}", package, name),
        _ => name.to_string(),
    }
}
