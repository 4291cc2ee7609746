//! `.proto` text rendering of message descriptors.
//!
//! Nested declarations come first, one indent level deeper, followed by the
//! fields in declaration order. Members of a oneof are grouped into a
//! `oneof` block at the position of the first member.

use super::{EnumDescriptor, FieldDescriptor, FieldKind, Label, MessageDescriptor};
use crate::value::Value;
use std::collections::HashSet;
use std::fmt::Write as FmtWrite;

/// Configuration for rendering
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Indentation string (default: 4 spaces)
    pub indent_str: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            indent_str: "    ".to_string(),
        }
    }
}

impl RenderConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the indentation string
    pub fn indent_str(mut self, s: impl Into<String>) -> Self {
        self.indent_str = s.into();
        self
    }
}

/// Render a descriptor with the default configuration
pub fn render_proto(descriptor: &MessageDescriptor) -> String {
    ProtoRenderer::new().render(descriptor)
}

/// Writes message definitions as `.proto` source
#[derive(Debug, Clone, Default)]
pub struct ProtoRenderer {
    config: RenderConfig,
}

impl ProtoRenderer {
    /// Creates a renderer with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a renderer with custom configuration
    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render the message definition as a string
    pub fn render(&self, descriptor: &MessageDescriptor) -> String {
        let mut output = String::new();
        // Writing into a String never fails
        let _ = self.write_to(&mut output, descriptor);
        output
    }

    /// Write the message definition to a writer
    pub fn write_to(
        &self,
        w: &mut impl FmtWrite,
        descriptor: &MessageDescriptor,
    ) -> std::fmt::Result {
        let mut writer = Writer {
            writer: w,
            config: &self.config,
            indent_level: 0,
        };
        writer.write_message(descriptor)
    }
}

struct Writer<'a, W: FmtWrite> {
    writer: &'a mut W,
    config: &'a RenderConfig,
    indent_level: usize,
}

impl<W: FmtWrite> Writer<'_, W> {
    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    fn write_indent(&mut self) -> std::fmt::Result {
        for _ in 0..self.indent_level {
            write!(self.writer, "{}", self.config.indent_str)?;
        }
        Ok(())
    }

    fn writeln(&mut self, s: &str) -> std::fmt::Result {
        self.write_indent()?;
        writeln!(self.writer, "{}", s)
    }

    fn write_message(&mut self, message: &MessageDescriptor) -> std::fmt::Result {
        self.writeln(&format!("message {} {{", message.name()))?;
        self.indent();

        for nested in message.nested() {
            self.write_message(nested)?;
        }

        for enum_type in message.nested_enums() {
            self.write_enum(enum_type)?;
        }

        let mut written_oneofs = HashSet::new();

        for field in message.fields() {
            match message.oneof_of(field.number()) {
                Some(oneof) => {
                    if !written_oneofs.insert(oneof.name()) {
                        continue;
                    }
                    self.writeln(&format!("oneof {} {{", oneof.name()))?;
                    self.indent();
                    for member in message.fields().iter().filter(|f| oneof.contains(f.number())) {
                        self.write_field(member, message)?;
                    }
                    self.dedent();
                    self.writeln("}")?;
                }
                None => self.write_field(field, message)?,
            }
        }

        self.dedent();
        // The outermost closing brace carries no trailing newline
        if self.indent_level == 0 {
            write!(self.writer, "}}")
        } else {
            self.writeln("}")
        }
    }

    fn write_enum(&mut self, enum_type: &EnumDescriptor) -> std::fmt::Result {
        self.writeln(&format!("enum {} {{", enum_type.name()))?;
        self.indent();
        for (name, number) in enum_type.values() {
            self.writeln(&format!("{} = {};", name, number))?;
        }
        self.dedent();
        self.writeln("}")
    }

    fn write_field(
        &mut self,
        field: &FieldDescriptor,
        owner: &MessageDescriptor,
    ) -> std::fmt::Result {
        self.write_indent()?;

        match field.label() {
            Label::Repeated => write!(self.writer, "repeated ")?,
            Label::Required => write!(self.writer, "required ")?,
            Label::Optional => {}
        }

        write!(
            self.writer,
            "{} {} = {}",
            type_name(field.kind(), owner),
            field.name(),
            field.number()
        )?;

        let mut options = Vec::new();

        if let Some(default) = field.declared_default() {
            options.push(format!("default = {}", format_default(field.kind(), default)));
        }

        if field.is_repeated() && field.kind().is_packable() && !field.is_packed() {
            options.push("packed = false".to_string());
        }

        if !options.is_empty() {
            write!(self.writer, " [{}]", options.join(", "))?;
        }

        writeln!(self.writer, ";")
    }
}

fn type_name(kind: &FieldKind, owner: &MessageDescriptor) -> String {
    match kind {
        FieldKind::Enum(descriptor) => descriptor.full_name(),
        FieldKind::Message(target) => target.resolve(owner).full_name(),
        scalar => scalar.name().to_string(),
    }
}

fn format_default(kind: &FieldKind, value: &Value) -> String {
    match (kind, value) {
        (_, Value::String(s)) => format!("\"{}\"", escape_string(s)),
        (_, Value::Bytes(b)) => format!("\"{}\"", escape_bytes(b)),
        (FieldKind::Enum(descriptor), Value::EnumNumber(number)) => descriptor
            .name_of(*number)
            .map_or_else(|| number.to_string(), str::to_string),
        (_, Value::Bool(b)) => b.to_string(),
        (_, Value::I32(v)) => v.to_string(),
        (_, Value::I64(v)) => v.to_string(),
        (_, Value::U32(v)) => v.to_string(),
        (_, Value::U64(v)) => v.to_string(),
        (_, Value::F32(v)) => v.to_string(),
        (_, Value::F64(v)) => v.to_string(),
        (_, Value::EnumNumber(v)) => v.to_string(),
        (_, Value::Message(_)) => "{}".to_string(),
    }
}

/// Escape a string for proto syntax
fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            _ if c.is_ascii_control() => {
                result.push_str(&format!("\\x{:02x}", c as u8));
            }
            _ => result.push(c),
        }
    }
    result
}

/// Escape raw bytes; non-printable bytes become octal escapes
fn escape_bytes(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\\' => result.push_str("\\\\"),
            b'"' => result.push_str("\\\""),
            0x20..=0x7E => result.push(b as char),
            _ => result.push_str(&format!("\\{:03o}", b)),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::well_known;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn full_location() -> Arc<MessageDescriptor> {
        MessageDescriptor::builder("FullLocation")
            .field(FieldDescriptor::new(1, "score", FieldKind::Float))
            .field(FieldDescriptor::new(2, "skills", FieldKind::String).repeated())
            .build()
            .unwrap()
    }

    #[test]
    fn test_render_flat_message() {
        let descriptor = MessageDescriptor::builder("GitInfo")
            .field(FieldDescriptor::new(1, "branch_name", FieldKind::String))
            .field(FieldDescriptor::new(2, "committed_datetime", FieldKind::String))
            .field(FieldDescriptor::new(3, "hexsha", FieldKind::String))
            .build()
            .unwrap();

        assert_eq!(
            descriptor.to_proto(),
            "message GitInfo {\n    \
             string branch_name = 1;\n    \
             string committed_datetime = 2;\n    \
             string hexsha = 3;\n\
             }"
        );
    }

    #[test]
    fn test_render_keeps_declaration_order_and_wrappers() {
        let descriptor = MessageDescriptor::builder("InputRefDataSkill")
            .field(FieldDescriptor::new(2, "name", FieldKind::String))
            .field(FieldDescriptor::new(4, "occurrences", FieldKind::Uint32))
            .field(FieldDescriptor::new(
                1,
                "skill_id",
                FieldKind::message(well_known::uint32_value()),
            ))
            .field(FieldDescriptor::new(
                6,
                "active",
                FieldKind::message(well_known::bool_value()),
            ))
            .build()
            .unwrap();

        assert_eq!(
            descriptor.to_proto(),
            "message InputRefDataSkill {\n    \
             string name = 2;\n    \
             uint32 occurrences = 4;\n    \
             google.protobuf.UInt32Value skill_id = 1;\n    \
             google.protobuf.BoolValue active = 6;\n\
             }"
        );
    }

    #[test]
    fn test_render_repeated_message() {
        let descriptor = MessageDescriptor::builder("ComparedLocation")
            .field(FieldDescriptor::new(1, "inside", FieldKind::Bool))
            .field(FieldDescriptor::new(2, "hierarchy", FieldKind::message(full_location())).repeated())
            .field(FieldDescriptor::new(3, "likes", FieldKind::Bool))
            .field(FieldDescriptor::new(4, "location", FieldKind::String))
            .field(FieldDescriptor::new(5, "result", FieldKind::String).repeated())
            .build()
            .unwrap();

        assert_eq!(
            descriptor.to_proto(),
            "message ComparedLocation {\n    \
             bool inside = 1;\n    \
             repeated FullLocation hierarchy = 2;\n    \
             bool likes = 3;\n    \
             string location = 4;\n    \
             repeated string result = 5;\n\
             }"
        );
    }

    #[test]
    fn test_render_nested_oneof_and_options() {
        let status = Arc::new(EnumDescriptor::new("Status").value("IDLE", 0).value("BUSY", 1));
        let descriptor = MessageDescriptor::builder("Node")
            .nested(full_location())
            .nested_enum(status.clone())
            .field(FieldDescriptor::new(1, "label", FieldKind::String).with_default("a\"b"))
            .field(FieldDescriptor::new(2, "text", FieldKind::String))
            .field(FieldDescriptor::new(3, "blob", FieldKind::Bytes))
            .field(FieldDescriptor::new(4, "ids", FieldKind::Int32).repeated().unpacked())
            .field(FieldDescriptor::new(5, "children", FieldKind::recursive()).repeated())
            .field(
                FieldDescriptor::new(6, "status", FieldKind::enumeration(status))
                    .with_default(Value::EnumNumber(1)),
            )
            .oneof("payload", &[2, 3])
            .build()
            .unwrap();

        let config = RenderConfig::new().indent_str("  ");
        let rendered = ProtoRenderer::with_config(config).render(&descriptor);

        assert_eq!(
            rendered,
            "message Node {\n\
             \x20 message FullLocation {\n\
             \x20   float score = 1;\n\
             \x20   repeated string skills = 2;\n\
             \x20 }\n\
             \x20 enum Status {\n\
             \x20   IDLE = 0;\n\
             \x20   BUSY = 1;\n\
             \x20 }\n\
             \x20 string label = 1 [default = \"a\\\"b\"];\n\
             \x20 oneof payload {\n\
             \x20   string text = 2;\n\
             \x20   bytes blob = 3;\n\
             \x20 }\n\
             \x20 repeated int32 ids = 4 [packed = false];\n\
             \x20 repeated Node children = 5;\n\
             \x20 Status status = 6 [default = BUSY];\n\
             }"
        );
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("tab\there"), "tab\\there");
        assert_eq!(escape_string("bell\x07"), "bell\\x07");
        assert_eq!(escape_string("\x00\x1f\x7f"), "\\x00\\x1f\\x7f");
        // Non-ASCII text passes through unescaped
        assert_eq!(escape_string("héllo"), "héllo");
    }

    #[test]
    fn test_escape_bytes() {
        assert_eq!(escape_bytes(b"ab"), "ab");
        assert_eq!(escape_bytes(&[0x00, 0xFF]), "\\000\\377");
    }
}
