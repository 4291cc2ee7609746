//! Fields whose numbers the descriptor does not declare.
//!
//! They are kept byte-for-byte so that a message decoded with an older schema
//! and encoded again does not lose data written by a newer one.

use crate::error::Result;
use crate::wire::{encode_uvarint, encoded_len_uvarint, Tag, WireReader, WireType, WireValue};
use bytes::{BufMut, Bytes};

/// A field captured verbatim during decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField {
    number: u32,
    wire_type: WireType,
    data: Bytes,
}

impl UnknownField {
    /// Creates a new unknown field.
    ///
    /// `data` is the payload exactly as it appears after the tag; for
    /// length-delimited fields that includes the length prefix.
    pub fn new(number: u32, wire_type: WireType, data: impl Into<Bytes>) -> Self {
        Self {
            number,
            wire_type,
            data: data.into(),
        }
    }

    /// Field number
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Wire type the payload was written with
    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    /// Raw payload bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Re-read the payload as a wire value
    pub fn value(&self) -> Result<WireValue<'_>> {
        WireReader::new(&self.data).read_value(self.wire_type)
    }

    /// Size of the field on the wire, tag included
    pub fn encoded_len(&self) -> usize {
        encoded_len_uvarint(self.tag().to_raw()) + self.data.len()
    }

    fn tag(&self) -> Tag {
        Tag::new(self.number, self.wire_type)
    }

    /// Write tag and payload.
    ///
    /// The number is not range-checked: it was accepted on decode and is
    /// passed through as-is.
    pub fn encode(&self, buf: &mut impl BufMut) {
        encode_uvarint(self.tag().to_raw(), buf);
        buf.put_slice(&self.data);
    }
}

/// Unknown fields of one message, in the order they were read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnknownFieldSet {
    fields: Vec<UnknownField>,
}

impl UnknownFieldSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field
    pub fn push(&mut self, field: UnknownField) {
        self.fields.push(field);
    }

    /// Appends every field of `other`
    pub fn extend(&mut self, other: UnknownFieldSet) {
        self.fields.extend(other.fields);
    }

    /// Number of captured fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if nothing was captured
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates in capture order
    pub fn iter(&self) -> std::slice::Iter<'_, UnknownField> {
        self.fields.iter()
    }

    /// All occurrences of one field number
    pub fn get(&self, number: u32) -> impl Iterator<Item = &UnknownField> + '_ {
        self.fields.iter().filter(move |f| f.number == number)
    }

    /// Drops every captured field
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Total size on the wire
    pub fn encoded_len(&self) -> usize {
        self.fields.iter().map(UnknownField::encoded_len).sum()
    }

    /// Writes every field in capture order
    pub fn encode(&self, buf: &mut impl BufMut) {
        for field in &self.fields {
            field.encode(buf);
        }
    }
}

impl<'a> IntoIterator for &'a UnknownFieldSet {
    type Item = &'a UnknownField;
    type IntoIter = std::slice::Iter<'a, UnknownField>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
