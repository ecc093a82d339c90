//! Generic decoded-value tree.
//!
//! Every decoder produces a [`Record`]: an ordered mapping of field names to
//! [`Value`]s. Values are scalars, texts, blobs, fixed-shape float aggregates,
//! bit flags, sequences, and nested records. Trees are built bottom-up during a
//! single decode pass and never mutated afterwards.
//!
//! Text and blob nodes keep the byte offset they were read from, so a hex viewer
//! can highlight the originating range.

mod render;

use bytes::Bytes;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;
use std::ops::Range;

pub use render::{render_tree, walk, Label, StatsVisitor, TreeRenderer, TreeVisitor};

/// A primitive number as it appeared on the wire
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    /// Unsigned 8-bit integer
    U8(u8),
    /// Signed 8-bit integer
    I8(i8),
    /// Unsigned 16-bit integer
    U16(u16),
    /// Signed 16-bit integer
    I16(i16),
    /// Unsigned 32-bit integer
    U32(u32),
    /// Signed 32-bit integer
    I32(i32),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
}

impl Scalar {
    /// Returns the value as an unsigned integer, if it is one
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Scalar::U8(v) => Some(v.into()),
            Scalar::U16(v) => Some(v.into()),
            Scalar::U32(v) => Some(v.into()),
            _ => None,
        }
    }

    /// Returns the value widened to `f64`
    pub fn as_f64(&self) -> f64 {
        match *self {
            Scalar::U8(v) => v.into(),
            Scalar::I8(v) => v.into(),
            Scalar::U16(v) => v.into(),
            Scalar::I16(v) => v.into(),
            Scalar::U32(v) => v.into(),
            Scalar::I32(v) => v.into(),
            Scalar::F32(v) => v.into(),
            Scalar::F64(v) => v,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::U8(v) => write!(f, "{v}"),
            Scalar::I8(v) => write!(f, "{v}"),
            Scalar::U16(v) => write!(f, "{v}"),
            Scalar::I16(v) => write!(f, "{v}"),
            Scalar::U32(v) => write!(f, "{v}"),
            Scalar::I32(v) => write!(f, "{v}"),
            Scalar::F32(v) => write!(f, "{v}"),
            Scalar::F64(v) => write!(f, "{v}"),
        }
    }
}

/// A run of bytes with a best-effort ASCII view.
///
/// Bytes are kept verbatim. The decoded string maps ASCII bytes to themselves and
/// every byte above 0x7F to the code point of the same number, so decoding never
/// fails and never loses information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    offset: usize,
    bytes: Bytes,
    value: String,
}

impl Text {
    /// Creates a text node from raw bytes read at `offset`
    pub fn new(bytes: Bytes, offset: usize) -> Self {
        let value = ascii_view(&bytes);
        Self {
            offset,
            bytes,
            value,
        }
    }

    /// The decoded string
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The raw bytes
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Offset of the first byte in the source buffer
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of raw bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the text has no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether every byte is 7-bit ASCII
    pub fn is_ascii(&self) -> bool {
        self.bytes.is_ascii()
    }
}

/// Maps bytes one-to-one onto `char`s (ASCII verbatim, high bytes to U+0080..U+00FF)
pub(crate) fn ascii_view(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// An opaque byte run of known length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    offset: usize,
    bytes: Bytes,
}

impl Blob {
    /// Creates a blob from raw bytes read at `offset`
    pub fn new(bytes: Bytes, offset: usize) -> Self {
        Self { offset, bytes }
    }

    /// The raw bytes
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Offset of the first byte in the source buffer
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the blob has no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Byte range in the source buffer
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.bytes.len()
    }

    /// Lowercase hex rendering of the bytes
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(self.bytes.len() * 2);
        for byte in self.bytes.iter() {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }
}

/// Three floats (`x`, `y`, `z`)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vector3 {
    /// Creates a new vector
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// The engine's 3×4 affine transform, stored as 12 floats in wire order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Matrix12(pub [f32; 12]);

/// A placement: position followed by an orientation quaternion (`w`, `x`, `y`, `z`)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QuatVect {
    /// Position
    pub pos: Vector3,
    /// Quaternion scalar part
    pub w: f32,
    /// Quaternion x
    pub x: f32,
    /// Quaternion y
    pub y: f32,
    /// Quaternion z
    pub z: f32,
}

/// Named bit positions of a flags field
pub type FlagSchema = &'static [(&'static str, u8)];

/// A raw `u32` flags word with named boolean projections.
///
/// Accessors are computed from the raw value on every call; nothing is stored
/// besides the word itself and the static schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitFlags {
    raw: u32,
    schema: FlagSchema,
}

impl BitFlags {
    /// Creates a flags value with the given schema
    pub fn new(raw: u32, schema: FlagSchema) -> Self {
        Self { raw, schema }
    }

    /// The raw value
    pub fn raw(&self) -> u32 {
        self.raw
    }

    /// Whether bit `n` is set
    pub fn bit(&self, n: u8) -> bool {
        n < 32 && self.raw & (1 << n) != 0
    }

    /// Looks up a named flag; `None` if the schema has no such name
    pub fn get(&self, name: &str) -> Option<bool> {
        self.schema
            .iter()
            .find(|(flag, _)| *flag == name)
            .map(|&(_, bit)| self.bit(bit))
    }

    /// Iterates over every named flag in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        self.schema.iter().map(|&(name, bit)| (name, self.bit(bit)))
    }

    /// Names of the flags that are set
    pub fn set_names(&self) -> Vec<&'static str> {
        self.iter().filter(|(_, on)| *on).map(|(name, _)| name).collect()
    }
}

/// A decoded node
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A primitive number
    Scalar(Scalar),
    /// A string with its raw bytes
    Text(Text),
    /// Opaque bytes
    Blob(Blob),
    /// Three floats
    Vector3(Vector3),
    /// A 3×4 transform
    Matrix12(Matrix12),
    /// Position plus quaternion
    QuatVect(QuatVect),
    /// A flags word
    Flags(BitFlags),
    /// An ordered list
    Seq(Vec<Value>),
    /// Named fields
    Record(Record),
    /// The body of a chunk whose tag was not recognized
    Empty,
}

impl Value {
    /// Returns the scalar, if this is one
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Value::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    /// Returns the value as `u32` (unsigned integer scalars only)
    pub fn as_u32(&self) -> Option<u32> {
        self.as_u64().and_then(|v| u32::try_from(v).ok())
    }

    /// Returns the value as `u64` (unsigned integer scalars only)
    pub fn as_u64(&self) -> Option<u64> {
        self.as_scalar().and_then(|s| s.as_u64())
    }

    /// Returns the value as `f32`, if it is a 32-bit float
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Scalar(Scalar::F32(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text node, if this is one
    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Value::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the decoded string, if this is a text node
    pub fn as_str(&self) -> Option<&str> {
        self.as_text().map(Text::as_str)
    }

    /// Returns the blob, if this is one
    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the vector, if this is one
    pub fn as_vector3(&self) -> Option<Vector3> {
        match self {
            Value::Vector3(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the flags, if this is a flags word
    pub fn as_flags(&self) -> Option<&BitFlags> {
        match self {
            Value::Flags(f) => Some(f),
            _ => None,
        }
    }

    /// Returns the elements, if this is a sequence
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the record, if this is one
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Whether this is the opaque body of an unrecognized chunk
    pub fn is_empty_body(&self) -> bool {
        matches!(self, Value::Empty)
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Scalar(Scalar::$variant(v))
                }
            }
        )*
    };
}

scalar_from! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    f32 => F32,
    f64 => F64,
}

impl From<Text> for Value {
    fn from(v: Text) -> Self {
        Value::Text(v)
    }
}

impl From<Blob> for Value {
    fn from(v: Blob) -> Self {
        Value::Blob(v)
    }
}

impl From<Vector3> for Value {
    fn from(v: Vector3) -> Self {
        Value::Vector3(v)
    }
}

impl From<Matrix12> for Value {
    fn from(v: Matrix12) -> Self {
        Value::Matrix12(v)
    }
}

impl From<QuatVect> for Value {
    fn from(v: QuatVect) -> Self {
        Value::QuatVect(v)
    }
}

impl From<BitFlags> for Value {
    fn from(v: BitFlags) -> Self {
        Value::Flags(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Seq(v)
    }
}

/// An ordered mapping of field name to value.
///
/// Insertion order is preserved and keys are unique within one record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(&'static str, Value)>,
}

impl Record {
    /// Creates an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field. A repeated name replaces the earlier value in place.
    pub fn insert(&mut self, name: &'static str, value: impl Into<Value>) {
        let value = value.into();
        let existing = self.fields.iter().position(|(key, _)| *key == name);
        debug_assert!(existing.is_none(), "duplicate record field '{name}'");
        match existing {
            Some(index) => self.fields[index].1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Builder form of [`Record::insert`]
    pub fn with(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether a field with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Looks up a field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// Looks up an unsigned integer field
    pub fn get_u32(&self, name: &str) -> Option<u32> {
        self.get(name).and_then(Value::as_u32)
    }

    /// Looks up a text field and returns its decoded string
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Looks up a text field
    pub fn get_text(&self, name: &str) -> Option<&Text> {
        self.get(name).and_then(Value::as_text)
    }

    /// Looks up a nested record
    pub fn get_record(&self, name: &str) -> Option<&Record> {
        self.get(name).and_then(Value::as_record)
    }

    /// Looks up a sequence
    pub fn get_seq(&self, name: &str) -> Option<&[Value]> {
        self.get(name).and_then(Value::as_seq)
    }

    /// Follows a path of nested record fields
    pub fn lookup(&self, path: &[&str]) -> Option<&Value> {
        let (last, parents) = path.split_last()?;
        let mut record = self;
        for name in parents {
            record = record.get_record(name)?;
        }
        record.get(last)
    }

    /// Iterates over fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> + '_ {
        self.fields.iter().map(|(key, value)| (*key, value))
    }

    /// Field names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(key, _)| *key)
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Scalar::U8(v) => serializer.serialize_u8(v),
            Scalar::I8(v) => serializer.serialize_i8(v),
            Scalar::U16(v) => serializer.serialize_u16(v),
            Scalar::I16(v) => serializer.serialize_i16(v),
            Scalar::U32(v) => serializer.serialize_u32(v),
            Scalar::I32(v) => serializer.serialize_i32(v),
            Scalar::F32(v) => serializer.serialize_f32(v),
            Scalar::F64(v) => serializer.serialize_f64(v),
        }
    }
}

impl Serialize for Text {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl Serialize for Blob {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("offset", &self.offset)?;
        map.serialize_entry("length", &self.bytes.len())?;
        map.serialize_entry("hex", &self.to_hex())?;
        map.end()
    }
}

impl Serialize for Vector3 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("x", &self.x)?;
        map.serialize_entry("y", &self.y)?;
        map.serialize_entry("z", &self.z)?;
        map.end()
    }
}

impl Serialize for Matrix12 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(12))?;
        for v in &self.0 {
            seq.serialize_element(v)?;
        }
        seq.end()
    }
}

impl Serialize for QuatVect {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry("pos", &self.pos)?;
        map.serialize_entry("w", &self.w)?;
        map.serialize_entry("x", &self.x)?;
        map.serialize_entry("y", &self.y)?;
        map.serialize_entry("z", &self.z)?;
        map.end()
    }
}

impl Serialize for BitFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.schema.len() + 1))?;
        map.serialize_entry("raw", &self.raw)?;
        for (name, on) in self.iter() {
            map.serialize_entry(name, &on)?;
        }
        map.end()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Scalar(v) => v.serialize(serializer),
            Value::Text(v) => v.serialize(serializer),
            Value::Blob(v) => v.serialize(serializer),
            Value::Vector3(v) => v.serialize(serializer),
            Value::Matrix12(v) => v.serialize(serializer),
            Value::QuatVect(v) => v.serialize(serializer),
            Value::Flags(v) => v.serialize(serializer),
            Value::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Record(v) => v.serialize(serializer),
            Value::Empty => serializer.serialize_unit(),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
