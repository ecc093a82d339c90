//! Tree walking and text rendering.
//!
//! [`TreeVisitor`] receives every node of a decoded tree in document order;
//! [`walk`] drives it. [`StatsVisitor`] is a ready-made visitor that counts
//! nodes, and [`TreeRenderer`] prints an indented outline for terminals.

use super::{Record, Value};
use std::fmt::{self, Write as FmtWrite};

/// Where a node sits inside its container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label<'a> {
    /// The top-level record
    Root,
    /// A record field
    Field(&'a str),
    /// A sequence element
    Index(usize),
}

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Root => f.write_str("<root>"),
            Label::Field(name) => f.write_str(name),
            Label::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Receives the nodes of a decoded tree.
///
/// All methods default to doing nothing, so implementors only override what
/// they need.
pub trait TreeVisitor {
    /// Called before the fields of a record are visited
    fn enter_record(&mut self, label: Label<'_>, depth: usize, record: &Record) {
        let _ = (label, depth, record);
    }

    /// Called after the fields of a record were visited
    fn leave_record(&mut self, label: Label<'_>, depth: usize, record: &Record) {
        let _ = (label, depth, record);
    }

    /// Called before the elements of a sequence are visited
    fn enter_seq(&mut self, label: Label<'_>, depth: usize, items: &[Value]) {
        let _ = (label, depth, items);
    }

    /// Called after the elements of a sequence were visited
    fn leave_seq(&mut self, label: Label<'_>, depth: usize, items: &[Value]) {
        let _ = (label, depth, items);
    }

    /// Called for every node that is neither a record nor a sequence
    fn visit_leaf(&mut self, label: Label<'_>, depth: usize, value: &Value) {
        let _ = (label, depth, value);
    }
}

/// Visits `record` and everything below it
pub fn walk<V: TreeVisitor + ?Sized>(record: &Record, visitor: &mut V) {
    walk_record(Label::Root, 0, record, visitor);
}

fn walk_record<V: TreeVisitor + ?Sized>(label: Label<'_>, depth: usize, record: &Record, visitor: &mut V) {
    visitor.enter_record(label, depth, record);
    for (name, value) in record.iter() {
        walk_value(Label::Field(name), depth + 1, value, visitor);
    }
    visitor.leave_record(label, depth, record);
}

fn walk_value<V: TreeVisitor + ?Sized>(label: Label<'_>, depth: usize, value: &Value, visitor: &mut V) {
    match value {
        Value::Record(record) => walk_record(label, depth, record, visitor),
        Value::Seq(items) => {
            visitor.enter_seq(label, depth, items);
            for (index, item) in items.iter().enumerate() {
                walk_value(Label::Index(index), depth + 1, item, visitor);
            }
            visitor.leave_seq(label, depth, items);
        }
        leaf => visitor.visit_leaf(label, depth, leaf),
    }
}

/// A visitor that collects statistics about a tree
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatsVisitor {
    /// Number of records, including the root
    pub record_count: usize,
    /// Number of sequences
    pub seq_count: usize,
    /// Number of leaf nodes
    pub leaf_count: usize,
    /// Number of unrecognized chunk bodies
    pub empty_count: usize,
    /// Total bytes held by blobs
    pub blob_bytes: usize,
    /// Deepest nesting level seen
    pub max_depth: usize,
}

impl TreeVisitor for StatsVisitor {
    fn enter_record(&mut self, _label: Label<'_>, depth: usize, _record: &Record) {
        self.record_count += 1;
        self.max_depth = self.max_depth.max(depth);
    }

    fn enter_seq(&mut self, _label: Label<'_>, depth: usize, _items: &[Value]) {
        self.seq_count += 1;
        self.max_depth = self.max_depth.max(depth);
    }

    fn visit_leaf(&mut self, _label: Label<'_>, depth: usize, value: &Value) {
        self.leaf_count += 1;
        self.max_depth = self.max_depth.max(depth);
        match value {
            Value::Blob(blob) => self.blob_bytes += blob.len(),
            Value::Empty => self.empty_count += 1,
            _ => {}
        }
    }
}

/// Renders a tree as an indented outline
#[derive(Debug, Clone)]
pub struct TreeRenderer {
    indent_str: String,
    max_items: usize,
}

impl Default for TreeRenderer {
    fn default() -> Self {
        Self {
            indent_str: "  ".to_string(),
            max_items: 16,
        }
    }
}

impl TreeRenderer {
    /// Creates a renderer with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the indentation string
    pub fn indent_str(mut self, s: impl Into<String>) -> Self {
        self.indent_str = s.into();
        self
    }

    /// Sets how many elements of a sequence are printed (0 = all)
    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = max;
        self
    }

    /// Renders `record` into a string
    pub fn render(&self, record: &Record) -> String {
        let mut out = String::new();
        self.render_fields(&mut out, 0, record);
        out
    }

    fn render_fields(&self, out: &mut String, depth: usize, record: &Record) {
        for (name, value) in record.iter() {
            self.render_value(out, depth, Label::Field(name), value);
        }
    }

    fn render_value(&self, out: &mut String, depth: usize, label: Label<'_>, value: &Value) {
        let indent = self.indent_str.repeat(depth);
        match value {
            Value::Record(record) => {
                let _ = writeln!(out, "{indent}{label}");
                self.render_fields(out, depth + 1, record);
            }
            Value::Seq(items) => {
                let _ = writeln!(out, "{indent}{label} ({} items)", items.len());
                let shown = if self.max_items == 0 {
                    items.len()
                } else {
                    items.len().min(self.max_items)
                };
                for (index, item) in items.iter().take(shown).enumerate() {
                    self.render_value(out, depth + 1, Label::Index(index), item);
                }
                if shown < items.len() {
                    let more = self.indent_str.repeat(depth + 1);
                    let _ = writeln!(out, "{more}... {} more", items.len() - shown);
                }
            }
            leaf => {
                let _ = writeln!(out, "{indent}{label}: {leaf}");
            }
        }
    }
}

/// Renders `record` with the default [`TreeRenderer`] settings
pub fn render_tree(record: &Record) -> String {
    TreeRenderer::new().render(record)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(s) => write!(f, "{s}"),
            Value::Text(t) => write!(f, "{:?}", t.as_str()),
            Value::Blob(b) => write!(f, "<{} bytes @ {:#x}>", b.len(), b.offset()),
            Value::Vector3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            Value::Matrix12(m) => {
                f.write_str("[")?;
                for (i, v) in m.0.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            Value::QuatVect(q) => write!(
                f,
                "pos ({}, {}, {}) rot ({}, {}, {}, {})",
                q.pos.x, q.pos.y, q.pos.z, q.w, q.x, q.y, q.z
            ),
            Value::Flags(flags) => {
                write!(f, "{:#010x}", flags.raw())?;
                let set = flags.set_names();
                if !set.is_empty() {
                    write!(f, " [{}]", set.join(", "))?;
                }
                Ok(())
            }
            Value::Seq(items) => write!(f, "[{} items]", items.len()),
            Value::Record(record) => write!(f, "{{{} fields}}", record.len()),
            Value::Empty => f.write_str("<empty>"),
        }
    }
}
