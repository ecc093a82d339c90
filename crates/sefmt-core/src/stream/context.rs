//! Read-only access to ancestor nodes while a tree is being built.

use super::ByteCursor;
use crate::config::DecoderConfig;
use crate::error::{DecodeError, DecodeResult};
use crate::value::Record;

/// Ancestor view handed to every nested decode call.
///
/// Holds two borrowed references: the record that directly encloses the node
/// being decoded and the file-level record. Neither is stored in the output
/// tree; both only live for the duration of the call that receives them.
/// Records are built bottom-up, so the references see exactly the fields that
/// were decoded before the current node.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    parent: Option<&'a Record>,
    root: &'a Record,
    config: &'a DecoderConfig,
}

impl<'a> DecodeContext<'a> {
    /// Context for the file-level record. The root has no parent.
    pub fn root(root: &'a Record, config: &'a DecoderConfig) -> Self {
        Self {
            parent: None,
            root,
            config,
        }
    }

    /// Context for a node nested in `parent`; the root is inherited
    pub fn child<'b>(&self, parent: &'b Record) -> DecodeContext<'b>
    where
        'a: 'b,
    {
        DecodeContext {
            parent: Some(parent),
            root: self.root,
            config: self.config,
        }
    }

    /// The enclosing record, if any
    pub fn parent(&self) -> Option<&'a Record> {
        self.parent
    }

    /// The file-level record
    pub fn root_record(&self) -> &'a Record {
        self.root
    }

    /// The active decoder configuration
    pub fn config(&self) -> &'a DecoderConfig {
        self.config
    }

    /// Reads an unsigned integer field of the enclosing record
    pub fn parent_u32(&self, name: &'static str, cur: &ByteCursor) -> DecodeResult<u32> {
        self.parent
            .and_then(|parent| parent.get_u32(name))
            .ok_or_else(|| DecodeError::missing_field(format!("parent.{name}"), cur.position()))
    }

    /// Reads an unsigned integer field below the root, e.g. `["header", "vtxCount", "value"]`
    pub fn root_u32(&self, path: &[&str], cur: &ByteCursor) -> DecodeResult<u32> {
        self.root
            .lookup(path)
            .and_then(|value| value.as_u32())
            .ok_or_else(|| {
                DecodeError::missing_field(format!("root.{}", path.join(".")), cur.position())
            })
    }
}
