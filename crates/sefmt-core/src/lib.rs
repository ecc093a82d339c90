//! # sefmt-core
//!
//! A library for decoding the binary asset formats of the Serious Engine into
//! a generic, inspectable value tree.
//!
//! This crate provides the core functionality for:
//! - Reading little-endian primitives, tags and length-prefixed strings
//! - Decoding bone animations, effects, meshes, skeletons, fonts, models,
//!   worlds and engine-2 metadata
//! - Walking and rendering the decoded trees
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`stream`]: Byte cursor, primitive readers and repeat combinators
//! - [`chunk`]: Tag-dispatched chunk containers
//! - [`formats`]: One decoder per asset kind, and the [`Decoder`] entry point
//! - [`value`]: The decoded tree and its visitors
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use sefmt_core::{Decoder, FormatKind, TreeRenderer};
//! use std::fs;
//!
//! let data = fs::read("Models/Player.bm")?;
//!
//! let tree = Decoder::new().decode(data, FormatKind::Bm)?;
//! print!("{}", TreeRenderer::new().render(&tree));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`TreeVisitor`]: Walk a decoded tree without matching on every node
//! - [`ChunkKind`]: Declare a new tag-dispatched container
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod chunk;
pub mod config;
pub mod error;
pub mod formats;
pub mod stream;
pub mod value;

use std::path::Path;

// Re-export primary types for convenience
pub use chunk::{ChunkKind, UnknownTag};
pub use config::DecoderConfig;
pub use error::{DecodeError, DecodeErrorKind, DecodeResult, Error, Result};
pub use formats::{Decoded, Decoder, FormatKind, LOD_FLAGS, MODEL_FLAGS};
pub use stream::ByteCursor;
pub use value::{render_tree, Record, StatsVisitor, TreeRenderer, TreeVisitor, Value};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Decodes `data` as the format named by `key` with the default configuration
///
/// `key` is a file extension token such as `"bm"` or `".wld"`.
pub fn decode(data: impl Into<bytes::Bytes>, key: &str) -> Result<Record> {
    Decoder::new().decode_key(data, key)
}

/// Decodes `data` as `kind` with the default configuration
pub fn decode_as(data: impl Into<bytes::Bytes>, kind: FormatKind) -> DecodeResult<Record> {
    Decoder::new().decode(data, kind)
}

/// Reads and decodes a file, choosing the format from its extension.
///
/// Files whose extension is not recognized are identified by their leading
/// magic instead.
pub fn decode_file(path: impl AsRef<Path>) -> Result<Record> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| Error::file_read(path, e))?;
    let kind = FormatKind::from_path(path)
        .or_else(|| FormatKind::sniff(&data))
        .ok_or_else(|| {
            let key = path
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_default();
            Error::unknown_format(key)
        })?;
    Ok(Decoder::new().decode(data, kind)?)
}
