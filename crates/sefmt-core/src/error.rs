//! Error types for the sefmt-core library.
//!
//! Two layers are provided:
//!
//! - [`DecodeError`] describes why a byte stream could not be decoded: what went
//!   wrong ([`DecodeErrorKind`]), the byte offset, and the structural path of the
//!   node being decoded (for example `lods[2].surfaces[0].triangles`).
//! - [`Error`] is the crate-level error returned by the convenience entry points,
//!   which can additionally fail before decoding starts (unknown format key,
//!   unreadable file).

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sefmt operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias used inside the decoders
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Crate-level error type
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The format key does not name one of the supported asset kinds
    #[error("unknown format '{key}'")]
    UnknownFormat {
        /// The key (file extension token) that was supplied
        key: String,
    },

    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The bytes did not match the selected format
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl Error {
    /// Creates a new unknown format error
    pub fn unknown_format(key: impl Into<String>) -> Self {
        Self::UnknownFormat { key: key.into() }
    }

    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Returns the decode error, if this error came from the decoder
    pub fn as_decode(&self) -> Option<&DecodeError> {
        match self {
            Self::Decode(err) => Some(err),
            _ => None,
        }
    }
}

/// What went wrong while decoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeErrorKind {
    /// A structural identity tag did not match
    #[error("bad magic: expected '{expected}', found '{actual}'")]
    BadMagic {
        /// The literal the grammar requires
        expected: String,
        /// ASCII view of the bytes actually found
        actual: String,
    },

    /// A fixed-width or sized read ran past the end of the stream
    #[error("out of bounds: requested {requested} bytes, {available} available")]
    OutOfBounds {
        /// Number of bytes the read needed
        requested: usize,
        /// Number of bytes left in the stream
        available: usize,
    },

    /// A count field implies more data than the stream holds
    #[error("invalid count {count}: {element_size}-byte elements exceed the {remaining} remaining bytes")]
    InvalidCount {
        /// The declared element count
        count: u64,
        /// Minimum encoded size of one element
        element_size: usize,
        /// Bytes left in the stream when the count was checked
        remaining: usize,
    },

    /// A count field exceeds the configured element limit
    #[error("count {count} exceeds the limit of {limit} elements")]
    CountLimit {
        /// The declared element count
        count: u64,
        /// The configured limit
        limit: usize,
    },

    /// The stream ended before a required terminator
    #[error("stream ended before '{expected}'")]
    Truncated {
        /// What the grammar was waiting for
        expected: &'static str,
    },

    /// A chunk tag was not recognized at a level that cannot skip it
    #[error("unknown chunk tag '{tag}'")]
    UnknownChunkTag {
        /// ASCII view of the tag
        tag: String,
    },

    /// A version field selects a layout that is not implemented
    #[error("unsupported version {version}")]
    UnsupportedVersion {
        /// The version found in the stream
        version: u32,
    },

    /// A context lookup named a field the ancestor node does not carry
    #[error("field '{name}' is not available in the enclosing node")]
    MissingField {
        /// Name (or dotted path) of the field
        name: String,
    },
}

/// One step of the structural path recorded on a [`DecodeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment {
    /// A named record field
    Field(&'static str),
    /// A position inside a sequence
    Index(usize),
}

/// A decode failure with its location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    kind: DecodeErrorKind,
    offset: usize,
    // innermost segment first; segments are appended while the error unwinds
    path: Vec<PathSegment>,
}

impl DecodeError {
    /// Creates a new decode error at the given byte offset
    pub fn new(kind: DecodeErrorKind, offset: usize) -> Self {
        Self {
            kind,
            offset,
            path: Vec::new(),
        }
    }

    /// Creates a new bad magic error
    pub fn bad_magic(expected: impl Into<String>, actual: impl Into<String>, offset: usize) -> Self {
        Self::new(
            DecodeErrorKind::BadMagic {
                expected: expected.into(),
                actual: actual.into(),
            },
            offset,
        )
    }

    /// Creates a new out-of-bounds error
    pub fn out_of_bounds(requested: usize, available: usize, offset: usize) -> Self {
        Self::new(
            DecodeErrorKind::OutOfBounds {
                requested,
                available,
            },
            offset,
        )
    }

    /// Creates a new invalid count error
    pub fn invalid_count(count: u64, element_size: usize, remaining: usize, offset: usize) -> Self {
        Self::new(
            DecodeErrorKind::InvalidCount {
                count,
                element_size,
                remaining,
            },
            offset,
        )
    }

    /// Creates a new count limit error
    pub fn count_limit(count: u64, limit: usize, offset: usize) -> Self {
        Self::new(DecodeErrorKind::CountLimit { count, limit }, offset)
    }

    /// Creates a new truncation error
    pub fn truncated(expected: &'static str, offset: usize) -> Self {
        Self::new(DecodeErrorKind::Truncated { expected }, offset)
    }

    /// Creates a new unknown chunk tag error
    pub fn unknown_chunk_tag(tag: impl Into<String>, offset: usize) -> Self {
        Self::new(DecodeErrorKind::UnknownChunkTag { tag: tag.into() }, offset)
    }

    /// Creates a new unsupported version error
    pub fn unsupported_version(version: u32, offset: usize) -> Self {
        Self::new(DecodeErrorKind::UnsupportedVersion { version }, offset)
    }

    /// Creates a new missing field error
    pub fn missing_field(name: impl Into<String>, offset: usize) -> Self {
        Self::new(DecodeErrorKind::MissingField { name: name.into() }, offset)
    }

    /// The failure kind
    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }

    /// Byte offset at which decoding stopped
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Human-readable description of the failure kind
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    /// Structural path segments, outermost first
    pub fn segments(&self) -> impl Iterator<Item = PathSegment> + '_ {
        self.path.iter().rev().copied()
    }

    /// Structural breadcrumb, e.g. `lods[2].surfaces[0].triangles`
    pub fn path(&self) -> String {
        let mut out = String::new();
        for segment in self.segments() {
            match segment {
                PathSegment::Field(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                PathSegment::Index(index) => {
                    out.push('[');
                    out.push_str(&index.to_string());
                    out.push(']');
                }
            }
        }
        out
    }

    /// Records that the failure happened inside the named field
    pub fn within(mut self, field: &'static str) -> Self {
        self.path.push(PathSegment::Field(field));
        self
    }

    /// Records that the failure happened inside the element at `index`
    pub fn within_index(mut self, index: usize) -> Self {
        self.path.push(PathSegment::Index(index));
        self
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {:#x}", self.kind, self.offset)?;
        if !self.path.is_empty() {
            write!(f, " (in {})", self.path())?;
        }
        Ok(())
    }
}

impl std::error::Error for DecodeError {}

/// Attaches structural path information to decode results
pub trait ResultExt<T> {
    /// Marks an error as having happened inside `field`
    fn at(self, field: &'static str) -> DecodeResult<T>;

    /// Marks an error as having happened inside element `index`
    fn at_index(self, index: usize) -> DecodeResult<T>;
}

impl<T> ResultExt<T> for DecodeResult<T> {
    fn at(self, field: &'static str) -> DecodeResult<T> {
        self.map_err(|e| e.within(field))
    }

    fn at_index(self, index: usize) -> DecodeResult<T> {
        self.map_err(|e| e.within_index(index))
    }
}
