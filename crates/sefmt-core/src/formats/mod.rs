//! Format registry and the decoder entry point.
//!
//! ## Supported formats
//!
//! | Key   | Magic      | Content                              |
//! |-------|------------|--------------------------------------|
//! | `ba`  | `ANIM`     | bone animations                      |
//! | `bae` | `AEFF`     | bone animation effects               |
//! | `bm`  | `MESH`     | skinned meshes (v11, v12, v16)       |
//! | `bs`  | `SKEL`     | bone skeletons                       |
//! | `fnt` | `FTTF`     | bitmap fonts                         |
//! | `mdl` | `MDAT`     | vertex-animated models               |
//! | `wld` | `BUIV`     | worlds, or a bare terrain chunk      |
//! | `tex` | `CTSEMETA` | engine-2 metadata                    |
//!
//! ```no_run
//! use sefmt_core::{Decoder, DecoderConfig, FormatKind};
//!
//! let bytes = std::fs::read("Player.bm").unwrap();
//! let decoder = Decoder::with_config(DecoderConfig::new().max_elements(1 << 20));
//! let tree = decoder.decode(bytes, FormatKind::Bm).unwrap();
//! println!("{} LODs", tree.get_seq("lods").map_or(0, |lods| lods.len()));
//! ```

mod animation;
mod effects;
mod font;
mod mesh;
mod metadata;
mod model;
mod skeleton;
mod world;

pub use mesh::LOD_FLAGS;
pub use model::MODEL_FLAGS;

use crate::config::DecoderConfig;
use crate::error::{DecodeResult, Error, Result};
use crate::stream::ByteCursor;
use crate::value::Record;
use bytes::Bytes;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// The asset kinds this crate decodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormatKind {
    /// Bone animation (`.ba`)
    Ba,
    /// Bone animation effects (`.bae`)
    Bae,
    /// Bone mesh (`.bm`)
    Bm,
    /// Bone skeleton (`.bs`)
    Bs,
    /// Font (`.fnt`)
    Fnt,
    /// Model (`.mdl`)
    Mdl,
    /// World (`.wld`)
    Wld,
    /// Engine-2 metadata (`.tex`)
    Tex,
}

impl FormatKind {
    /// Every supported kind, in key order
    pub const ALL: [FormatKind; 8] = [
        FormatKind::Ba,
        FormatKind::Bae,
        FormatKind::Bm,
        FormatKind::Bs,
        FormatKind::Fnt,
        FormatKind::Mdl,
        FormatKind::Wld,
        FormatKind::Tex,
    ];

    /// Resolves a file extension token, ignoring case and a leading dot
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.strip_prefix('.').unwrap_or(key);
        Self::ALL
            .into_iter()
            .find(|kind| kind.key().eq_ignore_ascii_case(key))
    }

    /// Resolves the kind from a path's extension
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_key)
    }

    /// Guesses the kind from the leading magic bytes.
    ///
    /// A world file starts with `BUIV`; a bare terrain list (`TRAR`) is also
    /// accepted as a world.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"CTSEMETA") {
            return Some(FormatKind::Tex);
        }
        let magic = data.get(..4)?;
        match magic {
            b"ANIM" => Some(FormatKind::Ba),
            b"AEFF" => Some(FormatKind::Bae),
            b"MESH" => Some(FormatKind::Bm),
            b"SKEL" => Some(FormatKind::Bs),
            b"FTTF" => Some(FormatKind::Fnt),
            b"MDAT" => Some(FormatKind::Mdl),
            b"BUIV" | b"TRAR" => Some(FormatKind::Wld),
            _ => None,
        }
    }

    /// The file extension token
    pub fn key(&self) -> &'static str {
        match self {
            FormatKind::Ba => "ba",
            FormatKind::Bae => "bae",
            FormatKind::Bm => "bm",
            FormatKind::Bs => "bs",
            FormatKind::Fnt => "fnt",
            FormatKind::Mdl => "mdl",
            FormatKind::Wld => "wld",
            FormatKind::Tex => "tex",
        }
    }

    /// Short human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            FormatKind::Ba => "Bone Animation",
            FormatKind::Bae => "Bone Animation Effects",
            FormatKind::Bm => "Bone Mesh",
            FormatKind::Bs => "Bone Skeleton",
            FormatKind::Fnt => "Font",
            FormatKind::Mdl => "Model",
            FormatKind::Wld => "World",
            FormatKind::Tex => "Serious Engine 2 Metadata",
        }
    }

    /// One-line description of the content
    pub fn description(&self) -> &'static str {
        match self {
            FormatKind::Ba => "Skeletal animation tracks for bones and morph targets",
            FormatKind::Bae => "Effect groups triggered by bone animations",
            FormatKind::Bm => "Skinned mesh with LODs, surfaces, weight and morph maps",
            FormatKind::Bs => "Bone hierarchy with placements per LOD",
            FormatKind::Fnt => "Bitmap font with per-character metrics",
            FormatKind::Mdl => "Vertex-animated model with frames and mip levels",
            FormatKind::Wld => "World sections: info, brushes, terrains, dictionary",
            FormatKind::Tex => "Engine-2 metadata: resources, identifiers, types, objects",
        }
    }

    /// The leading magic of a well-formed file
    pub fn magic(&self) -> &'static str {
        match self {
            FormatKind::Ba => "ANIM",
            FormatKind::Bae => "AEFF",
            FormatKind::Bm => "MESH",
            FormatKind::Bs => "SKEL",
            FormatKind::Fnt => "FTTF",
            FormatKind::Mdl => "MDAT",
            FormatKind::Wld => "BUIV",
            FormatKind::Tex => "CTSEMETA",
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FormatKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_key(s).ok_or_else(|| Error::unknown_format(s))
    }
}

/// A decoded tree plus how much of the input it covered
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// The file-level record
    pub record: Record,
    /// Bytes consumed by the grammar
    pub consumed: usize,
    /// Bytes left over after the grammar finished
    pub trailing: usize,
}

/// Decodes byte buffers into value trees
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Creates a decoder with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder with a custom configuration
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// The active configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes `data` as `kind`
    pub fn decode(&self, data: impl Into<Bytes>, kind: FormatKind) -> DecodeResult<Record> {
        self.decode_detailed(data, kind).map(|decoded| decoded.record)
    }

    /// Decodes `data` as the format named by `key`
    pub fn decode_key(&self, data: impl Into<Bytes>, key: &str) -> Result<Record> {
        let kind = key.parse::<FormatKind>()?;
        Ok(self.decode(data, kind)?)
    }

    /// Decodes `data` as `kind` and reports how many bytes were left unread.
    ///
    /// Bytes after the end of the grammar are not an error.
    pub fn decode_detailed(&self, data: impl Into<Bytes>, kind: FormatKind) -> DecodeResult<Decoded> {
        let mut cur = ByteCursor::new(data);
        debug!(format = kind.key(), size = cur.len(), "decoding");

        let config = &self.config;
        let record = match kind {
            FormatKind::Ba => animation::decode(&mut cur, config),
            FormatKind::Bae => effects::decode(&mut cur, config),
            FormatKind::Bm => mesh::decode(&mut cur, config),
            FormatKind::Bs => skeleton::decode(&mut cur, config),
            FormatKind::Fnt => font::decode(&mut cur, config),
            FormatKind::Mdl => model::decode(&mut cur, config),
            FormatKind::Wld => world::decode(&mut cur, config),
            FormatKind::Tex => metadata::decode(&mut cur, config),
        }?;

        let decoded = Decoded {
            record,
            consumed: cur.position(),
            trailing: cur.remaining(),
        };
        if decoded.trailing > 0 {
            debug!(
                format = kind.key(),
                trailing = decoded.trailing,
                "bytes left after the end of the file grammar"
            );
        }
        debug!(format = kind.key(), consumed = decoded.consumed, "decoded");
        Ok(decoded)
    }
}
