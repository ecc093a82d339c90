//! Decoder configuration.

/// Default cap on the number of elements in one counted repeat
pub const DEFAULT_MAX_ELEMENTS: usize = 16 * 1024 * 1024;

/// Configuration for the decoders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Maximum element count accepted for any single counted repeat.
    /// Checked in addition to the remaining-bytes guard.
    pub max_elements: usize,
    /// Reproduce the lenient world chunk loop: a corrupt trailing chunk ends
    /// the list (keeping everything decoded before it) and a missing `WEND`
    /// terminator is tolerated.
    pub lenient_world_chunks: bool,
    /// Decode the normals, UV maps, surfaces, weight maps and morph maps
    /// that follow the vertex block of legacy (v11/v12) mesh LODs.
    pub legacy_mesh_groups: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_elements: DEFAULT_MAX_ELEMENTS,
            lenient_world_chunks: false,
            legacy_mesh_groups: false,
        }
    }
}

impl DecoderConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum element count for counted repeats
    pub fn max_elements(mut self, max: usize) -> Self {
        self.max_elements = max;
        self
    }

    /// Sets whether the world chunk loop tolerates corrupt trailing chunks
    pub fn lenient_world_chunks(mut self, lenient: bool) -> Self {
        self.lenient_world_chunks = lenient;
        self
    }

    /// Sets whether legacy mesh LODs carry the full attribute groups
    pub fn legacy_mesh_groups(mut self, enabled: bool) -> Self {
        self.legacy_mesh_groups = enabled;
        self
    }
}
