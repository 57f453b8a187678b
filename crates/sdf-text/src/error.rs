use crate::LabelId;

/// Errors raised while packing glyphs or driving labels.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TextError {
    /// The glyph does not fit into the remaining atlas space.
    ///
    /// Fatal for the atlas instance: rebuild with a larger atlas or smaller glyphs.
    #[error(
        "glyph atlas exhausted: cannot place {ch:?} ({glyph_width}x{glyph_height}) \
         in a {atlas_width}x{atlas_height} atlas"
    )]
    AtlasExhausted {
        ch: char,
        glyph_width: u32,
        glyph_height: u32,
        atlas_width: u32,
        atlas_height: u32,
    },

    /// A character was about to be packed a second time.
    #[error("duplicate character in alphabet: {0:?}")]
    DuplicateCharacter(char),

    /// The rasterizer returned fewer bytes than its declared dimensions require.
    #[error("rasterizer returned {actual} bytes for {ch:?}, expected {expected}")]
    MalformedGlyph {
        ch: char,
        expected: usize,
        actual: usize,
    },

    #[error("label {0:?} is not part of this pool")]
    UnknownLabel(LabelId),
}

pub type Result<T, E = TextError> = std::result::Result<T, E>;
