//! Atlas and distance-field configuration.

/// Glyph substituted for characters missing from the atlas. Always the first glyph packed.
pub const REPLACEMENT_CHARACTER: char = '\u{FFFD}';

/// Parameters handed to a [`GlyphRasterizer`](crate::GlyphRasterizer) for every glyph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SdfParams {
    /// Font size in pixels.
    pub font_size: f32,
    /// Padding in pixels around the glyph coverage, on every side.
    pub buffer: u32,
    /// Distance in pixels covered by the full 0..=255 value range.
    pub radius: f32,
    /// Fraction of the value range reserved for the inside of the glyph.
    ///
    /// The glyph edge ends up at `255 * (1 - cutoff)`.
    pub cutoff: f32,
}

impl Default for SdfParams {
    fn default() -> Self {
        Self {
            font_size: 100.0,
            buffer: 10,
            radius: 8.0,
            cutoff: 0.25,
        }
    }
}

impl SdfParams {
    /// Normalized value (0..=1) a sampler returns on the glyph edge.
    pub fn edge_value(&self) -> f32 {
        1.0 - self.cutoff
    }
}

/// Configuration of one atlas.
#[derive(Clone, Debug, PartialEq)]
pub struct AtlasConfig {
    /// Atlas width in pixels. Fixed for the lifetime of the atlas.
    pub width: u32,
    /// Atlas height in pixels. Fixed for the lifetime of the atlas.
    pub height: u32,
    pub sdf: SdfParams,
    /// Characters packed at construction, after [`REPLACEMENT_CHARACTER`].
    pub initial_chars: String,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            sdf: SdfParams::default(),
            initial_chars: printable_ascii(),
        }
    }
}

impl AtlasConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_sdf(mut self, sdf: SdfParams) -> Self {
        self.sdf = sdf;
        self
    }

    pub fn with_initial_chars(mut self, chars: impl Into<String>) -> Self {
        self.initial_chars = chars.into();
        self
    }
}

/// `' '..='~'`, the seed alphabet used by default.
pub fn printable_ascii() -> String {
    (' '..='~').collect()
}
