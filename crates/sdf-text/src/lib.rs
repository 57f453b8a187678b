//! Backend-agnostic signed-distance-field text for labels in a 3D scene.
//!
//! # Design goals
//! - **Backend-agnostic**: no `wgpu`, no renderer-specific types.
//! - **One atlas, many labels**: glyphs are rasterized once into a shared single-channel atlas
//!   and every label draws instanced quads against it.
//! - **Incremental**: the alphabet grows on demand; seeded characters never touch the rasterizer
//!   again.
//!
//! # Flow
//! 1. [`LabelPool::update`] asks the [`AtlasManager`] to [`ensure`](AtlasManager::ensure) the
//!    label's characters.
//! 2. [`layout`] turns the text plus atlas metrics into positioned character boxes.
//! 3. [`InstanceBuffer::pack`] flips the boxes into render space as [`LabelInstance`]s.
//! 4. A backend uploads the atlas when [`LabelPool::atlas_needs_upload`] and issues one
//!    instanced draw per label.
//!
//! Glyph bitmaps come from a [`GlyphRasterizer`]. The `cosmic` feature provides one backed by
//! `cosmic-text`; [`BlockFont`] is a procedural font that needs no font files.

mod atlas;
mod block_font;
mod config;
mod error;
mod instance;
mod layout;
mod pool;
mod sdf;

pub use atlas::{AtlasData, AtlasManager, CharInfo};
pub use block_font::{BlockFont, BlockFontMetrics};
pub use config::{printable_ascii, AtlasConfig, SdfParams, REPLACEMENT_CHARACTER};
pub use error::{Result, TextError};
pub use instance::{InstanceBuffer, LabelInstance};
pub use layout::{layout, CharLayoutInfo, LayoutInfo};
pub use pool::{Label, LabelId, LabelPool};
pub use sdf::distance_field;

/// Single-channel distance-field bitmap of one character.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SdfGlyph {
    /// Row-major distance values, length = `width * height`.
    pub data: Vec<u8>,
    /// Bitmap width in pixels, including the buffer on both sides.
    pub width: u32,
    /// Bitmap height in pixels, including the buffer on both sides.
    pub height: u32,
    /// Ascent from the baseline to the top edge of the glyph, in pixels.
    pub glyph_top: f32,
    /// Pen advance after this glyph, in pixels.
    pub glyph_advance: f32,
}

impl SdfGlyph {
    /// A fully transparent glyph of `width * height` texels.
    pub fn blank(width: u32, height: u32, glyph_top: f32, glyph_advance: f32) -> Self {
        Self {
            data: vec![0; (width * height) as usize],
            width,
            height,
            glyph_top,
            glyph_advance,
        }
    }
}

/// Produces distance-field bitmaps for single characters.
///
/// Implementations may cache internally but must return the same bitmap for the same
/// `(ch, params)` pair.
pub trait GlyphRasterizer {
    fn rasterize(&mut self, ch: char, params: &SdfParams) -> SdfGlyph;
}

impl<R: GlyphRasterizer + ?Sized> GlyphRasterizer for Box<R> {
    fn rasterize(&mut self, ch: char, params: &SdfParams) -> SdfGlyph {
        (**self).rasterize(ch, params)
    }
}

/// A convenient concrete rasterizer selection.
pub enum Rasterizer {
    #[cfg(feature = "cosmic")]
    Cosmic(cosmic::CosmicRasterizer),
    Block(BlockFont),
}

impl Rasterizer {
    /// Create the default rasterizer.
    ///
    /// With the `cosmic` feature enabled this uses the system fonts found by `cosmic-text`,
    /// otherwise the built-in [`BlockFont`].
    pub fn new_default() -> Self {
        #[cfg(feature = "cosmic")]
        {
            Self::Cosmic(cosmic::CosmicRasterizer::new())
        }
        #[cfg(not(feature = "cosmic"))]
        {
            Self::Block(BlockFont::new())
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "cosmic")]
            Self::Cosmic(_) => "cosmic-text",
            Self::Block(_) => "block font",
        }
    }
}

impl GlyphRasterizer for Rasterizer {
    fn rasterize(&mut self, ch: char, params: &SdfParams) -> SdfGlyph {
        match self {
            #[cfg(feature = "cosmic")]
            Self::Cosmic(rasterizer) => rasterizer.rasterize(ch, params),
            Self::Block(font) => font.rasterize(ch, params),
        }
    }
}

#[cfg(feature = "cosmic")]
pub mod cosmic {
    //! `cosmic-text` glyph rasterization.
    //!
    //! Each character is shaped on its own (no ligatures, no kerning), rasterized to a coverage
    //! mask through swash and converted to a distance field.

    use super::{distance_field, GlyphRasterizer, SdfGlyph, SdfParams};

    use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, SwashCache};

    /// Rasterizer backed by `cosmic-text`.
    ///
    /// Owns its `FontSystem`; independent rasterizers do not share font state.
    pub struct CosmicRasterizer {
        font_system: FontSystem,
        swash_cache: SwashCache,
        family: Option<String>,
    }

    impl Default for CosmicRasterizer {
        fn default() -> Self {
            Self::new()
        }
    }

    impl CosmicRasterizer {
        /// Create a rasterizer over the system fonts.
        pub fn new() -> Self {
            Self::with_font_system(FontSystem::new())
        }

        pub fn with_font_system(font_system: FontSystem) -> Self {
            Self {
                font_system,
                swash_cache: SwashCache::new(),
                family: None,
            }
        }

        /// Add a font from raw bytes (TTF/OTF).
        pub fn load_font_data(&mut self, data: Vec<u8>) {
            self.font_system.db_mut().load_font_data(data);
        }

        /// Prefer `family` over the default sans-serif face.
        pub fn set_family(&mut self, family: impl Into<String>) {
            self.family = Some(family.into());
        }

        pub fn font_system_mut(&mut self) -> &mut FontSystem {
            &mut self.font_system
        }
    }

    impl GlyphRasterizer for CosmicRasterizer {
        fn rasterize(&mut self, ch: char, params: &SdfParams) -> SdfGlyph {
            let pad = 2 * params.buffer;
            let metrics = Metrics::new(params.font_size, params.font_size * 1.2);

            let mut buffer = Buffer::new(&mut self.font_system, metrics);
            buffer.set_size(
                &mut self.font_system,
                Some(f32::MAX),
                Some(metrics.line_height),
            );

            let family = self.family.clone();
            let attrs = match family.as_deref() {
                Some(name) => Attrs::new().family(Family::Name(name)),
                None => Attrs::new().family(Family::SansSerif),
            };
            let mut text = [0u8; 4];
            buffer.set_text(
                &mut self.font_system,
                ch.encode_utf8(&mut text),
                &attrs,
                Shaping::Advanced,
                None,
            );
            buffer.shape_until_scroll(&mut self.font_system, false);

            let Some(run) = buffer.layout_runs().next() else {
                return SdfGlyph::blank(pad, pad, 0.0, 0.0);
            };

            let advance: f32 = run.glyphs.iter().map(|glyph| glyph.w).sum();
            let Some(glyph) = run.glyphs.first() else {
                return SdfGlyph::blank(pad, pad, 0.0, advance);
            };

            let physical = glyph.physical((0.0, 0.0), 1.0);
            let image = self
                .swash_cache
                .get_image(&mut self.font_system, physical.cache_key)
                .clone();

            // Whitespace has no outline; color glyphs are not supported by the R8 atlas.
            let Some(image) = image.filter(|image| {
                image.content == cosmic_text::SwashContent::Mask
                    && image.placement.width > 0
                    && image.placement.height > 0
            }) else {
                return SdfGlyph::blank(pad, pad, 0.0, advance);
            };

            let (w, h) = (image.placement.width, image.placement.height);

            SdfGlyph {
                data: distance_field(&image.data, w, h, params),
                width: w + pad,
                height: h + pad,
                // Measured to the padded top edge so the bitmap lines up with the baseline.
                glyph_top: image.placement.top as f32 + params.buffer as f32,
                glyph_advance: advance,
            }
        }
    }
}
