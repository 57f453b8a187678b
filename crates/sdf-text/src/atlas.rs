//! Glyph atlas: alphabet bookkeeping + shelf packing into a CPU-side pixel buffer.
//!
//! The atlas is a fixed-size single-channel image. Glyphs are placed left to right on the
//! current shelf (row); when a glyph does not fit horizontally a new shelf is opened below the
//! tallest glyph of the current one. There is no eviction: once the bottom is reached the atlas
//! is exhausted.
//!
//! Characters are rasterized exactly once. Consumers watch [`AtlasManager::needs_upload`] (or
//! [`AtlasManager::generation`]) to know when the pixel buffer must be re-uploaded.

use std::collections::HashMap;

use crate::{
    layout, AtlasConfig, GlyphRasterizer, LayoutInfo, Result, SdfParams, TextError,
    REPLACEMENT_CHARACTER,
};

/// Placement and metrics of one packed glyph.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CharInfo {
    /// Left edge in atlas pixels.
    pub atlas_x: u32,
    /// Top edge in atlas pixels (top-left origin).
    pub atlas_y: u32,
    /// Bitmap width in pixels, buffer included.
    pub width: u32,
    /// Bitmap height in pixels, buffer included.
    pub height: u32,
    /// Ascent from the baseline to the top of the bitmap.
    pub y_offset: f32,
    pub x_advance: f32,
}

/// The atlas image and the metrics of every glyph in it.
#[derive(Clone, Debug)]
pub struct AtlasData {
    /// Row-major distance values, `width * height` bytes.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub char_info: HashMap<char, CharInfo>,
    /// Largest `y_offset` of any packed glyph.
    pub max_ascent: f32,
    /// Largest bitmap height of any packed glyph.
    pub line_height: f32,
}

impl AtlasData {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0; width as usize * height as usize],
            width,
            height,
            char_info: HashMap::new(),
            max_ascent: 0.0,
            line_height: 0.0,
        }
    }

    #[inline]
    pub fn get(&self, ch: char) -> Option<&CharInfo> {
        self.char_info.get(&ch)
    }

    fn blit(&mut self, x: u32, y: u32, width: u32, height: u32, pixels: &[u8]) {
        let (x, w) = (x as usize, width as usize);
        for row in 0..height as usize {
            let dst = (y as usize + row) * self.width as usize + x;
            self.data[dst..dst + w].copy_from_slice(&pixels[row * w..(row + 1) * w]);
        }
    }
}

/// Packing cursor on the current shelf.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
struct Shelf {
    x: u32,
    y: u32,
    height: u32,
}

/// Owns the alphabet, the atlas image and the rasterizer that feeds it.
pub struct AtlasManager<R> {
    rasterizer: R,
    params: SdfParams,
    alphabet: Vec<char>,
    atlas: AtlasData,
    shelf: Shelf,
    dirty: bool,
    generation: u64,
}

impl<R: GlyphRasterizer> AtlasManager<R> {
    /// Create the atlas and pack [`REPLACEMENT_CHARACTER`] followed by
    /// `config.initial_chars`.
    ///
    /// Fails with [`TextError::AtlasExhausted`] when the seed alphabet does not fit.
    pub fn new(rasterizer: R, config: AtlasConfig) -> Result<Self> {
        let mut manager = Self {
            rasterizer,
            params: config.sdf,
            alphabet: Vec::new(),
            atlas: AtlasData::new(config.width, config.height),
            shelf: Shelf::default(),
            dirty: true,
            generation: 0,
        };

        manager.add_char(REPLACEMENT_CHARACTER)?;
        for ch in config.initial_chars.chars() {
            if ch != '\n' && !manager.contains(ch) {
                manager.add_char(ch)?;
            }
        }
        manager.generation = 1;

        log::info!(
            "Glyph atlas {}x{} ready: {} glyphs, line height {}px, {} rows used",
            config.width,
            config.height,
            manager.alphabet.len(),
            manager.atlas.line_height,
            manager.shelf.y + manager.shelf.height,
        );
        if manager.free_rows() < manager.atlas.line_height as u32 {
            log::warn!(
                "Glyph atlas has {} free rows, less than one line ({}px): new characters may not fit",
                manager.free_rows(),
                manager.atlas.line_height
            );
        }

        Ok(manager)
    }

    /// Rasterize and pack every character of `text` not yet in the alphabet.
    ///
    /// Returns `true` when new glyphs were added and the atlas must be re-uploaded. `'\n'` is
    /// never rasterized.
    ///
    /// On [`TextError::AtlasExhausted`] the failing glyph leaves no trace; glyphs packed earlier
    /// in the same call are kept and flagged for upload.
    pub fn ensure(&mut self, text: &str) -> Result<bool> {
        let mut added = 0usize;

        for ch in text.chars() {
            if ch == '\n' || self.contains(ch) {
                continue;
            }
            if let Err(err) = self.add_char(ch) {
                if added > 0 {
                    self.touch();
                }
                return Err(err);
            }
            added += 1;
        }

        if added > 0 {
            self.touch();
            log::debug!(
                "Glyph atlas grew by {} glyphs to {} (generation {})",
                added,
                self.alphabet.len(),
                self.generation
            );
        }

        Ok(added > 0)
    }

    fn add_char(&mut self, ch: char) -> Result<()> {
        if self.atlas.char_info.contains_key(&ch) {
            return Err(TextError::DuplicateCharacter(ch));
        }

        let glyph = self.rasterizer.rasterize(ch, &self.params);

        let expected = glyph.width as usize * glyph.height as usize;
        if glyph.data.len() != expected {
            return Err(TextError::MalformedGlyph {
                ch,
                expected,
                actual: glyph.data.len(),
            });
        }

        let Some((x, y, shelf)) = self.place(glyph.width, glyph.height) else {
            log::warn!(
                "Glyph atlas exhausted at {:?} ({}x{}), {} glyphs packed",
                ch,
                glyph.width,
                glyph.height,
                self.alphabet.len()
            );
            return Err(TextError::AtlasExhausted {
                ch,
                glyph_width: glyph.width,
                glyph_height: glyph.height,
                atlas_width: self.atlas.width,
                atlas_height: self.atlas.height,
            });
        };

        self.atlas.blit(x, y, glyph.width, glyph.height, &glyph.data);
        self.atlas.char_info.insert(
            ch,
            CharInfo {
                atlas_x: x,
                atlas_y: y,
                width: glyph.width,
                height: glyph.height,
                y_offset: glyph.glyph_top,
                x_advance: glyph.glyph_advance,
            },
        );
        self.atlas.max_ascent = self.atlas.max_ascent.max(glyph.glyph_top);
        self.atlas.line_height = self.atlas.line_height.max(glyph.height as f32);
        self.alphabet.push(ch);
        self.shelf = shelf;

        Ok(())
    }

    /// Compute where a `width x height` bitmap would go without committing anything.
    ///
    /// Returns the top-left corner and the cursor after placement.
    fn place(&self, width: u32, height: u32) -> Option<(u32, u32, Shelf)> {
        if width > self.atlas.width {
            return None;
        }

        let mut shelf = self.shelf;
        if shelf.x + width > self.atlas.width {
            shelf = Shelf {
                x: 0,
                y: shelf.y + shelf.height,
                height: 0,
            };
        }
        if shelf.y + height > self.atlas.height {
            return None;
        }

        let (x, y) = (shelf.x, shelf.y);
        shelf.x += width;
        shelf.height = shelf.height.max(height);

        Some((x, y, shelf))
    }

    /// Atlas rows below the current shelf, free for new shelves.
    pub fn free_rows(&self) -> u32 {
        self.atlas
            .height
            .saturating_sub(self.shelf.y + self.shelf.height)
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.generation += 1;
    }

    /// Lay out `text` against the current atlas metrics.
    pub fn layout(&self, text: &str) -> LayoutInfo {
        layout(text, &self.atlas)
    }
}

impl<R> AtlasManager<R> {
    #[inline]
    pub fn atlas(&self) -> &AtlasData {
        &self.atlas
    }

    /// Packed characters in packing order; the first one is always [`REPLACEMENT_CHARACTER`].
    #[inline]
    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    #[inline]
    pub fn contains(&self, ch: char) -> bool {
        self.atlas.char_info.contains_key(&ch)
    }

    #[inline]
    pub fn params(&self) -> &SdfParams {
        &self.params
    }

    /// Whether the pixel buffer changed since the last [`mark_uploaded`](Self::mark_uploaded).
    #[inline]
    pub fn needs_upload(&self) -> bool {
        self.dirty
    }

    pub fn mark_uploaded(&mut self) {
        self.dirty = false;
    }

    /// Incremented every time glyphs are added.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// Glyphs already packed are not re-rasterized when the rasterizer changes.
    pub fn rasterizer_mut(&mut self) -> &mut R {
        &mut self.rasterizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FixedRasterizer;

    fn manager(
        width: u32,
        height: u32,
        seed: &str,
        rasterizer: FixedRasterizer,
    ) -> Result<AtlasManager<FixedRasterizer>> {
        AtlasManager::new(
            rasterizer,
            AtlasConfig::new(width, height).with_initial_chars(seed),
        )
    }

    #[test]
    fn test_replacement_character_is_packed_first() {
        let atlas = manager(64, 64, "ab", FixedRasterizer::new(10, 20, 10.0)).unwrap();

        assert_eq!(atlas.alphabet(), &[REPLACEMENT_CHARACTER, 'a', 'b']);
        let info = atlas.atlas().get(REPLACEMENT_CHARACTER).unwrap();
        assert_eq!((info.atlas_x, info.atlas_y), (0, 0));
        assert!(atlas.needs_upload());
    }

    #[test]
    fn test_seeded_text_needs_no_upload() {
        let mut atlas = manager(256, 256, "Helo wrd", FixedRasterizer::new(10, 20, 10.0)).unwrap();
        atlas.mark_uploaded();
        let before = atlas.atlas().data.clone();
        let calls = atlas.rasterizer().calls.len();

        assert!(!atlas.ensure("Hello world").unwrap());
        assert!(!atlas.needs_upload());
        assert_eq!(atlas.atlas().data, before);
        assert_eq!(atlas.rasterizer().calls.len(), calls);
    }

    #[test]
    fn test_new_characters_are_added_once() {
        let mut atlas = manager(256, 256, "", FixedRasterizer::new(10, 20, 10.0)).unwrap();
        atlas.mark_uploaded();
        let generation = atlas.generation();

        assert!(atlas.ensure("xyx").unwrap());
        assert!(atlas.contains('x'));
        assert!(atlas.contains('y'));
        assert_eq!(atlas.alphabet().len(), 3);
        assert!(atlas.needs_upload());
        assert_eq!(atlas.generation(), generation + 1);

        atlas.mark_uploaded();
        assert!(!atlas.ensure("yx").unwrap());
        assert!(!atlas.needs_upload());
        assert_eq!(
            atlas.rasterizer().calls,
            vec![REPLACEMENT_CHARACTER, 'x', 'y']
        );
    }

    #[test]
    fn test_newline_is_never_rasterized() {
        let mut atlas = manager(256, 256, "a\n", FixedRasterizer::new(10, 20, 10.0)).unwrap();

        assert!(!atlas.ensure("a\na").unwrap());
        assert!(!atlas.contains('\n'));
    }

    #[test]
    fn test_glyph_pixels_are_blitted() {
        let atlas = manager(64, 64, "a", FixedRasterizer::new(4, 3, 4.0)).unwrap();
        let data = atlas.atlas();
        let info = data.get('a').unwrap();

        assert_eq!((info.atlas_x, info.atlas_y), (4, 0));
        for y in 0..3 {
            for x in 4..8 {
                assert_eq!(data.data[y * 64 + x], FixedRasterizer::fill('a'));
            }
        }
        assert_eq!(data.data[3 * 64 + 4], 0);
        assert_eq!(data.data[8], 0);
    }

    #[test]
    fn test_shelf_wraps_to_next_row() {
        let atlas = manager(30, 100, "abcd", FixedRasterizer::new(10, 20, 10.0)).unwrap();
        let data = atlas.atlas();

        let pos = |ch| {
            let info = data.get(ch).unwrap();
            (info.atlas_x, info.atlas_y)
        };
        assert_eq!(pos('a'), (10, 0));
        assert_eq!(pos('b'), (20, 0));
        assert_eq!(pos('c'), (0, 20));
        assert_eq!(pos('d'), (10, 20));
    }

    #[test]
    fn test_metrics_track_largest_glyph() {
        let rasterizer = FixedRasterizer::new(10, 20, 10.0)
            .with_top(REPLACEMENT_CHARACTER, 5.0)
            .with_top('a', 12.0)
            .with_top('b', 17.0)
            .with_height('b', 24);
        let atlas = manager(256, 256, "ab", rasterizer).unwrap();

        assert_eq!(atlas.atlas().max_ascent, 17.0);
        assert_eq!(atlas.atlas().line_height, 24.0);
    }

    #[test]
    fn test_packing_a_character_twice_is_rejected() {
        let mut atlas = manager(256, 256, "a", FixedRasterizer::new(10, 20, 10.0)).unwrap();
        let calls = atlas.rasterizer().calls.len();
        let alphabet = atlas.alphabet().to_vec();

        assert_eq!(
            atlas.add_char('a').unwrap_err(),
            TextError::DuplicateCharacter('a')
        );
        assert_eq!(atlas.rasterizer().calls.len(), calls);
        assert_eq!(atlas.alphabet(), alphabet.as_slice());
    }

    #[test]
    fn test_exhaustion_leaves_atlas_untouched() {
        // Two rows of three 10x20 glyphs fill a 30x40 atlas.
        let mut atlas = manager(30, 40, "", FixedRasterizer::new(10, 20, 10.0)).unwrap();
        assert!(atlas.ensure("abcde").unwrap());
        atlas.mark_uploaded();

        let data = atlas.atlas().data.clone();
        let alphabet = atlas.alphabet().to_vec();
        let generation = atlas.generation();

        let err = atlas.ensure("f").unwrap_err();
        assert_eq!(
            err,
            TextError::AtlasExhausted {
                ch: 'f',
                glyph_width: 10,
                glyph_height: 20,
                atlas_width: 30,
                atlas_height: 40,
            }
        );
        assert_eq!(atlas.atlas().data, data);
        assert_eq!(atlas.alphabet(), alphabet.as_slice());
        assert!(!atlas.contains('f'));
        assert!(!atlas.needs_upload());
        assert_eq!(atlas.generation(), generation);
        assert_eq!((atlas.atlas().width, atlas.atlas().height), (30, 40));
    }

    #[test]
    fn test_partial_batch_keeps_earlier_glyphs() {
        let mut atlas = manager(30, 40, "", FixedRasterizer::new(10, 20, 10.0)).unwrap();
        atlas.mark_uploaded();

        assert!(atlas.ensure("abcdefg").is_err());
        assert!(atlas.contains('e'));
        assert!(!atlas.contains('f'));
        assert!(atlas.needs_upload());
    }

    #[test]
    fn test_glyph_wider_than_atlas_fails() {
        let result = manager(8, 64, "", FixedRasterizer::new(10, 4, 10.0));
        assert!(matches!(
            result,
            Err(TextError::AtlasExhausted {
                ch: REPLACEMENT_CHARACTER,
                ..
            })
        ));
    }

    #[test]
    fn test_seed_that_does_not_fit_fails_construction() {
        let result = manager(20, 20, "abc", FixedRasterizer::new(10, 20, 10.0));
        assert!(matches!(
            result,
            Err(TextError::AtlasExhausted { ch: 'b', .. })
        ));
    }

    #[test]
    fn test_malformed_glyph_is_rejected() {
        let mut rasterizer = FixedRasterizer::new(10, 20, 10.0);
        rasterizer.truncate = Some('z');
        let mut atlas = manager(256, 256, "", rasterizer).unwrap();

        assert_eq!(
            atlas.ensure("z").unwrap_err(),
            TextError::MalformedGlyph {
                ch: 'z',
                expected: 200,
                actual: 199,
            }
        );
        assert!(!atlas.contains('z'));
    }

    #[test]
    fn test_alphabet_never_shrinks() {
        let mut atlas = manager(64, 64, "", FixedRasterizer::new(10, 20, 10.0)).unwrap();
        let mut last = atlas.alphabet().len();

        for text in ["ab", "", "ba", "cdefghijklmnop", "q"] {
            let _ = atlas.ensure(text);
            assert!(atlas.alphabet().len() >= last);
            assert_eq!((atlas.atlas().width, atlas.atlas().height), (64, 64));
            last = atlas.alphabet().len();
        }
    }
}
