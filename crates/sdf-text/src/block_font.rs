//! Tiny built-in procedural font.
//!
//! Glyphs are drawn from a fixed set of strokes (a seven-segment display plus a centre bar, a
//! dot and an outline box), so the font needs no font files and its metrics are exact. It is
//! readable at demo sizes and is what tests and the `--block-font` demo mode run on.
//!
//! Unknown characters render as an outline box.

use crate::{distance_field, GlyphRasterizer, SdfGlyph, SdfParams};

const TOP: u16 = 1 << 0;
const MID: u16 = 1 << 1;
const BOTTOM: u16 = 1 << 2;
const LEFT_UPPER: u16 = 1 << 3;
const LEFT_LOWER: u16 = 1 << 4;
const RIGHT_UPPER: u16 = 1 << 5;
const RIGHT_LOWER: u16 = 1 << 6;
const CENTER: u16 = 1 << 7;
const DOT: u16 = 1 << 8;
const CENTER_UPPER: u16 = 1 << 9;

const LEFT: u16 = LEFT_UPPER | LEFT_LOWER;
const RIGHT: u16 = RIGHT_UPPER | RIGHT_LOWER;
const BOX: u16 = TOP | BOTTOM | LEFT | RIGHT;

/// Monospace metrics, relative to the font size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockFontMetrics {
    /// Cell width as a fraction of the font size.
    pub advance: f32,
    /// Cell height as a fraction of the font size. The cell sits on the baseline.
    pub cap_height: f32,
}

impl Default for BlockFontMetrics {
    fn default() -> Self {
        Self {
            advance: 0.5,
            cap_height: 0.7,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct BlockFont {
    metrics: BlockFontMetrics,
}

impl BlockFont {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(metrics: BlockFontMetrics) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> BlockFontMetrics {
        self.metrics
    }

    /// Cell size in pixels (width, height) at `font_size`.
    pub fn cell_px(&self, font_size: f32) -> (u32, u32) {
        let height = (font_size * self.metrics.cap_height).round().max(1.0) as u32;
        let width = (font_size * self.metrics.advance).round().max(1.0) as u32;
        (width, height)
    }

    /// Coverage mask of the cell for `ch`, row-major, one byte per pixel.
    pub fn coverage(&self, ch: char, font_size: f32) -> Vec<u8> {
        let (w, h) = self.cell_px(font_size);
        let mut canvas = Canvas::new(w, h);
        canvas.draw(segments(ch));
        canvas.pixels
    }
}

impl GlyphRasterizer for BlockFont {
    fn rasterize(&mut self, ch: char, params: &SdfParams) -> SdfGlyph {
        let (w, h) = self.cell_px(params.font_size);
        let coverage = self.coverage(ch, params.font_size);

        SdfGlyph {
            data: distance_field(&coverage, w, h, params),
            width: w + 2 * params.buffer,
            height: h + 2 * params.buffer,
            glyph_top: (h + params.buffer) as f32,
            glyph_advance: w as f32,
        }
    }
}

fn segments(ch: char) -> u16 {
    match ch.to_ascii_uppercase() {
        ' ' => 0,
        '0' | 'O' | 'D' => BOX,
        '1' => RIGHT,
        '2' => TOP | RIGHT_UPPER | MID | LEFT_LOWER | BOTTOM,
        '3' => TOP | MID | BOTTOM | RIGHT,
        '4' => LEFT_UPPER | MID | RIGHT,
        '5' | 'S' => TOP | LEFT_UPPER | MID | RIGHT_LOWER | BOTTOM,
        '6' => TOP | LEFT | MID | RIGHT_LOWER | BOTTOM,
        '7' => TOP | RIGHT,
        '8' | 'B' => BOX | MID,
        '9' => TOP | LEFT_UPPER | MID | RIGHT | BOTTOM,
        'A' => TOP | LEFT | RIGHT | MID,
        'C' => TOP | LEFT | BOTTOM,
        'E' => TOP | LEFT | MID | BOTTOM,
        'F' => TOP | LEFT | MID,
        'G' => TOP | LEFT | BOTTOM | RIGHT_LOWER,
        'H' => LEFT | RIGHT | MID,
        'I' => TOP | CENTER | BOTTOM,
        'T' => TOP | CENTER,
        'J' => RIGHT | BOTTOM | LEFT_LOWER,
        'K' => LEFT | MID | RIGHT_LOWER | CENTER_UPPER,
        'L' => LEFT | BOTTOM,
        'M' => LEFT | RIGHT | TOP | CENTER_UPPER,
        'N' => LEFT | RIGHT | TOP,
        'P' => TOP | LEFT | MID | RIGHT_UPPER,
        'Q' => BOX | DOT,
        'R' => TOP | LEFT | MID | RIGHT_UPPER | RIGHT_LOWER,
        'U' | 'V' => LEFT | RIGHT | BOTTOM,
        'W' => LEFT | RIGHT | BOTTOM | CENTER,
        'X' => MID | CENTER,
        'Y' => LEFT_UPPER | RIGHT_UPPER | MID | CENTER,
        'Z' => TOP | RIGHT_UPPER | MID | LEFT_LOWER | BOTTOM,
        '-' => MID,
        '_' => BOTTOM,
        '=' => TOP | MID,
        '+' => MID | CENTER,
        '|' => CENTER,
        '.' | ',' => DOT,
        ':' | ';' => DOT | CENTER_UPPER,
        '!' => CENTER_UPPER | DOT,
        '?' => TOP | RIGHT_UPPER | MID | DOT,
        '(' | '[' | '{' | '<' => TOP | LEFT | BOTTOM,
        ')' | ']' | '}' | '>' => TOP | RIGHT | BOTTOM,
        '\'' | '"' | '`' => CENTER_UPPER,
        _ => BOX,
    }
}

struct Canvas {
    w: u32,
    h: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    fn new(w: u32, h: u32) -> Self {
        Self {
            w,
            h,
            pixels: vec![0; (w * h) as usize],
        }
    }

    fn fill(&mut self, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0.min(self.h)..y1.min(self.h) {
            let row = (y * self.w) as usize;
            for x in x0.min(self.w)..x1.min(self.w) {
                self.pixels[row + x as usize] = 255;
            }
        }
    }

    fn draw(&mut self, segments: u16) {
        if segments == 0 {
            return;
        }

        let (w, h) = (self.w, self.h);
        let t = (h / 10).max(1);
        let pad_x = (w / 8).max(1);
        let pad_y = (h / 10).max(1);

        let (x0, x1) = (pad_x, w.saturating_sub(pad_x).max(pad_x + t));
        let (y0, y1) = (pad_y, h.saturating_sub(pad_y).max(pad_y + t));
        let mid_y = (y0 + y1) / 2;
        let mid_x = (x0 + x1) / 2;
        let half_t = t / 2;

        if segments & TOP != 0 {
            self.fill(x0, y0, x1, y0 + t);
        }
        if segments & MID != 0 {
            self.fill(x0, mid_y - half_t, x1, mid_y - half_t + t);
        }
        if segments & BOTTOM != 0 {
            self.fill(x0, y1 - t, x1, y1);
        }
        if segments & LEFT_UPPER != 0 {
            self.fill(x0, y0, x0 + t, mid_y + half_t);
        }
        if segments & LEFT_LOWER != 0 {
            self.fill(x0, mid_y - half_t, x0 + t, y1);
        }
        if segments & RIGHT_UPPER != 0 {
            self.fill(x1 - t, y0, x1, mid_y + half_t);
        }
        if segments & RIGHT_LOWER != 0 {
            self.fill(x1 - t, mid_y - half_t, x1, y1);
        }
        if segments & CENTER != 0 {
            self.fill(mid_x - half_t, y0, mid_x - half_t + t, y1);
        }
        if segments & CENTER_UPPER != 0 {
            self.fill(mid_x - half_t, y0, mid_x - half_t + t, mid_y);
        }
        if segments & DOT != 0 {
            self.fill(mid_x - half_t, y1 - t, mid_x - half_t + t, y1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SdfParams {
        SdfParams {
            font_size: 20.0,
            buffer: 2,
            radius: 4.0,
            cutoff: 0.25,
        }
    }

    #[test]
    fn test_glyph_dimensions_include_buffer() {
        let mut font = BlockFont::new();
        let glyph = font.rasterize('A', &params());

        assert_eq!(glyph.width, 10 + 4);
        assert_eq!(glyph.height, 14 + 4);
        assert_eq!(glyph.data.len(), (glyph.width * glyph.height) as usize);
        assert_eq!(glyph.glyph_advance, 10.0);
        // Cell bottom on the baseline.
        assert_eq!(glyph.glyph_top, 16.0);
    }

    #[test]
    fn test_space_is_blank_but_advances() {
        let mut font = BlockFont::new();
        let glyph = font.rasterize(' ', &params());

        assert!(glyph.data.iter().all(|&v| v == 0));
        assert_eq!(glyph.glyph_advance, 10.0);
    }

    #[test]
    fn test_case_insensitive_shapes() {
        let font = BlockFont::new();
        assert_eq!(font.coverage('e', 20.0), font.coverage('E', 20.0));
        assert_ne!(font.coverage('E', 20.0), font.coverage('F', 20.0));
    }

    #[test]
    fn test_unknown_glyph_draws_box() {
        let font = BlockFont::new();
        assert_eq!(font.coverage('\u{FFFD}', 20.0), font.coverage('0', 20.0));
    }

    #[test]
    fn test_tiny_font_size_does_not_panic() {
        let mut font = BlockFont::new();
        let glyph = font.rasterize(
            '8',
            &SdfParams {
                font_size: 1.0,
                buffer: 0,
                ..params()
            },
        );
        assert_eq!((glyph.width, glyph.height), (1, 1));
    }
}
