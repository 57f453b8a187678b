//! Multi-line, baseline-aware placement of characters against atlas metrics.
//!
//! Coordinates are in atlas pixels with a top-left origin and y growing down. There is no
//! wrapping, alignment or kerning: `'\n'` starts a new line, everything else advances the pen.

use crate::{AtlasData, REPLACEMENT_CHARACTER};

/// Box of one character in layout space.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CharLayoutInfo {
    pub left: f32,
    /// Top of the glyph bitmap, baseline-aligned with the rest of the line.
    pub top: f32,
    /// Top of the line box the character sits in.
    pub box_top: f32,
    pub box_height: f32,
    /// Bitmap width.
    pub width: f32,
    /// Bitmap height.
    pub height: f32,
    pub atlas_x: f32,
    pub atlas_y: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutInfo {
    pub width: f32,
    pub height: f32,
    /// One entry per laid out character, in text order. Newlines have none.
    pub chars: Vec<CharLayoutInfo>,
    /// Characters missing from the atlas, drawn as the replacement glyph or skipped.
    pub replaced: usize,
}

/// Lay out `text` using the metrics in `atlas`.
pub fn layout(text: &str, atlas: &AtlasData) -> LayoutInfo {
    let line_height = atlas.line_height;
    let replacement = atlas.get(REPLACEMENT_CHARACTER);

    let mut out = LayoutInfo::default();
    let mut x = 0.0f32;
    let mut line_top = 0.0f32;

    for ch in text.chars() {
        if ch == '\n' {
            x = 0.0;
            line_top += line_height;
            continue;
        }

        let info = match atlas.get(ch) {
            Some(info) => info,
            None => {
                out.replaced += 1;
                log::debug!("No glyph for {:?}, using replacement", ch);
                match replacement {
                    Some(info) => info,
                    None => continue,
                }
            }
        };

        out.chars.push(CharLayoutInfo {
            left: x,
            top: line_top - info.y_offset + atlas.max_ascent,
            box_top: line_top,
            box_height: line_height,
            width: info.width as f32,
            height: info.height as f32,
            atlas_x: info.atlas_x as f32,
            atlas_y: info.atlas_y as f32,
        });

        x += info.x_advance;
        out.width = out.width.max(x);
        out.height = out.height.max(line_top + line_height);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CharInfo;

    fn char_info(atlas_x: u32, y_offset: f32) -> CharInfo {
        CharInfo {
            atlas_x,
            atlas_y: 0,
            width: 10,
            height: 20,
            y_offset,
            x_advance: 10.0,
        }
    }

    fn atlas(chars: &[(char, f32)]) -> AtlasData {
        let mut atlas = AtlasData::new(128, 128);
        for (i, &(ch, y_offset)) in chars.iter().enumerate() {
            atlas.char_info.insert(ch, char_info(i as u32 * 10, y_offset));
            atlas.max_ascent = atlas.max_ascent.max(y_offset);
        }
        atlas.line_height = 20.0;
        atlas
    }

    #[test]
    fn test_multi_line_boxes() {
        let atlas = atlas(&[(REPLACEMENT_CHARACTER, 15.0), ('A', 15.0), ('B', 15.0)]);
        let info = layout("A\nBB", &atlas);

        assert_eq!(info.chars.len(), 3);
        assert_eq!(info.width, 20.0);
        assert_eq!(info.height, 40.0);
        assert_eq!(info.replaced, 0);

        let (a, b0, b1) = (info.chars[0], info.chars[1], info.chars[2]);
        assert_eq!((a.left, a.box_top), (0.0, 0.0));
        assert_eq!((b0.left, b0.box_top), (0.0, 20.0));
        assert_eq!((b1.left, b1.box_top), (10.0, 20.0));
        assert_eq!(b0.atlas_x, 20.0);
        assert!(info.chars.iter().all(|c| c.box_height == 20.0));
    }

    #[test]
    fn test_baseline_alignment() {
        let atlas = atlas(&[(REPLACEMENT_CHARACTER, 15.0), ('x', 10.0), ('T', 15.0)]);
        let info = layout("xT", &atlas);
        let (x, t) = (info.chars[0], info.chars[1]);

        assert_ne!(x.top, t.top);
        assert_eq!(x.top, 5.0);
        assert_eq!(t.top, 0.0);
        assert_eq!(x.box_top, t.box_top);
        assert_eq!(x.box_height, t.box_height);
    }

    #[test]
    fn test_missing_character_uses_replacement() {
        let atlas = atlas(&[(REPLACEMENT_CHARACTER, 15.0), ('a', 15.0)]);
        let info = layout("aé", &atlas);

        assert_eq!(info.replaced, 1);
        assert_eq!(info.chars.len(), 2);
        assert_eq!(info.chars[1].atlas_x, 0.0);
        assert_eq!(info.width, 20.0);
    }

    #[test]
    fn test_missing_replacement_skips_character() {
        let atlas = atlas(&[('a', 15.0)]);
        let info = layout("a?a", &atlas);

        assert_eq!(info.replaced, 1);
        assert_eq!(info.chars.len(), 2);
        assert_eq!(info.chars[1].left, 10.0);
    }

    #[test]
    fn test_layout_is_deterministic() {
        let atlas = atlas(&[(REPLACEMENT_CHARACTER, 15.0), ('a', 12.0), ('b', 15.0)]);
        assert_eq!(layout("ab\nba", &atlas), layout("ab\nba", &atlas));
    }

    #[test]
    fn test_empty_lines_do_not_add_height() {
        let atlas = atlas(&[(REPLACEMENT_CHARACTER, 15.0), ('a', 15.0)]);

        assert_eq!(layout("", &atlas), LayoutInfo::default());
        assert_eq!(layout("a\n", &atlas).height, 20.0);
        // A blank line between two lines still offsets the second one.
        let info = layout("a\n\na", &atlas);
        assert_eq!(info.chars[1].box_top, 40.0);
        assert_eq!(info.height, 60.0);
    }
}
