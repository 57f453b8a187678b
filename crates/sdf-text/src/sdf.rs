//! Coverage mask to signed distance field conversion.
//!
//! Two squared-distance grids are built from the coverage mask: one holding the distance to
//! the glyph for outside texels, one holding the distance to the background for inside
//! texels. Both are resolved with a separable 1D Euclidean distance transform (lower
//! envelope of parabolas), first along columns, then along rows.

use crate::SdfParams;

const INF: f64 = 1e20;

/// Convert an 8-bit coverage mask of `width * height` texels into a distance field padded by
/// `params.buffer` on every side.
///
/// The result is `(width + 2 * buffer) * (height + 2 * buffer)` bytes, row-major. Texels on
/// the glyph edge map to `255 * (1 - cutoff)`, values grow towards the inside.
pub fn distance_field(coverage: &[u8], width: u32, height: u32, params: &SdfParams) -> Vec<u8> {
    let buffer = params.buffer as usize;
    let (glyph_w, glyph_h) = (width as usize, height as usize);
    let grid_w = glyph_w + 2 * buffer;
    let grid_h = glyph_h + 2 * buffer;
    let len = grid_w * grid_h;

    debug_assert!(coverage.len() >= glyph_w * glyph_h);

    let mut outer = vec![INF; len];
    let mut inner = vec![0.0; len];

    for y in 0..glyph_h {
        for x in 0..glyph_w {
            let a = coverage[y * glyph_w + x] as f64 / 255.0;
            if a == 0.0 {
                continue;
            }

            let j = (y + buffer) * grid_w + x + buffer;
            if a == 1.0 {
                outer[j] = 0.0;
                inner[j] = INF;
            } else {
                // Partial coverage: approximate the sub-texel edge offset.
                let d = 0.5 - a;
                outer[j] = if d > 0.0 { d * d } else { 0.0 };
                inner[j] = if d < 0.0 { d * d } else { 0.0 };
            }
        }
    }

    let mut scratch = Scratch::new(grid_w.max(grid_h));
    edt(&mut outer, 0, 0, grid_w, grid_h, grid_w, &mut scratch);
    edt(&mut inner, buffer, buffer, glyph_w, glyph_h, grid_w, &mut scratch);

    outer
        .iter()
        .zip(&inner)
        .map(|(o, i)| {
            let d = o.sqrt() - i.sqrt();
            let value = 255.0 - 255.0 * (d / params.radius as f64 + params.cutoff as f64);
            value.round().clamp(0.0, 255.0) as u8
        })
        .collect()
}

/// Reusable buffers for [`edt_1d`].
struct Scratch {
    f: Vec<f64>,
    v: Vec<usize>,
    z: Vec<f64>,
}

impl Scratch {
    fn new(size: usize) -> Self {
        Self {
            f: vec![0.0; size],
            v: vec![0; size],
            z: vec![0.0; size + 1],
        }
    }
}

/// 2D transform of the `width * height` region at (`x0`, `y0`) of a grid with row stride
/// `grid_w`.
fn edt(
    grid: &mut [f64],
    x0: usize,
    y0: usize,
    width: usize,
    height: usize,
    grid_w: usize,
    scratch: &mut Scratch,
) {
    if width == 0 || height == 0 {
        return;
    }
    for x in x0..x0 + width {
        edt_1d(grid, y0 * grid_w + x, grid_w, height, scratch);
    }
    for y in y0..y0 + height {
        edt_1d(grid, y * grid_w + x0, 1, width, scratch);
    }
}

fn edt_1d(grid: &mut [f64], offset: usize, stride: usize, length: usize, scratch: &mut Scratch) {
    let Scratch { f, v, z } = scratch;

    v[0] = 0;
    z[0] = -INF;
    z[1] = INF;
    f[0] = grid[offset];

    let mut k: usize = 0;
    for q in 1..length {
        f[q] = grid[offset + q * stride];
        let q2 = (q * q) as f64;
        let mut s;
        loop {
            let r = v[k];
            s = (f[q] - f[r] + q2 - (r * r) as f64) / (q - r) as f64 / 2.0;
            if s <= z[k] && k > 0 {
                k -= 1;
            } else {
                break;
            }
        }
        // `k` only stays 0 with `s <= z[0]` when z[0] is -INF, which cannot happen.
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = INF;
    }

    k = 0;
    for q in 0..length {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let r = v[k];
        let qr = q as f64 - r as f64;
        grid[offset + q * stride] = f[r] + qr * qr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(buffer: u32) -> SdfParams {
        SdfParams {
            font_size: 16.0,
            buffer,
            radius: 4.0,
            cutoff: 0.25,
        }
    }

    #[test]
    fn test_output_is_padded() {
        let coverage = vec![255u8; 3 * 5];
        let field = distance_field(&coverage, 3, 5, &params(2));
        assert_eq!(field.len(), (3 + 4) * (5 + 4));
    }

    #[test]
    fn test_empty_coverage_is_far_outside() {
        let coverage = vec![0u8; 4 * 4];
        let field = distance_field(&coverage, 4, 4, &params(2));
        assert!(field.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_zero_sized_glyph_yields_blank_padding() {
        let field = distance_field(&[], 0, 0, &params(3));
        assert_eq!(field.len(), 36);
        assert!(field.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_inside_is_brighter_than_edge_and_outside() {
        // 5x5 solid square padded by 3.
        let coverage = vec![255u8; 5 * 5];
        let p = params(3);
        let field = distance_field(&coverage, 5, 5, &p);
        let grid_w = 11;

        let center = field[5 * grid_w + 5];
        let corner = field[0];
        let just_outside = field[5 * grid_w + 2];

        assert!(center > just_outside);
        assert!(just_outside > corner);
        // Solid texels sit at or above the edge value.
        assert!(field[3 * grid_w + 3] as f32 >= 255.0 * p.edge_value() - 1.0);
    }

    #[test]
    fn test_field_is_symmetric_for_symmetric_input() {
        let coverage = vec![255u8; 2 * 2];
        let field = distance_field(&coverage, 2, 2, &params(2));
        let grid_w = 6;
        for y in 0..6 {
            for x in 0..6 {
                assert_eq!(field[y * grid_w + x], field[y * grid_w + (5 - x)]);
                assert_eq!(field[y * grid_w + x], field[(5 - y) * grid_w + x]);
            }
        }
    }
}
