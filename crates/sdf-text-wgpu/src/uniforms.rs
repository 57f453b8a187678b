use glam::Mat4;

/// Per-frame values shared by every label (bind group 0, binding 0).
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Globals {
    pub view_proj: [[f32; 4]; 4],
    /// Atlas size in pixels.
    pub texture_size: [f32; 2],
    /// Layout pixels to label units.
    pub line_scale: f32,
    /// Normalized distance value of the glyph edge.
    pub edge: f32,
}

impl Globals {
    pub fn new(view_proj: Mat4, texture_size: [f32; 2], line_scale: f32, edge: f32) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            texture_size,
            line_scale,
            edge,
        }
    }
}

/// Per-label values (bind group 1, binding 0).
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LabelUniform {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub background: [f32; 4],
}

impl LabelUniform {
    pub fn new(model: Mat4, color: [f32; 4], background: [f32; 4]) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            color,
            background,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<Globals>(), 80);
        assert_eq!(std::mem::size_of::<LabelUniform>(), 96);
    }

    #[test]
    fn test_matrices_are_column_major() {
        let model = Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0));
        let uniform = LabelUniform::new(model, [1.0; 4], [0.0; 4]);
        assert_eq!(uniform.model[3], [1.0, 2.0, 3.0, 1.0]);
    }
}
