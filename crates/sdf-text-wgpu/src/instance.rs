use sdf_text::LabelInstance;

const VEC2: wgpu::BufferAddress = std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress;

/// Vertex buffer layout of [`LabelInstance`] (shader locations 1 to 5).
pub const fn label_instance_desc() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: &[wgpu::VertexAttribute] = &[
        // box_position
        wgpu::VertexAttribute {
            offset: 0,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x2,
        },
        // char_position
        wgpu::VertexAttribute {
            offset: VEC2,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x2,
        },
        // uv_position
        wgpu::VertexAttribute {
            offset: VEC2 * 2,
            shader_location: 3,
            format: wgpu::VertexFormat::Float32x2,
        },
        // box_size
        wgpu::VertexAttribute {
            offset: VEC2 * 3,
            shader_location: 4,
            format: wgpu::VertexFormat::Float32x2,
        },
        // char_size
        wgpu::VertexAttribute {
            offset: VEC2 * 4,
            shader_location: 5,
            format: wgpu::VertexFormat::Float32x2,
        },
    ];

    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<LabelInstance>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: ATTRIBUTES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset_of(field: fn(&LabelInstance) -> &[f32; 2]) -> wgpu::BufferAddress {
        let instance = LabelInstance::default();
        let base = &instance as *const LabelInstance as usize;
        (field(&instance).as_ptr() as usize - base) as wgpu::BufferAddress
    }

    #[test]
    fn test_stride_matches_struct() {
        assert_eq!(label_instance_desc().array_stride, 40);
        assert_eq!(label_instance_desc().step_mode, wgpu::VertexStepMode::Instance);
    }

    #[test]
    fn test_attribute_offsets_match_fields() {
        let attributes = label_instance_desc().attributes;
        let fields: [fn(&LabelInstance) -> &[f32; 2]; 5] = [
            |i| &i.box_position,
            |i| &i.char_position,
            |i| &i.uv_position,
            |i| &i.box_size,
            |i| &i.char_size,
        ];

        assert_eq!(attributes.len(), fields.len());
        for (location, (attribute, field)) in attributes.iter().zip(fields).enumerate() {
            assert_eq!(attribute.offset, offset_of(field));
            assert_eq!(attribute.shader_location, location as u32 + 1);
        }
    }
}
