//! # sdf-text-wgpu
//!
//! WGPU rendering backend for [`sdf_text`] labels.
//!
//! The renderer mirrors a [`LabelPool`]: it keeps one `R8Unorm` texture for the shared atlas,
//! one instance buffer plus uniform per label, and issues one instanced draw of the unit quad
//! per label.
//!
//! ```ignore
//! renderer.prepare(&device, &queue, &mut pool, camera.view_proj());
//! // ... inside a render pass
//! renderer.render(&mut render_pass);
//! ```

mod instance;
mod uniforms;
mod vertex;

pub use instance::label_instance_desc;
pub use uniforms::{Globals, LabelUniform};
pub use vertex::{QuadVertex, QUAD_INDICES, QUAD_VERTICES};

use glam::Mat4;
use sdf_text::{Label, LabelId, LabelInstance, LabelPool};
use slotmap::SecondaryMap;

/// Instance capacity of a label's GPU buffer before its text is known.
const INITIAL_INSTANCE_CAPACITY: usize = 16;

/// GPU side of one label.
struct GpuLabel {
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    instance_count: u32,
    /// [`sdf_text::InstanceBuffer::version`] last uploaded.
    version: Option<u64>,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Atlas texture and the bind group that samples it.
struct GpuAtlas {
    texture: wgpu::Texture,
    size: [u32; 2],
    bind_group: wgpu::BindGroup,
}

/// WGPU renderer for the labels of one [`LabelPool`].
pub struct LabelRenderer {
    pipeline: wgpu::RenderPipeline,
    quad_vertex_buffer: wgpu::Buffer,
    quad_index_buffer: wgpu::Buffer,
    globals_buffer: wgpu::Buffer,
    globals_bind_group_layout: wgpu::BindGroupLayout,
    label_bind_group_layout: wgpu::BindGroupLayout,
    atlas_sampler: wgpu::Sampler,
    atlas: Option<GpuAtlas>,
    labels: SecondaryMap<LabelId, GpuLabel>,
}

impl LabelRenderer {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("SDF Label Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/label.wgsl").into()),
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SDF Label Globals Buffer"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Globals + atlas
        let globals_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("SDF Label Globals Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let label_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("SDF Label Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        // Distance fields interpolate well, so sample linearly.
        let atlas_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("SDF Label Atlas Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("SDF Label Pipeline Layout"),
            bind_group_layouts: &[&globals_bind_group_layout, &label_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("SDF Label Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[QuadVertex::desc(), label_instance_desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Labels are visible from behind.
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let quad_vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SDF Label Quad Vertex Buffer"),
            size: std::mem::size_of_val(QUAD_VERTICES) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: true,
        });
        quad_vertex_buffer
            .slice(..)
            .get_mapped_range_mut()
            .copy_from_slice(bytemuck::cast_slice(QUAD_VERTICES));
        quad_vertex_buffer.unmap();

        let quad_index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SDF Label Quad Index Buffer"),
            size: std::mem::size_of_val(QUAD_INDICES) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: true,
        });
        quad_index_buffer
            .slice(..)
            .get_mapped_range_mut()
            .copy_from_slice(bytemuck::cast_slice(QUAD_INDICES));
        quad_index_buffer.unmap();

        log::info!("SDF label renderer created for {:?}", surface_format);

        Self {
            pipeline,
            quad_vertex_buffer,
            quad_index_buffer,
            globals_buffer,
            globals_bind_group_layout,
            label_bind_group_layout,
            atlas_sampler,
            atlas: None,
            labels: SecondaryMap::new(),
        }
    }

    /// Upload everything that changed in `pool` since the last call.
    ///
    /// Uploads the atlas if it is dirty (and marks it uploaded), creates, grows or drops
    /// per-label buffers to match the pool, and refreshes all uniforms.
    pub fn prepare<R>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pool: &mut LabelPool<R>,
        view_proj: Mat4,
    ) {
        self.prepare_atlas(device, queue, pool);

        let globals = Globals::new(
            view_proj,
            pool.texture_size(),
            pool.line_scale(),
            pool.atlas_manager().params().edge_value(),
        );
        queue.write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        // Drop GPU resources of released labels.
        self.labels.retain(|id, _| pool.label(id).is_some());

        for (id, label) in pool.labels() {
            if !self.labels.contains_key(id) {
                let gpu = self.create_label(device, INITIAL_INSTANCE_CAPACITY);
                self.labels.insert(id, gpu);
            }

            let required = label.instances().capacity();
            if required > self.labels[id].instance_capacity {
                log::debug!("Growing label instance buffer to {}", required);
                let gpu = self.create_label(device, required);
                self.labels.insert(id, gpu);
            }

            Self::write_label(queue, &mut self.labels[id], label);
        }
    }

    fn prepare_atlas<R>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pool: &mut LabelPool<R>,
    ) {
        let atlas = pool.atlas();
        let size = [atlas.width, atlas.height];

        let recreated = self.atlas.as_ref().map_or(true, |gpu| gpu.size != size);
        if recreated {
            self.atlas = Some(self.create_atlas(device, size));
        }

        if !recreated && !pool.atlas_needs_upload() {
            return;
        }

        let Some(gpu) = &self.atlas else {
            return;
        };

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &gpu.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &atlas.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(atlas.width),
                rows_per_image: Some(atlas.height),
            },
            wgpu::Extent3d {
                width: atlas.width,
                height: atlas.height,
                depth_or_array_layers: 1,
            },
        );
        log::debug!(
            "Uploaded glyph atlas ({}x{}, generation {})",
            atlas.width,
            atlas.height,
            pool.atlas_manager().generation()
        );

        pool.mark_atlas_uploaded();
    }

    fn create_atlas(&self, device: &wgpu::Device, size: [u32; 2]) -> GpuAtlas {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("SDF Label Glyph Atlas"),
            size: wgpu::Extent3d {
                width: size[0],
                height: size[1],
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SDF Label Globals Bind Group"),
            layout: &self.globals_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.atlas_sampler),
                },
            ],
        });

        log::info!("Created glyph atlas texture {}x{}", size[0], size[1]);

        GpuAtlas {
            texture,
            size,
            bind_group,
        }
    }

    fn create_label(&self, device: &wgpu::Device, capacity: usize) -> GpuLabel {
        let capacity = capacity.max(1);
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SDF Label Instance Buffer"),
            size: (capacity * std::mem::size_of::<LabelInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SDF Label Uniform Buffer"),
            size: std::mem::size_of::<LabelUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SDF Label Bind Group"),
            layout: &self.label_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        GpuLabel {
            instance_buffer,
            instance_capacity: capacity,
            instance_count: 0,
            version: None,
            uniform_buffer,
            bind_group,
        }
    }

    fn write_label(queue: &wgpu::Queue, gpu: &mut GpuLabel, label: &Label) {
        let instances = label.instances();
        if gpu.version != Some(instances.version()) {
            if !instances.is_empty() {
                queue.write_buffer(&gpu.instance_buffer, 0, instances.as_bytes());
            }
            gpu.instance_count = instances.len() as u32;
            gpu.version = Some(instances.version());
        }

        let uniform = LabelUniform::new(label.transform, label.color, label.background);
        queue.write_buffer(&gpu.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Draw every prepared label into `render_pass`.
    pub fn render(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        let Some(atlas) = &self.atlas else {
            return;
        };

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &atlas.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        for gpu in self.labels.values() {
            if gpu.instance_count == 0 {
                continue;
            }
            render_pass.set_bind_group(1, &gpu.bind_group, &[]);
            render_pass.set_vertex_buffer(1, gpu.instance_buffer.slice(..));
            render_pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..gpu.instance_count);
        }
    }

    /// Number of labels with GPU resources.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }
}
