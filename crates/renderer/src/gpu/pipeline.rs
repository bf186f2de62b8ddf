use anyhow::{Context, Result};
use lens::PlaneVertex;
use wgpu::naga::ShaderStage;

use crate::compile::{
    compile_shader, lens_defines, LENS_FRAGMENT_GLSL, LENS_VERTEX_GLSL, PRESENT_FRAGMENT_GLSL,
    PRESENT_VERTEX_GLSL,
};

use super::texture::{SampledTexture, TARGET_FORMAT};

const PLANE_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

/// The two render pipelines plus the layouts their bind groups are built from.
///
/// * lens: camera texture ─▶ offscreen target (what captures read back)
/// * present: offscreen target + flash + preview modal ─▶ swapchain
pub(crate) struct Pipelines {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub camera_layout: wgpu::BindGroupLayout,
    pub present_layout: wgpu::BindGroupLayout,
    pub lens: wgpu::RenderPipeline,
    pub present: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Result<Self> {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform layout"),
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
        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera layout"),
            entries: &texture_layout_entries(1),
        });
        let present_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("present layout"),
            entries: &texture_layout_entries(2),
        });

        let lens_vertex = compile_shader(
            device,
            "lens vertex",
            LENS_VERTEX_GLSL,
            ShaderStage::Vertex,
            &[],
        )?;
        let lens_fragment = compile_shader(
            device,
            "lens fragment",
            LENS_FRAGMENT_GLSL,
            ShaderStage::Fragment,
            &lens_defines(),
        )
        .context("failed to compile lens shader")?;
        let present_vertex = compile_shader(
            device,
            "present vertex",
            PRESENT_VERTEX_GLSL,
            ShaderStage::Vertex,
            &[],
        )?;
        let present_fragment = compile_shader(
            device,
            "present fragment",
            PRESENT_FRAGMENT_GLSL,
            ShaderStage::Fragment,
            &[],
        )
        .context("failed to compile present shader")?;

        let lens = build_pipeline(
            device,
            "lens pipeline",
            &[&uniform_layout, &camera_layout],
            &lens_vertex,
            &lens_fragment,
            &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<PlaneVertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &PLANE_ATTRIBUTES,
            }],
            TARGET_FORMAT,
        );
        let present = build_pipeline(
            device,
            "present pipeline",
            &[&uniform_layout, &present_layout],
            &present_vertex,
            &present_fragment,
            &[],
            surface_format,
        );

        Ok(Self {
            uniform_layout,
            camera_layout,
            present_layout,
            lens,
            present,
        })
    }

    pub fn uniform_bind_group(&self, device: &wgpu::Device, buffer: &wgpu::Buffer) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform bind group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    pub fn camera_bind_group(&self, device: &wgpu::Device, camera: &SampledTexture) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera bind group"),
            layout: &self.camera_layout,
            entries: &texture_entries(&[camera]),
        })
    }

    pub fn present_bind_group(
        &self,
        device: &wgpu::Device,
        scene: &SampledTexture,
        preview: &SampledTexture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("present bind group"),
            layout: &self.present_layout,
            entries: &texture_entries(&[scene, preview]),
        })
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    label: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    vertex_module: &wgpu::ShaderModule,
    fragment_module: &wgpu::ShaderModule,
    buffers: &[wgpu::VertexBufferLayout<'_>],
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: vertex_module,
            entry_point: Some("main"),
            buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

/// Texture/sampler pairs at bindings `2n` and `2n + 1`.
fn texture_layout_entries(count: u32) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = Vec::with_capacity(count as usize * 2);
    for index in 0..count {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: index * 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: index * 2 + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    entries
}

fn texture_entries<'a>(textures: &[&'a SampledTexture]) -> Vec<wgpu::BindGroupEntry<'a>> {
    let mut entries = Vec::with_capacity(textures.len() * 2);
    for (index, texture) in textures.iter().enumerate() {
        entries.push(wgpu::BindGroupEntry {
            binding: (index as u32) * 2,
            resource: wgpu::BindingResource::TextureView(&texture.view),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: (index as u32) * 2 + 1,
            resource: wgpu::BindingResource::Sampler(&texture.sampler),
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_attributes_match_vertex_layout() {
        assert_eq!(std::mem::size_of::<PlaneVertex>(), 16);
        assert_eq!(PLANE_ATTRIBUTES[0].offset, 0);
        assert_eq!(PLANE_ATTRIBUTES[1].offset, 8);
        assert_eq!(PLANE_ATTRIBUTES[1].shader_location, 1);
    }

    #[test]
    fn texture_layout_pairs_views_with_samplers() {
        let entries = texture_layout_entries(2);
        let bindings: Vec<u32> = entries.iter().map(|entry| entry.binding).collect();
        assert_eq!(bindings, vec![0, 1, 2, 3]);
        assert!(matches!(entries[1].ty, wgpu::BindingType::Sampler(_)));
        assert!(matches!(entries[2].ty, wgpu::BindingType::Texture { .. }));
    }
}
