use bytemuck::{Pod, Zeroable};

use crate::compile;
use crate::error::{PipelineError, PipelineResult};

use super::surface::RenderSurface;

pub(crate) const COMPOSITE_SHADER: &str = include_str!("shaders/composite.wgsl");

/// Uniform block for the composite shader. Layout mirrors the WGSL struct
/// byte for byte: 16 bytes, 16-aligned, time first.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectParams {
    pub time: f32,
    pub strength: f32,
    pub _padding: [f32; 2],
}

unsafe impl Zeroable for EffectParams {}
unsafe impl Pod for EffectParams {}

impl EffectParams {
    pub fn new(strength: f32) -> Self {
        Self {
            time: 0.0,
            strength,
            _padding: [0.0; 2],
        }
    }
}

struct EffectResources {
    pipeline: wgpu::RenderPipeline,
    params_buffer: wgpu::Buffer,
    params_group: wgpu::BindGroup,
    input_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    input_group: Option<wgpu::BindGroup>,
    input_generation: u64,
}

/// The full-screen post-process stage.
///
/// The CPU-side parameter snapshot lives here and outlasts the GPU objects:
/// a device loss releases the pipeline and buffer, but the accumulated time
/// carries over so the effect does not visibly rewind after a restore.
pub struct EffectPass {
    params: EffectParams,
    resources: Option<EffectResources>,
}

impl EffectPass {
    pub fn new(strength: f32) -> Self {
        Self {
            params: EffectParams::new(strength),
            resources: None,
        }
    }

    pub fn time(&self) -> f32 {
        self.params.time
    }

    /// Accumulate elapsed seconds into the time parameter. Called once per
    /// update step; never resets.
    pub fn advance(&mut self, elapsed_seconds: f32) {
        self.params.time += elapsed_seconds;
    }

    pub fn is_loaded(&self) -> bool {
        self.resources.is_some()
    }

    /// Compile `source` and build the composite pipeline targeting `format`.
    ///
    /// Runs at first bring-up and again after a device restore; the params
    /// snapshot is untouched either way.
    pub(crate) fn load(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        source: &str,
    ) -> PipelineResult<()> {
        let module = compile::build_shader_module(device, "composite shader", source)?;

        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("effect params layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let input_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("effect input layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("effect pipeline layout"),
            bind_group_layouts: &[&params_layout, &input_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("effect pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                buffers: &[],
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
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("effect params buffer"),
            size: std::mem::size_of::<EffectParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let params_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("effect params bind group"),
            layout: &params_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("effect input sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        self.resources = Some(EffectResources {
            pipeline,
            params_buffer,
            params_group,
            input_layout,
            sampler,
            input_group: None,
            input_generation: 0,
        });
        Ok(())
    }

    /// Drop every GPU object. The params snapshot survives for the rebuild.
    pub(crate) fn release(&mut self) {
        self.resources = None;
    }

    /// Mirror the CPU snapshot into the GPU buffer. Called once per frame,
    /// after updates have settled.
    pub(crate) fn update_params(&self, queue: &wgpu::Queue) -> PipelineResult<()> {
        let resources = self.require_resources()?;
        queue.write_buffer(
            &resources.params_buffer,
            0,
            bytemuck::bytes_of(&self.params),
        );
        Ok(())
    }

    /// Point the input binding at `source`'s shader view, rebuilding the bind
    /// group only when the surface reallocated since the last call.
    pub(crate) fn bind_input(
        &mut self,
        device: &wgpu::Device,
        source: &RenderSurface,
    ) -> PipelineResult<()> {
        let generation = source.generation();
        let view = source.shader_view()?;
        let resources = self
            .resources
            .as_mut()
            .ok_or(PipelineError::NotReady("effect pass"))?;
        if resources.input_group.is_some() && resources.input_generation == generation {
            return Ok(());
        }

        resources.input_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("effect input bind group"),
            layout: &resources.input_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&resources.sampler),
                },
            ],
        }));
        resources.input_generation = generation;
        Ok(())
    }

    /// Set the composite pipeline and bindings on `pass`. Issues no draw;
    /// the caller decides the geometry.
    pub(crate) fn apply(&self, pass: &mut wgpu::RenderPass<'_>) -> PipelineResult<()> {
        let resources = self.require_resources()?;
        let input = resources
            .input_group
            .as_ref()
            .ok_or(PipelineError::NotReady("effect input binding"))?;
        pass.set_pipeline(&resources.pipeline);
        pass.set_bind_group(0, &resources.params_group, &[]);
        pass.set_bind_group(1, input, &[]);
        Ok(())
    }

    fn require_resources(&self) -> PipelineResult<&EffectResources> {
        self.resources
            .as_ref()
            .ok_or(PipelineError::NotReady("effect pass"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_match_the_gpu_block_layout() {
        assert_eq!(std::mem::size_of::<EffectParams>(), 16);
        assert_eq!(std::mem::align_of::<EffectParams>(), 16);

        let mut params = EffectParams::new(0.25);
        params.time = 1.5;
        let bytes = bytemuck::bytes_of(&params);
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..4], &1.5f32.to_ne_bytes());
        assert_eq!(&bytes[4..8], &0.25f32.to_ne_bytes());
    }

    #[test]
    fn time_accumulates_the_sum_of_deltas() {
        let mut pass = EffectPass::new(1.0);
        let deltas = [0.016, 0.017, 0.016, 0.033];
        let mut previous = pass.time();
        for delta in deltas {
            pass.advance(delta);
            assert!(pass.time() > previous);
            previous = pass.time();
        }
        let expected: f32 = deltas.iter().sum();
        assert!((pass.time() - expected).abs() < 1e-6);
    }

    #[test]
    fn time_survives_a_release() {
        let mut pass = EffectPass::new(1.0);
        pass.advance(2.5);
        pass.release();
        assert!((pass.time() - 2.5).abs() < 1e-6);
        assert!(!pass.is_loaded());
    }

    #[test]
    fn gpu_entry_points_require_a_load() {
        let pass = EffectPass::new(1.0);
        assert!(matches!(
            pass.require_resources(),
            Err(PipelineError::NotReady(_))
        ));
    }

    #[test]
    fn bundled_composite_shader_compiles() {
        assert!(compile::validate_wgsl("composite shader", COMPOSITE_SHADER).is_ok());
    }
}
