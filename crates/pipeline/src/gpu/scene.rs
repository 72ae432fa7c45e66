use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::compile;
use crate::error::{PipelineError, PipelineResult};

use super::context::DEPTH_FORMAT;
use super::mesh::{TorusMesh, Vertex};

const BACKGROUND_SHADER: &str = include_str!("shaders/background.wgsl");
const SCENE_SHADER: &str = include_str!("shaders/scene.wgsl");

/// Rows in the procedural fallback gradient.
const GRADIENT_STEPS: u32 = 256;
/// Gradient endpoints, sky at the top of the frame down to a warm horizon.
const GRADIENT_TOP: [f32; 3] = [0.17, 0.24, 0.45];
const GRADIENT_BOTTOM: [f32; 3] = [0.93, 0.58, 0.35];

/// Uniform block for the scene shader. Two column-major matrices, 128 bytes.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SceneUniforms {
    pub mvp: [[f32; 4]; 4],
    pub world: [[f32; 4]; 4],
}

unsafe impl Zeroable for SceneUniforms {}
unsafe impl Pod for SceneUniforms {}

impl SceneUniforms {
    fn new(mvp: Mat4, world: Mat4) -> Self {
        Self {
            mvp: mvp.to_cols_array_2d(),
            world: world.to_cols_array_2d(),
        }
    }
}

struct SceneResources {
    background_pipeline: wgpu::RenderPipeline,
    background_group: wgpu::BindGroup,
    torus_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_group: wgpu::BindGroup,
    mesh: TorusMesh,
}

/// The scene stage: a background layer behind a lit torus.
///
/// Only the background path is CPU-side state; everything else is rebuilt
/// from scratch on [`load`](Self::load), which runs at bring-up and again
/// after a device restore.
pub struct SceneRenderer {
    background: Option<PathBuf>,
    resources: Option<SceneResources>,
}

impl SceneRenderer {
    pub fn new(background: Option<PathBuf>) -> Self {
        Self {
            background,
            resources: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.resources.is_some()
    }

    /// Build every GPU object the scene needs, targeting `format`.
    ///
    /// A configured background image that fails to decode is a hard error;
    /// without one the procedural gradient stands in.
    pub(crate) fn load(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
    ) -> PipelineResult<()> {
        let (pixels, width, height) = match &self.background {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading background image");
                background_pixels(path)?
            }
            None => (gradient_pixels(), 1, GRADIENT_STEPS),
        };
        check_background_extent(width, height, device.limits().max_texture_dimension_2d)?;

        let background_texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("background texture"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: background_format(format),
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &pixels,
        );
        let background_view =
            background_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let background_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("background sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let background_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("background layout"),
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
        let background_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("background bind group"),
            layout: &background_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&background_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&background_sampler),
                },
            ],
        });

        let background_module =
            compile::build_shader_module(device, "background shader", BACKGROUND_SHADER)?;
        let background_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("background pipeline layout"),
                bind_group_layouts: &[&background_layout],
                push_constant_ranges: &[],
            });
        let background_pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("background pipeline"),
                layout: Some(&background_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &background_module,
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
                // Runs inside the depth-attached scene pass but never touches
                // depth, so the torus always draws over it.
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: false,
                    depth_compare: wgpu::CompareFunction::Always,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &background_module,
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

        let scene_module = compile::build_shader_module(device, "scene shader", SCENE_SHADER)?;
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene uniform buffer"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene uniform bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let torus_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("torus pipeline layout"),
                bind_group_layouts: &[&uniform_layout],
                push_constant_ranges: &[],
            });
        let torus_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("torus pipeline"),
            layout: Some(&torus_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &scene_module,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout()],
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
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &scene_module,
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

        let mesh = TorusMesh::create(device);

        self.resources = Some(SceneResources {
            background_pipeline,
            background_group,
            torus_pipeline,
            uniform_buffer,
            uniform_group,
            mesh,
        });
        Ok(())
    }

    /// Drop every GPU object. The background path survives for the rebuild.
    pub(crate) fn release(&mut self) {
        self.resources = None;
    }

    /// Push this frame's transforms into the uniform buffer. Must happen
    /// before the pass that draws with them is encoded.
    pub(crate) fn write_uniforms(
        &self,
        queue: &wgpu::Queue,
        mvp: Mat4,
        world: Mat4,
    ) -> PipelineResult<()> {
        let resources = self.require_resources()?;
        let uniforms = SceneUniforms::new(mvp, world);
        queue.write_buffer(
            &resources.uniform_buffer,
            0,
            bytemuck::bytes_of(&uniforms),
        );
        Ok(())
    }

    /// Record the scene into `pass`: background first, torus over it.
    pub(crate) fn draw(&self, pass: &mut wgpu::RenderPass<'_>) -> PipelineResult<()> {
        let resources = self.require_resources()?;

        pass.set_pipeline(&resources.background_pipeline);
        pass.set_bind_group(0, &resources.background_group, &[]);
        pass.draw(0..3, 0..1);

        pass.set_pipeline(&resources.torus_pipeline);
        pass.set_bind_group(0, &resources.uniform_group, &[]);
        pass.set_vertex_buffer(0, resources.mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(
            resources.mesh.index_buffer.slice(..),
            wgpu::IndexFormat::Uint16,
        );
        pass.draw_indexed(0..resources.mesh.index_count, 0, 0..1);
        Ok(())
    }

    fn require_resources(&self) -> PipelineResult<&SceneResources> {
        self.resources
            .as_ref()
            .ok_or(PipelineError::NotReady("scene renderer"))
    }
}

/// Decode a background image into tightly packed RGBA8 rows.
fn background_pixels(path: &Path) -> PipelineResult<(Vec<u8>, u32, u32)> {
    let image = image::open(path).map_err(|err| {
        PipelineError::ResourceCreation(format!(
            "background image {}: {err}",
            path.display()
        ))
    })?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((rgba.into_raw(), width, height))
}

/// Background texels carry the same transfer function as the surface they
/// end up on: raw bytes for a gamma swapchain, hardware decode for sRGB.
fn background_format(surface_format: wgpu::TextureFormat) -> wgpu::TextureFormat {
    if surface_format.is_srgb() {
        wgpu::TextureFormat::Rgba8UnormSrgb
    } else {
        wgpu::TextureFormat::Rgba8Unorm
    }
}

fn check_background_extent(width: u32, height: u32, max_dimension: u32) -> PipelineResult<()> {
    if width > max_dimension || height > max_dimension {
        return Err(PipelineError::ResourceCreation(format!(
            "background image {width}x{height} exceeds device limit {max_dimension}"
        )));
    }
    Ok(())
}

/// One-texel-wide RGBA8 column, top row first.
fn gradient_pixels() -> Vec<u8> {
    let mut pixels = Vec::with_capacity((GRADIENT_STEPS * 4) as usize);
    for row in 0..GRADIENT_STEPS {
        let t = row as f32 / (GRADIENT_STEPS - 1) as f32;
        for channel in 0..3 {
            let value =
                GRADIENT_TOP[channel] + (GRADIENT_BOTTOM[channel] - GRADIENT_TOP[channel]) * t;
            pixels.push((value.clamp(0.0, 1.0) * 255.0).round() as u8);
        }
        pixels.push(u8::MAX);
    }
    pixels
}
