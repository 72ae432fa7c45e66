use glam::{Mat4, Vec3};

use crate::error::PipelineResult;
use crate::timer::TimeSlice;
use crate::types::ClearPolicy;

use super::context::GpuContext;
use super::effect::EffectPass;
use super::scene::SceneRenderer;
use super::surface::{RenderSurface, SurfaceScale};

const NEAR_PLANE: f32 = 0.01;
const FAR_PLANE: f32 = 100.0;
/// Camera sits above and behind the origin, looking back at it.
const EYE: Vec3 = Vec3::new(0.0, 3.0, -3.0);

/// What one render call produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A frame was drawn and queued for presentation.
    Presented,
    /// No update step has run yet; nothing was submitted to the GPU.
    Skipped,
    /// The pipeline has no live device, so the tick was a no-op.
    Idle,
}

/// Frame orchestration: owns the off-screen surfaces and the scene
/// transforms, and encodes the fixed pass order of every frame.
///
/// Per frame: clear depth/stencil (color per policy), draw the scene into
/// the off-screen target, pre-seed the back buffer with a copy where the
/// swapchain allows it, then run the post-process into the back buffer and
/// present. Until the first update step has run the render call is a guard
/// that submits nothing.
///
/// All transform state is CPU-side and survives a device loss; only the
/// surfaces are released and rebound.
pub struct FrameCompositor {
    offscreen: RenderSurface,
    aux: [RenderSurface; 2],
    clear: ClearPolicy,
    world: Mat4,
    view: Mat4,
    projection: Mat4,
    output_rect: (u32, u32),
    frame_count: u64,
}

impl FrameCompositor {
    pub fn new(clear: ClearPolicy) -> Self {
        Self {
            offscreen: RenderSurface::new("offscreen color", SurfaceScale::Full),
            // Half-resolution pair for multi-pass effect chains.
            aux: [
                RenderSurface::new("aux color 0", SurfaceScale::Half),
                RenderSurface::new("aux color 1", SurfaceScale::Half),
            ],
            clear,
            world: Mat4::IDENTITY,
            view: Mat4::look_at_rh(EYE, Vec3::ZERO, Vec3::Y),
            projection: Mat4::IDENTITY,
            output_rect: (1, 1),
            frame_count: 0,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// True once at least one update step has run.
    pub fn should_render(&self) -> bool {
        self.frame_count > 0
    }

    pub fn output_rect(&self) -> (u32, u32) {
        self.output_rect
    }

    pub fn world(&self) -> Mat4 {
        self.world
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn mvp(&self) -> Mat4 {
        self.projection * self.view * self.world
    }

    pub fn offscreen(&self) -> &RenderSurface {
        &self.offscreen
    }

    pub fn aux(&self) -> &[RenderSurface; 2] {
        &self.aux
    }

    /// Recompute the output rect and the projection for `window_extent`.
    /// Pure CPU state; the GPU-side counterpart is [`bind`](Self::bind).
    pub fn set_output(&mut self, window_extent: (u32, u32)) {
        self.output_rect = (window_extent.0.max(1), window_extent.1.max(1));
        let aspect = self.output_rect.0 as f32 / self.output_rect.1 as f32;
        self.projection = Mat4::perspective_rh(
            std::f32::consts::FRAC_PI_4,
            aspect,
            NEAR_PLANE,
            FAR_PLANE,
        );
    }

    /// Size the off-screen surfaces (and the projection) to `window_extent`.
    /// Idempotent; surfaces only reallocate when their scaled extent or the
    /// format actually changed.
    pub(crate) fn bind(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        window_extent: (u32, u32),
    ) -> PipelineResult<()> {
        self.set_output(window_extent);
        self.offscreen.resize(device, format, window_extent)?;
        for surface in &mut self.aux {
            surface.resize(device, format, window_extent)?;
        }
        Ok(())
    }

    /// Fold one update step into the scene transforms.
    pub fn advance(&mut self, slice: &TimeSlice) {
        let t = slice.total_seconds as f32;
        // Rotation order: Z first, then Y, then X, each at its own rate.
        self.world = Mat4::from_rotation_x(t * 2.0)
            * Mat4::from_rotation_y(t)
            * Mat4::from_rotation_z(t / 2.0);
        self.frame_count = slice.frame;
    }

    /// Drop the off-screen surfaces. Transforms and the frame counter are
    /// CPU state and stay put for the rebuild.
    pub(crate) fn release(&mut self) {
        self.offscreen.release();
        for surface in &mut self.aux {
            surface.release();
        }
    }

    /// Encode and present one frame.
    pub(crate) fn render(
        &mut self,
        context: &GpuContext,
        scene: &SceneRenderer,
        effect: &mut EffectPass,
    ) -> PipelineResult<FrameOutcome> {
        if !self.should_render() {
            return Ok(FrameOutcome::Skipped);
        }

        let frame = context.surface.get_current_texture()?;

        scene.write_uniforms(&context.queue, self.mvp(), self.world)?;
        effect.bind_input(&context.device, &self.offscreen)?;

        let back_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });

        {
            let target = self.offscreen.target_view()?;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: self.clear.color_load_op(),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &context.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_viewport(
                0.0,
                0.0,
                self.output_rect.0 as f32,
                self.output_rect.1 as f32,
                0.0,
                1.0,
            );
            scene.draw(&mut pass)?;
        }

        // Seed the back buffer with the scene color before compositing, the
        // same wholesale copy the post-process chain starts from. Skipped
        // when the swapchain lacks COPY_DST or a resize is still settling.
        let copied = context.surface_supports_copy
            && frame.texture.width() == self.output_rect.0
            && frame.texture.height() == self.output_rect.1;
        if copied {
            let source = self.offscreen.texture()?;
            encoder.copy_texture_to_texture(
                source.as_image_copy(),
                frame.texture.as_image_copy(),
                wgpu::Extent3d {
                    width: self.output_rect.0,
                    height: self.output_rect.1,
                    depth_or_array_layers: 1,
                },
            );
        }

        {
            // From here on the off-screen target is input only; the effect
            // samples it while the back buffer is the sole attachment.
            let load = if copied {
                wgpu::LoadOp::Load
            } else {
                wgpu::LoadOp::Clear(wgpu::Color::BLACK)
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("composite pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &back_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            effect.apply(&mut pass)?;
            pass.draw(0..3, 0..1);
        }

        context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(FrameOutcome::Presented)
    }
}
