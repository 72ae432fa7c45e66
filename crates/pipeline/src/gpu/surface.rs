use crate::error::{PipelineError, PipelineResult};

/// How a surface tracks the window extent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceScale {
    /// Same extent as the window.
    Full,
    /// Each dimension halved, rounding down, never below one texel.
    Half,
}

impl SurfaceScale {
    /// Texel extent for a window of `extent`.
    pub fn apply(self, extent: (u32, u32)) -> (u32, u32) {
        match self {
            SurfaceScale::Full => (extent.0.max(1), extent.1.max(1)),
            SurfaceScale::Half => ((extent.0 / 2).max(1), (extent.1 / 2).max(1)),
        }
    }
}

/// Allocation bookkeeping for one surface, kept separate from the GPU objects
/// so the reallocation decision stays plain data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SurfaceSpec {
    scale: SurfaceScale,
    /// Pixel format of the live attachment, `None` while unbound.
    format: Option<wgpu::TextureFormat>,
    /// Scaled extent of the live attachment, `None` while unbound.
    extent: Option<(u32, u32)>,
}

impl SurfaceSpec {
    /// `Some(scaled)` when a resize to `window_extent` must reallocate,
    /// `None` when the live attachment already matches in format and extent.
    fn plan(
        &self,
        format: wgpu::TextureFormat,
        window_extent: (u32, u32),
    ) -> Option<(u32, u32)> {
        let scaled = self.scale.apply(window_extent);
        if self.format == Some(format) && self.extent == Some(scaled) {
            None
        } else {
            Some(scaled)
        }
    }
}

struct Attachment {
    texture: wgpu::Texture,
    target_view: wgpu::TextureView,
    shader_view: wgpu::TextureView,
}

/// Off-screen color target that is drawn into by one pass and sampled by a
/// later one.
///
/// Construction is cheap and GPU-free; the texture comes into being on the
/// first [`resize`](Self::resize) and follows the window (and the swapchain
/// format) from then on. Each reallocation bumps `generation`, which is how
/// callers notice that bind groups referencing the old view went stale.
pub struct RenderSurface {
    label: &'static str,
    spec: SurfaceSpec,
    attachment: Option<Attachment>,
    generation: u64,
}

impl RenderSurface {
    pub fn new(label: &'static str, scale: SurfaceScale) -> Self {
        Self {
            label,
            spec: SurfaceSpec {
                scale,
                format: None,
                extent: None,
            },
            attachment: None,
            generation: 0,
        }
    }

    pub fn scale(&self) -> SurfaceScale {
        self.spec.scale
    }

    /// Pixel format of the live attachment.
    pub fn format(&self) -> Option<wgpu::TextureFormat> {
        self.spec.format
    }

    /// Scaled extent of the live attachment.
    pub fn extent(&self) -> Option<(u32, u32)> {
        self.spec.extent
    }

    /// Bumps on every reallocation; 0 while never bound.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_bound(&self) -> bool {
        self.attachment.is_some()
    }

    /// Follow the window to `window_extent`, reallocating only when the
    /// scaled extent or the format actually changed.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        window_extent: (u32, u32),
    ) -> PipelineResult<()> {
        let Some(scaled) = self.spec.plan(format, window_extent) else {
            return Ok(());
        };

        let max_dimension = device.limits().max_texture_dimension_2d;
        if scaled.0 > max_dimension || scaled.1 > max_dimension {
            return Err(PipelineError::ResourceCreation(format!(
                "{} extent {}x{} exceeds device limit {}",
                self.label, scaled.0, scaled.1, max_dimension
            )));
        }

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(self.label),
            size: wgpu::Extent3d {
                width: scaled.0,
                height: scaled.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let shader_view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.attachment = Some(Attachment {
            texture,
            target_view,
            shader_view,
        });
        self.spec.format = Some(format);
        self.spec.extent = Some(scaled);
        self.generation += 1;
        tracing::debug!(
            label = self.label,
            width = scaled.0,
            height = scaled.1,
            generation = self.generation,
            "allocated render surface"
        );
        Ok(())
    }

    /// Drop the attachment. Safe to call repeatedly; a later `resize` starts
    /// from scratch.
    pub fn release(&mut self) {
        self.attachment = None;
        self.spec.format = None;
        self.spec.extent = None;
    }

    /// View to render into.
    pub fn target_view(&self) -> PipelineResult<&wgpu::TextureView> {
        self.attachment
            .as_ref()
            .map(|attachment| &attachment.target_view)
            .ok_or(PipelineError::NotReady("render surface target view"))
    }

    /// View to sample from.
    pub fn shader_view(&self) -> PipelineResult<&wgpu::TextureView> {
        self.attachment
            .as_ref()
            .map(|attachment| &attachment.shader_view)
            .ok_or(PipelineError::NotReady("render surface shader view"))
    }

    /// Backing texture, for whole-surface copies.
    pub fn texture(&self) -> PipelineResult<&wgpu::Texture> {
        self.attachment
            .as_ref()
            .map(|attachment| &attachment.texture)
            .ok_or(PipelineError::NotReady("render surface texture"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_scale_keeps_the_window_extent() {
        assert_eq!(SurfaceScale::Full.apply((800, 600)), (800, 600));
        assert_eq!(SurfaceScale::Full.apply((1920, 1080)), (1920, 1080));
    }

    #[test]
    fn half_scale_rounds_down() {
        assert_eq!(SurfaceScale::Half.apply((800, 600)), (400, 300));
        assert_eq!(SurfaceScale::Half.apply((1920, 1080)), (960, 540));
        assert_eq!(SurfaceScale::Half.apply((801, 601)), (400, 300));
    }

    #[test]
    fn half_scale_never_reaches_zero() {
        assert_eq!(SurfaceScale::Half.apply((1, 1)), (1, 1));
        assert_eq!(SurfaceScale::Half.apply((0, 0)), (1, 1));
    }

    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;

    #[test]
    fn plan_requests_an_allocation_while_unbound() {
        let spec = SurfaceSpec {
            scale: SurfaceScale::Half,
            format: None,
            extent: None,
        };
        assert_eq!(spec.plan(FORMAT, (800, 600)), Some((400, 300)));
    }

    #[test]
    fn plan_is_a_no_op_when_the_live_attachment_matches() {
        let spec = SurfaceSpec {
            scale: SurfaceScale::Half,
            format: Some(FORMAT),
            extent: Some((400, 300)),
        };
        assert_eq!(spec.plan(FORMAT, (800, 600)), None);
        // Odd window sizes that scale to the same texel extent also skip.
        assert_eq!(spec.plan(FORMAT, (801, 601)), None);
    }

    #[test]
    fn plan_reallocates_on_an_extent_change() {
        let spec = SurfaceSpec {
            scale: SurfaceScale::Full,
            format: Some(FORMAT),
            extent: Some((800, 600)),
        };
        assert_eq!(spec.plan(FORMAT, (1920, 1080)), Some((1920, 1080)));
    }

    #[test]
    fn plan_reallocates_on_a_format_change() {
        let spec = SurfaceSpec {
            scale: SurfaceScale::Full,
            format: Some(FORMAT),
            extent: Some((800, 600)),
        };
        assert_eq!(
            spec.plan(wgpu::TextureFormat::Rgba8Unorm, (800, 600)),
            Some((800, 600))
        );
    }

    #[test]
    fn views_are_not_ready_before_the_first_resize() {
        let surface = RenderSurface::new("offscreen color", SurfaceScale::Full);
        assert!(!surface.is_bound());
        assert!(matches!(
            surface.target_view(),
            Err(PipelineError::NotReady(_))
        ));
        assert!(matches!(
            surface.shader_view(),
            Err(PipelineError::NotReady(_))
        ));
        assert!(matches!(surface.texture(), Err(PipelineError::NotReady(_))));
        assert_eq!(surface.generation(), 0);
        assert_eq!(surface.format(), None);
        assert_eq!(surface.extent(), None);
    }

    #[test]
    fn release_is_idempotent() {
        let mut surface = RenderSurface::new("offscreen color", SurfaceScale::Half);
        surface.release();
        surface.release();
        assert!(!surface.is_bound());
        assert_eq!(surface.format(), None);
    }
}
