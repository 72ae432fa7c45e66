use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context as AnyhowContext, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::{PipelineError, PipelineResult};
use crate::gpu::{
    DeviceLifecycle, DeviceNotify, EffectPass, FrameCompositor, FrameOutcome, GpuContext,
    LifecycleState, SceneRenderer, COMPOSITE_SHADER,
};
use crate::timer::StepTimer;
use crate::types::{DemoConfig, DEFAULT_SIZE};

/// Anything the demo can render to: a window or equivalent that exposes raw
/// display and window handles.
pub trait RenderTarget: HasDisplayHandle + HasWindowHandle {}

impl<T: HasDisplayHandle + HasWindowHandle> RenderTarget for T {}

/// The embeddable demo façade.
///
/// Owns the step timer, the device lifecycle, and every render stage, and
/// turns host callbacks into pipeline work. The host keeps it alive, calls
/// [`tick`](Self::tick) once per frame, forwards window resizes, and routes
/// device loss through the [`DeviceNotify`] impl.
///
/// The render target handed to [`initialize`](Self::initialize) is retained
/// so a restore can rebuild the swapchain without the host's involvement.
pub struct Demo {
    config: DemoConfig,
    size: (u32, u32),
    target: Option<Arc<dyn RenderTarget>>,
    timer: StepTimer,
    lifecycle: DeviceLifecycle,
    context: Option<GpuContext>,
    compositor: FrameCompositor,
    scene: SceneRenderer,
    effect: EffectPass,
    reported_fps: u32,
}

impl Demo {
    pub fn new(config: DemoConfig) -> Self {
        let timer = match config.fixed_step() {
            Some(step) => StepTimer::fixed(step),
            None => StepTimer::new(),
        };
        Self {
            size: config.size,
            compositor: FrameCompositor::new(config.clear),
            scene: SceneRenderer::new(config.background.clone()),
            effect: EffectPass::new(config.effect_strength),
            timer,
            lifecycle: DeviceLifecycle::new(),
            context: None,
            target: None,
            config,
            reported_fps: 0,
        }
    }

    /// Window size to ask for when the host has no opinion.
    pub fn default_size() -> (u32, u32) {
        DEFAULT_SIZE
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Generation of the live resource set; bumps on every restore.
    pub fn resource_generation(&self) -> u64 {
        self.lifecycle.generation()
    }

    /// Update steps completed so far.
    pub fn frame_count(&self) -> u64 {
        self.timer.frame_count()
    }

    /// First-time bring-up against `target`. Shader or resource failures
    /// here are fatal; there is nothing sensible to fall back to.
    pub fn initialize(
        &mut self,
        target: Arc<dyn RenderTarget>,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.size = (width.max(1), height.max(1));
        let context = GpuContext::new(&*target, self.size, self.config.power, self.config.vsync)?;
        self.target = Some(target);
        self.build_resources(&context)?;
        self.context = Some(context);
        self.lifecycle
            .initialized()
            .context("lifecycle refused initialisation")?;
        tracing::info!(width = self.size.0, height = self.size.1, "demo initialised");
        Ok(())
    }

    /// One host tick: advance the clock, run the update steps it owes, then
    /// render. A no-op unless the device is live.
    pub fn tick(&mut self, now: Instant) -> PipelineResult<FrameOutcome> {
        if !self.lifecycle.is_ready() {
            return Ok(FrameOutcome::Idle);
        }
        let context = self
            .context
            .as_ref()
            .ok_or(PipelineError::NotReady("gpu context"))?;

        for slice in self.timer.advance(now) {
            self.compositor.advance(&slice);
            self.effect.advance(slice.elapsed_seconds as f32);
        }

        // The reading rolls over once per second.
        let fps = self.timer.frames_per_second();
        if fps != 0 && fps != self.reported_fps {
            self.reported_fps = fps;
            tracing::debug!(fps, "frame rate");
        }

        if !self.compositor.should_render() {
            return Ok(FrameOutcome::Skipped);
        }
        self.effect.update_params(&context.queue)?;
        self.compositor
            .render(context, &self.scene, &mut self.effect)
    }

    /// Follow the window to a new size. Returns without touching the GPU
    /// when the size did not actually change or no device is live.
    pub fn window_size_changed(&mut self, width: u32, height: u32) -> PipelineResult<()> {
        let new_size = (width.max(1), height.max(1));
        if new_size == self.size {
            return Ok(());
        }
        self.size = new_size;

        let Some(context) = self.context.as_mut() else {
            return Ok(());
        };
        context.resize(new_size);
        self.compositor
            .bind(&context.device, context.surface_format, context.size)?;
        tracing::debug!(width = new_size.0, height = new_size.1, "window resized");
        Ok(())
    }

    /// Reapply the current surface configuration, the recovery step for an
    /// outdated swapchain.
    pub fn reconfigure(&mut self) {
        if let Some(context) = self.context.as_mut() {
            context.reconfigure();
        }
    }

    /// The host came back from a suspend; swallow the pause instead of
    /// counting it as one giant delta.
    pub fn resuming(&mut self, now: Instant) {
        self.timer.reset_elapsed(now);
    }

    fn build_resources(&mut self, context: &GpuContext) -> Result<()> {
        self.scene
            .load(&context.device, &context.queue, context.surface_format)
            .context("failed to build scene resources")?;
        self.effect
            .load(&context.device, context.surface_format, COMPOSITE_SHADER)
            .context("failed to build effect resources")?;
        self.compositor
            .bind(&context.device, context.surface_format, context.size)
            .context("failed to bind frame surfaces")?;
        Ok(())
    }
}

impl DeviceNotify for Demo {
    /// Tear down every device-dependent object. CPU state (clock, params,
    /// transforms) stays put so the restored demo picks up mid-animation.
    fn device_lost(&mut self) -> Result<()> {
        self.lifecycle.lost().context("lifecycle refused the loss")?;
        self.effect.release();
        self.scene.release();
        self.compositor.release();
        self.context = None;
        tracing::warn!("device lost; resources released");
        Ok(())
    }

    /// Bring up a fresh device and resource set against the stored target.
    fn device_restored(&mut self) -> Result<()> {
        self.lifecycle
            .restore_started()
            .context("lifecycle refused the restore")?;
        let target = self
            .target
            .clone()
            .context("no render target to restore against")?;
        let context = GpuContext::new(&*target, self.size, self.config.power, self.config.vsync)?;
        self.build_resources(&context)?;
        self.context = Some(context);
        self.lifecycle
            .restored()
            .context("lifecycle refused to finish the restore")?;
        tracing::info!(
            generation = self.lifecycle.generation(),
            "device restored"
        );
        Ok(())
    }
}
