//! GPU orchestration for the demo pipeline.
//!
//! - `context` owns wgpu instance/device/surface wiring plus the
//!   window-sized depth/stencil buffer, and rebuilds swapchain state when
//!   the window resizes.
//! - `surface` is the reallocating off-screen color target; the scene draws
//!   into it and the post-process samples it.
//! - `mesh` generates the torus geometry on the CPU and uploads it once.
//! - `scene` draws the background layer and the lit torus.
//! - `effect` compiles the composite shader and carries its parameter block
//!   across device rebuilds.
//! - `compositor` owns the scene transforms and encodes the fixed per-frame
//!   pass order: clear, scene, copy, composite, present.
//! - `lifecycle` tracks device validity across loss and restore.

mod compositor;
mod context;
mod effect;
mod lifecycle;
mod mesh;
mod scene;
mod surface;

pub use compositor::{FrameCompositor, FrameOutcome};
pub use effect::{EffectParams, EffectPass};
pub use lifecycle::{DeviceLifecycle, DeviceNotify, LifecycleState, TransitionError};
pub use scene::SceneRenderer;
pub use surface::{RenderSurface, SurfaceScale};

pub(crate) use context::GpuContext;
pub(crate) use effect::COMPOSITE_SHADER;
