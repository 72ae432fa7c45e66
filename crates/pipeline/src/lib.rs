//! Frame pipeline crate for Chromatorus.
//!
//! The crate renders a spinning lit torus over a background layer and
//! finishes each frame with a full-screen chromatic-aberration pass. The
//! overall flow is:
//!
//! ```text
//!   CLI / chromatorus
//!          │ DemoConfig
//!          ▼
//!   run_windowed ──▶ Demo ──▶ winit event loop ──▶ tick()
//!          ▲                             │ StepTimer ─▶ update steps
//!          │                             └ FrameCompositor ─▶ scene ─▶ copy
//!          │                                             ─▶ composite ─▶ present
//!          └─▶ DeviceNotify walks loss/restore when the surface drops out
//! ```
//!
//! [`Demo`] is the embeddable façade; hosts that bring their own event loop
//! hand it a render target and call [`Demo::tick`] once per frame. Update
//! steps only touch CPU state, so everything timing- and transform-related
//! is testable without a GPU, and the whole device-dependent resource set
//! can be dropped and rebuilt mid-run without losing the animation.

mod compile;
mod demo;
mod error;
mod gpu;
mod timer;
mod types;
mod window;

pub use demo::{Demo, RenderTarget};
pub use error::{PipelineError, PipelineResult};
pub use gpu::{
    DeviceLifecycle, DeviceNotify, EffectParams, EffectPass, FrameCompositor, FrameOutcome,
    LifecycleState, RenderSurface, SceneRenderer, SurfaceScale, TransitionError,
};
pub use timer::{StepTimer, Steps, TimeSlice};
pub use types::{
    ClearPolicy, DemoConfig, PowerPreference, DEFAULT_EFFECT_STRENGTH, DEFAULT_SIZE,
};
pub use window::run_windowed;
