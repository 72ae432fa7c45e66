use thiserror::Error;

/// Failures surfaced by the frame pipeline.
///
/// Construction-time failures (`ResourceCreation`, `ShaderCompile`) abort
/// startup or restore; `NotReady` marks use-before-init bugs; `Device` wraps
/// swapchain failures and is the signal that drives the loss/restore
/// protocol.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("resource creation failed: {0}")]
    ResourceCreation(String),

    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),

    #[error("{0} used before it was initialised")]
    NotReady(&'static str),

    #[error("device unavailable: {0}")]
    Device(#[from] wgpu::SurfaceError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
