use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Window size used when the host does not specify one.
pub const DEFAULT_SIZE: (u32, u32) = (800, 600);

/// Aberration displacement at strength 1.0, in UV units.
pub const DEFAULT_EFFECT_STRENGTH: f32 = 1.0;

/// Adapter selection bias passed through to the instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerPreference {
    Low,
    High,
}

impl fmt::Display for PowerPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerPreference::Low => f.write_str("low"),
            PowerPreference::High => f.write_str("high"),
        }
    }
}

/// What the per-frame clear touches.
///
/// The scene's background layer repaints every output pixel, so clearing the
/// color target is optional; depth/stencil is always cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearPolicy {
    /// Depth/stencil only.
    DepthOnly,
    /// Depth/stencil plus a solid cornflower-blue color clear.
    Solid,
}

impl ClearPolicy {
    pub(crate) fn color_load_op(self) -> wgpu::LoadOp<wgpu::Color> {
        match self {
            ClearPolicy::DepthOnly => wgpu::LoadOp::Load,
            ClearPolicy::Solid => wgpu::LoadOp::Clear(wgpu::Color {
                r: 0.392156899,
                g: 0.584313750,
                b: 0.929411829,
                a: 1.0,
            }),
        }
    }
}

impl fmt::Display for ClearPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClearPolicy::DepthOnly => f.write_str("depth-only"),
            ClearPolicy::Solid => f.write_str("solid"),
        }
    }
}

/// Everything the demo needs to come up, resolved by the host from CLI and
/// profile input.
#[derive(Clone, Debug)]
pub struct DemoConfig {
    pub size: (u32, u32),
    pub vsync: bool,
    pub power: PowerPreference,
    pub clear: ClearPolicy,
    /// Background image; `None` selects the procedural gradient.
    pub background: Option<PathBuf>,
    pub effect_strength: f32,
    /// `Some(n)` pins updates to a fixed `1/n` second step, `None` runs a
    /// variable step.
    pub fixed_fps: Option<u32>,
}

impl DemoConfig {
    pub(crate) fn fixed_step(&self) -> Option<Duration> {
        self.fixed_fps
            .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps.max(1))))
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            vsync: true,
            power: PowerPreference::High,
            clear: ClearPolicy::DepthOnly,
            background: None,
            effect_strength: DEFAULT_EFFECT_STRENGTH,
            fixed_fps: Some(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_step_matches_requested_rate() {
        let config = DemoConfig {
            fixed_fps: Some(60),
            ..DemoConfig::default()
        };
        let step = config.fixed_step().unwrap();
        assert!((step.as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn variable_step_has_no_target() {
        let config = DemoConfig {
            fixed_fps: None,
            ..DemoConfig::default()
        };
        assert!(config.fixed_step().is_none());
    }

    #[test]
    fn zero_fps_is_clamped_rather_than_dividing_by_zero() {
        let config = DemoConfig {
            fixed_fps: Some(0),
            ..DemoConfig::default()
        };
        assert_eq!(config.fixed_step().unwrap(), Duration::from_secs(1));
    }
}
