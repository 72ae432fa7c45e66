//! Render profile files for the chromatorus demo.
//!
//! A profile is a small TOML document describing how the demo should come
//! up: window size and vsync, the scene background and clear mode, the
//! post-process strength, and the update timing. Every section and field is
//! optional except `version`; CLI flags override whatever the profile says.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Largest window dimension a profile may request.
pub const MAX_SURFACE_DIMENSION: u32 = 16_384;

/// Largest fixed update rate a profile may request. With the per-tick delta
/// clamped at 100 ms, one tick then owes at most a hundred catch-up steps.
pub const MAX_FIXED_FPS: u32 = 1_000;

/// Largest post-process strength a profile may request.
pub const MAX_EFFECT_STRENGTH: f32 = 100.0;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("failed to read profile at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse profile: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid profile: {0}")]
    Invalid(String),
}

/// What the per-frame clear touches before the scene draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ClearSetting {
    /// Depth/stencil only; the background layer repaints every pixel anyway.
    #[default]
    DepthOnly,
    /// Depth/stencil plus a solid color clear.
    Solid,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderProfile {
    pub version: u32,
    #[serde(default)]
    pub window: WindowSettings,
    #[serde(default)]
    pub scene: SceneSettings,
    #[serde(default)]
    pub effect: EffectSettings,
    #[serde(default)]
    pub timing: TimingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WindowSettings {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_vsync")]
    pub vsync: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SceneSettings {
    /// Background image path; the built-in gradient is used when absent.
    #[serde(default)]
    pub background: Option<PathBuf>,
    #[serde(default)]
    pub clear: ClearSetting,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EffectSettings {
    #[serde(default = "default_strength")]
    pub strength: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingSettings {
    /// Fixed update rate; `0` selects the variable step.
    #[serde(default = "default_fixed_fps")]
    pub fixed_fps: Option<u32>,
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    600
}

fn default_vsync() -> bool {
    true
}

fn default_strength() -> f32 {
    1.0
}

fn default_fixed_fps() -> Option<u32> {
    Some(60)
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            vsync: default_vsync(),
        }
    }
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            strength: default_strength(),
        }
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            fixed_fps: default_fixed_fps(),
        }
    }
}

impl Default for RenderProfile {
    fn default() -> Self {
        Self {
            version: 1,
            window: WindowSettings::default(),
            scene: SceneSettings::default(),
            effect: EffectSettings::default(),
            timing: TimingSettings::default(),
        }
    }
}

impl RenderProfile {
    pub fn from_toml_str(input: &str) -> Result<Self, ProfileError> {
        let raw: RenderProfile = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let contents = fs::read_to_string(path).map_err(|source| ProfileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Fixed update rate with the zero sentinel folded away.
    pub fn fixed_step_fps(&self) -> Option<u32> {
        self.timing.fixed_fps.filter(|fps| *fps > 0)
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.version != 1 {
            return Err(ProfileError::Invalid(format!(
                "unsupported profile version {}; expected 1",
                self.version
            )));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ProfileError::Invalid(
                "window dimensions must be greater than zero".into(),
            ));
        }

        if self.window.width > MAX_SURFACE_DIMENSION || self.window.height > MAX_SURFACE_DIMENSION {
            return Err(ProfileError::Invalid(format!(
                "window dimensions may not exceed {MAX_SURFACE_DIMENSION}"
            )));
        }

        if !self.effect.strength.is_finite()
            || !(0.0..=MAX_EFFECT_STRENGTH).contains(&self.effect.strength)
        {
            return Err(ProfileError::Invalid(format!(
                "effect strength {} must be between 0 and {MAX_EFFECT_STRENGTH}",
                self.effect.strength
            )));
        }

        if let Some(fps) = self.timing.fixed_fps {
            if fps > MAX_FIXED_FPS {
                return Err(ProfileError::Invalid(format!(
                    "timing.fixed_fps {fps} must be at most {MAX_FIXED_FPS}"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[window]
width = 1280
height = 720
vsync = false

[scene]
background = "assets/sunset.jpg"
clear = "solid"

[effect]
strength = 2.5

[timing]
fixed_fps = 120
"#;

    #[test]
    fn parses_sample_profile() {
        let profile = RenderProfile::from_toml_str(SAMPLE).expect("parse profile");
        assert_eq!(profile.version, 1);
        assert_eq!(profile.window.width, 1280);
        assert_eq!(profile.window.height, 720);
        assert!(!profile.window.vsync);
        assert_eq!(
            profile.scene.background.as_deref(),
            Some(Path::new("assets/sunset.jpg"))
        );
        assert_eq!(profile.scene.clear, ClearSetting::Solid);
        assert!((profile.effect.strength - 2.5).abs() < f32::EPSILON);
        assert_eq!(profile.fixed_step_fps(), Some(120));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let profile = RenderProfile::from_toml_str("version = 1").unwrap();
        assert_eq!(profile.window.width, 800);
        assert_eq!(profile.window.height, 600);
        assert!(profile.window.vsync);
        assert!(profile.scene.background.is_none());
        assert_eq!(profile.scene.clear, ClearSetting::DepthOnly);
        assert!((profile.effect.strength - 1.0).abs() < f32::EPSILON);
        assert_eq!(profile.fixed_step_fps(), Some(60));
    }

    #[test]
    fn zero_fps_selects_the_variable_step() {
        let profile = RenderProfile::from_toml_str(
            r#"
version = 1

[timing]
fixed_fps = 0
"#,
        )
        .unwrap();
        assert_eq!(profile.fixed_step_fps(), None);
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = RenderProfile::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ProfileError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_window_dimensions() {
        let err = RenderProfile::from_toml_str(
            r#"
version = 1

[window]
width = 0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ProfileError::Invalid(_)));
    }

    #[test]
    fn rejects_negative_strength() {
        let err = RenderProfile::from_toml_str(
            r#"
version = 1

[effect]
strength = -1.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ProfileError::Invalid(_)));
    }

    #[test]
    fn rejects_an_absurd_fixed_rate() {
        let err = RenderProfile::from_toml_str(
            r#"
version = 1

[timing]
fixed_fps = 100000
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ProfileError::Invalid(_)));
    }

    #[test]
    fn unknown_clear_values_fail_to_parse() {
        let err = RenderProfile::from_toml_str(
            r#"
version = 1

[scene]
clear = "everything"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ProfileError::Parse(_)));
    }

    #[test]
    fn loads_a_profile_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.toml");
        fs::write(&path, SAMPLE).unwrap();

        let profile = RenderProfile::load(&path).unwrap();
        assert_eq!(profile.window.width, 1280);
    }

    #[test]
    fn a_missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = RenderProfile::load(&path).unwrap_err();
        assert!(matches!(err, ProfileError::Read { .. }));
        assert!(err.to_string().contains("absent.toml"));
    }
}
