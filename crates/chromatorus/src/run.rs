use std::path::Path;

use anyhow::{Context, Result};
use pipeline::{ClearPolicy, DemoConfig, PowerPreference};
use showconfig::{ClearSetting, MAX_EFFECT_STRENGTH, MAX_FIXED_FPS, RenderProfile};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

pub fn run(args: Cli) -> Result<()> {
    initialise_tracing();

    let profile = load_profile(args.profile.as_deref())?;
    let config = resolve_config(&args, &profile)?;
    tracing::info!(
        width = config.size.0,
        height = config.size.1,
        vsync = config.vsync,
        power = %config.power,
        clear = %config.clear,
        "starting chromatorus"
    );
    pipeline::run_windowed(config)
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_profile(path: Option<&Path>) -> Result<RenderProfile> {
    match path {
        Some(path) => RenderProfile::load(path)
            .with_context(|| format!("failed to load render profile {}", path.display())),
        None => Ok(RenderProfile::default()),
    }
}

/// Folds CLI flags over the profile; a flag always wins over its profile
/// counterpart.
fn resolve_config(args: &Cli, profile: &RenderProfile) -> Result<DemoConfig> {
    let size = match args.size.as_deref() {
        Some(spec) => parse_surface_size(spec)?,
        None => (profile.window.width, profile.window.height),
    };

    let vsync = if args.no_vsync {
        false
    } else {
        profile.window.vsync
    };

    let clear = args.clear.unwrap_or(match profile.scene.clear {
        ClearSetting::DepthOnly => ClearPolicy::DepthOnly,
        ClearSetting::Solid => ClearPolicy::Solid,
    });

    let background = args
        .background
        .clone()
        .or_else(|| profile.scene.background.clone());

    // Flags obey the same bounds the profile validator enforces.
    let effect_strength = match args.strength {
        Some(strength) => {
            if !strength.is_finite() || !(0.0..=MAX_EFFECT_STRENGTH).contains(&strength) {
                anyhow::bail!(
                    "effect strength {strength} must be between 0 and {MAX_EFFECT_STRENGTH}"
                );
            }
            strength
        }
        None => profile.effect.strength,
    };

    let fixed_fps = match args.fps {
        Some(0) => None,
        Some(fps) if fps > MAX_FIXED_FPS => {
            anyhow::bail!("fps {fps} must be at most {MAX_FIXED_FPS}")
        }
        Some(fps) => Some(fps),
        None => profile.fixed_step_fps(),
    };

    Ok(DemoConfig {
        size,
        vsync,
        power: args.power.unwrap_or(PowerPreference::High),
        clear,
        background,
        effect_strength,
        fixed_fps,
    })
}

fn parse_surface_size(spec: &str) -> Result<(u32, u32)> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| anyhow::anyhow!("expected WxH format, e.g. 1280x720"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid width in size specification"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid height in size specification"))?;

    if width == 0 || height == 0 {
        anyhow::bail!("surface dimensions must be greater than zero");
    }

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;
    use tempfile::tempdir;

    use super::*;

    fn parse_args(argv: &[&str]) -> Cli {
        Cli::try_parse_from(argv).expect("arguments parse")
    }

    #[test]
    fn surface_size_accepts_mixed_separators() {
        assert_eq!(parse_surface_size("1920x1080").unwrap(), (1920, 1080));
        assert_eq!(parse_surface_size(" 1280 X 720 ").unwrap(), (1280, 720));
        assert_eq!(parse_surface_size("640×480").unwrap(), (640, 480));
    }

    #[test]
    fn surface_size_rejects_garbage() {
        assert!(parse_surface_size("1920").is_err());
        assert!(parse_surface_size("axb").is_err());
        assert!(parse_surface_size("0x600").is_err());
        assert!(parse_surface_size("800x0").is_err());
    }

    #[test]
    fn flags_override_profile_values() {
        let args = parse_args(&[
            "chromatorus",
            "--size",
            "1024x768",
            "--no-vsync",
            "--fps",
            "0",
            "--strength",
            "2.5",
            "--clear",
            "solid",
            "--power",
            "low",
        ]);
        let mut profile = RenderProfile::default();
        profile.window.width = 640;
        profile.window.height = 480;
        profile.effect.strength = 0.25;

        let config = resolve_config(&args, &profile).expect("config resolves");
        assert_eq!(config.size, (1024, 768));
        assert!(!config.vsync);
        assert_eq!(config.fixed_fps, None);
        assert_eq!(config.effect_strength, 2.5);
        assert_eq!(config.clear, ClearPolicy::Solid);
        assert_eq!(config.power, PowerPreference::Low);
    }

    #[test]
    fn profile_values_apply_when_flags_are_absent() {
        let args = parse_args(&["chromatorus"]);
        let mut profile = RenderProfile::default();
        profile.window.width = 1600;
        profile.window.height = 900;
        profile.window.vsync = false;
        profile.scene.clear = ClearSetting::Solid;
        profile.scene.background = Some(PathBuf::from("backdrop.png"));
        profile.effect.strength = 0.5;
        profile.timing.fixed_fps = Some(30);

        let config = resolve_config(&args, &profile).expect("config resolves");
        assert_eq!(config.size, (1600, 900));
        assert!(!config.vsync);
        assert_eq!(config.clear, ClearPolicy::Solid);
        assert_eq!(config.background, Some(PathBuf::from("backdrop.png")));
        assert_eq!(config.effect_strength, 0.5);
        assert_eq!(config.fixed_fps, Some(30));
        assert_eq!(config.power, PowerPreference::High);
    }

    #[test]
    fn zero_profile_fps_selects_variable_step() {
        let args = parse_args(&["chromatorus"]);
        let mut profile = RenderProfile::default();
        profile.timing.fixed_fps = Some(0);

        let config = resolve_config(&args, &profile).expect("config resolves");
        assert_eq!(config.fixed_fps, None);
    }

    #[test]
    fn negative_strength_is_rejected() {
        let args = parse_args(&["chromatorus", "--strength=-1"]);
        let profile = RenderProfile::default();
        assert!(resolve_config(&args, &profile).is_err());
    }

    #[test]
    fn fps_flag_beyond_the_fixed_rate_cap_is_rejected() {
        let profile = RenderProfile::default();
        let args = parse_args(&["chromatorus", "--fps", "1000000"]);
        assert!(resolve_config(&args, &profile).is_err());

        let args = parse_args(&["chromatorus", "--fps", "1000"]);
        let config = resolve_config(&args, &profile).expect("config resolves");
        assert_eq!(config.fixed_fps, Some(1000));
    }

    #[test]
    fn strength_flag_beyond_the_cap_is_rejected() {
        let profile = RenderProfile::default();
        let args = parse_args(&["chromatorus", "--strength", "250"]);
        assert!(resolve_config(&args, &profile).is_err());

        let args = parse_args(&["chromatorus", "--strength", "100"]);
        let config = resolve_config(&args, &profile).expect("config resolves");
        assert_eq!(config.effect_strength, 100.0);
    }

    #[test]
    fn profile_file_feeds_resolution() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("show.toml");
        std::fs::write(
            &path,
            r#"
version = 1

[window]
width = 1280
height = 720
vsync = false

[effect]
strength = 1.5
"#,
        )
        .expect("profile written");

        let profile = load_profile(Some(&path)).expect("profile loads");
        let config =
            resolve_config(&parse_args(&["chromatorus"]), &profile).expect("config resolves");
        assert_eq!(config.size, (1280, 720));
        assert!(!config.vsync);
        assert_eq!(config.effect_strength, 1.5);
    }

    #[test]
    fn missing_profile_argument_uses_defaults() {
        let profile = load_profile(None).expect("defaults load");
        assert_eq!(profile.window.width, 800);
        assert_eq!(profile.window.height, 600);
    }

    #[test]
    fn broken_profile_path_reports_context() {
        let err = load_profile(Some(Path::new("/nonexistent/profile.toml")))
            .expect_err("load should fail");
        assert!(err.to_string().contains("profile"));
    }
}
