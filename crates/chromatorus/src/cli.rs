use std::path::PathBuf;

use clap::Parser;
use pipeline::{ClearPolicy, PowerPreference};

#[derive(Parser, Debug)]
#[command(
    name = "chromatorus",
    author,
    version,
    about = "Windowed torus demo with a chromatic-aberration post pass",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Render profile TOML file; built-in defaults apply when omitted.
    #[arg(value_name = "PROFILE")]
    pub profile: Option<PathBuf>,

    /// Override the window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Background image (PNG or JPEG) drawn behind the torus.
    #[arg(long, value_name = "PATH")]
    pub background: Option<PathBuf>,

    /// Fixed update rate in frames per second (0=variable step).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<u32>,

    /// Present as fast as the surface allows instead of waiting for vblank.
    #[arg(long)]
    pub no_vsync: bool,

    /// Adapter preference: `low` or `high` power.
    #[arg(long, value_name = "MODE", value_parser = parse_power)]
    pub power: Option<PowerPreference>,

    /// Per-frame clear policy: `depth-only` or `solid`.
    #[arg(long, value_name = "POLICY", value_parser = parse_clear)]
    pub clear: Option<ClearPolicy>,

    /// Aberration strength multiplier (non-negative).
    #[arg(long, value_name = "FACTOR")]
    pub strength: Option<f32>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_power(value: &str) -> Result<PowerPreference, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("power preference must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "low" | "low-power" | "battery" => Ok(PowerPreference::Low),
        "high" | "high-performance" | "performance" => Ok(PowerPreference::High),
        other => Err(format!(
            "unknown power preference '{other}'; expected low or high"
        )),
    }
}

pub fn parse_clear(value: &str) -> Result<ClearPolicy, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("clear policy must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "depth-only" | "depth" => Ok(ClearPolicy::DepthOnly),
        "solid" | "color" | "colour" => Ok(ClearPolicy::Solid),
        other => Err(format!(
            "unknown clear policy '{other}'; expected depth-only or solid"
        )),
    }
}
