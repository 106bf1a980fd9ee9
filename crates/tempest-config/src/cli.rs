//! Command-line argument parsing for Tempest.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::{Config, SimulationMode};

/// Particle motion mode selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Analytic integration, particles expire.
    Kinematic,
    /// Rigid bodies in the dynamics world.
    Dynamic,
}

impl From<ModeArg> for SimulationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Kinematic => SimulationMode::Kinematic,
            ModeArg::Dynamic => SimulationMode::Dynamic,
        }
    }
}

/// Tempest command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "tempest", about = "Headless weather particle scene")]
pub struct CliArgs {
    /// Number of frames to simulate.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Start with rain enabled.
    #[arg(long)]
    pub rain: bool,

    /// Start with snow enabled.
    #[arg(long)]
    pub snow: bool,

    /// Start with fog enabled.
    #[arg(long)]
    pub fog: bool,

    /// Particle motion mode for both systems.
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Seed for spawn sampling (both systems).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(frames) = args.frames {
            self.debug.frames = frames;
        }
        if args.rain {
            self.weather.rain = true;
        }
        if args.snow {
            self.weather.snow = true;
        }
        if args.fog {
            self.weather.fog = true;
        }
        if let Some(mode) = args.mode {
            self.rain.mode = mode.into();
            self.snow.mode = mode.into();
        }
        if let Some(seed) = args.seed {
            self.rain.seed = Some(seed);
            self.snow.seed = Some(seed.wrapping_add(1));
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
