//! Configuration system for Tempest.
//!
//! Provides runtime-configurable settings that persist to disk as RON files.
//! Supports CLI overrides via clap, hot-reload detection, and forward/backward
//! compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::{CliArgs, ModeArg};
pub use config::{
    AppearanceConfig, Config, DebugConfig, DynamicConfig, ExhaustionPolicy, ParticleConfig,
    PhysicsConfig, RandomRotationConfig, SimulationMode, SpawnRegionConfig, WeatherConfig,
    WindowConfig, default_config_dir,
};
pub use error::ConfigError;
