//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration for the weather scene.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window settings (only the aspect ratio matters for headless runs).
    pub window: WindowConfig,
    /// Weather toggles, surface level ramps and the shared spawn region.
    pub weather: WeatherConfig,
    /// Rain particle system.
    pub rain: ParticleConfig,
    /// Snow particle system.
    pub snow: ParticleConfig,
    /// Dynamics world settings.
    pub physics: PhysicsConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in logical pixels.
    pub width: u32,
    /// Window height in logical pixels.
    pub height: u32,
    /// Window title.
    pub title: String,
}

/// Weather state at startup and the rates driving surface wetness/snow cover.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WeatherConfig {
    /// Start with rain enabled. Rain and snow are mutually exclusive; rain wins.
    pub rain: bool,
    /// Start with snow enabled.
    pub snow: bool,
    /// Start with fog enabled.
    pub fog: bool,
    /// Level both surface effects restart from when a weather kind is enabled.
    pub level_start: f32,
    /// Seconds for the wet level to rise by 1.0.
    pub wet_ramp_seconds: f32,
    /// Upper clamp of the wet level.
    pub wet_max: f32,
    /// Seconds for the snow level to fall by 1.0.
    pub snow_ramp_seconds: f32,
    /// Lower clamp of the snow level.
    pub snow_min: f32,
    /// Area both particle systems spawn from.
    pub spawn_region: SpawnRegionConfig,
}

/// Axis-aligned spawn rectangle in the XZ plane at a fixed height.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpawnRegionConfig {
    /// Minimum corner as `[x, z]`.
    pub min: [f32; 2],
    /// Maximum corner as `[x, z]`.
    pub max: [f32; 2],
    /// Fixed spawn height.
    pub height: f32,
}

/// How particle positions are advanced each frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SimulationMode {
    /// Positions integrated directly from velocity; particles expire.
    #[default]
    Kinematic,
    /// Positions read back from rigid bodies in the dynamics world.
    Dynamic,
}

/// What the recycler does when every slot is alive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ExhaustionPolicy {
    /// Reuse slot 0.
    #[default]
    OverrideFirst,
    /// Reuse the slot under the recycling cursor.
    OverrideCursor,
}

/// Settings for one particle system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParticleConfig {
    /// Number of slots in the pool.
    pub capacity: usize,
    /// Particles spawned per second of elapsed time.
    pub spawn_rate: f32,
    /// Largest elapsed time (seconds) honoured by the spawn budget.
    pub frame_budget: f32,
    /// Lifetime of a kinematic particle in seconds.
    pub lifetime: f32,
    /// Per-axis speed multiplied component-wise with `direction`.
    pub speed: [f32; 3],
    /// Fall direction.
    pub direction: [f32; 3],
    /// Kinematic or physics-driven motion.
    pub mode: SimulationMode,
    /// Rigid body parameters used in dynamic mode.
    pub dynamic: DynamicConfig,
    /// Recycler behaviour under over-subscription.
    pub exhaustion: ExhaustionPolicy,
    /// Draw parameters.
    pub appearance: AppearanceConfig,
    /// Seed for spawn sampling. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

/// Rigid body parameters for physics-driven particles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DynamicConfig {
    /// Collider radius in meters.
    pub radius: f32,
    /// Half height of the capsule segment. Zero selects a sphere.
    pub half_height: f32,
    /// Mass in kilograms.
    pub mass: f32,
    /// Surface friction coefficient.
    pub friction: f32,
    /// Restitution (bounciness).
    pub restitution: f32,
    /// Kill physics-bound particles after this many seconds. `None` keeps them forever.
    pub expire_after: Option<f32>,
    /// Make a particle recyclable once it touched the terrain.
    pub recycle_on_hit: bool,
}

/// Model transform and color applied to every particle of a system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppearanceConfig {
    /// RGBA color uniform.
    pub color: [f32; 4],
    /// Fixed rotation of the particle mesh in degrees.
    pub model_rotation_deg: f32,
    /// Axis of the fixed rotation.
    pub model_rotation_axis: [f32; 3],
    /// Non-uniform mesh scale.
    pub scale: [f32; 3],
    /// Optional random per-particle rotation.
    pub random_rotation: Option<RandomRotationConfig>,
}

/// Range of the random per-particle rotation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RandomRotationConfig {
    /// Lower bound in degrees.
    pub min_deg: f32,
    /// Upper bound in degrees.
    pub max_deg: f32,
    /// Rotation axis.
    pub axis: [f32; 3],
}

/// Dynamics world configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity vector.
    pub gravity: [f32; 3],
    /// Fixed physics timestep in seconds.
    pub timestep: f64,
    /// Frame time clamp in seconds.
    pub max_frame_time: f64,
    /// Terrain body center.
    pub terrain_position: [f32; 3],
    /// Terrain cuboid half extents.
    pub terrain_half_extents: [f32; 3],
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Frames to run in headless mode.
    pub frames: u32,
    /// Emit a stats line every N frames (0 disables).
    pub stats_interval: u32,
}

// --- Default implementations ---

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            weather: WeatherConfig::default(),
            rain: ParticleConfig::rain(),
            snow: ParticleConfig::snow(),
            physics: PhysicsConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Tempest".to_string(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            rain: false,
            snow: false,
            fog: false,
            level_start: -0.2,
            wet_ramp_seconds: 10.0,
            wet_max: 1.0,
            snow_ramp_seconds: 20.0,
            snow_min: -0.98,
            spawn_region: SpawnRegionConfig::default(),
        }
    }
}

impl Default for SpawnRegionConfig {
    fn default() -> Self {
        Self {
            min: [-130.0, -130.0],
            max: [130.0, 130.0],
            height: 20.0,
        }
    }
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self::rain()
    }
}

impl ParticleConfig {
    /// Rain preset: thin, fast, translucent blue drops.
    pub fn rain() -> Self {
        Self {
            capacity: 100_000,
            spawn_rate: 10_000.0,
            frame_budget: 0.016,
            lifetime: 5.0,
            speed: [0.0, 9.81, 0.0],
            direction: [0.0, -1.0, 0.0],
            mode: SimulationMode::Kinematic,
            dynamic: DynamicConfig::default(),
            exhaustion: ExhaustionPolicy::OverrideFirst,
            appearance: AppearanceConfig {
                color: [122.0 / 255.0, 162.0 / 255.0, 226.0 / 255.0, 0.2],
                model_rotation_deg: -90.0,
                model_rotation_axis: [1.0, 0.0, 0.0],
                scale: [0.0009, 0.0009, 0.002],
                random_rotation: None,
            },
            seed: None,
        }
    }

    /// Snow preset: larger white flakes with a random yaw.
    pub fn snow() -> Self {
        Self {
            capacity: 10_000,
            appearance: AppearanceConfig {
                color: [1.0, 1.0, 1.0, 0.7],
                model_rotation_deg: 0.0,
                model_rotation_axis: [1.0, 0.0, 0.0],
                scale: [0.8, 0.8, 0.8],
                random_rotation: Some(RandomRotationConfig {
                    min_deg: 0.0,
                    max_deg: 180.0,
                    axis: [0.0, 1.0, 0.0],
                }),
            },
            ..Self::rain()
        }
    }
}

impl Default for DynamicConfig {
    fn default() -> Self {
        Self {
            radius: 0.05,
            half_height: 0.0,
            mass: 0.01,
            friction: 0.0,
            restitution: 0.0,
            expire_after: None,
            recycle_on_hit: false,
        }
    }
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        ParticleConfig::rain().appearance
    }
}

impl Default for RandomRotationConfig {
    fn default() -> Self {
        Self {
            min_deg: 0.0,
            max_deg: 180.0,
            axis: [0.0, 1.0, 0.0],
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.82, 0.0],
            timestep: 1.0 / 60.0,
            max_frame_time: 0.25,
            terrain_position: [0.0, -30.0, 0.0],
            terrain_half_extents: [130.0, 1.0, 130.0],
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            frames: 600,
            stats_interval: 60,
        }
    }
}

/// Platform config directory for Tempest, falling back to the working directory.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("tempest"))
        .unwrap_or_else(|| PathBuf::from("."))
}

// --- Validation ---

fn finite_positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} must be finite and positive")))
    }
}

fn finite_non_negative(field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} must be finite and non-negative")))
    }
}

fn all_finite(field: &str, values: &[f32]) -> Result<(), ConfigError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{values:?} contains a non-finite component")))
    }
}

impl PhysicsConfig {
    /// Rejects settings the fixed-step driver cannot run with.
    ///
    /// A zero, negative or NaN timestep would make the accumulator loop spin
    /// forever, and a frame clamp below one timestep would never step at all.
    pub fn validate(&self) -> Result<(), ConfigError> {
        finite_positive("physics.timestep", self.timestep)?;
        finite_positive("physics.max_frame_time", self.max_frame_time)?;
        if self.max_frame_time < self.timestep {
            return Err(ConfigError::invalid(
                "physics.max_frame_time",
                format!(
                    "{} is shorter than one timestep ({})",
                    self.max_frame_time, self.timestep
                ),
            ));
        }
        all_finite("physics.gravity", &self.gravity)?;
        all_finite("physics.terrain_position", &self.terrain_position)?;
        for (axis, extent) in ["x", "y", "z"].iter().zip(self.terrain_half_extents) {
            finite_positive(&format!("physics.terrain_half_extents.{axis}"), f64::from(extent))?;
        }
        Ok(())
    }
}

impl SpawnRegionConfig {
    /// Bounds must be finite and `min <= max` on both axes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        all_finite("weather.spawn_region.min", &self.min)?;
        all_finite("weather.spawn_region.max", &self.max)?;
        all_finite("weather.spawn_region.height", &[self.height])?;
        if self.min[0] > self.max[0] || self.min[1] > self.max[1] {
            return Err(ConfigError::invalid(
                "weather.spawn_region",
                format!("min {:?} exceeds max {:?}", self.min, self.max),
            ));
        }
        Ok(())
    }
}

impl WeatherConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        finite_positive("weather.wet_ramp_seconds", f64::from(self.wet_ramp_seconds))?;
        finite_positive("weather.snow_ramp_seconds", f64::from(self.snow_ramp_seconds))?;
        all_finite("weather.levels", &[self.level_start, self.wet_max, self.snow_min])?;
        self.spawn_region.validate()
    }
}

impl ParticleConfig {
    /// Checks one particle system section; `section` prefixes reported field names.
    pub fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::invalid(format!("{section}.capacity"), "must be at least 1"));
        }
        finite_non_negative(&format!("{section}.spawn_rate"), self.spawn_rate)?;
        finite_non_negative(&format!("{section}.frame_budget"), self.frame_budget)?;
        finite_non_negative(&format!("{section}.lifetime"), self.lifetime)?;
        all_finite(&format!("{section}.speed"), &self.speed)?;
        all_finite(&format!("{section}.direction"), &self.direction)?;

        if let Some(rotation) = &self.appearance.random_rotation {
            let field = format!("{section}.appearance.random_rotation");
            all_finite(&field, &[rotation.min_deg, rotation.max_deg])?;
            if rotation.min_deg > rotation.max_deg {
                return Err(ConfigError::invalid(
                    field,
                    format!("range [{}, {}] is empty", rotation.min_deg, rotation.max_deg),
                ));
            }
        }

        if self.mode == SimulationMode::Dynamic {
            let dynamic = &self.dynamic;
            finite_positive(&format!("{section}.dynamic.radius"), f64::from(dynamic.radius))?;
            finite_non_negative(&format!("{section}.dynamic.half_height"), dynamic.half_height)?;
            finite_positive(&format!("{section}.dynamic.mass"), f64::from(dynamic.mass))?;
            if let Some(secs) = dynamic.expire_after {
                finite_positive(&format!("{section}.dynamic.expire_after"), f64::from(secs))?;
            }
        }
        Ok(())
    }
}

// --- Load / Save / Reload ---

const CONFIG_FILE: &str = "config.ron";

impl Config {
    /// Checks every section. Run on every config read from disk.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.physics.validate()?;
        self.weather.validate()?;
        self.rain.validate("rain")?;
        self.snow.validate("snow")
    }

    /// Load config from the given directory, or create a default config file.
    ///
    /// A file that parses but fails [`Config::validate`] is an error; it is
    /// never replaced by defaults.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if !path.exists() {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", path.display());
            return Ok(config);
        }

        let config = Self::read_validated(&path)?;
        log::info!(
            "Loaded config from {} (rain {:?}, snow {:?})",
            path.display(),
            config.rain.mode,
            config.snow.mode
        );
        Ok(config)
    }

    /// Save config to the given directory as `config.ron`.
    ///
    /// Invalid configs are refused so the next load cannot fail on them.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let path = config_dir.join(CONFIG_FILE);
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&path, serialized).map_err(|source| ConfigError::Write { path, source })
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    ///
    /// An edit that breaks validation is reported as an error and the caller
    /// keeps running with `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read_validated(&config_dir.join(CONFIG_FILE))?;
        if &new_config == self {
            return Ok(None);
        }
        log::info!("Config reloaded with changes");
        Ok(Some(new_config))
    }

    fn read_validated(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = ron::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }
}
