use tempest_config::ConfigError;
use tempest_particles::{ParticleError, RegionError};

/// Errors surfaced while building or running the weather scene.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("spawn region error: {0}")]
    Region(#[from] RegionError),
    #[error("particle system error: {0}")]
    Particles(#[from] ParticleError),
}
