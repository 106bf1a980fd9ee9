//! Weather particle systems: spawn region, pooled particles with slot
//! recycling, kinematic or physics-driven motion, back-to-front ordering and
//! instanced drawing through a renderer seam.

pub mod particle;
pub mod pool;
pub mod region;
pub mod render;
pub mod sort;
pub mod system;
pub mod systems;

pub use particle::{Lifecycle, Particle};
pub use pool::{ParticlePool, spawn_budget, spawn_cap};
pub use region::{RegionError, SpawnRegion};
pub use render::{
    Appearance, BlendMode, DrawBatch, DrawInstance, DrawList, InstanceData, ParticleRenderer,
    RandomRotation, ViewPoint, normal_matrix,
};
pub use sort::{DEAD_DISTANCE, DepthOrder};
pub use system::{
    DynamicSettings, FrameStage, FrameStats, ParticleError, ParticleMode, ParticleSettings,
    ParticleSystem,
};
pub use systems::{
    ActiveEmitter, FrameClock, ViewState, add_particle_systems, build_particle_schedule,
};
