//! The particle system: spawn, simulate, sort and draw, once per frame.
//!
//! A [`ParticleSystem`] owns its pool, its spawn region and its random
//! source. Frames advance through [`FrameStage`]s in a fixed order; each
//! stage is also callable on its own. In [`ParticleMode::Dynamic`] the
//! system borrows the scene's dynamics world for the duration of a call and
//! keeps only body handles.

use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempest_config::{ExhaustionPolicy, ParticleConfig, SimulationMode};
use tempest_physics::{BodyDesc, BodyShape, BodyTransform, CollisionRecord, DynamicsWorld};
use tracing::{debug, trace, warn};

use crate::particle::{Lifecycle, Particle};
use crate::pool::{ParticlePool, spawn_budget};
use crate::region::SpawnRegion;
use crate::render::{Appearance, BlendMode, DrawInstance, ParticleRenderer, ViewPoint, normal_matrix};
use crate::sort::{DEAD_DISTANCE, DepthOrder};

/// Errors raised by particle systems.
#[derive(Debug, thiserror::Error)]
pub enum ParticleError {
    /// A dynamic-mode system was driven without a dynamics world.
    #[error("particle system '{0}' runs in dynamic mode but no dynamics world was supplied")]
    DynamicsWorldRequired(String),
    /// Settings that cannot produce a working system.
    #[error("invalid particle settings: {0}")]
    InvalidConfig(String),
}

/// Rigid body parameters of physics-driven particles.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicSettings {
    pub shape: BodyShape,
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
    /// Seconds a physics-bound particle lives; `None` never expires.
    pub expire_after: Option<f32>,
    /// Recycle a particle once it touched the terrain.
    pub recycle_on_hit: bool,
}

impl Default for DynamicSettings {
    fn default() -> Self {
        Self {
            shape: BodyShape::Sphere { radius: 0.05 },
            mass: 0.01,
            friction: 0.0,
            restitution: 0.0,
            expire_after: None,
            recycle_on_hit: false,
        }
    }
}

/// How positions advance.
#[derive(Debug, Clone, PartialEq)]
pub enum ParticleMode {
    /// Direct integration with a lifetime countdown.
    Kinematic,
    /// Positions read back from bodies in a dynamics world.
    Dynamic(DynamicSettings),
}

impl ParticleMode {
    fn lifecycle(&self) -> Lifecycle {
        match self {
            Self::Kinematic => Lifecycle::timed(),
            Self::Dynamic(_) => Lifecycle::physics_bound(),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic(_))
    }
}

/// Spawn and motion parameters shared by both modes.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSettings {
    pub capacity: usize,
    /// Spawns per second of elapsed time.
    pub spawn_rate: f32,
    /// Elapsed-time cap of the spawn budget, in seconds.
    pub frame_budget: f32,
    /// Lifetime of timed particles, in seconds.
    pub lifetime: f32,
    /// Per-axis speed.
    pub speed: Vec3,
    /// Fall direction, multiplied component-wise with `speed`.
    pub direction: Vec3,
    pub exhaustion: ExhaustionPolicy,
    pub appearance: Appearance,
}

impl ParticleSettings {
    pub fn from_config(config: &ParticleConfig) -> Self {
        Self {
            capacity: config.capacity,
            spawn_rate: config.spawn_rate,
            frame_budget: config.frame_budget,
            lifetime: config.lifetime,
            speed: Vec3::from_array(config.speed),
            direction: Vec3::from_array(config.direction),
            exhaustion: config.exhaustion,
            appearance: Appearance::from_config(&config.appearance),
        }
    }

    fn validate(&self) -> Result<(), ParticleError> {
        if self.capacity == 0 {
            return Err(ParticleError::InvalidConfig("capacity must be at least 1".into()));
        }
        if !(self.spawn_rate >= 0.0) || !(self.frame_budget >= 0.0) {
            return Err(ParticleError::InvalidConfig(format!(
                "spawn rate {} and frame budget {} must be non-negative",
                self.spawn_rate, self.frame_budget
            )));
        }
        if let Some(r) = &self.appearance.random_rotation
            && !(r.min_deg <= r.max_deg)
        {
            return Err(ParticleError::InvalidConfig(format!(
                "random rotation range [{}, {}] is empty",
                r.min_deg, r.max_deg
            )));
        }
        Ok(())
    }
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self::from_config(&ParticleConfig::rain())
    }
}

/// Where a system is within its frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameStage {
    #[default]
    Idle,
    Spawning,
    Simulating,
    Sorting,
    Drawing,
}

/// Counters for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Slots (re)spawned.
    pub spawned: usize,
    /// Slots alive after simulation.
    pub live: usize,
    /// Instances handed to the renderer.
    pub drawn: usize,
    /// Particles whose body touched the terrain since the previous frame.
    pub hits: usize,
    /// Bodies created this frame.
    pub bodies_created: usize,
}

/// A pool of weather particles and everything needed to advance and draw it.
#[derive(Component)]
pub struct ParticleSystem {
    name: String,
    pool: ParticlePool,
    order: DepthOrder,
    region: SpawnRegion,
    settings: ParticleSettings,
    mode: ParticleMode,
    rng: ChaCha8Rng,
    last_update: f64,
    delta: f32,
    stage: FrameStage,
    stats: FrameStats,
    bodies_created: usize,
}

impl ParticleSystem {
    /// Creates a system whose clock starts at `now`.
    ///
    /// `seed` makes spawn positions reproducible; `None` seeds from OS entropy.
    pub fn new(
        name: impl Into<String>,
        settings: ParticleSettings,
        mode: ParticleMode,
        region: SpawnRegion,
        seed: Option<u64>,
        now: f64,
    ) -> Result<Self, ParticleError> {
        settings.validate()?;
        let name = name.into();
        let pool = ParticlePool::new(settings.capacity, mode.lifecycle(), settings.exhaustion);
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        debug!(
            system = %name,
            capacity = settings.capacity,
            dynamic = mode.is_dynamic(),
            "particle system created"
        );
        Ok(Self {
            name,
            order: DepthOrder::new(pool.len()),
            pool,
            region,
            settings,
            mode,
            rng,
            last_update: now,
            delta: 0.0,
            stage: FrameStage::Idle,
            stats: FrameStats::default(),
            bodies_created: 0,
        })
    }

    /// Builds a system from its configuration section.
    pub fn from_config(
        name: impl Into<String>,
        config: &ParticleConfig,
        region: SpawnRegion,
        now: f64,
    ) -> Result<Self, ParticleError> {
        let mode = match config.mode {
            SimulationMode::Kinematic => ParticleMode::Kinematic,
            SimulationMode::Dynamic => {
                let d = &config.dynamic;
                let shape = if d.half_height > 0.0 {
                    BodyShape::Capsule {
                        half_height: d.half_height,
                        radius: d.radius,
                    }
                } else {
                    BodyShape::Sphere { radius: d.radius }
                };
                ParticleMode::Dynamic(DynamicSettings {
                    shape,
                    mass: d.mass,
                    friction: d.friction,
                    restitution: d.restitution,
                    expire_after: d.expire_after,
                    recycle_on_hit: d.recycle_on_hit,
                })
            }
        };
        Self::new(
            name,
            ParticleSettings::from_config(config),
            mode,
            region,
            config.seed,
            now,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> FrameStage {
        self.stage
    }

    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    pub fn order(&self) -> &DepthOrder {
        &self.order
    }

    pub fn mode(&self) -> &ParticleMode {
        &self.mode
    }

    pub fn settings(&self) -> &ParticleSettings {
        &self.settings
    }

    pub fn region(&self) -> &SpawnRegion {
        &self.region
    }

    /// Counters of the most recent frame.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Bodies created over the system's lifetime.
    pub fn bodies_created(&self) -> usize {
        self.bodies_created
    }

    /// Frame delta measured by the last [`ParticleSystem::spawn`].
    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Runs a whole frame and returns its counters.
    pub fn update(
        &mut self,
        now: f64,
        view: &dyn ViewPoint,
        mut world: Option<&mut dyn DynamicsWorld>,
        renderer: &mut dyn ParticleRenderer,
    ) -> Result<FrameStats, ParticleError> {
        self.spawn(now, world.as_deref_mut())?;
        self.simulate(view.position(), world)?;
        self.sort();
        self.draw(view.view_matrix(), renderer);
        let stats = self.stats;
        trace!(
            system = %self.name,
            spawned = stats.spawned,
            live = stats.live,
            drawn = stats.drawn,
            hits = stats.hits,
            "frame"
        );
        Ok(stats)
    }

    /// Measures the time since the last frame and (re)spawns the budgeted
    /// number of particles at random points of the region.
    ///
    /// Returns the number of spawns.
    pub fn spawn(
        &mut self,
        now: f64,
        world: Option<&mut (dyn DynamicsWorld + '_)>,
    ) -> Result<usize, ParticleError> {
        if self.mode.is_dynamic() && world.is_none() {
            return Err(ParticleError::DynamicsWorldRequired(self.name.clone()));
        }
        self.stage = FrameStage::Spawning;
        self.stats = FrameStats::default();

        let elapsed = now - self.last_update;
        self.last_update = now;
        self.delta = elapsed.max(0.0) as f32;
        let count = spawn_budget(elapsed, self.settings.spawn_rate, self.settings.frame_budget);

        let Self {
            pool,
            region,
            settings,
            mode,
            rng,
            stats,
            bodies_created,
            ..
        } = self;

        let mut world = world;
        for _ in 0..count {
            let slot = pool.find_unused_slot();
            let position = region.sample(rng);
            let rotation_deg = match &settings.appearance.random_rotation {
                Some(r) => rng.random_range(r.min_deg..=r.max_deg),
                None => 0.0,
            };
            let Some(particle) = pool.get_mut(slot) else {
                continue;
            };
            particle.position = position;
            particle.rotation_deg = rotation_deg;

            match (&*mode, world.as_deref_mut()) {
                (ParticleMode::Dynamic(dynamic), Some(world)) => {
                    if spawn_body(slot, particle, settings, dynamic, world) {
                        stats.bodies_created += 1;
                        *bodies_created += 1;
                    }
                }
                _ => {
                    particle.velocity = settings.speed;
                    particle.lifecycle = Lifecycle::Timed {
                        remaining: settings.lifetime,
                    };
                }
            }
        }

        stats.spawned = count;
        if stats.bodies_created > 0 {
            debug!(
                system = %self.name,
                created = stats.bodies_created,
                total = self.bodies_created,
                "bound new particle bodies"
            );
        }
        Ok(count)
    }

    /// Advances every particle by the last measured delta and refreshes its
    /// camera distance. Dead slots get [`DEAD_DISTANCE`].
    pub fn simulate(
        &mut self,
        camera: Vec3,
        world: Option<&mut (dyn DynamicsWorld + '_)>,
    ) -> Result<usize, ParticleError> {
        self.stage = FrameStage::Simulating;
        let dt = self.delta;
        let live = match (&self.mode, world) {
            (ParticleMode::Kinematic, _) => {
                simulate_timed(self.pool.particles_mut(), camera, self.settings.direction, dt)
            }
            (ParticleMode::Dynamic(dynamic), Some(world)) => {
                let (live, hits) =
                    simulate_bound(self.pool.particles_mut(), camera, dynamic, world, dt);
                self.stats.hits = hits;
                live
            }
            (ParticleMode::Dynamic(_), None) => {
                return Err(ParticleError::DynamicsWorldRequired(self.name.clone()));
            }
        };
        self.stats.live = live;
        Ok(live)
    }

    /// Orders slots farthest-first.
    pub fn sort(&mut self) {
        self.stage = FrameStage::Sorting;
        self.order.sort_back_to_front(self.pool.particles());
    }

    /// Issues one instance per particle marked for drawing, farthest first,
    /// and clears the marks.
    pub fn draw(&mut self, view: Mat4, renderer: &mut dyn ParticleRenderer) -> usize {
        self.stage = FrameStage::Drawing;
        let appearance = &self.settings.appearance;
        let particles = self.pool.particles_mut();

        renderer.begin_batch(appearance.color, BlendMode::Alpha);
        let mut drawn = 0;
        for slot in self.order.iter() {
            let Some(particle) = particles.get_mut(slot) else {
                continue;
            };
            if !particle.to_draw {
                continue;
            }
            particle.to_draw = false;
            let model = appearance.model_matrix(particle.position, particle.rotation_deg);
            renderer.draw_instance(&DrawInstance {
                slot,
                model,
                normal: normal_matrix(view, model),
            });
            drawn += 1;
        }
        renderer.end_batch();

        self.stats.drawn = drawn;
        self.stage = FrameStage::Idle;
        drawn
    }

    /// Removes every body this system created and resets its slots.
    ///
    /// Returns how many bodies were removed.
    pub fn release_bodies(&mut self, world: &mut dyn DynamicsWorld) -> usize {
        let mut removed = 0;
        let lifecycle = self.mode.lifecycle();
        for particle in self.pool.particles_mut() {
            if let Some(body) = particle.lifecycle.body() {
                if world.remove_body(body) {
                    removed += 1;
                }
                *particle = Particle::inert(lifecycle);
            }
        }
        if removed > 0 {
            debug!(system = %self.name, removed, "released particle bodies");
        }
        removed
    }
}

impl std::fmt::Debug for ParticleSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticleSystem")
            .field("name", &self.name)
            .field("capacity", &self.pool.len())
            .field("mode", &self.mode)
            .field("stage", &self.stage)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Creates the slot's body on first use, resets it afterwards.
/// Returns `true` when a body was created.
fn spawn_body(
    slot: usize,
    particle: &mut Particle,
    settings: &ParticleSettings,
    dynamic: &DynamicSettings,
    world: &mut dyn DynamicsWorld,
) -> bool {
    let transform =
        BodyTransform::from_position_yaw(particle.position, particle.rotation_deg.to_radians());
    let velocity = settings.speed * settings.direction;

    let (body, created) = match particle.lifecycle.body() {
        Some(body) => {
            world.set_transform(body, transform);
            world.set_linear_velocity(body, velocity);
            world.take_hit(body);
            (body, false)
        }
        None => {
            let desc = BodyDesc {
                shape: dynamic.shape.clone(),
                transform,
                mass: dynamic.mass,
                friction: dynamic.friction,
                restitution: dynamic.restitution,
                linear_velocity: velocity,
            };
            (world.create_body(&desc, CollisionRecord::particle(slot)), true)
        }
    };

    particle.velocity = velocity;
    particle.lifecycle = Lifecycle::PhysicsBound {
        body: Some(body),
        alive: true,
        remaining: dynamic.expire_after,
    };
    created
}

fn simulate_timed(particles: &mut [Particle], camera: Vec3, direction: Vec3, dt: f32) -> usize {
    let mut live = 0;
    for p in particles {
        let Lifecycle::Timed { remaining } = &mut p.lifecycle else {
            p.camera_distance = DEAD_DISTANCE;
            continue;
        };
        if *remaining > 0.0 {
            *remaining -= dt;
            if *remaining > 0.0 {
                p.position += p.velocity * direction * dt;
                p.camera_distance = p.position.distance(camera);
                p.to_draw = true;
                live += 1;
                continue;
            }
        }
        p.camera_distance = DEAD_DISTANCE;
    }
    live
}

fn simulate_bound(
    particles: &mut [Particle],
    camera: Vec3,
    dynamic: &DynamicSettings,
    world: &mut dyn DynamicsWorld,
    dt: f32,
) -> (usize, usize) {
    let (mut live, mut hits) = (0, 0);
    for (slot, p) in particles.iter_mut().enumerate() {
        let Lifecycle::PhysicsBound {
            body: Some(body),
            alive: true,
            remaining,
        } = &mut p.lifecycle
        else {
            p.camera_distance = DEAD_DISTANCE;
            continue;
        };
        let body = *body;

        let expired = match remaining {
            Some(r) => {
                *r -= dt;
                *r <= 0.0
            }
            None => false,
        };
        let hit = world.take_hit(body);
        if hit {
            hits += 1;
        }
        if expired || (hit && dynamic.recycle_on_hit) {
            p.lifecycle.kill();
            p.camera_distance = DEAD_DISTANCE;
            continue;
        }

        let Some(transform) = world.transform(body) else {
            warn!(slot, ?body, "particle body missing from the dynamics world");
            p.lifecycle.kill();
            p.camera_distance = DEAD_DISTANCE;
            continue;
        };
        p.position = transform.position;
        p.camera_distance = p.position.distance(camera);
        p.to_draw = true;
        live += 1;
    }
    (live, hits)
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
