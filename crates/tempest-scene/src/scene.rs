//! The weather scene: terrain, rain and snow systems, and the dynamics world
//! they share.

use glam::Vec3;
use tempest_config::Config;
use tempest_particles::{FrameStats, ParticleRenderer, ParticleSystem, SpawnRegion};
use tempest_physics::{
    BodyDesc, BodyHandle, BodyShape, BodyTransform, CollisionRecord, DynamicsWorld, PhysicsWorld,
};
use tracing::{debug, info};

use crate::camera::Camera;
use crate::error::SceneError;
use crate::stepper::FixedStepper;
use crate::weather::{ShaderSelection, WeatherState};

/// What one frame produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneFrame {
    /// Rain counters, when rain is on.
    pub rain: Option<FrameStats>,
    /// Snow counters, when snow is on.
    pub snow: Option<FrameStats>,
    /// Fixed physics steps taken after drawing.
    pub physics_steps: u32,
    pub shader: ShaderSelection,
    pub shader_level: Option<f32>,
    pub fog: bool,
}

/// Owns every piece of the weather demo.
///
/// A frame advances the surface levels, updates whichever precipitation is
/// active and then steps the dynamics world on a fixed timestep.
pub struct WeatherScene {
    physics: PhysicsWorld,
    terrain: BodyHandle,
    rain: ParticleSystem,
    snow: ParticleSystem,
    weather: WeatherState,
    stepper: FixedStepper,
    camera: Camera,
    last_frame: f64,
    frame_count: u64,
}

impl WeatherScene {
    /// Builds the scene with its clock starting at `now`.
    ///
    /// The physics section is checked before any body is created; region and
    /// particle settings are rejected by their own constructors.
    pub fn new(config: &Config, now: f64) -> Result<Self, SceneError> {
        config.physics.validate()?;
        let mut physics = PhysicsWorld::new();
        let [gx, gy, gz] = config.physics.gravity;
        physics.set_gravity(gx, gy, gz);
        physics.set_timestep(config.physics.timestep as f32);

        let terrain = physics.create_body(
            &BodyDesc {
                shape: BodyShape::Cuboid {
                    half_extents: Vec3::from_array(config.physics.terrain_half_extents),
                },
                transform: BodyTransform::from_position_yaw(
                    Vec3::from_array(config.physics.terrain_position),
                    0.0,
                ),
                mass: 0.0,
                friction: 0.5,
                restitution: 0.0,
                linear_velocity: Vec3::ZERO,
            },
            CollisionRecord::terrain(),
        );

        let region = SpawnRegion::from_config(&config.weather.spawn_region)?;
        let rain = ParticleSystem::from_config("rain", &config.rain, region, now)?;
        let snow = ParticleSystem::from_config("snow", &config.snow, region, now)?;

        let mut camera = Camera::default();
        camera.set_aspect_ratio(config.window.width as f32, config.window.height as f32);

        let weather = WeatherState::from_config(&config.weather);
        info!(
            rain_capacity = config.rain.capacity,
            snow_capacity = config.snow.capacity,
            rain_mode = ?config.rain.mode,
            snow_mode = ?config.snow.mode,
            weather = ?weather.current(),
            fog = weather.fog_active(),
            "weather scene ready"
        );

        Ok(Self {
            physics,
            terrain,
            rain,
            snow,
            weather,
            stepper: FixedStepper::new(config.physics.timestep, config.physics.max_frame_time),
            camera,
            last_frame: now,
            frame_count: 0,
        })
    }

    /// Produces one frame at time `now`, drawing into `renderer`.
    pub fn frame(
        &mut self,
        now: f64,
        renderer: &mut dyn ParticleRenderer,
    ) -> Result<SceneFrame, SceneError> {
        let dt = (now - self.last_frame).max(0.0);
        self.last_frame = now;
        self.weather.advance(dt as f32);

        let rain = if self.weather.is_raining() {
            Some(
                self.rain
                    .update(now, &self.camera, Some(&mut self.physics), renderer)?,
            )
        } else {
            None
        };
        let snow = if self.weather.is_snowing() {
            Some(
                self.snow
                    .update(now, &self.camera, Some(&mut self.physics), renderer)?,
            )
        } else {
            None
        };

        let physics = &mut self.physics;
        let physics_steps = self
            .stepper
            .advance(dt, |step| DynamicsWorld::step(&mut *physics, step as f32));

        self.frame_count += 1;
        Ok(SceneFrame {
            rain,
            snow,
            physics_steps,
            shader: self.weather.shader(),
            shader_level: self.weather.shader_level(),
            fog: self.weather.fog_active(),
        })
    }

    pub fn toggle_rain(&mut self) {
        self.weather.toggle_rain();
    }

    pub fn toggle_snow(&mut self) {
        self.weather.toggle_snow();
    }

    pub fn toggle_fog(&mut self) {
        self.weather.toggle_fog();
    }

    pub fn weather(&self) -> &WeatherState {
        &self.weather
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn rain(&self) -> &ParticleSystem {
        &self.rain
    }

    pub fn snow(&self) -> &ParticleSystem {
        &self.snow
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    pub fn terrain(&self) -> BodyHandle {
        self.terrain
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Removes every particle body and the terrain from the dynamics world.
    /// Returns the number of bodies removed.
    pub fn shutdown(&mut self) -> usize {
        let mut removed = self.rain.release_bodies(&mut self.physics);
        removed += self.snow.release_bodies(&mut self.physics);
        if self.physics.remove_body(self.terrain) {
            removed += 1;
        }
        debug!(removed, remaining = self.physics.body_count(), "dynamics world cleared");
        info!(frames = self.frame_count, "weather scene shut down");
        removed
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
