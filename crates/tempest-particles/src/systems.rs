//! ECS systems driving every active [`ParticleSystem`] once per schedule run.
//!
//! The four stages run as chained systems so that spawning, simulation,
//! sorting and drawing never interleave across emitters. The physics world,
//! when present, is the [`PhysicsWorld`] resource.

use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};
use tempest_physics::{DynamicsWorld, PhysicsWorld};
use tracing::warn;

use crate::render::{DrawList, ViewPoint};
use crate::system::ParticleSystem;

/// Time of the frame being produced, in seconds.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameClock {
    pub now: f64,
}

/// Camera state for the frame being produced.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub position: Vec3,
    pub view: Mat4,
}

impl ViewState {
    pub fn from_view(view: &dyn ViewPoint) -> Self {
        Self {
            position: view.position(),
            view: view.view_matrix(),
        }
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            view: Mat4::IDENTITY,
        }
    }
}

impl ViewPoint for ViewState {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn view_matrix(&self) -> Mat4 {
        self.view
    }
}

/// Marks a particle system that currently emits.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct ActiveEmitter;

pub fn spawn_particles_system(
    clock: Res<FrameClock>,
    mut physics: Option<ResMut<PhysicsWorld>>,
    mut emitters: Query<&mut ParticleSystem, With<ActiveEmitter>>,
) {
    for mut system in &mut emitters {
        let world = physics.as_deref_mut().map(|w| w as &mut dyn DynamicsWorld);
        if let Err(err) = system.spawn(clock.now, world) {
            warn!(%err, "particle spawn skipped");
        }
    }
}

pub fn simulate_particles_system(
    view: Res<ViewState>,
    mut physics: Option<ResMut<PhysicsWorld>>,
    mut emitters: Query<&mut ParticleSystem, With<ActiveEmitter>>,
) {
    for mut system in &mut emitters {
        let world = physics.as_deref_mut().map(|w| w as &mut dyn DynamicsWorld);
        if let Err(err) = system.simulate(view.position, world) {
            warn!(%err, "particle simulation skipped");
        }
    }
}

pub fn sort_particles_system(mut emitters: Query<&mut ParticleSystem, With<ActiveEmitter>>) {
    for mut system in &mut emitters {
        system.sort();
    }
}

pub fn draw_particles_system(
    view: Res<ViewState>,
    mut draw_list: ResMut<DrawList>,
    mut emitters: Query<&mut ParticleSystem, With<ActiveEmitter>>,
) {
    for mut system in &mut emitters {
        system.draw(view.view, &mut *draw_list);
    }
}

/// Adds the particle stages to `schedule` in frame order.
pub fn add_particle_systems(schedule: &mut Schedule) {
    schedule.add_systems(
        (
            spawn_particles_system,
            simulate_particles_system,
            sort_particles_system,
            draw_particles_system,
        )
            .chain(),
    );
}

/// A schedule containing only the chained particle stages.
pub fn build_particle_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    add_particle_systems(&mut schedule);
    schedule
}

#[cfg(test)]
mod tests {
    use bevy_ecs::system::RunSystemOnce;
    use glam::Vec2;
    use tempest_physics::physics_step_system;

    use super::*;
    use crate::region::SpawnRegion;
    use crate::system::{DynamicSettings, FrameStage, ParticleMode, ParticleSettings};

    fn emitter(mode: ParticleMode, seed: u64) -> ParticleSystem {
        let region = SpawnRegion::new(Vec2::splat(-5.0), Vec2::splat(5.0), 20.0).unwrap();
        let settings = ParticleSettings {
            capacity: 200,
            ..ParticleSettings::default()
        };
        ParticleSystem::new("ecs", settings, mode, region, Some(seed), 0.0).unwrap()
    }

    fn world_with_resources(now: f64) -> World {
        let mut world = World::new();
        world.insert_resource(FrameClock { now });
        world.insert_resource(ViewState {
            position: Vec3::new(0.0, 25.0, 40.0),
            view: Mat4::look_at_rh(Vec3::new(0.0, 25.0, 40.0), Vec3::ZERO, Vec3::Y),
        });
        world.insert_resource(DrawList::new());
        world
    }

    #[test]
    fn test_schedule_runs_all_stages() {
        let mut world = world_with_resources(0.005);
        let entity = world
            .spawn((emitter(ParticleMode::Kinematic, 1), ActiveEmitter))
            .id();

        let mut schedule = build_particle_schedule();
        schedule.run(&mut world);

        let system = world.get::<ParticleSystem>(entity).unwrap();
        assert_eq!(system.stage(), FrameStage::Idle);
        assert_eq!(system.stats().spawned, 50);
        assert_eq!(system.stats().drawn, 50);
        assert_eq!(world.resource::<DrawList>().instance_count(), 50);
    }

    #[test]
    fn test_inactive_emitters_are_skipped() {
        let mut world = world_with_resources(0.005);
        let idle = world.spawn(emitter(ParticleMode::Kinematic, 2)).id();

        build_particle_schedule().run(&mut world);

        let system = world.get::<ParticleSystem>(idle).unwrap();
        assert_eq!(system.pool().live_count(), 0);
        assert!(world.resource::<DrawList>().batches().is_empty());
    }

    #[test]
    fn test_each_emitter_gets_one_batch() {
        let mut world = world_with_resources(0.002);
        world.spawn((emitter(ParticleMode::Kinematic, 3), ActiveEmitter));
        world.spawn((emitter(ParticleMode::Kinematic, 4), ActiveEmitter));

        build_particle_schedule().run(&mut world);

        let list = world.resource::<DrawList>();
        assert_eq!(list.batches().len(), 2);
        assert_eq!(list.instance_count(), 40);
    }

    #[test]
    fn test_dynamic_emitter_uses_physics_resource() {
        let mut world = world_with_resources(0.001);
        world.insert_resource(PhysicsWorld::new());
        let entity = world
            .spawn((
                emitter(ParticleMode::Dynamic(DynamicSettings::default()), 5),
                ActiveEmitter,
            ))
            .id();

        let mut schedule = build_particle_schedule();
        schedule.run(&mut world);
        assert_eq!(world.resource::<PhysicsWorld>().body_count(), 10);

        for _ in 0..30 {
            world.run_system_once(physics_step_system).unwrap();
        }
        world.resource_mut::<FrameClock>().now = 0.001;
        schedule.run(&mut world);

        let system = world.get::<ParticleSystem>(entity).unwrap();
        assert_eq!(system.stats().live, 10);
        assert!(
            system
                .pool()
                .particles()
                .iter()
                .filter(|p| p.is_alive())
                .all(|p| p.position.y < 20.0)
        );
    }

    #[test]
    fn test_dynamic_emitter_without_physics_is_skipped() {
        let mut world = world_with_resources(1.0);
        let entity = world
            .spawn((
                emitter(ParticleMode::Dynamic(DynamicSettings::default()), 6),
                ActiveEmitter,
            ))
            .id();

        world.run_system_once(spawn_particles_system).unwrap();

        let system = world.get::<ParticleSystem>(entity).unwrap();
        assert_eq!(system.pool().live_count(), 0);
    }

    #[test]
    fn test_view_state_from_view_point() {
        let state = ViewState {
            position: Vec3::new(1.0, 2.0, 3.0),
            view: Mat4::from_translation(Vec3::new(-1.0, -2.0, -3.0)),
        };
        assert_eq!(ViewState::from_view(&state), state);
    }
}
