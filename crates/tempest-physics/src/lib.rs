//! Physics integration: rigid bodies, collision records and world stepping.
//!
//! Wraps the Rapier 3D physics engine behind a single [`PhysicsWorld`] resource
//! that owns all simulation state and exposes it through the
//! [`DynamicsWorld`] capability.

mod collision;
mod dynamics;

use bevy_ecs::prelude::*;
use rapier3d::prelude::*;
use rustc_hash::FxHashMap;

pub use collision::{
    CollisionClassifier, CollisionKind, CollisionRecord, ContactListener, ContactResponse,
    classify_contact,
};
pub use dynamics::{BodyDesc, BodyHandle, BodyShape, BodyTransform, DynamicsWorld};

/// Rotation type expected by rapier bodies.
type Rotation = rapier3d::math::Rotation;

/// Central physics simulation resource owning all Rapier state.
///
/// Besides the Rapier sets it keeps the collision record of every body in a
/// side-table keyed by body handle, and the contact listener that classifies
/// contacts during [`PhysicsWorld::step`].
#[derive(Resource)]
pub struct PhysicsWorld {
    /// World-space gravity vector.
    pub gravity: Vector,
    /// Timestep and solver configuration.
    pub integration_parameters: IntegrationParameters,
    /// The main simulation pipeline.
    pub physics_pipeline: PhysicsPipeline,
    /// Tracks sleeping/awake body islands.
    pub island_manager: IslandManager,
    /// Broad-phase collision detection.
    pub broad_phase: BroadPhaseBvh,
    /// Narrow-phase collision detection (contact manifolds).
    pub narrow_phase: NarrowPhase,
    /// All rigid bodies in the simulation.
    pub rigid_body_set: RigidBodySet,
    /// All colliders in the simulation.
    pub collider_set: ColliderSet,
    /// Impulse-based joints (unused by the scene, required by the pipeline).
    pub impulse_joint_set: ImpulseJointSet,
    /// Multibody joints (unused by the scene, required by the pipeline).
    pub multibody_joint_set: MultibodyJointSet,
    /// Continuous collision detection solver.
    pub ccd_solver: CCDSolver,
    records: FxHashMap<RigidBodyHandle, CollisionRecord>,
    listener: Box<dyn ContactListener>,
    hits_flagged: u64,
}

impl PhysicsWorld {
    /// Creates a new physics world with gravity `(0, -9.82, 0)`, a timestep of
    /// `1/60` seconds and a [`CollisionClassifier`] as contact listener.
    pub fn new() -> Self {
        let integration_parameters = IntegrationParameters {
            dt: 1.0 / 60.0,
            ..Default::default()
        };

        Self {
            gravity: Vector::new(0.0, -9.82, 0.0),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            records: FxHashMap::default(),
            listener: Box::new(CollisionClassifier::new()),
            hits_flagged: 0,
        }
    }

    /// Advances the simulation by one fixed timestep, then reports every
    /// contact point to the listener.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            &(),
            &(),
        );
        self.dispatch_contacts();
    }

    /// Sets the world gravity vector.
    pub fn set_gravity(&mut self, x: f32, y: f32, z: f32) {
        self.gravity = Vector::new(x, y, z);
    }

    /// Returns the current gravity as `(x, y, z)`.
    pub fn gravity(&self) -> (f32, f32, f32) {
        (self.gravity.x, self.gravity.y, self.gravity.z)
    }

    /// Sets the fixed timestep used by [`PhysicsWorld::step`].
    pub fn set_timestep(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
    }

    /// Number of records whose `hit` flag went from clear to set.
    pub fn hits_flagged(&self) -> u64 {
        self.hits_flagged
    }

    fn dispatch_contacts(&mut self) {
        let Self {
            narrow_phase,
            collider_set,
            records,
            listener,
            hits_flagged,
            ..
        } = self;

        let parent = |h: ColliderHandle| collider_set.get(h).and_then(|c| c.parent());

        for pair in narrow_phase.contact_pairs() {
            let (Some(body_a), Some(body_b)) = (parent(pair.collider1), parent(pair.collider2))
            else {
                continue;
            };

            for manifold in pair.manifolds.iter() {
                for _contact in manifold.contacts() {
                    let (Some(mut rec_a), Some(mut rec_b)) =
                        (records.get(&body_a).copied(), records.get(&body_b).copied())
                    else {
                        continue;
                    };
                    let before = u64::from(!rec_a.hit) + u64::from(!rec_b.hit);

                    let ContactResponse::Unmodified = listener.on_contact(
                        (BodyHandle(body_a), &mut rec_a),
                        (BodyHandle(body_b), &mut rec_b),
                    );

                    let after = u64::from(!rec_a.hit) + u64::from(!rec_b.hit);
                    *hits_flagged += before.saturating_sub(after);
                    records.insert(body_a, rec_a);
                    records.insert(body_b, rec_b);
                }
            }
        }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicsWorld for PhysicsWorld {
    fn create_body(&mut self, desc: &BodyDesc, record: CollisionRecord) -> BodyHandle {
        let p = desc.transform.position;
        let axis = desc.transform.orientation.to_scaled_axis();
        let builder = if desc.mass > 0.0 {
            RigidBodyBuilder::dynamic()
        } else {
            RigidBodyBuilder::fixed()
        };
        let v = desc.linear_velocity;
        let body = builder
            .translation(Vector::new(p.x, p.y, p.z))
            .rotation(Vector::new(axis.x, axis.y, axis.z))
            .linvel(Vector::new(v.x, v.y, v.z))
            .build();
        let body_handle = self.rigid_body_set.insert(body);

        let mut collider = ColliderBuilder::new(build_shared_shape(&desc.shape))
            .friction(desc.friction)
            .restitution(desc.restitution);
        if desc.mass > 0.0 {
            collider = collider.mass(desc.mass);
        }
        self.collider_set.insert_with_parent(
            collider.build(),
            body_handle,
            &mut self.rigid_body_set,
        );

        self.records.insert(body_handle, record);
        tracing::debug!(?body_handle, kind = ?record.kind, "created rigid body");
        BodyHandle(body_handle)
    }

    fn remove_body(&mut self, handle: BodyHandle) -> bool {
        self.records.remove(&handle.0);
        self.rigid_body_set
            .remove(
                handle.0,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    fn transform(&self, handle: BodyHandle) -> Option<BodyTransform> {
        let body = self.rigid_body_set.get(handle.0)?;
        let t = body.translation();
        let r = body.rotation();
        Some(BodyTransform {
            position: glam::Vec3::new(t.x, t.y, t.z),
            orientation: glam::Quat::from_xyzw(r.x, r.y, r.z, r.w),
        })
    }

    fn set_transform(&mut self, handle: BodyHandle, transform: BodyTransform) {
        let Some(body) = self.rigid_body_set.get_mut(handle.0) else {
            tracing::warn!(?handle, "set_transform on a stale body handle");
            return;
        };
        let p = transform.position;
        let axis = transform.orientation.to_scaled_axis();
        body.set_translation(Vector::new(p.x, p.y, p.z), true);
        body.set_rotation(
            Rotation::from_scaled_axis(Vector::new(axis.x, axis.y, axis.z)),
            true,
        );
    }

    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: glam::Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle.0) {
            body.set_linvel(Vector::new(velocity.x, velocity.y, velocity.z), true);
            body.set_angvel(Vector::new(0.0, 0.0, 0.0), true);
        }
    }

    fn record(&self, handle: BodyHandle) -> Option<&CollisionRecord> {
        self.records.get(&handle.0)
    }

    fn take_hit(&mut self, handle: BodyHandle) -> bool {
        self.records
            .get_mut(&handle.0)
            .map(|record| std::mem::replace(&mut record.hit, false))
            .unwrap_or(false)
    }

    fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        PhysicsWorld::step(self);
    }

    fn set_contact_listener(&mut self, listener: Box<dyn ContactListener>) {
        self.listener = listener;
    }

    fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }
}

/// Builds a [`SharedShape`] from a [`BodyShape`] definition.
fn build_shared_shape(shape: &BodyShape) -> SharedShape {
    match shape {
        BodyShape::Sphere { radius } => SharedShape::ball(*radius),
        BodyShape::Capsule {
            half_height,
            radius,
        } => SharedShape::capsule_y(*half_height, *radius),
        BodyShape::Cuboid { half_extents } => {
            SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }
    }
}

/// ECS system that steps the physics simulation once per invocation.
pub fn physics_step_system(mut physics: ResMut<PhysicsWorld>) {
    physics.step();
}

#[cfg(test)]
#[path = "world_tests.rs"]
mod tests;
