//! The dynamics-world capability handed to particle systems.
//!
//! The scene owns the world; particle systems only see `&mut dyn DynamicsWorld`
//! and use it to create, reset and query their bodies.

use glam::{Quat, Vec3};

use crate::collision::{CollisionRecord, ContactListener};

/// Typed handle of a rigid body (generational arena index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub rapier3d::prelude::RigidBodyHandle);

impl BodyHandle {
    /// A handle that never refers to a live body.
    pub fn invalid() -> Self {
        Self(rapier3d::prelude::RigidBodyHandle::invalid())
    }
}

/// Collision shape of a body.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyShape {
    /// Sphere.
    Sphere {
        /// Radius.
        radius: f32,
    },
    /// Capsule aligned along the Y axis.
    Capsule {
        /// Half the height of the cylindrical part.
        half_height: f32,
        /// Radius of the hemispheres.
        radius: f32,
    },
    /// Axis-aligned box.
    Cuboid {
        /// Half-extents along each axis.
        half_extents: Vec3,
    },
}

/// Position and orientation of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyTransform {
    /// World-space translation.
    pub position: Vec3,
    /// World-space orientation.
    pub orientation: Quat,
}

impl BodyTransform {
    /// Transform at `position` rotated by `yaw` radians about +Y.
    pub fn from_position_yaw(position: Vec3, yaw: f32) -> Self {
        Self {
            position,
            orientation: Quat::from_rotation_y(yaw),
        }
    }
}

/// Everything needed to insert a body.
///
/// A mass of zero creates a fixed body that never moves.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    /// Collision shape.
    pub shape: BodyShape,
    /// Initial transform.
    pub transform: BodyTransform,
    /// Mass in kilograms; zero for static bodies.
    pub mass: f32,
    /// Surface friction coefficient.
    pub friction: f32,
    /// Restitution (bounciness).
    pub restitution: f32,
    /// Initial linear velocity.
    pub linear_velocity: Vec3,
}

/// Rigid-body world as seen by its clients.
pub trait DynamicsWorld {
    /// Inserts a body with its collision record and returns its handle.
    fn create_body(&mut self, desc: &BodyDesc, record: CollisionRecord) -> BodyHandle;

    /// Removes a body and its record. Returns `false` if the handle was stale.
    fn remove_body(&mut self, handle: BodyHandle) -> bool;

    /// Current transform, or `None` for a stale handle.
    fn transform(&self, handle: BodyHandle) -> Option<BodyTransform>;

    /// Teleports a body.
    fn set_transform(&mut self, handle: BodyHandle, transform: BodyTransform);

    /// Overwrites linear velocity and clears angular velocity.
    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3);

    /// Collision record attached to a body.
    fn record(&self, handle: BodyHandle) -> Option<&CollisionRecord>;

    /// Returns the body's `hit` flag and clears it.
    fn take_hit(&mut self, handle: BodyHandle) -> bool;

    /// Advances the simulation by `dt` seconds, invoking the contact listener.
    fn step(&mut self, dt: f32);

    /// Replaces the contact listener.
    fn set_contact_listener(&mut self, listener: Box<dyn ContactListener>);

    /// Number of bodies in the world.
    fn body_count(&self) -> usize;
}
