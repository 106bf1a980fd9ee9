//! A single pool slot and its lifecycle.

use glam::Vec3;
use tempest_physics::BodyHandle;

/// How a slot decides whether it is alive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lifecycle {
    /// Counted down by the frame delta; alive while `remaining > 0`.
    Timed {
        /// Seconds left.
        remaining: f32,
    },
    /// Driven by a rigid body in the dynamics world.
    PhysicsBound {
        /// Body created on the slot's first spawn and reused afterwards.
        body: Option<BodyHandle>,
        /// Cleared when the slot expires or is recycled after a hit.
        alive: bool,
        /// Seconds left, when physics-bound particles expire.
        remaining: Option<f32>,
    },
}

impl Lifecycle {
    /// Inert timed lifecycle.
    pub const fn timed() -> Self {
        Self::Timed { remaining: 0.0 }
    }

    /// Inert physics-bound lifecycle with no body yet.
    pub const fn physics_bound() -> Self {
        Self::PhysicsBound {
            body: None,
            alive: false,
            remaining: None,
        }
    }

    /// Whether the slot currently holds a live particle.
    pub fn is_alive(&self) -> bool {
        match *self {
            Self::Timed { remaining } => remaining > 0.0,
            Self::PhysicsBound { alive, .. } => alive,
        }
    }

    /// Body bound to the slot, if any.
    pub fn body(&self) -> Option<BodyHandle> {
        match *self {
            Self::Timed { .. } => None,
            Self::PhysicsBound { body, .. } => body,
        }
    }

    /// Marks the slot dead without touching its body binding.
    pub fn kill(&mut self) {
        match self {
            Self::Timed { remaining } => *remaining = 0.0,
            Self::PhysicsBound { alive, .. } => *alive = false,
        }
    }
}

/// One element of the particle pool.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// World-space position.
    pub position: Vec3,
    /// Per-axis speed, used by timed particles.
    pub velocity: Vec3,
    /// Liveness and body binding.
    pub lifecycle: Lifecycle,
    /// Distance to the camera computed this frame; negative when dead.
    pub camera_distance: f32,
    /// Set by the simulation, cleared once drawn.
    pub to_draw: bool,
    /// Random rotation in degrees picked at spawn.
    pub rotation_deg: f32,
}

impl Particle {
    /// An inert particle with the given lifecycle kind.
    pub fn inert(lifecycle: Lifecycle) -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            lifecycle,
            camera_distance: 0.0,
            to_draw: false,
            rotation_deg: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.lifecycle.is_alive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inert_particles_are_dead() {
        for lifecycle in [Lifecycle::timed(), Lifecycle::physics_bound()] {
            let p = Particle::inert(lifecycle);
            assert!(!p.is_alive());
            assert!(!p.to_draw);
            assert_eq!(p.camera_distance, 0.0);
            assert_eq!(p.lifecycle.body(), None);
        }
    }

    #[test]
    fn test_timed_alive_only_while_positive() {
        assert!(Lifecycle::Timed { remaining: 0.01 }.is_alive());
        assert!(!Lifecycle::Timed { remaining: 0.0 }.is_alive());
        assert!(!Lifecycle::Timed { remaining: -3.0 }.is_alive());
    }

    #[test]
    fn test_kill_keeps_body() {
        let body = BodyHandle::invalid();
        let mut lifecycle = Lifecycle::PhysicsBound {
            body: Some(body),
            alive: true,
            remaining: None,
        };
        lifecycle.kill();
        assert!(!lifecycle.is_alive());
        assert_eq!(lifecycle.body(), Some(body));

        let mut timed = Lifecycle::Timed { remaining: 4.0 };
        timed.kill();
        assert!(!timed.is_alive());
    }
}
