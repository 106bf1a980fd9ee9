//! Back-to-front ordering of pool slots.

use crate::particle::Particle;

/// Camera distance assigned to dead slots so they sort after every live one.
pub const DEAD_DISTANCE: f32 = -1.0;

/// Permutation of slot indices ordered farthest-first.
///
/// The pool itself is never reordered; drawing walks this permutation.
#[derive(Debug, Clone, Default)]
pub struct DepthOrder {
    order: Vec<usize>,
}

impl DepthOrder {
    /// Identity order over `len` slots.
    pub fn new(len: usize) -> Self {
        Self {
            order: (0..len).collect(),
        }
    }

    /// Reorders the permutation by `camera_distance`, largest first.
    ///
    /// Ties are broken by slot index, so the result only depends on the
    /// distances.
    pub fn sort_back_to_front(&mut self, particles: &[Particle]) {
        if self.order.len() != particles.len() {
            self.order.clear();
            self.order.extend(0..particles.len());
        }
        self.order.sort_unstable_by(|&a, &b| {
            particles[b]
                .camera_distance
                .total_cmp(&particles[a].camera_distance)
                .then(a.cmp(&b))
        });
    }

    /// Slot indices, farthest first.
    pub fn as_slice(&self) -> &[usize] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
