//! Fixed-size particle pool with cursor-based slot recycling.

use tempest_config::ExhaustionPolicy;
use tracing::trace;

use crate::particle::{Lifecycle, Particle};

/// Number of particles to spawn for `elapsed` seconds at `rate` per second,
/// capped at what `frame_budget` seconds would produce.
///
/// Negative or NaN elapsed time yields zero.
pub fn spawn_budget(elapsed: f64, rate: f32, frame_budget: f32) -> usize {
    if elapsed.is_nan() || elapsed <= 0.0 {
        return 0;
    }
    let wanted = (elapsed * f64::from(rate)).floor();
    wanted.min(spawn_cap(rate, frame_budget) as f64) as usize
}

/// Largest number of spawns a single frame may produce.
pub fn spawn_cap(rate: f32, frame_budget: f32) -> usize {
    let cap = (f64::from(frame_budget) * f64::from(rate)).floor();
    if cap.is_nan() || cap <= 0.0 { 0 } else { cap as usize }
}

/// Fixed-length array of particles, reused for the pool's whole life.
#[derive(Debug, Clone)]
pub struct ParticlePool {
    particles: Vec<Particle>,
    last_used: usize,
    policy: ExhaustionPolicy,
}

impl ParticlePool {
    /// Creates `capacity` inert particles of the given lifecycle kind.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, lifecycle: Lifecycle, policy: ExhaustionPolicy) -> Self {
        assert!(capacity > 0, "particle pool needs at least one slot");
        Self {
            particles: vec![Particle::inert(lifecycle); capacity],
            last_used: 0,
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Recycling cursor: the slot handed out last.
    pub fn cursor(&self) -> usize {
        self.last_used
    }

    pub fn policy(&self) -> ExhaustionPolicy {
        self.policy
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn get(&self, slot: usize) -> Option<&Particle> {
        self.particles.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Particle> {
        self.particles.get_mut(slot)
    }

    /// Number of live slots.
    pub fn live_count(&self) -> usize {
        self.particles.iter().filter(|p| p.is_alive()).count()
    }

    /// Returns a dead slot to respawn, scanning from the cursor and wrapping
    /// around. The cursor moves to the returned slot.
    ///
    /// When every slot is alive the exhaustion policy picks a live slot to
    /// override and the cursor stays put.
    pub fn find_unused_slot(&mut self) -> usize {
        let len = self.particles.len();
        let start = self.last_used.min(len - 1);
        let found = (start..len)
            .chain(0..start)
            .find(|&i| !self.particles[i].is_alive());

        match found {
            Some(slot) => {
                self.last_used = slot;
                slot
            }
            None => {
                let slot = match self.policy {
                    ExhaustionPolicy::OverrideFirst => 0,
                    ExhaustionPolicy::OverrideCursor => start,
                };
                trace!(slot, "pool exhausted, overriding a live particle");
                slot
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(len: usize, policy: ExhaustionPolicy) -> ParticlePool {
        ParticlePool::new(len, Lifecycle::timed(), policy)
    }

    fn revive(pool: &mut ParticlePool, slot: usize) {
        pool.get_mut(slot).unwrap().lifecycle = Lifecycle::Timed { remaining: 1.0 };
    }

    #[test]
    fn test_sequential_slots_from_dead_pool() {
        let mut pool = pool(4, ExhaustionPolicy::OverrideFirst);
        let mut handed = Vec::new();
        for _ in 0..4 {
            let slot = pool.find_unused_slot();
            handed.push(slot);
            revive(&mut pool, slot);
        }
        assert_eq!(handed, vec![0, 1, 2, 3]);
        assert_eq!(pool.cursor(), 3);
    }

    #[test]
    fn test_finds_the_single_dead_slot() {
        let mut pool = pool(4, ExhaustionPolicy::OverrideFirst);
        for slot in [0, 1, 3] {
            revive(&mut pool, slot);
        }
        assert_eq!(pool.cursor(), 0);
        assert_eq!(pool.find_unused_slot(), 2);
        assert_eq!(pool.cursor(), 2);
    }

    #[test]
    fn test_full_pool_overrides_slot_zero() {
        let mut pool = pool(4, ExhaustionPolicy::OverrideFirst);
        for slot in 0..4 {
            revive(&mut pool, slot);
        }
        assert_eq!(pool.find_unused_slot(), 0);
        assert_eq!(pool.cursor(), 0);
    }

    #[test]
    fn test_full_pool_override_leaves_cursor() {
        let mut pool = pool(4, ExhaustionPolicy::OverrideFirst);
        for _ in 0..3 {
            let slot = pool.find_unused_slot();
            revive(&mut pool, slot);
        }
        revive(&mut pool, 3);
        assert_eq!(pool.cursor(), 2);
        assert_eq!(pool.find_unused_slot(), 0);
        assert_eq!(pool.cursor(), 2);
    }

    #[test]
    fn test_override_cursor_policy() {
        let mut pool = pool(4, ExhaustionPolicy::OverrideCursor);
        for _ in 0..4 {
            let slot = pool.find_unused_slot();
            revive(&mut pool, slot);
        }
        assert_eq!(pool.find_unused_slot(), 3);
    }

    #[test]
    fn test_scan_wraps_past_the_end() {
        let mut pool = pool(5, ExhaustionPolicy::OverrideFirst);
        for _ in 0..5 {
            let slot = pool.find_unused_slot();
            revive(&mut pool, slot);
        }
        pool.get_mut(1).unwrap().lifecycle.kill();
        assert_eq!(pool.cursor(), 4);
        assert_eq!(pool.find_unused_slot(), 1);
    }

    #[test]
    fn test_dead_slot_preferred_over_override() {
        // Any dead slot anywhere wins over overriding slot 0.
        for dead in 0..6 {
            let mut pool = pool(6, ExhaustionPolicy::OverrideFirst);
            for slot in (0..6).filter(|&s| s != dead) {
                revive(&mut pool, slot);
            }
            assert_eq!(pool.find_unused_slot(), dead);
        }
    }

    #[test]
    fn test_physics_bound_liveness() {
        let mut pool = ParticlePool::new(2, Lifecycle::physics_bound(), ExhaustionPolicy::OverrideFirst);
        pool.get_mut(0).unwrap().lifecycle = Lifecycle::PhysicsBound {
            body: None,
            alive: true,
            remaining: None,
        };
        assert_eq!(pool.live_count(), 1);
        assert_eq!(pool.find_unused_slot(), 1);
    }

    #[test]
    fn test_spawn_budget_defaults() {
        assert_eq!(spawn_cap(10_000.0, 0.016), 160);
        assert_eq!(spawn_budget(0.001, 10_000.0, 0.016), 10);
        assert_eq!(spawn_budget(0.0159, 10_000.0, 0.016), 159);
        assert_eq!(spawn_budget(0.5, 10_000.0, 0.016), 160);
        assert_eq!(spawn_budget(3600.0, 10_000.0, 0.016), 160);
    }

    #[test]
    fn test_spawn_budget_rejects_bad_elapsed() {
        assert_eq!(spawn_budget(0.0, 10_000.0, 0.016), 0);
        assert_eq!(spawn_budget(-1.0, 10_000.0, 0.016), 0);
        assert_eq!(spawn_budget(f64::NAN, 10_000.0, 0.016), 0);
    }

    #[test]
    fn test_spawn_budget_never_exceeds_cap() {
        for rate in [1.0_f32, 60.0, 999.0, 10_000.0, 250_000.0] {
            let cap = spawn_cap(rate, 0.016);
            for elapsed in [0.0001, 0.01, 0.016, 0.017, 0.1, 1.0, 1e6] {
                assert!(spawn_budget(elapsed, rate, 0.016) <= cap);
            }
        }
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_panics() {
        let _ = pool(0, ExhaustionPolicy::OverrideFirst);
    }
}
