//! Frame time sources.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonic time in seconds.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Wall-clock time since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Clock advanced by hand. Shared references can advance it.
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            bits: AtomicU64::new(start.to_bits()),
        }
    }

    pub fn set(&self, now: f64) {
        self.bits.store(now.to_bits(), Ordering::Relaxed);
    }

    /// Moves the clock forward by `dt` seconds and returns the new time.
    pub fn advance(&self, dt: f64) -> f64 {
        let now = self.now() + dt;
        self.set(now);
        now
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1.5);
        assert_eq!(clock.now(), 1.5);
        assert_eq!(clock.advance(0.25), 1.75);
        clock.set(10.0);
        assert_eq!(clock.now(), 10.0);
        assert_eq!(ManualClock::default().now(), 0.0);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(a >= 0.0);
        assert!(b >= a);
    }
}
