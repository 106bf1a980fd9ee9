//! Fixed-timestep physics stepping.
//!
//! Frame time is accumulated and drained in fixed steps, so the dynamics
//! world advances at the same rate however fast frames are produced. Long
//! frames are clamped to keep a stall from queueing dozens of steps.

use tracing::warn;

/// Default fixed timestep: 60 Hz.
pub const FIXED_DT: f64 = 1.0 / 60.0;

/// Default frame time clamp: 250 ms.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// Accumulator-based fixed stepper.
#[derive(Debug, Clone)]
pub struct FixedStepper {
    timestep: f64,
    max_frame_time: f64,
    accumulator: f64,
    total_sim_time: f64,
    step_count: u64,
}

impl FixedStepper {
    /// # Panics
    ///
    /// Panics unless `timestep` is finite and positive; the step loop would
    /// never drain the accumulator otherwise.
    pub fn new(timestep: f64, max_frame_time: f64) -> Self {
        assert!(
            timestep.is_finite() && timestep > 0.0,
            "fixed timestep must be finite and positive, got {timestep}"
        );
        Self {
            timestep,
            max_frame_time,
            accumulator: 0.0,
            total_sim_time: 0.0,
            step_count: 0,
        }
    }

    /// Adds `frame_time` seconds and calls `step_fn(timestep)` once per whole
    /// timestep available. Returns the number of steps taken.
    pub fn advance(&mut self, frame_time: f64, mut step_fn: impl FnMut(f64)) -> u32 {
        let mut frame_time = frame_time.max(0.0);
        if frame_time > self.max_frame_time {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                frame_time * 1000.0,
                self.max_frame_time * 1000.0
            );
            frame_time = self.max_frame_time;
        }
        self.accumulator += frame_time;

        let mut steps = 0;
        while self.accumulator >= self.timestep {
            step_fn(self.timestep);
            self.total_sim_time += self.timestep;
            self.accumulator -= self.timestep;
            self.step_count += 1;
            steps += 1;
        }
        steps
    }

    /// Fraction of a step left in the accumulator, in `[0, 1)`.
    pub fn alpha(&self) -> f64 {
        if self.accumulator > 0.0 {
            self.accumulator / self.timestep
        } else {
            0.0
        }
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn total_sim_time(&self) -> f64 {
        self.total_sim_time
    }
}

impl Default for FixedStepper {
    fn default() -> Self {
        Self::new(FIXED_DT, MAX_FRAME_TIME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_timestep_runs_one_step() {
        let mut stepper = FixedStepper::default();
        let mut dts = Vec::new();
        assert_eq!(stepper.advance(FIXED_DT, |dt| dts.push(dt)), 1);
        assert_eq!(dts, vec![FIXED_DT]);
        assert!(stepper.alpha() < 1e-9);
    }

    #[test]
    fn test_short_frames_accumulate() {
        let mut stepper = FixedStepper::default();
        let half = FIXED_DT / 2.0 + 1e-9;
        assert_eq!(stepper.advance(half, |_| {}), 0);
        assert!((stepper.alpha() - 0.5).abs() < 1e-6);
        assert_eq!(stepper.advance(half, |_| {}), 1);
        assert_eq!(stepper.step_count(), 1);
    }

    #[test]
    fn test_long_frame_is_clamped() {
        let mut stepper = FixedStepper::default();
        let steps = stepper.advance(1.0, |_| {});
        // 0.25 s at 60 Hz, give or take rounding of the accumulator.
        assert!((14..=15).contains(&steps), "steps={steps}");
        assert!(stepper.total_sim_time() <= 0.25 + 1e-9);
    }

    #[test]
    #[should_panic(expected = "finite and positive")]
    fn test_zero_timestep_is_refused() {
        let _ = FixedStepper::new(0.0, MAX_FRAME_TIME);
    }

    #[test]
    #[should_panic(expected = "finite and positive")]
    fn test_nan_timestep_is_refused() {
        let _ = FixedStepper::new(f64::NAN, MAX_FRAME_TIME);
    }

    #[test]
    fn test_negative_frame_time_ignored() {
        let mut stepper = FixedStepper::default();
        assert_eq!(stepper.advance(-1.0, |_| {}), 0);
        assert_eq!(stepper.alpha(), 0.0);
    }

    #[test]
    fn test_sixty_frames_make_one_second() {
        let mut stepper = FixedStepper::default();
        let total: u32 = (0..60).map(|_| stepper.advance(FIXED_DT, |_| {})).sum();
        assert!((59..=60).contains(&total));
        assert!((stepper.total_sim_time() - f64::from(total) * FIXED_DT).abs() < 1e-9);
    }
}
