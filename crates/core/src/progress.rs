//! Client-side progress estimate shown while a generation is in flight.
//!
//! The backend reports no progress, so the indicator advances by a random
//! step on every tick and stalls at [`PROGRESS_CEILING`] until the request
//! resolves.

use rand::Rng;

/// The estimate never passes this percentage on its own.
pub const PROGRESS_CEILING: f64 = 90.0;

/// Upper bound of a single random step.
pub const MAX_STEP: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FakeProgress {
    percent: f64,
}

impl FakeProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// Advance by `step` percentage points, capped at the ceiling.
    pub fn advance(&mut self, step: f64) -> f64 {
        if step.is_finite() && step > 0.0 {
            self.percent = (self.percent + step).min(PROGRESS_CEILING);
        }
        self.percent
    }

    /// Advance by a random step in `[0, MAX_STEP)`.
    pub fn tick(&mut self) -> f64 {
        let step = rand::rng().random_range(0.0..MAX_STEP);
        self.advance(step)
    }

    pub fn reset(&mut self) {
        self.percent = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_stops_at_ceiling() {
        let mut progress = FakeProgress::new();
        for _ in 0..20 {
            progress.advance(9.5);
        }
        assert_eq!(progress.percent(), PROGRESS_CEILING);
    }

    #[test]
    fn ticks_are_monotonic_and_bounded() {
        let mut progress = FakeProgress::new();
        let mut last = 0.0;
        for _ in 0..100 {
            let now = progress.tick();
            assert!(now >= last);
            assert!(now <= PROGRESS_CEILING);
            last = now;
        }
    }

    #[test]
    fn negative_and_nan_steps_are_ignored() {
        let mut progress = FakeProgress::new();
        progress.advance(5.0);
        progress.advance(-3.0);
        progress.advance(f64::NAN);
        assert_eq!(progress.percent(), 5.0);
        progress.reset();
        assert_eq!(progress.percent(), 0.0);
    }
}
