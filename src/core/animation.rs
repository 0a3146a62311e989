// src/core/animation.rs

use crate::Quatf;

/// Duration of an eased orientation change, in seconds.
pub const ORIENTATION_TRANSITION_DURATION: f64 = 0.2;

/// Cubic ease-in-out on `[0, 1]`.
pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// An in-flight eased rotation from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationTransition {
    from: Quatf,
    to: Quatf,
    started_at: f64,
    duration: f64,
}

impl OrientationTransition {
    pub fn new(from: Quatf, to: Quatf, started_at: f64, duration: f64) -> Self {
        Self {
            from,
            to,
            started_at,
            duration,
        }
    }

    pub fn target(&self) -> Quatf {
        self.to
    }

    /// Linear progress in `[0, 1]` at time `now`.
    pub fn progress(&self, now: f64) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((now - self.started_at) / self.duration).clamp(0.0, 1.0) as f32
    }

    pub fn is_finished(&self, now: f64) -> bool {
        self.progress(now) >= 1.0
    }

    /// Eased rotation at `now`. Lands exactly on the target once finished.
    pub fn sample(&self, now: f64) -> Quatf {
        let p = self.progress(now);
        if p >= 1.0 {
            return self.to;
        }
        self.from
            .try_slerp(&self.to, ease_in_out(p), 1.0e-6)
            .unwrap_or(self.to)
    }
}
