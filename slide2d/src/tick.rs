use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, PhysicsError, Result};

/// Timing of one simulation step as handed out by the game clock.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Elapsed time since the previous tick, in milliseconds.
    pub delta_ms: f64,
    /// Game speed multiplier; 1.0 is real time.
    pub time_scale: f64,
}

impl Default for Tick {
    fn default() -> Self {
        // 60 FPS fixed timestep
        Self::new(1000.0 / 60.0, 1.0)
    }
}

impl Tick {
    pub fn new(delta_ms: f64, time_scale: f64) -> Self {
        Self {
            delta_ms,
            time_scale,
        }
    }

    /// Build a tick from a frame duration.
    pub fn from_duration(delta: Duration, time_scale: f64) -> Self {
        Self::new(delta.as_secs_f64() * 1000.0, time_scale)
    }

    /// Scaled elapsed time in milliseconds.
    pub fn scaled_ms(&self) -> f64 {
        self.delta_ms * self.time_scale
    }

    /// Distance covered this tick at `units_per_second`.
    pub fn distance(&self, units_per_second: f64) -> f64 {
        self.delta_ms * 0.001 * units_per_second * self.time_scale
    }

    /// Time never runs backwards: both values must be finite and non-negative.
    pub(crate) fn validate(&self) -> Result<()> {
        ensure_finite(self.delta_ms, "tick delta")?;
        ensure_finite(self.time_scale, "tick time scale")?;
        if self.delta_ms < 0.0 || self.time_scale < 0.0 {
            return Err(PhysicsError::InvalidArgument(format!(
                "tick must not run backwards, got {} ms at scale {}",
                self.delta_ms, self.time_scale
            )));
        }
        Ok(())
    }
}
