//! Simulation clock: pause, single-step and time scaling.

use crate::error::{PhysicsError, Result};

/// Nominal frame length used for single steps, 60 Hz.
pub const DEFAULT_NOMINAL_DT: f32 = 1.0 / 60.0;

/// Converts elapsed wall time into the step length for one tick.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeSource {
    paused: bool,
    step_requested: bool,
    time_scale: f32,
    nominal_dt: f32,
}

impl Default for TimeSource {
    fn default() -> Self {
        Self { paused: false, step_requested: false, time_scale: 1.0, nominal_dt: DEFAULT_NOMINAL_DT }
    }
}

impl TimeSource {
    pub fn new(nominal_dt: f32) -> Result<Self> {
        if !(nominal_dt.is_finite() && nominal_dt > 0.0) {
            return Err(PhysicsError::InvalidConfig { field: "nominal_dt", reason: "must be finite and > 0" });
        }
        Ok(Self { nominal_dt, ..Default::default() })
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
        self.step_requested = false;
    }

    /// While paused, the next `frame_dt` returns one nominal frame.
    pub fn request_step(&mut self) {
        self.step_requested = true;
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, scale: f32) -> Result<()> {
        if !(scale.is_finite() && scale >= 0.0) {
            return Err(PhysicsError::InvalidConfig { field: "time_scale", reason: "must be finite and >= 0" });
        }
        self.time_scale = scale;
        Ok(())
    }

    pub fn nominal_dt(&self) -> f32 {
        self.nominal_dt
    }

    /// Step length for this tick. Reading consumes a pending single step.
    pub fn frame_dt(&mut self, real_elapsed: f32) -> f32 {
        if self.paused {
            if std::mem::take(&mut self.step_requested) {
                return self.nominal_dt;
            }
            return 0.0;
        }
        let real = if real_elapsed.is_finite() { real_elapsed.max(0.0) } else { 0.0 };
        real * self.time_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_running_clock() {
        let mut t = TimeSource::default();
        t.set_time_scale(0.5).unwrap();
        assert_eq!(t.frame_dt(0.1), 0.05);
        assert_eq!(t.frame_dt(-1.0), 0.0);
    }

    #[test]
    fn test_pause_and_single_step() {
        let mut t = TimeSource::new(0.02).unwrap();
        t.pause();
        assert_eq!(t.frame_dt(0.1), 0.0);
        t.request_step();
        assert_eq!(t.frame_dt(0.1), 0.02);
        assert_eq!(t.frame_dt(0.1), 0.0);
        t.resume();
        assert_eq!(t.frame_dt(0.1), 0.1);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(TimeSource::new(0.0).is_err());
        assert!(TimeSource::new(f32::INFINITY).is_err());
        let mut t = TimeSource::default();
        assert!(matches!(t.set_time_scale(-1.0), Err(PhysicsError::InvalidConfig { field: "time_scale", .. })));
        assert_eq!(t.time_scale(), 1.0);
    }
}
