//! Physical length <-> driver step conversion.

use crate::calibration::Calibration;

/// Pure conversion between inches and driver pulses.
///
/// `distance_per_step` is the travel of one driver pulse (microstepping already
/// included); `pulses_per_revolution` (steps per revolution times microstep
/// multiplier) ties that to the leadscrew.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConverter {
    pulses_per_revolution: u64,
    distance_per_step: f64,
}

impl UnitConverter {
    pub fn new(steps_per_revolution: u32, microstep_multiplier: u32, distance_per_step: f64) -> Self {
        Self {
            pulses_per_revolution: u64::from(steps_per_revolution)
                * u64::from(microstep_multiplier),
            distance_per_step,
        }
    }

    pub fn from_calibration(c: &Calibration) -> Self {
        Self::new(
            c.steps_per_revolution,
            c.microstep_multiplier,
            c.distance_per_step,
        )
    }

    #[inline]
    pub fn pulses_per_revolution(&self) -> u64 {
        self.pulses_per_revolution
    }

    /// Travel of one leadscrew revolution in inches.
    #[inline]
    pub fn lead_inches(&self) -> f64 {
        self.pulses_per_revolution as f64 * self.distance_per_step
    }

    /// Nearest step count for `inches`, ties away from zero.
    ///
    /// Non-finite input (or an unusable calibration) maps to 0; results
    /// saturate at the `i64` range.
    pub fn steps_from_inches(&self, inches: f64) -> i64 {
        if !inches.is_finite() || !(self.distance_per_step.is_finite() && self.distance_per_step > 0.0)
        {
            return 0;
        }
        // f64::round rounds half away from zero.
        let scaled = (inches / self.distance_per_step).round();
        if scaled >= i64::MAX as f64 {
            i64::MAX
        } else if scaled <= i64::MIN as f64 {
            i64::MIN
        } else {
            scaled as i64
        }
    }

    #[inline]
    pub fn inches_from_steps(&self, steps: i64) -> f64 {
        steps as f64 * self.distance_per_step
    }
}
