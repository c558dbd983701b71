//! Common time/period helpers for fence_core.

use std::time::Duration;

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Interval between step pulses at `steps_per_sec`.
/// - Clamps the speed to at least 1 to avoid division by zero.
/// - Ensures the result is at least 1 microsecond.
#[inline]
pub fn step_interval(steps_per_sec: u32) -> Duration {
    Duration::from_micros((MICROS_PER_SEC / u64::from(steps_per_sec.max(1))).max(1))
}

/// Linear map of a 0..=100 slider percentage onto `[0, max]`, rounded.
#[inline]
pub fn percent_of(max: u32, percent: i32) -> u32 {
    let p = u64::from(percent.clamp(0, 100).unsigned_abs());
    let scaled = (u64::from(max) * p + 50) / 100;
    u32::try_from(scaled).unwrap_or(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_from_speed() {
        assert_eq!(step_interval(800), Duration::from_micros(1250));
        assert_eq!(step_interval(0), Duration::from_secs(1));
        assert_eq!(step_interval(u32::MAX), Duration::from_micros(1));
    }

    #[test]
    fn percent_clamps_and_rounds() {
        assert_eq!(percent_of(4000, 50), 2000);
        assert_eq!(percent_of(4000, -5), 0);
        assert_eq!(percent_of(4000, 250), 4000);
        assert_eq!(percent_of(3, 50), 2);
    }
}
