//! Hardware seams for the fence controller.
//!
//! Everything the motion core touches in the outside world goes through one of
//! these traits: the stepper driver, the two end-of-travel switches, the
//! key/value store holding calibration, and the clock pacing step pulses.
pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Travel direction along the single axis.
///
/// Step counts increase toward the right switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// Sign of a step taken in this direction.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
        }
    }

    /// Direction needed to go from `from` to `to` (None when equal).
    #[inline]
    pub fn toward(from: i64, to: i64) -> Option<Self> {
        match to.cmp(&from) {
            std::cmp::Ordering::Greater => Some(Direction::Right),
            std::cmp::Ordering::Less => Some(Direction::Left),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// One of the two end-of-travel switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    Left,
    Right,
}

impl Limit {
    /// The switch sitting at the end of travel in `dir`.
    #[inline]
    pub fn ahead_of(dir: Direction) -> Self {
        match dir {
            Direction::Left => Limit::Left,
            Direction::Right => Limit::Right,
        }
    }

    /// Direction that moves the carriage off this switch.
    #[inline]
    pub fn release_direction(self) -> Direction {
        match self {
            Limit::Left => Direction::Right,
            Limit::Right => Direction::Left,
        }
    }
}

impl std::fmt::Display for Limit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Limit::Left => f.write_str("left"),
            Limit::Right => f.write_str("right"),
        }
    }
}

/// Open-loop stepper driver. The driver counts the pulses it has issued; that
/// count is the only record of where the carriage is.
pub trait StepperDriver {
    fn set_direction(&mut self, dir: Direction) -> Result<(), BoxError>;
    /// Issue exactly one step pulse in the current direction.
    fn step_once(&mut self) -> Result<(), BoxError>;
    fn current_position_steps(&self) -> i64;
    /// Redefine the current position (re-zero) without moving.
    fn set_current_position(&mut self, steps: i64);
    /// Record the commanded speed; `direction` carries the sign.
    fn set_speed(&mut self, steps_per_sec: u32, direction: Direction) -> Result<(), BoxError>;
    fn enable(&mut self) -> Result<(), BoxError>;
    fn disable(&mut self) -> Result<(), BoxError>;
}

/// The two digital end-of-travel inputs. `true` means contact closed.
pub trait LimitInputs {
    fn read_limit(&mut self, which: Limit) -> Result<bool, BoxError>;
}

/// Flat key/value persistence for calibration values.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    /// Write every entry or none of them.
    fn put_all(&mut self, entries: &[(&'static str, String)]) -> Result<(), BoxError>;
}

impl<T: StepperDriver + ?Sized> StepperDriver for Box<T> {
    fn set_direction(&mut self, dir: Direction) -> Result<(), BoxError> {
        (**self).set_direction(dir)
    }
    fn step_once(&mut self) -> Result<(), BoxError> {
        (**self).step_once()
    }
    fn current_position_steps(&self) -> i64 {
        (**self).current_position_steps()
    }
    fn set_current_position(&mut self, steps: i64) {
        (**self).set_current_position(steps);
    }
    fn set_speed(&mut self, steps_per_sec: u32, direction: Direction) -> Result<(), BoxError> {
        (**self).set_speed(steps_per_sec, direction)
    }
    fn enable(&mut self) -> Result<(), BoxError> {
        (**self).enable()
    }
    fn disable(&mut self) -> Result<(), BoxError> {
        (**self).disable()
    }
}

impl<T: LimitInputs + ?Sized> LimitInputs for Box<T> {
    fn read_limit(&mut self, which: Limit) -> Result<bool, BoxError> {
        (**self).read_limit(which)
    }
}

impl<T: KvStore + ?Sized> KvStore for Box<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
    fn put_all(&mut self, entries: &[(&'static str, String)]) -> Result<(), BoxError> {
        (**self).put_all(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_toward() {
        assert_eq!(Direction::toward(0, 10), Some(Direction::Right));
        assert_eq!(Direction::toward(10, 0), Some(Direction::Left));
        assert_eq!(Direction::toward(5, 5), None);
    }

    #[test]
    fn limit_geometry() {
        assert_eq!(Limit::ahead_of(Direction::Right), Limit::Right);
        assert_eq!(Limit::Right.release_direction(), Direction::Left);
        assert_eq!(Limit::Left.release_direction(), Direction::Right);
        assert_eq!(Direction::Right.sign(), 1);
    }
}
