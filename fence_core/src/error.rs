use fence_traits::Limit;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FenceError {
    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),
    #[error("{0} limit switch stuck closed; motion halted until reset")]
    LimitStuck(Limit),
    #[error("motor is powered off")]
    MotorDisabled,
    #[error("park failed: left limit not found within {0} steps")]
    ParkFailed(i64),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
