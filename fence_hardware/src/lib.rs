//! Stepper and limit-switch backends for the fence controller.
//!
//! The simulated axis is always available; the GPIO backend needs the
//! `hardware` feature on Linux.
pub mod error;
pub mod sim;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

pub use sim::{SimAxis, SimGeometry, SimulatedLimits, SimulatedStepper};
