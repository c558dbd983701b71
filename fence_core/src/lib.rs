#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core fence positioning logic (hardware-agnostic).
//!
//! All hardware interactions go through the `fence_traits` seams:
//! `StepperDriver`, `LimitInputs`, `KvStore` and `Clock`.
//!
//! ## Architecture
//!
//! - **Units**: inches <-> driver pulses (`units` module)
//! - **Calibration**: validated machine constants with fail-soft loading
//!   (`calibration` module) and `KvStore` backends (`storage` module)
//! - **Limits**: the switch guard and bounce recovery state machine (`limit`)
//! - **Motion**: clamped, limit-checked step loop (`motion`), assembled by the
//!   type-state builder (`builder`)
//! - **Router**: operator panel events to controller operations (`router`),
//!   reporting through `status` events
//!
//! ## Axis
//!
//! Step counts increase toward the right switch. Zero is the left (park) end
//! and the blade reference sits at `max_travel_steps`.

pub mod atomic;
pub mod builder;
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod cutlist;
pub mod error;
pub mod hw_error;
pub mod limit;
pub mod mocks;
pub mod motion;
pub mod router;
pub mod status;
pub mod storage;
pub mod units;
pub mod util;

pub use builder::{ControllerBuilder, FenceController, Missing};
pub use calibration::{Calibration, SettingsField, SettingsUpdate};
pub use config::{LimitCfg, MotionCfg};
pub use cutlist::{Cut, CutList};
pub use error::{BuildError, FenceError, Report, Result};
pub use limit::{BounceStep, GuardState, LimitEvent, LimitGuard};
pub use motion::{MotionController, MoveMode, MoveOutcome, MoveReport, MoveRequest};
pub use router::{ButtonId, CommandRouter, FieldId, PanelState, SliderId, SwitchId, UiEvent};
pub use status::{StatusEvent, StatusPublisher, channel};
pub use storage::{MemoryStore, TomlFileStore};
pub use units::UnitConverter;

pub use fence_traits::{Direction, Limit};
