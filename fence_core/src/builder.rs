//! Type-state builder for `MotionController`.
//!
//! `build()` only exists once both a driver and the limit inputs have been
//! supplied; everything else has a default.

use std::sync::Arc;

use fence_traits::{Clock, LimitInputs, MonotonicClock, StepperDriver};

use crate::calibration::Calibration;
use crate::config::{LimitCfg, MotionCfg};
use crate::error::{BuildError, Result};
use crate::limit::LimitGuard;
use crate::motion::MotionController;
use crate::status::StatusPublisher;

/// Controller over boxed trait objects, as assembled by the CLI.
pub type FenceController = MotionController<Box<dyn StepperDriver>, Box<dyn LimitInputs>>;

// ── Type-state marker ────────────────────────────────────────────────────────

pub struct Missing;

pub struct ControllerBuilder<D, L> {
    driver: D,
    limits: L,
    calibration: Option<Calibration>,
    motion: Option<MotionCfg>,
    limit_cfg: Option<LimitCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    stop_check: Option<Box<dyn Fn() -> bool>>,
    events: StatusPublisher,
    initial_speed_percent: Option<u8>,
}

impl Default for ControllerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerBuilder<Missing, Missing> {
    pub fn new() -> Self {
        Self {
            driver: Missing,
            limits: Missing,
            calibration: None,
            motion: None,
            limit_cfg: None,
            clock: None,
            stop_check: None,
            events: StatusPublisher::disconnected(),
            initial_speed_percent: None,
        }
    }
}

impl<D, L> ControllerBuilder<D, L> {
    pub fn with_driver<D2: StepperDriver>(self, driver: D2) -> ControllerBuilder<D2, L> {
        ControllerBuilder {
            driver,
            limits: self.limits,
            calibration: self.calibration,
            motion: self.motion,
            limit_cfg: self.limit_cfg,
            clock: self.clock,
            stop_check: self.stop_check,
            events: self.events,
            initial_speed_percent: self.initial_speed_percent,
        }
    }

    pub fn with_limits<L2: LimitInputs>(self, limits: L2) -> ControllerBuilder<D, L2> {
        ControllerBuilder {
            driver: self.driver,
            limits,
            calibration: self.calibration,
            motion: self.motion,
            limit_cfg: self.limit_cfg,
            clock: self.clock,
            stop_check: self.stop_check,
            events: self.events,
            initial_speed_percent: self.initial_speed_percent,
        }
    }

    pub fn with_calibration(mut self, c: Calibration) -> Self {
        self.calibration = Some(c);
        self
    }

    pub fn with_motion(mut self, m: MotionCfg) -> Self {
        self.motion = Some(m);
        self
    }

    pub fn with_limit_cfg(mut self, l: LimitCfg) -> Self {
        self.limit_cfg = Some(l);
        self
    }

    /// Clock used to pace step pulses. Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Polled between steps; returning true ends the move as cancelled.
    pub fn with_stop_check(mut self, f: impl Fn() -> bool + 'static) -> Self {
        self.stop_check = Some(Box::new(f));
        self
    }

    pub fn with_events(mut self, events: StatusPublisher) -> Self {
        self.events = events;
        self
    }

    /// Start at this slider percentage instead of the calibrated working speed.
    pub fn with_initial_speed_percent(mut self, percent: u8) -> Self {
        self.initial_speed_percent = Some(percent);
        self
    }
}

impl<D: StepperDriver, L: LimitInputs> ControllerBuilder<D, L> {
    /// Validate and construct the controller; the driver is enabled on success.
    pub fn build(self) -> Result<MotionController<D, L>> {
        let calibration = self.calibration.unwrap_or_default();
        calibration.validate().map_err(eyre::Report::new)?;
        let motion = self.motion.unwrap_or_default();
        if motion.nudge_steps == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "nudge_steps must be >= 1",
            )));
        }
        if motion.calibration_steps == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "calibration_steps must be >= 1",
            )));
        }
        let limit_cfg = self.limit_cfg.unwrap_or_default();
        if limit_cfg.bounce_steps == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "bounce_steps must be >= 1",
            )));
        }
        if limit_cfg.max_bounce_cycles == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "max_bounce_cycles must be >= 1",
            )));
        }
        if self.initial_speed_percent.is_some_and(|p| p > 100) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "initial speed percent must be <= 100",
            )));
        }

        let working_speed = calibration.working_speed;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let guard = LimitGuard::new(limit_cfg, self.events);
        let mut controller = MotionController::new(
            self.driver,
            self.limits,
            calibration,
            working_speed,
            guard,
            motion,
            clock,
            self.stop_check,
        );
        if let Some(p) = self.initial_speed_percent {
            controller.set_working_speed(i32::from(p));
        }
        controller.enable_driver()?;
        Ok(controller)
    }
}
