//! Motion controller: bounded positioning of the fence carriage.
//!
//! Owns the driver, the switch inputs, the calibration and the limit guard.
//! All motion runs through one blocking step loop that polls the switch ahead
//! of travel before every pulse, so the carriage never steps into an engaged
//! switch. Every public operation takes `&mut self`, which is what keeps
//! moves from overlapping.

use std::sync::Arc;

use eyre::WrapErr;
use fence_traits::{Clock, Direction, Limit, LimitInputs, StepperDriver};
use tracing::{debug, info, warn};

use crate::calibration::{Calibration, SettingsUpdate};
use crate::config::MotionCfg;
use crate::error::{FenceError, Result};
use crate::hw_error::to_report;
use crate::limit::{BounceStep, GuardState, LimitEvent, LimitGuard};
use crate::units::UnitConverter;
use crate::util::{percent_of, step_interval};

/// How the distance of a move request is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMode {
    /// Distance is an absolute position from zero.
    Exact,
    /// Distance is an offset from the current position along `direction`.
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveRequest {
    pub inches: f64,
    pub mode: MoveMode,
    /// Only used by relative moves.
    pub direction: Direction,
}

impl MoveRequest {
    pub fn exact(inches: f64) -> Self {
        Self {
            inches,
            mode: MoveMode::Exact,
            direction: Direction::Right,
        }
    }

    pub fn relative(inches: f64, direction: Direction) -> Self {
        Self {
            inches,
            mode: MoveMode::Relative,
            direction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Reached,
    /// A switch tripped; recovery ran and the target was abandoned.
    LimitHit(Limit),
    /// The stop check fired between steps.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveReport {
    pub outcome: MoveOutcome,
    pub start_steps: i64,
    /// Target after clamping into the travel range.
    pub target_steps: i64,
    pub final_steps: i64,
    /// True when the requested target was outside the travel range.
    pub clamped: bool,
    /// Pulses issued, bounce recovery included.
    pub steps_issued: u64,
}

pub struct MotionController<D: StepperDriver, L: LimitInputs> {
    driver: D,
    limits: L,
    calibration: Calibration,
    conv: UnitConverter,
    max_travel: i64,
    working_speed: u32,
    guard: LimitGuard,
    motion: MotionCfg,
    clock: Arc<dyn Clock + Send + Sync>,
    stop_check: Option<Box<dyn Fn() -> bool>>,
    enabled: bool,
    pulses: u64,
    commanded: Option<(Direction, u32)>,
}

impl<D: StepperDriver, L: LimitInputs> core::fmt::Debug for MotionController<D, L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MotionController")
            .field("position_steps", &self.driver.current_position_steps())
            .field("max_travel_steps", &self.max_travel)
            .field("working_speed", &self.working_speed)
            .field("guard", &self.guard.state())
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl<D: StepperDriver, L: LimitInputs> MotionController<D, L> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        driver: D,
        limits: L,
        calibration: Calibration,
        working_speed: u32,
        guard: LimitGuard,
        motion: MotionCfg,
        clock: Arc<dyn Clock + Send + Sync>,
        stop_check: Option<Box<dyn Fn() -> bool>>,
    ) -> Self {
        let conv = calibration.converter();
        let max_travel = calibration.max_travel_steps();
        Self {
            driver,
            limits,
            calibration,
            conv,
            max_travel,
            working_speed,
            guard,
            motion,
            clock,
            stop_check,
            enabled: false,
            pulses: 0,
            commanded: None,
        }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn converter(&self) -> UnitConverter {
        self.conv
    }

    pub fn max_travel_steps(&self) -> i64 {
        self.max_travel
    }

    pub fn motion_cfg(&self) -> &MotionCfg {
        &self.motion
    }

    pub fn current_position_steps(&self) -> i64 {
        self.driver.current_position_steps()
    }

    pub fn current_position_inches(&self) -> f64 {
        self.conv.inches_from_steps(self.current_position_steps())
    }

    pub fn working_speed(&self) -> u32 {
        self.working_speed
    }

    pub fn guard_state(&self) -> GuardState {
        self.guard.state()
    }

    pub fn is_faulted(&self) -> bool {
        self.guard.is_stuck()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Total pulses issued since construction.
    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    /// Map a 0..=100 slider value onto `[0, max_motor_speed]`. Out-of-range
    /// values clamp. Returns the new speed in steps/s.
    pub fn set_working_speed(&mut self, percent: i32) -> u32 {
        self.working_speed = percent_of(self.calibration.max_motor_speed, percent);
        debug!(percent, sps = self.working_speed, "working speed set");
        self.working_speed
    }

    /// Validate and apply a settings update. On failure nothing changes.
    pub fn apply_settings(&mut self, update: &SettingsUpdate) -> Result<()> {
        self.calibration
            .apply_settings(update)
            .map_err(eyre::Report::new)?;
        self.conv = self.calibration.converter();
        self.max_travel = self.calibration.max_travel_steps();
        if update.working_speed.is_some() {
            self.working_speed = self.calibration.working_speed;
        }
        self.working_speed = self.working_speed.min(self.calibration.max_motor_speed);
        Ok(())
    }

    pub(crate) fn enable_driver(&mut self) -> Result<()> {
        self.driver.enable().map_err(to_report)?;
        self.enabled = true;
        Ok(())
    }

    /// Energize or release the motor.
    pub fn set_power(&mut self, on: bool) -> Result<()> {
        if on {
            self.guard.ensure_clear()?;
            self.enable_driver().wrap_err("enable motor")?;
        } else {
            self.driver.disable().map_err(to_report).wrap_err("disable motor")?;
            self.enabled = false;
        }
        info!(on, "motor power");
        Ok(())
    }

    /// Declare the current carriage position to be zero.
    pub fn set_zero(&mut self) {
        let was = self.driver.current_position_steps();
        self.driver.set_current_position(0);
        info!(was, "position zeroed");
    }

    /// Clear a stuck-limit fault and re-energize the motor.
    pub fn reset_fault(&mut self) -> Result<()> {
        if let Some(limit) = self.guard.reset_fault() {
            info!(%limit, "fault cleared by operator");
            self.enable_driver().wrap_err("re-enable motor after fault")?;
        }
        Ok(())
    }

    /// Move to `inches` from zero, clamped into the travel range.
    pub fn move_absolute(&mut self, inches: f64) -> Result<MoveReport> {
        let requested = self.conv.steps_from_inches(inches);
        self.move_to_steps(requested)
    }

    /// Move `delta_inches` along `direction` from the current position.
    pub fn move_relative(&mut self, delta_inches: f64, direction: Direction) -> Result<MoveReport> {
        let delta = self.conv.steps_from_inches(delta_inches);
        let target = self
            .current_position_steps()
            .saturating_add(delta.saturating_mul(direction.sign()));
        self.move_to_steps(target)
    }

    pub fn execute(&mut self, req: &MoveRequest) -> Result<MoveReport> {
        match req.mode {
            MoveMode::Exact => self.move_absolute(req.inches),
            MoveMode::Relative => self.move_relative(req.inches, req.direction),
        }
    }

    pub fn move_to_zero(&mut self) -> Result<MoveReport> {
        self.move_to_steps(0)
    }

    /// Move to the blade reference, optionally backed off by the kerf.
    pub fn zero_to_blade(&mut self, include_kerf: bool) -> Result<MoveReport> {
        let kerf = if include_kerf {
            self.conv.steps_from_inches(self.calibration.kerf)
        } else {
            0
        };
        self.move_to_steps(self.max_travel - kerf)
    }

    /// Jog by the configured nudge distance.
    pub fn nudge(&mut self, direction: Direction) -> Result<MoveReport> {
        let delta = i64::from(self.motion.nudge_steps) * direction.sign();
        let target = self.current_position_steps().saturating_add(delta);
        self.move_to_steps(target)
    }

    /// Move right by the calibration step count; the operator measures the
    /// travel and feeds it back into `distance_per_step`.
    pub fn calibration_run(&mut self) -> Result<MoveReport> {
        let target = self
            .current_position_steps()
            .saturating_add(i64::from(self.motion.calibration_steps));
        self.move_to_steps(target)
    }

    /// Drive left until the left switch trips, back off it, and redefine the
    /// released position as zero.
    pub fn park(&mut self) -> Result<MoveReport> {
        self.ensure_ready()?;
        let start = self.current_position_steps();
        let first_pulse = self.pulses;
        let bound = self.max_travel.saturating_mul(2);
        info!(start, bound, "parking");
        let mut travelled: i64 = 0;
        loop {
            if self.stop_requested() {
                return Ok(self.report(MoveOutcome::Cancelled, start, 0, false, first_pulse));
            }
            if let Some(ev) = self.guard.check(&mut self.limits, Direction::Left, false)? {
                self.recover(ev)?;
                self.driver.set_current_position(0);
                info!(steps = self.pulses - first_pulse, "parked; position re-zeroed");
                return Ok(self.report(MoveOutcome::Reached, start, 0, false, first_pulse));
            }
            if travelled >= bound {
                warn!(travelled, "left limit not found while parking");
                return Err(eyre::Report::new(FenceError::ParkFailed(bound)));
            }
            self.step_toward(Direction::Left)?;
            travelled += 1;
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        self.guard.ensure_clear()?;
        if !self.enabled {
            return Err(eyre::Report::new(FenceError::MotorDisabled));
        }
        if self.working_speed == 0 {
            return Err(eyre::Report::new(FenceError::State(
                "working speed is 0; raise the speed before moving".into(),
            )));
        }
        Ok(())
    }

    fn stop_requested(&self) -> bool {
        self.stop_check.as_ref().is_some_and(|f| f())
    }

    fn clamp_target(&self, requested: i64) -> (i64, bool) {
        let target = requested.clamp(0, self.max_travel);
        if target != requested {
            warn!(
                requested,
                clamped_to = target,
                max = self.max_travel,
                "move target out of range; clamped"
            );
        }
        (target, target != requested)
    }

    fn move_to_steps(&mut self, requested: i64) -> Result<MoveReport> {
        self.ensure_ready()?;
        let (target, clamped) = self.clamp_target(requested);
        let start = self.current_position_steps();
        let first_pulse = self.pulses;
        let began = self.clock.now();
        debug!(start, target, sps = self.working_speed, "move");
        let outcome = loop {
            let Some(dir) = Direction::toward(self.current_position_steps(), target) else {
                break MoveOutcome::Reached;
            };
            if self.stop_requested() {
                info!(at = self.current_position_steps(), "move cancelled");
                break MoveOutcome::Cancelled;
            }
            if let Some(ev) = self.guard.check(&mut self.limits, dir, true)? {
                self.recover(ev)?;
                break MoveOutcome::LimitHit(ev.limit);
            }
            self.step_toward(dir)?;
        };
        let report = self.report(outcome, start, target, clamped, first_pulse);
        debug!(?report, elapsed_us = self.clock.us_since(began), "move finished");
        Ok(report)
    }

    fn report(
        &self,
        outcome: MoveOutcome,
        start: i64,
        target: i64,
        clamped: bool,
        first_pulse: u64,
    ) -> MoveReport {
        MoveReport {
            outcome,
            start_steps: start,
            target_steps: target,
            final_steps: self.current_position_steps(),
            clamped,
            steps_issued: self.pulses - first_pulse,
        }
    }

    /// Back off the tripped switch one micro-move at a time until it opens.
    /// Any failure on the way leaves the motor disabled and the fault latched.
    fn recover(&mut self, ev: LimitEvent) -> Result<()> {
        let res = self.back_off(ev);
        if res.is_err() {
            self.guard.latch_fault();
            if let Err(e) = self.driver.disable() {
                warn!(error = %e, "failed to disable motor after limit fault");
            }
            self.enabled = false;
        }
        res
    }

    fn back_off(&mut self, ev: LimitEvent) -> Result<()> {
        loop {
            let closed = self.read_limit(ev.limit)?;
            match self.guard.next_bounce(closed)? {
                BounceStep::Released(_) => return Ok(()),
                BounceStep::Stuck(limit) => {
                    return Err(eyre::Report::new(FenceError::LimitStuck(limit)));
                }
                BounceStep::Reverse { direction, steps } => {
                    for _ in 0..steps {
                        self.step_toward(direction)?;
                        if !self.read_limit(ev.limit)? {
                            break;
                        }
                    }
                }
            }
        }
    }

    fn read_limit(&mut self, limit: Limit) -> Result<bool> {
        self.limits.read_limit(limit).map_err(to_report)
    }

    /// One paced pulse at the working speed.
    fn step_toward(&mut self, dir: Direction) -> Result<()> {
        let sps = self.working_speed;
        if self.commanded != Some((dir, sps)) {
            self.driver.set_direction(dir).map_err(to_report)?;
            self.driver.set_speed(sps, dir).map_err(to_report)?;
            self.commanded = Some((dir, sps));
        }
        self.driver.step_once().map_err(to_report)?;
        self.pulses += 1;
        self.clock.sleep(step_interval(sps));
        Ok(())
    }
}
