//! End-of-travel switch supervision and bounce recovery.
//!
//! The guard polls only the switch lying ahead of the travel direction. When
//! it reads closed the guard enters `Bouncing` and hands the controller a
//! sequence of reverse micro-moves until the switch opens again. Every
//! `AlertRaised` is matched by exactly one `AlertCleared`; a switch that never
//! releases latches a stuck fault instead, and the clear is deferred until the
//! fault is reset.

use fence_traits::{Direction, Limit, LimitInputs};
use tracing::{error, info, trace, warn};

use crate::config::LimitCfg;
use crate::error::{FenceError, Result};
use crate::hw_error::to_report;
use crate::status::{StatusEvent, StatusPublisher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Clear,
    Bouncing(Limit),
}

/// A switch trip observed by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitEvent {
    pub limit: Limit,
    /// False when the trip was found outside a commanded move (parking).
    pub during_move: bool,
}

/// What the controller must do next while bouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BounceStep {
    /// Issue up to `steps` pulses in `direction`, re-polling after each one.
    Reverse { direction: Direction, steps: u32 },
    /// The switch opened; the guard is clear again.
    Released(Limit),
    /// The cycle bound was exceeded; the fault is latched.
    Stuck(Limit),
}

#[derive(Debug)]
pub struct LimitGuard {
    state: GuardState,
    cfg: LimitCfg,
    cycles: u32,
    stuck: bool,
    events: StatusPublisher,
}

impl LimitGuard {
    pub fn new(cfg: LimitCfg, events: StatusPublisher) -> Self {
        Self {
            state: GuardState::Clear,
            cfg,
            cycles: 0,
            stuck: false,
            events,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn is_stuck(&self) -> bool {
        self.stuck
    }

    /// Micro-moves issued in the current (or last) bounce.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn cfg(&self) -> &LimitCfg {
        &self.cfg
    }

    /// Fails with `LimitStuck` while a stuck fault is latched.
    pub fn ensure_clear(&self) -> Result<()> {
        match (self.stuck, self.state) {
            (true, GuardState::Bouncing(l)) => Err(eyre::Report::new(FenceError::LimitStuck(l))),
            _ => Ok(()),
        }
    }

    /// Poll the switch ahead of `dir`. A closed switch moves the guard into
    /// `Bouncing` and raises the alert.
    pub fn check<L: LimitInputs + ?Sized>(
        &mut self,
        inputs: &mut L,
        dir: Direction,
        during_move: bool,
    ) -> Result<Option<LimitEvent>> {
        self.ensure_clear()?;
        if let GuardState::Bouncing(l) = self.state {
            return Err(eyre::Report::new(FenceError::State(format!(
                "{l} limit recovery still in progress"
            ))));
        }
        // The switch behind the carriage cannot close while moving away from it.
        let limit = Limit::ahead_of(dir);
        let closed = inputs.read_limit(limit).map_err(to_report)?;
        if !closed {
            return Ok(None);
        }
        warn!(%limit, during_move, "limit switch tripped; backing off");
        self.state = GuardState::Bouncing(limit);
        self.cycles = 0;
        self.events.publish(StatusEvent::AlertRaised(limit));
        Ok(Some(LimitEvent { limit, during_move }))
    }

    /// Advance the bounce state machine given the latest switch reading.
    pub fn next_bounce(&mut self, still_closed: bool) -> Result<BounceStep> {
        let GuardState::Bouncing(limit) = self.state else {
            return Err(eyre::Report::new(FenceError::State(
                "no limit switch engaged".into(),
            )));
        };
        self.ensure_clear()?;
        if !still_closed {
            info!(%limit, cycles = self.cycles, "limit switch released");
            self.state = GuardState::Clear;
            self.events.publish(StatusEvent::AlertCleared(limit));
            return Ok(BounceStep::Released(limit));
        }
        if self.cycles >= self.cfg.max_bounce_cycles {
            error!(%limit, cycles = self.cycles, "limit switch did not release; motion halted");
            self.stuck = true;
            return Ok(BounceStep::Stuck(limit));
        }
        self.cycles += 1;
        trace!(%limit, cycle = self.cycles, "bounce micro-move");
        Ok(BounceStep::Reverse {
            direction: limit.release_direction(),
            steps: self.cfg.bounce_steps,
        })
    }

    /// Latch the fault for the switch being backed off, as if it had stuck.
    /// Used when recovery is interrupted by a hardware error so the alert
    /// stays pending until `reset_fault`.
    pub fn latch_fault(&mut self) -> Option<Limit> {
        let GuardState::Bouncing(limit) = self.state else {
            return None;
        };
        error!(%limit, cycles = self.cycles, "limit recovery interrupted; fault latched");
        self.stuck = true;
        Some(limit)
    }

    /// Clear a latched stuck fault. Returns the switch that was stuck.
    pub fn reset_fault(&mut self) -> Option<Limit> {
        if !self.stuck {
            return None;
        }
        let GuardState::Bouncing(limit) = self.state else {
            self.stuck = false;
            return None;
        };
        info!(%limit, "stuck limit fault reset");
        self.stuck = false;
        self.cycles = 0;
        self.state = GuardState::Clear;
        self.events.publish(StatusEvent::AlertCleared(limit));
        Some(limit)
    }
}
