//! Simulated axis: a stepper and two switches sharing one carriage position.
//!
//! Switch contact is modeled with release travel: a switch closes when the
//! carriage reaches its trip point and only opens again once the carriage has
//! backed off by `release_steps`, the way a lever switch with overtravel does.

use std::cell::RefCell;
use std::rc::Rc;

use fence_traits::{BoxError, Direction, Limit, LimitInputs, StepperDriver};
use tracing::trace;

use crate::error::HwError;

#[derive(Debug, Clone, Copy)]
pub struct SimGeometry {
    /// Switch positions in steps (left trips at or below, right at or above).
    pub left_trip: i64,
    pub right_trip: i64,
    /// Backoff needed before a tripped switch opens.
    pub release_steps: i64,
}

impl Default for SimGeometry {
    fn default() -> Self {
        Self {
            left_trip: -40,
            right_trip: 65_000,
            release_steps: 120,
        }
    }
}

#[derive(Debug, Default)]
struct AxisState {
    /// Physical carriage location in steps, independent of the driver count.
    carriage: i64,
    left_closed: bool,
    right_closed: bool,
    /// Force a switch closed regardless of the carriage (failed switch).
    left_stuck: bool,
    right_stuck: bool,
    pulses: u64,
    speed_sps: u32,
    speed_dir: Option<Direction>,
}

/// Shared handle used by tests and the CLI to inspect and perturb the axis.
#[derive(Debug, Clone)]
pub struct SimAxis {
    state: Rc<RefCell<AxisState>>,
    geometry: SimGeometry,
}

impl SimAxis {
    pub fn new(geometry: SimGeometry, start_at: i64) -> Self {
        let axis = Self {
            state: Rc::new(RefCell::new(AxisState {
                carriage: start_at,
                ..AxisState::default()
            })),
            geometry,
        };
        axis.update_switches();
        axis
    }

    /// Build the driver/switch pair bound to this axis.
    pub fn split(&self) -> (SimulatedStepper, SimulatedLimits) {
        (
            SimulatedStepper {
                axis: self.clone(),
                position: self.carriage(),
                dir: Direction::Right,
                enabled: true,
            },
            SimulatedLimits { axis: self.clone() },
        )
    }

    pub fn carriage(&self) -> i64 {
        self.state.borrow().carriage
    }

    pub fn pulses(&self) -> u64 {
        self.state.borrow().pulses
    }

    /// Last speed command as seen by the driver.
    pub fn last_speed(&self) -> (u32, Option<Direction>) {
        let s = self.state.borrow();
        (s.speed_sps, s.speed_dir)
    }

    pub fn is_closed(&self, which: Limit) -> bool {
        let s = self.state.borrow();
        match which {
            Limit::Left => s.left_closed || s.left_stuck,
            Limit::Right => s.right_closed || s.right_stuck,
        }
    }

    /// Weld a switch shut (or free it again).
    pub fn set_stuck(&self, which: Limit, stuck: bool) {
        let mut s = self.state.borrow_mut();
        match which {
            Limit::Left => s.left_stuck = stuck,
            Limit::Right => s.right_stuck = stuck,
        }
    }

    fn advance(&self, dir: Direction) {
        {
            let mut s = self.state.borrow_mut();
            s.carriage += dir.sign();
            s.pulses += 1;
        }
        self.update_switches();
    }

    fn update_switches(&self) {
        let g = self.geometry;
        let mut s = self.state.borrow_mut();
        let at = s.carriage;
        if at <= g.left_trip {
            s.left_closed = true;
        } else if at > g.left_trip + g.release_steps {
            s.left_closed = false;
        }
        if at >= g.right_trip {
            s.right_closed = true;
        } else if at < g.right_trip - g.release_steps {
            s.right_closed = false;
        }
    }
}

/// Simulated open-loop driver; counts pulses like a real step generator.
#[derive(Debug)]
pub struct SimulatedStepper {
    axis: SimAxis,
    position: i64,
    dir: Direction,
    enabled: bool,
}

impl SimulatedStepper {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl StepperDriver for SimulatedStepper {
    fn set_direction(&mut self, dir: Direction) -> Result<(), BoxError> {
        self.dir = dir;
        Ok(())
    }

    fn step_once(&mut self) -> Result<(), BoxError> {
        if !self.enabled {
            return Err(Box::new(HwError::Disabled));
        }
        self.axis.advance(self.dir);
        self.position += self.dir.sign();
        Ok(())
    }

    fn current_position_steps(&self) -> i64 {
        self.position
    }

    fn set_current_position(&mut self, steps: i64) {
        self.position = steps;
    }

    fn set_speed(&mut self, steps_per_sec: u32, direction: Direction) -> Result<(), BoxError> {
        let mut s = self.axis.state.borrow_mut();
        s.speed_sps = steps_per_sec;
        s.speed_dir = Some(direction);
        Ok(())
    }

    fn enable(&mut self) -> Result<(), BoxError> {
        self.enabled = true;
        trace!("sim driver enabled");
        Ok(())
    }

    fn disable(&mut self) -> Result<(), BoxError> {
        self.enabled = false;
        trace!("sim driver disabled");
        Ok(())
    }
}

#[derive(Debug)]
pub struct SimulatedLimits {
    axis: SimAxis,
}

impl LimitInputs for SimulatedLimits {
    fn read_limit(&mut self, which: Limit) -> Result<bool, BoxError> {
        Ok(self.axis.is_closed(which))
    }
}
