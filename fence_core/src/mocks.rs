//! Test and helper mocks for fence_core

use fence_traits::{BoxError, Direction, Limit, LimitInputs, StepperDriver};

/// Switches that never close.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenLimits;

impl LimitInputs for OpenLimits {
    fn read_limit(&mut self, _which: Limit) -> Result<bool, BoxError> {
        Ok(false)
    }
}

/// Driver with no hardware behind it; counts pulses and records the last
/// commanded speed.
#[derive(Debug, Default, Clone)]
pub struct CountingDriver {
    pub position: i64,
    pub pulses: u64,
    pub direction: Option<Direction>,
    pub speed: u32,
    pub enabled: bool,
}

impl StepperDriver for CountingDriver {
    fn set_direction(&mut self, dir: Direction) -> Result<(), BoxError> {
        self.direction = Some(dir);
        Ok(())
    }

    fn step_once(&mut self) -> Result<(), BoxError> {
        if !self.enabled {
            return Err("driver disabled".into());
        }
        let dir = self.direction.ok_or("direction not set")?;
        self.position += dir.sign();
        self.pulses += 1;
        Ok(())
    }

    fn current_position_steps(&self) -> i64 {
        self.position
    }

    fn set_current_position(&mut self, steps: i64) {
        self.position = steps;
    }

    fn set_speed(&mut self, steps_per_sec: u32, _direction: Direction) -> Result<(), BoxError> {
        self.speed = steps_per_sec;
        Ok(())
    }

    fn enable(&mut self) -> Result<(), BoxError> {
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), BoxError> {
        self.enabled = false;
        Ok(())
    }
}
