//! Raspberry Pi GPIO backend (rppal): STEP/DIR/ENA stepper driver inputs
//! (TB6600-style) and two limit switches wired to pulled-up inputs.

use std::time::Duration;

use fence_traits::{BoxError, Direction, Limit, LimitInputs, StepperDriver};
use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::{debug, trace};

use crate::error::{HwError, Result};
use crate::util::{pulse_width, read_switch};

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

pub struct GpioStepper {
    step: OutputPin,
    dir: OutputPin,
    /// ENA input on the driver; low enables the coils.
    enable: Option<OutputPin>,
    pulse: Duration,
    position: i64,
    current_dir: Direction,
    enabled: bool,
}

impl GpioStepper {
    pub fn new(step_pin: u8, dir_pin: u8, enable_pin: Option<u8>, pulse_us: u32) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let mut step = gpio.get(step_pin).map_err(gpio_err)?.into_output();
        let dir = gpio.get(dir_pin).map_err(gpio_err)?.into_output();
        let enable = match enable_pin {
            Some(p) => {
                let mut pin = gpio.get(p).map_err(gpio_err)?.into_output();
                pin.set_low();
                Some(pin)
            }
            None => None,
        };
        step.set_low();
        debug!(step_pin, dir_pin, ?enable_pin, pulse_us, "gpio stepper ready");
        Ok(Self {
            step,
            dir,
            enable,
            pulse: pulse_width(pulse_us),
            position: 0,
            current_dir: Direction::Right,
            enabled: true,
        })
    }
}

impl StepperDriver for GpioStepper {
    fn set_direction(&mut self, dir: Direction) -> std::result::Result<(), BoxError> {
        match dir {
            Direction::Right => self.dir.set_high(),
            Direction::Left => self.dir.set_low(),
        }
        self.current_dir = dir;
        Ok(())
    }

    fn step_once(&mut self) -> std::result::Result<(), BoxError> {
        if !self.enabled {
            return Err(Box::new(HwError::Disabled));
        }
        self.step.set_high();
        std::thread::sleep(self.pulse);
        self.step.set_low();
        self.position += self.current_dir.sign();
        Ok(())
    }

    fn current_position_steps(&self) -> i64 {
        self.position
    }

    fn set_current_position(&mut self, steps: i64) {
        self.position = steps;
    }

    fn set_speed(
        &mut self,
        steps_per_sec: u32,
        direction: Direction,
    ) -> std::result::Result<(), BoxError> {
        // Pulse spacing is owned by the controller's clock; only the sign matters here.
        trace!(steps_per_sec, ?direction, "gpio speed");
        self.set_direction(direction)
    }

    fn enable(&mut self) -> std::result::Result<(), BoxError> {
        if let Some(pin) = self.enable.as_mut() {
            pin.set_low();
        }
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> std::result::Result<(), BoxError> {
        if let Some(pin) = self.enable.as_mut() {
            pin.set_high();
        }
        self.enabled = false;
        Ok(())
    }
}

pub struct GpioLimits {
    left: InputPin,
    right: InputPin,
    active_low: bool,
    samples: u8,
}

impl GpioLimits {
    pub fn new(left_pin: u8, right_pin: u8, active_low: bool, samples: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let left = gpio.get(left_pin).map_err(gpio_err)?.into_input_pullup();
        let right = gpio.get(right_pin).map_err(gpio_err)?.into_input_pullup();
        debug!(left_pin, right_pin, active_low, "gpio limit inputs ready");
        Ok(Self {
            left,
            right,
            active_low,
            samples,
        })
    }
}

impl LimitInputs for GpioLimits {
    fn read_limit(&mut self, which: Limit) -> std::result::Result<bool, BoxError> {
        let pin = match which {
            Limit::Left => &self.left,
            Limit::Right => &self.right,
        };
        Ok(read_switch(
            || pin.is_high(),
            self.active_low,
            self.samples,
            Duration::from_micros(2),
        ))
    }
}
