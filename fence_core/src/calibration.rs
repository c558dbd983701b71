//! Tunable physical and motion constants, their validation, and persistence.

use std::fmt::Display;
use std::str::FromStr;

use fence_traits::KvStore;
use tracing::{debug, info, warn};

use crate::error::FenceError;
use crate::units::UnitConverter;

pub const KEY_STEPS_PER_REVOLUTION: &str = "steps_per_revolution";
pub const KEY_MICROSTEP_MULTIPLIER: &str = "microstep_multiplier";
pub const KEY_DISTANCE_PER_STEP: &str = "distance_per_step";
pub const KEY_MAX_MOTOR_SPEED: &str = "max_motor_speed";
pub const KEY_MAX_ACCELERATION: &str = "max_acceleration";
pub const KEY_WORKING_SPEED: &str = "working_speed";
pub const KEY_KERF: &str = "kerf";
pub const KEY_LEFT_TRAVEL_INCHES: &str = "left_travel_inches";

/// Calibration of the fence axis.
///
/// Mutated only through [`Calibration::apply_settings`]; the controller owns
/// its copy, so nothing can change it while a move is running.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    /// Full steps per leadscrew revolution.
    pub steps_per_revolution: u32,
    /// Driver microstep subdivision.
    pub microstep_multiplier: u32,
    /// Inches travelled per driver pulse.
    pub distance_per_step: f64,
    /// Ceiling of the speed slider (steps/s).
    pub max_motor_speed: u32,
    /// Steps/s². Stored and validated; moves run at constant speed.
    pub max_acceleration: u32,
    /// Speed used for moves and bounce recovery (steps/s).
    pub working_speed: u32,
    /// Blade cutting width in inches.
    pub kerf: f64,
    /// Distance from the left switch to the blade; bounds travel.
    pub left_travel_inches: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            steps_per_revolution: 1600,
            microstep_multiplier: 8,
            distance_per_step: 0.000_739_20,
            max_motor_speed: 4000,
            max_acceleration: 2000,
            working_speed: 2000,
            kerf: 0.125,
            left_travel_inches: 48.0,
        }
    }
}

/// One editable calibration field, addressed by the settings form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsField {
    StepsPerRevolution,
    MicrostepMultiplier,
    DistancePerStep,
    MaxMotorSpeed,
    MaxAcceleration,
    WorkingSpeed,
    Kerf,
    LeftTravelInches,
}

impl SettingsField {
    pub const ALL: [SettingsField; 8] = [
        SettingsField::StepsPerRevolution,
        SettingsField::MicrostepMultiplier,
        SettingsField::DistancePerStep,
        SettingsField::MaxMotorSpeed,
        SettingsField::MaxAcceleration,
        SettingsField::WorkingSpeed,
        SettingsField::Kerf,
        SettingsField::LeftTravelInches,
    ];

    /// Storage key, also accepted by `FromStr`.
    pub fn key(self) -> &'static str {
        match self {
            SettingsField::StepsPerRevolution => KEY_STEPS_PER_REVOLUTION,
            SettingsField::MicrostepMultiplier => KEY_MICROSTEP_MULTIPLIER,
            SettingsField::DistancePerStep => KEY_DISTANCE_PER_STEP,
            SettingsField::MaxMotorSpeed => KEY_MAX_MOTOR_SPEED,
            SettingsField::MaxAcceleration => KEY_MAX_ACCELERATION,
            SettingsField::WorkingSpeed => KEY_WORKING_SPEED,
            SettingsField::Kerf => KEY_KERF,
            SettingsField::LeftTravelInches => KEY_LEFT_TRAVEL_INCHES,
        }
    }
}

impl FromStr for SettingsField {
    type Err = FenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|f| f.key() == wanted)
            .ok_or_else(|| FenceError::InvalidCalibration(format!("unknown setting '{s}'")))
    }
}

/// Partial update from the settings form; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub steps_per_revolution: Option<u32>,
    pub microstep_multiplier: Option<u32>,
    pub distance_per_step: Option<f64>,
    pub max_motor_speed: Option<u32>,
    pub max_acceleration: Option<u32>,
    pub working_speed: Option<u32>,
    pub kerf: Option<f64>,
    pub left_travel_inches: Option<f64>,
}

fn parse_field<T: FromStr>(field: SettingsField, text: &str) -> Result<T, FenceError> {
    text.trim().parse::<T>().map_err(|_| {
        FenceError::InvalidCalibration(format!("{}: cannot parse '{}'", field.key(), text.trim()))
    })
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Parse operator text into one field. Range checks happen on apply.
    pub fn set_field(&mut self, field: SettingsField, text: &str) -> Result<(), FenceError> {
        match field {
            SettingsField::StepsPerRevolution => {
                self.steps_per_revolution = Some(parse_field(field, text)?);
            }
            SettingsField::MicrostepMultiplier => {
                self.microstep_multiplier = Some(parse_field(field, text)?);
            }
            SettingsField::DistancePerStep => {
                self.distance_per_step = Some(parse_field(field, text)?);
            }
            SettingsField::MaxMotorSpeed => {
                self.max_motor_speed = Some(parse_field(field, text)?);
            }
            SettingsField::MaxAcceleration => {
                self.max_acceleration = Some(parse_field(field, text)?);
            }
            SettingsField::WorkingSpeed => self.working_speed = Some(parse_field(field, text)?),
            SettingsField::Kerf => self.kerf = Some(parse_field(field, text)?),
            SettingsField::LeftTravelInches => {
                self.left_travel_inches = Some(parse_field(field, text)?);
            }
        }
        Ok(())
    }
}

fn positive_f64(key: &str, v: f64) -> Result<(), FenceError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(FenceError::InvalidCalibration(format!(
            "{key} must be a positive number, got {v}"
        )))
    }
}

fn positive_u32(key: &str, v: u32) -> Result<(), FenceError> {
    if v > 0 {
        Ok(())
    } else {
        Err(FenceError::InvalidCalibration(format!("{key} must be > 0")))
    }
}

fn read_or<T, S>(store: &S, key: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
    S: KvStore + ?Sized,
{
    match store.get(key) {
        None => {
            debug!(key, default = %default, "calibration key missing; using default");
            default
        }
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                warn!(key, raw = %raw, default = %default, "malformed calibration value; using default");
                default
            }
        },
    }
}

impl Calibration {
    pub fn validate(&self) -> Result<(), FenceError> {
        positive_u32(KEY_STEPS_PER_REVOLUTION, self.steps_per_revolution)?;
        positive_u32(KEY_MICROSTEP_MULTIPLIER, self.microstep_multiplier)?;
        positive_f64(KEY_DISTANCE_PER_STEP, self.distance_per_step)?;
        positive_u32(KEY_MAX_MOTOR_SPEED, self.max_motor_speed)?;
        positive_u32(KEY_MAX_ACCELERATION, self.max_acceleration)?;
        positive_u32(KEY_WORKING_SPEED, self.working_speed)?;
        positive_f64(KEY_KERF, self.kerf)?;
        positive_f64(KEY_LEFT_TRAVEL_INCHES, self.left_travel_inches)?;
        if self.working_speed > self.max_motor_speed {
            return Err(FenceError::InvalidCalibration(format!(
                "working_speed ({}) must not exceed max_motor_speed ({})",
                self.working_speed, self.max_motor_speed
            )));
        }
        if self.kerf >= self.left_travel_inches {
            return Err(FenceError::InvalidCalibration(
                "kerf must be smaller than left_travel_inches".into(),
            ));
        }
        if self.max_travel_steps() < 1 {
            return Err(FenceError::InvalidCalibration(
                "left_travel_inches is shorter than one step".into(),
            ));
        }
        Ok(())
    }

    pub fn converter(&self) -> UnitConverter {
        UnitConverter::from_calibration(self)
    }

    /// Travel bound in steps; the blade reference sits here.
    pub fn max_travel_steps(&self) -> i64 {
        self.converter().steps_from_inches(self.left_travel_inches)
    }

    /// Apply a settings update all-or-nothing.
    ///
    /// The candidate is validated as a whole; on error `self` is untouched.
    pub fn apply_settings(&mut self, update: &SettingsUpdate) -> Result<(), FenceError> {
        let candidate = Calibration {
            steps_per_revolution: update
                .steps_per_revolution
                .unwrap_or(self.steps_per_revolution),
            microstep_multiplier: update
                .microstep_multiplier
                .unwrap_or(self.microstep_multiplier),
            distance_per_step: update.distance_per_step.unwrap_or(self.distance_per_step),
            max_motor_speed: update.max_motor_speed.unwrap_or(self.max_motor_speed),
            max_acceleration: update.max_acceleration.unwrap_or(self.max_acceleration),
            working_speed: update.working_speed.unwrap_or(self.working_speed),
            kerf: update.kerf.unwrap_or(self.kerf),
            left_travel_inches: update.left_travel_inches.unwrap_or(self.left_travel_inches),
        };
        candidate.validate()?;
        info!(
            lead_in = candidate.converter().lead_inches(),
            max_travel_steps = candidate.max_travel_steps(),
            "calibration updated"
        );
        *self = candidate;
        Ok(())
    }

    /// Read every field from `store`; bad or missing entries fall back to
    /// defaults, and an inconsistent combination falls back entirely.
    pub fn load<S: KvStore + ?Sized>(store: &S) -> Self {
        let d = Self::default();
        let loaded = Self {
            steps_per_revolution: read_or(store, KEY_STEPS_PER_REVOLUTION, d.steps_per_revolution),
            microstep_multiplier: read_or(store, KEY_MICROSTEP_MULTIPLIER, d.microstep_multiplier),
            distance_per_step: read_or(store, KEY_DISTANCE_PER_STEP, d.distance_per_step),
            max_motor_speed: read_or(store, KEY_MAX_MOTOR_SPEED, d.max_motor_speed),
            max_acceleration: read_or(store, KEY_MAX_ACCELERATION, d.max_acceleration),
            working_speed: read_or(store, KEY_WORKING_SPEED, d.working_speed),
            kerf: read_or(store, KEY_KERF, d.kerf),
            left_travel_inches: read_or(store, KEY_LEFT_TRAVEL_INCHES, d.left_travel_inches),
        };
        match loaded.validate() {
            Ok(()) => loaded,
            Err(e) => {
                warn!(error = %e, "stored calibration rejected; using defaults");
                d
            }
        }
    }

    /// Key/value pairs for every field, in storage order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            (KEY_STEPS_PER_REVOLUTION, self.steps_per_revolution.to_string()),
            (KEY_MICROSTEP_MULTIPLIER, self.microstep_multiplier.to_string()),
            (KEY_DISTANCE_PER_STEP, self.distance_per_step.to_string()),
            (KEY_MAX_MOTOR_SPEED, self.max_motor_speed.to_string()),
            (KEY_MAX_ACCELERATION, self.max_acceleration.to_string()),
            (KEY_WORKING_SPEED, self.working_speed.to_string()),
            (KEY_KERF, self.kerf.to_string()),
            (KEY_LEFT_TRAVEL_INCHES, self.left_travel_inches.to_string()),
        ]
    }

    pub fn save<S: KvStore + ?Sized>(&self, store: &mut S) -> Result<(), FenceError> {
        store
            .put_all(&self.entries())
            .map_err(|e| FenceError::Storage(e.to_string()))?;
        info!("calibration saved");
        Ok(())
    }

    /// Inches per pulse measured by a calibration run of `steps` pulses.
    pub fn distance_per_step_from_run(measured_inches: f64, steps: i64) -> Result<f64, FenceError> {
        if steps == 0 {
            return Err(FenceError::InvalidCalibration(
                "calibration run moved no steps".into(),
            ));
        }
        positive_f64("measured distance", measured_inches)?;
        Ok(measured_inches / steps.unsigned_abs() as f64)
    }
}
