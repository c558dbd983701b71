#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and cut-list parsing for the fence controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Cut-list CSV loader enforces headers and rejects rows that cannot be
//!   cut (non-finite or non-positive lengths).
//!
//! Calibration values are not part of this file; they live in the calibration
//! store written by the controller (`[storage].path`).
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Pins {
    pub motor_step: u8,
    pub motor_dir: u8,
    /// Driver ENA input; omitted when the driver is hard-wired enabled.
    pub motor_en: Option<u8>,
    pub limit_left: u8,
    pub limit_right: u8,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MotionCfg {
    /// Steps per press of the nudge buttons.
    pub nudge_steps: u32,
    /// Length of the calibration run in steps.
    pub calibration_steps: u32,
    /// High time of one step pulse in microseconds.
    pub step_pulse_us: u32,
    /// Slider position applied at startup (0-100); absent keeps the stored working speed.
    pub initial_speed_percent: Option<u8>,
}

impl Default for MotionCfg {
    fn default() -> Self {
        Self {
            nudge_steps: 3,
            calibration_steps: 1000,
            step_pulse_us: 20,
            initial_speed_percent: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LimitsCfg {
    /// Steps per bounce micro-move when backing off a switch.
    pub bounce_steps: u32,
    /// Micro-moves allowed before a switch is declared stuck.
    pub max_bounce_cycles: u32,
    /// Treat low level as contact closed when true.
    pub active_low: bool,
    /// Reads per poll (majority vote) on the GPIO backend.
    pub samples: u8,
}

impl Default for LimitsCfg {
    fn default() -> Self {
        Self {
            bounce_steps: 50,
            max_bounce_cycles: 40,
            active_low: true,
            samples: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageCfg {
    /// TOML file holding calibration key/value pairs.
    pub path: String,
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            path: "fence_calibration.toml".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Geometry of the simulated axis used when no hardware backend is built.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    pub left_trip: i64,
    pub right_trip: i64,
    pub release_steps: i64,
    pub start_at: i64,
    /// Pace simulated pulses in real time; off runs moves instantly.
    pub realtime: bool,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            left_trip: -40,
            right_trip: 65_000,
            release_steps: 120,
            start_at: 0,
            realtime: false,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct CutListCfg {
    /// Optional CSV (`label,inches`) fed to the Next button.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub motion: MotionCfg,
    #[serde(default)]
    pub limits: LimitsCfg,
    #[serde(default)]
    pub storage: StorageCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub sim: SimCfg,
    #[serde(default)]
    pub cut_list: CutListCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Cut-list CSV schema.
///
/// Expected headers:
/// label,inches
///
/// Example:
/// label,inches
/// rail,23.5
/// stile,11.25
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CutRow {
    pub label: String,
    pub inches: f64,
}

pub fn load_cut_list_csv(path: &std::path::Path) -> eyre::Result<Vec<CutRow>> {
    let file = std::fs::File::open(path)
        .map_err(|e| eyre::eyre!("open cut list CSV {:?}: {}", path, e))?;
    parse_cut_list(file).map_err(|e| eyre::eyre!("{:?}: {}", path, e))
}

pub fn parse_cut_list<R: std::io::Read>(reader: R) -> eyre::Result<Vec<CutRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers: {}", e))?
        .clone();
    let expected = ["label", "inches"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "cut list CSV must have headers 'label,inches', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CutRow>().enumerate() {
        match rec {
            Ok(row) => {
                if !row.inches.is_finite() || row.inches <= 0.0 {
                    eyre::bail!(
                        "cut list row {} ({}): inches must be a positive number",
                        idx + 2,
                        row.label
                    );
                }
                rows.push(row);
            }
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    if rows.is_empty() {
        eyre::bail!("cut list CSV has no rows");
    }
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        let p = &self.pins;
        let mut used = vec![p.motor_step, p.motor_dir, p.limit_left, p.limit_right];
        if let Some(en) = p.motor_en {
            used.push(en);
        }
        let mut sorted = used.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != used.len() {
            eyre::bail!("pins must all be distinct");
        }

        // Motion
        if self.motion.nudge_steps == 0 {
            eyre::bail!("motion.nudge_steps must be >= 1");
        }
        if self.motion.calibration_steps == 0 {
            eyre::bail!("motion.calibration_steps must be >= 1");
        }
        if self.motion.step_pulse_us == 0 {
            eyre::bail!("motion.step_pulse_us must be >= 1");
        }
        if self.motion.step_pulse_us > 10_000 {
            eyre::bail!("motion.step_pulse_us is unreasonably large (>10ms)");
        }
        if let Some(pct) = self.motion.initial_speed_percent
            && pct > 100
        {
            eyre::bail!("motion.initial_speed_percent must be in [0, 100]");
        }

        // Limits
        if self.limits.bounce_steps == 0 {
            eyre::bail!("limits.bounce_steps must be >= 1");
        }
        if self.limits.max_bounce_cycles == 0 {
            eyre::bail!("limits.max_bounce_cycles must be >= 1");
        }
        if self.limits.samples == 0 {
            eyre::bail!("limits.samples must be >= 1");
        }

        // Storage
        if self.storage.path.trim().is_empty() {
            eyre::bail!("storage.path must not be empty");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        // Sim
        if self.sim.left_trip >= self.sim.right_trip {
            eyre::bail!("sim.left_trip must be below sim.right_trip");
        }
        if self.sim.release_steps < 1 {
            eyre::bail!("sim.release_steps must be >= 1");
        }

        Ok(())
    }
}
