//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use fence_traits::Direction;
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "fence", version, about = "Motorized miter-saw fence controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/fence_config.toml")]
    pub config: PathBuf,

    /// Cut list CSV (strict `label,inches` header); overrides [cut_list].path
    #[arg(long = "cut-list", value_name = "FILE")]
    pub cut_list: Option<PathBuf>,

    /// Output JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum DirArg {
    Left,
    Right,
}

impl From<DirArg> for Direction {
    fn from(d: DirArg) -> Self {
        match d {
            DirArg::Left => Direction::Left,
            DirArg::Right => Direction::Right,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Move the fence to a distance from zero (or by an offset with --relative)
    Move {
        /// Distance in inches
        #[arg(long, allow_hyphen_values = true)]
        inches: f64,
        /// Treat --inches as an offset from the current position
        #[arg(long, action = ArgAction::SetTrue)]
        relative: bool,
        /// Direction of a relative move
        #[arg(long, value_enum, default_value = "right")]
        direction: DirArg,
    },
    /// Move to the blade reference
    ZeroToBlade {
        /// Stop short of the blade by the calibrated kerf
        #[arg(long, action = ArgAction::SetTrue)]
        kerf: bool,
    },
    /// Move back to position zero
    MoveToZero,
    /// Home against the left switch and re-zero
    Park,
    /// Jog by the configured nudge distance
    Nudge {
        #[arg(long, value_enum, default_value = "right")]
        direction: DirArg,
    },
    /// Show or change the stored calibration
    Settings {
        #[command(subcommand)]
        action: SettingsCmd,
    },
    /// Replay operator panel events from a script file
    Panel {
        /// One event per line, e.g. `press move-stop` or `text move-distance 12.5`
        #[arg(long, value_name = "FILE")]
        script: PathBuf,
    },
    /// Quick health check (hardware presence / sim ok)
    SelfCheck,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCmd {
    /// Print the active calibration
    Show,
    /// Validate and apply KEY=VALUE pairs
    Apply {
        /// Setting to change, e.g. --set kerf=0.094 (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE", required = true)]
        set: Vec<String>,
        /// Persist the result to [storage].path
        #[arg(long, action = ArgAction::SetTrue)]
        save: bool,
    },
}
