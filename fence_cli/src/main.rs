mod cli;
mod error_fmt;
mod hw;
mod panel;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr};
use fence_core::calibration::KEY_DISTANCE_PER_STEP;
use fence_core::{
    Calibration, CommandRouter, CutList, FenceController, MoveOutcome, MoveReport, MoveRequest,
    SettingsField, SettingsUpdate, StatusPublisher, TomlFileStore,
};
use fence_traits::{KvStore, Limit, LimitInputs};
use serde_json::json;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE, SettingsCmd};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    if let Err(e) = color_eyre::install() {
        eprintln!("color-eyre: {e}");
    }
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let code = match run(cli) {
        Ok(()) => 0,
        Err(e) => {
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            tracing::error!(error = %format!("{e:#}"), "command failed");
            exit_code_for_error(&e)
        }
    };
    std::process::exit(code);
}

fn init_tracing(json: bool, level: &str, logging: &fence_config::Logging) -> Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level '{level}'"))?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if json {
        layers.push(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    }

    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_filter = EnvFilter::try_new(logging.level.as_deref().unwrap_or("info"))
            .wrap_err("invalid logging.level")?;
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_filter)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .wrap_err("install tracing subscriber")
}

fn load_config(path: &Path) -> Result<fence_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = fence_config::load_toml(&text).wrap_err("parse config")?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config)?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging)?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))
            .wrap_err("install Ctrl-C handler")?;
    }

    match cli.cmd {
        Commands::Move {
            inches,
            relative,
            direction,
        } => {
            let req = if relative {
                MoveRequest::relative(inches, direction.into())
            } else {
                MoveRequest::exact(inches)
            };
            motion(&cfg, stop, cli.json, |c| c.execute(&req))
        }
        Commands::ZeroToBlade { kerf } => motion(&cfg, stop, cli.json, |c| c.zero_to_blade(kerf)),
        Commands::MoveToZero => motion(&cfg, stop, cli.json, FenceController::move_to_zero),
        Commands::Park => motion(&cfg, stop, cli.json, FenceController::park),
        Commands::Nudge { direction } => {
            motion(&cfg, stop, cli.json, |c| c.nudge(direction.into()))
        }
        Commands::Settings { action } => settings(&cfg, action, cli.json),
        Commands::Panel { script } => {
            let text = std::fs::read_to_string(&script)
                .wrap_err_with(|| format!("read panel script {}", script.display()))?;
            let events = panel::parse_script(&text)?;
            let cut_list = match cli
                .cut_list
                .or_else(|| cfg.cut_list.path.as_ref().map(Into::into))
            {
                Some(path) => {
                    let rows = fence_config::load_cut_list_csv(&path).wrap_err("load cut list")?;
                    CutList::from(rows.as_slice())
                }
                None => CutList::default(),
            };
            let (publisher, rx) = fence_core::channel();
            let (controller, store) = hw::build_controller(&cfg, stop, publisher.clone())?;
            let mut router = CommandRouter::new(controller, store, publisher).with_cut_list(cut_list);
            let faults = panel::run(&mut router, &rx, events, cli.json);
            tracing::info!(faults, "panel script finished");
            if faults > 0 {
                return Err(eyre::Report::new(panel::ScriptFaults(faults)));
            }
            Ok(())
        }
        Commands::SelfCheck => self_check(&cfg, cli.json),
    }
}

fn motion<F>(cfg: &fence_config::Config, stop: Arc<AtomicBool>, json: bool, op: F) -> Result<()>
where
    F: FnOnce(&mut FenceController) -> Result<MoveReport>,
{
    let (mut controller, _store) = hw::build_controller(cfg, stop, StatusPublisher::disconnected())?;
    let report = op(&mut controller)?;
    let inches = controller.converter().inches_from_steps(report.final_steps);
    let (outcome, limit) = match report.outcome {
        MoveOutcome::Reached => ("reached", None),
        MoveOutcome::LimitHit(l) => ("limit_hit", Some(l.to_string())),
        MoveOutcome::Cancelled => ("cancelled", None),
    };
    if json {
        println!(
            "{}",
            json!({
                "outcome": outcome,
                "limit": limit,
                "position_in": inches,
                "position_steps": report.final_steps,
                "target_steps": report.target_steps,
                "clamped": report.clamped,
                "steps_issued": report.steps_issued,
            })
        );
    } else {
        let mut line = format!("{outcome}: {inches:.4} in ({} steps)", report.final_steps);
        if report.clamped {
            line.push_str(", target clamped to travel range");
        }
        if let Some(l) = limit {
            line.push_str(&format!(", stopped by {l} limit"));
        }
        println!("{line}");
    }
    Ok(())
}

fn print_calibration(c: &Calibration, json: bool) {
    if json {
        let mut obj = serde_json::Map::new();
        for (k, v) in c.entries() {
            obj.insert(k.to_string(), json!(v));
        }
        obj.insert("lead_inches".into(), json!(c.converter().lead_inches()));
        obj.insert("max_travel_steps".into(), json!(c.max_travel_steps()));
        println!("{}", serde_json::Value::Object(obj));
    } else {
        for (k, v) in c.entries() {
            println!("{k} = {v}");
        }
        println!("# lead {:.4} in/rev, travel {} steps", c.converter().lead_inches(), c.max_travel_steps());
    }
}

fn settings(cfg: &fence_config::Config, action: SettingsCmd, json: bool) -> Result<()> {
    let mut store = TomlFileStore::open(&cfg.storage.path);
    let mut calibration = Calibration::load(&store);
    match action {
        SettingsCmd::Show => {}
        SettingsCmd::Apply { set, save } => {
            let mut update = SettingsUpdate::default();
            for pair in &set {
                let Some((key, value)) = pair.split_once('=') else {
                    eyre::bail!("expected KEY=VALUE, got '{pair}'");
                };
                let field = key.parse::<SettingsField>()?;
                update.set_field(field, value)?;
            }
            calibration
                .apply_settings(&update)
                .map_err(eyre::Report::new)
                .wrap_err("apply settings")?;
            if save {
                calibration.save(&mut store).map_err(eyre::Report::new)?;
                tracing::info!(path = %store.path().display(), "calibration written");
            }
        }
    }
    print_calibration(&calibration, json);
    Ok(())
}

fn self_check(cfg: &fence_config::Config, json: bool) -> Result<()> {
    let store = TomlFileStore::open(&cfg.storage.path);
    let stored = store.get(KEY_DISTANCE_PER_STEP).is_some();
    let calibration = Calibration::load(&store);
    let ((_driver, mut limits), _clock) = hw::make_backend(cfg)?;
    let mut read = |l: Limit| {
        limits
            .read_limit(l)
            .map_err(|e| eyre::Report::new(fence_core::hw_error::map_hw_error(&*e)))
    };
    let left = read(Limit::Left)?;
    let right = read(Limit::Right)?;
    let backend = if cfg!(feature = "hardware") { "gpio" } else { "sim" };
    if json {
        println!(
            "{}",
            json!({
                "ok": true,
                "backend": backend,
                "left_closed": left,
                "right_closed": right,
                "calibration_stored": stored,
                "max_travel_steps": calibration.max_travel_steps(),
            })
        );
    } else {
        println!(
            "self-check ok ({backend}): left={} right={} calibration={}",
            if left { "closed" } else { "open" },
            if right { "closed" } else { "open" },
            if stored { "stored" } else { "defaults" },
        );
    }
    Ok(())
}
