//! Human-readable error descriptions and structured JSON error formatting.

use fence_core::error::{BuildError, FenceError};

use crate::panel::ScriptFaults;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(BuildError::InvalidConfig(msg)) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the [motion] / [limits] sections of the config, then rerun."
        );
    }

    if let Some(ScriptFaults(n)) = err.downcast_ref::<ScriptFaults>() {
        return format!(
            "What happened: The panel script ran to the end but {n} event(s) faulted.\nLikely causes: See the FAULT lines printed above.\nHow to fix: Resolve each fault and rerun the script."
        );
    }

    if let Some(fe) = err.downcast_ref::<FenceError>() {
        return match fe {
            FenceError::LimitStuck(limit) => format!(
                "What happened: The {limit} limit switch stayed closed through every back-off attempt; the motor was switched off.\nLikely causes: Carriage jammed against the stop, a welded or mis-wired switch, or limits.active_low set wrong.\nHow to fix: Free the carriage and check the switch wiring, then reset the fault from the panel (press reset-fault)."
            ),
            FenceError::ParkFailed(steps) => format!(
                "What happened: Parking travelled {steps} steps without reaching the left limit switch.\nLikely causes: Left switch disconnected, wrong limit_left pin, or distance_per_step far too small.\nHow to fix: Check [pins].limit_left and the switch, and verify the calibration."
            ),
            FenceError::MotorDisabled => "What happened: The motor is powered off.\nLikely causes: The power switch was turned off or a fault disabled the driver.\nHow to fix: Turn motor power on (or reset the fault) and retry.".to_string(),
            FenceError::InvalidCalibration(msg) => format!(
                "What happened: Calibration rejected ({msg}).\nLikely causes: A zero, negative or non-numeric setting, or working_speed above max_motor_speed.\nHow to fix: Correct the value; `fence settings show` lists the active calibration."
            ),
            FenceError::Storage(msg) => format!(
                "What happened: Calibration could not be saved ({msg}).\nLikely causes: Read-only filesystem or missing permissions on [storage].path.\nHow to fix: Point [storage].path at a writable location."
            ),
            FenceError::Hardware(msg) | FenceError::HardwareFault(msg) => format!(
                "What happened: The motor driver or a switch input reported an error ({msg}).\nLikely causes: Wiring, power to the driver, or GPIO permissions.\nHow to fix: Check [pins] and the driver supply, then retry."
            ),
            FenceError::State(msg) => format!(
                "What happened: Command refused ({msg}).\nLikely causes: The controller is not in a state that allows it.\nHow to fix: Resolve the condition above and retry."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("open motor pins") || lower.contains("open limit pins") {
        return "What happened: Failed to initialize hardware pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO.".to_string();
    }

    if lower.contains("invalid configuration") || lower.contains("parse config") {
        let cause = err.root_cause();
        return format!(
            "What happened: Configuration is invalid or incomplete ({cause}).\nLikely causes: Missing [pins] (motor_step, motor_dir, limit_left, limit_right), or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("cut list") {
        let cause = err.root_cause();
        return format!("Invalid cut list: {cause}. Expected a CSV with headers 'label,inches'.");
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable short name for the error kind, used in JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    if err.downcast_ref::<ScriptFaults>().is_some() {
        return "PanelFaults";
    }
    match err.downcast_ref::<FenceError>() {
        Some(FenceError::LimitStuck(_)) => "LimitStuck",
        Some(FenceError::ParkFailed(_)) => "ParkFailed",
        Some(FenceError::MotorDisabled) => "MotorDisabled",
        Some(FenceError::InvalidCalibration(_)) => "InvalidCalibration",
        Some(FenceError::Storage(_)) => "Storage",
        Some(FenceError::Hardware(_) | FenceError::HardwareFault(_)) => "Hardware",
        Some(FenceError::State(_)) => "State",
        None => "Error",
    }
}

/// Map typed errors to stable exit codes; anything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<ScriptFaults>().is_some() {
        return 10;
    }
    match err.downcast_ref::<FenceError>() {
        Some(FenceError::LimitStuck(_)) => 3,
        Some(FenceError::ParkFailed(_)) => 4,
        Some(FenceError::MotorDisabled) => 5,
        Some(FenceError::InvalidCalibration(_)) => 6,
        Some(FenceError::Hardware(_) | FenceError::HardwareFault(_)) => 7,
        Some(FenceError::Storage(_)) => 8,
        Some(FenceError::State(_)) => 9,
        None => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
