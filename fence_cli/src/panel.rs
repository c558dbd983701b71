//! Text scripts of operator panel events, and status event rendering.
//!
//! Script syntax, one event per line (`#` starts a comment):
//!
//! ```text
//! text move-distance 23.5
//! switch travel off
//! press move-stop
//! slide speed 40
//! text setting.kerf 0.094
//! press apply
//! ```

use eyre::{WrapErr, bail};
use fence_core::{
    ButtonId, CommandRouter, FieldId, SettingsField, SliderId, StatusEvent, SwitchId, UiEvent,
};
use fence_traits::{KvStore, LimitInputs, StepperDriver};
use serde_json::json;

fn button(name: &str) -> eyre::Result<ButtonId> {
    Ok(match name {
        "move-stop" => ButtonId::MoveStop,
        "zero-to-blade" => ButtonId::ZeroToBlade,
        "move-to-zero" => ButtonId::MoveToZero,
        "nudge-right" => ButtonId::NudgeRight,
        "nudge-left" => ButtonId::NudgeLeft,
        "next" => ButtonId::Next,
        "rewind" => ButtonId::RewindCuts,
        "park" => ButtonId::Park,
        "set-zero" => ButtonId::SetZero,
        "save" => ButtonId::SaveSettings,
        "apply" => ButtonId::ApplySettings,
        "calibrate" => ButtonId::Calibrate,
        "reset-fault" => ButtonId::ResetFault,
        other => bail!("unknown button '{other}'"),
    })
}

fn switch(name: &str) -> eyre::Result<SwitchId> {
    Ok(match name {
        "power" => SwitchId::Power,
        "travel" => SwitchId::Travel,
        "left-right" => SwitchId::LeftRight,
        "kerf" => SwitchId::Kerf,
        other => bail!("unknown switch '{other}'"),
    })
}

fn field(name: &str) -> eyre::Result<FieldId> {
    Ok(match name {
        "move-distance" => FieldId::MoveDistance,
        "calibration-measured" => FieldId::CalibrationMeasured,
        other => match other.strip_prefix("setting.") {
            Some(key) => FieldId::Setting(key.parse::<SettingsField>()?),
            None => bail!("unknown field '{other}'"),
        },
    })
}

/// Parse one script line; blank lines and comments yield `None`.
pub fn parse_line(line: &str) -> eyre::Result<Option<UiEvent>> {
    let line = line.split('#').next().unwrap_or_default().trim();
    if line.is_empty() {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let target = words.next();
    let rest: Vec<&str> = words.collect();
    let Some(target) = target else {
        bail!("'{verb}' needs an argument");
    };
    let event = match verb {
        "press" => UiEvent::ButtonPressed(button(target)?),
        "slide" => {
            if target != "speed" {
                bail!("unknown slider '{target}'");
            }
            let [value] = rest.as_slice() else {
                bail!("usage: slide speed <0-100>");
            };
            let v = value
                .parse::<i32>()
                .wrap_err_with(|| format!("slider value '{value}'"))?;
            UiEvent::SliderChanged(SliderId::Speed, v)
        }
        "switch" => {
            let on = match rest.as_slice() {
                ["on"] => true,
                ["off"] => false,
                _ => bail!("usage: switch <name> on|off"),
            };
            UiEvent::SwitchToggled(switch(target)?, on)
        }
        "text" => {
            if rest.is_empty() {
                bail!("usage: text <field> <value>");
            }
            UiEvent::TextEntered(field(target)?, rest.join(" "))
        }
        other => bail!("unknown verb '{other}' (press|slide|switch|text)"),
    };
    Ok(Some(event))
}

pub fn parse_script(text: &str) -> eyre::Result<Vec<UiEvent>> {
    let mut events = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if let Some(ev) = parse_line(line).wrap_err_with(|| format!("script line {}", idx + 1))? {
            events.push(ev);
        }
    }
    Ok(events)
}

pub fn render_text(ev: &StatusEvent) -> String {
    match ev {
        StatusEvent::PositionChanged(inches) => format!("position {inches:.4} in"),
        StatusEvent::AlertRaised(l) => format!("ALERT {l} limit switch"),
        StatusEvent::AlertCleared(l) => format!("cleared {l} limit switch"),
        StatusEvent::SettingsApplied => "settings applied".to_string(),
        StatusEvent::SettingsRejected(why) => format!("settings rejected: {why}"),
        StatusEvent::SettingsSaved => "settings saved".to_string(),
        StatusEvent::SpeedChanged {
            steps_per_sec,
            percent,
        } => format!("speed {percent}% ({steps_per_sec} steps/s)"),
        StatusEvent::PowerChanged(on) => format!("motor {}", if *on { "on" } else { "off" }),
        StatusEvent::CutSelected {
            index,
            label,
            inches,
        } => format!("cut #{} {label}: {inches:.4} in", index + 1),
        StatusEvent::Rejected(why) => format!("rejected: {why}"),
        StatusEvent::Fault(msg) => format!("FAULT {msg}"),
    }
}

pub fn render_json(ev: &StatusEvent) -> serde_json::Value {
    match ev {
        StatusEvent::PositionChanged(inches) => json!({ "event": "position", "inches": inches }),
        StatusEvent::AlertRaised(l) => json!({ "event": "alert_raised", "limit": l.to_string() }),
        StatusEvent::AlertCleared(l) => json!({ "event": "alert_cleared", "limit": l.to_string() }),
        StatusEvent::SettingsApplied => json!({ "event": "settings_applied" }),
        StatusEvent::SettingsRejected(why) => json!({ "event": "settings_rejected", "reason": why }),
        StatusEvent::SettingsSaved => json!({ "event": "settings_saved" }),
        StatusEvent::SpeedChanged {
            steps_per_sec,
            percent,
        } => json!({ "event": "speed", "steps_per_sec": steps_per_sec, "percent": percent }),
        StatusEvent::PowerChanged(on) => json!({ "event": "power", "on": on }),
        StatusEvent::CutSelected {
            index,
            label,
            inches,
        } => json!({ "event": "cut_selected", "index": index, "label": label, "inches": inches }),
        StatusEvent::Rejected(why) => json!({ "event": "rejected", "reason": why }),
        StatusEvent::Fault(msg) => json!({ "event": "fault", "message": msg }),
    }
}

/// Raised after a script ran to the end with one or more faulted events.
#[derive(Debug, thiserror::Error)]
#[error("panel script reported {0} fault(s)")]
pub struct ScriptFaults(pub usize);

/// Feed every event through the router, printing status as it arrives.
/// Returns the number of faults.
pub fn run<D, L, S>(
    router: &mut CommandRouter<D, L, S>,
    rx: &crossbeam_channel::Receiver<StatusEvent>,
    events: Vec<UiEvent>,
    json: bool,
) -> usize
where
    D: StepperDriver,
    L: LimitInputs,
    S: KvStore,
{
    let mut faults = 0;
    for ev in events {
        if let Err(e) = router.handle(ev) {
            faults += 1;
            tracing::debug!(error = %e, "panel event failed");
        }
        for status in rx.try_iter() {
            if json {
                println!("{}", render_json(&status));
            } else {
                println!("{}", render_text(&status));
            }
        }
    }
    faults
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_verb() {
        assert_eq!(
            parse_line("press move-stop").unwrap(),
            Some(UiEvent::ButtonPressed(ButtonId::MoveStop))
        );
        assert_eq!(
            parse_line("  slide speed 40  # slower").unwrap(),
            Some(UiEvent::SliderChanged(SliderId::Speed, 40))
        );
        assert_eq!(
            parse_line("switch left-right off").unwrap(),
            Some(UiEvent::SwitchToggled(SwitchId::LeftRight, false))
        );
        assert_eq!(
            parse_line("text setting.working_speed 1500").unwrap(),
            Some(UiEvent::TextEntered(
                FieldId::Setting(SettingsField::WorkingSpeed),
                "1500".into()
            ))
        );
        assert_eq!(parse_line("# only a comment").unwrap(), None);
    }

    #[test]
    fn script_errors_name_the_line() {
        let err = parse_script("press park\npress launch\n").unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("script line 2"), "{msg}");
        assert!(msg.contains("launch"), "{msg}");
    }
}
