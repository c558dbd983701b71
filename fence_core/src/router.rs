//! Operator panel events mapped onto controller operations.
//!
//! The router mirrors the panel widgets (distance entry, travel mode,
//! direction, kerf checkbox, settings form) in `PanelState`; buttons act on
//! that mirrored state. Each event runs at most one operation; failures are
//! published and returned, never retried.

use fence_traits::{Direction, KvStore, LimitInputs, StepperDriver};
use tracing::{debug, warn};

use crate::calibration::{Calibration, SettingsField, SettingsUpdate};
use crate::cutlist::CutList;
use crate::error::Result;
use crate::motion::{MotionController, MoveMode, MoveReport, MoveRequest};
use crate::status::{StatusEvent, StatusPublisher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonId {
    /// Run the move described by the distance entry and switches.
    MoveStop,
    ZeroToBlade,
    MoveToZero,
    NudgeRight,
    NudgeLeft,
    /// Load the next cut list entry and move to it.
    Next,
    /// Start the cut list over from its first entry; no motion.
    RewindCuts,
    Park,
    SetZero,
    /// Persist the active calibration.
    SaveSettings,
    /// Apply the settings form draft.
    ApplySettings,
    Calibrate,
    ResetFault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SliderId {
    Speed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchId {
    Power,
    /// On selects relative travel.
    Travel,
    /// On selects rightward travel.
    LeftRight,
    Kerf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    MoveDistance,
    Setting(SettingsField),
    /// Distance measured after a calibration run, in inches.
    CalibrationMeasured,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    ButtonPressed(ButtonId),
    SliderChanged(SliderId, i32),
    SwitchToggled(SwitchId, bool),
    TextEntered(FieldId, String),
}

/// Mirrored values of the operator widgets.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelState {
    pub move_inches: f64,
    pub mode: MoveMode,
    pub direction: Direction,
    pub kerf: bool,
    pub draft: SettingsUpdate,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            move_inches: 0.0,
            mode: MoveMode::Exact,
            direction: Direction::Right,
            kerf: false,
            draft: SettingsUpdate::default(),
        }
    }
}

pub struct CommandRouter<D: StepperDriver, L: LimitInputs, S: KvStore> {
    controller: MotionController<D, L>,
    store: S,
    panel: PanelState,
    cuts: CutList,
    events: StatusPublisher,
    last_calibration_steps: Option<i64>,
}

impl<D: StepperDriver, L: LimitInputs, S: KvStore> CommandRouter<D, L, S> {
    pub fn new(controller: MotionController<D, L>, store: S, events: StatusPublisher) -> Self {
        Self {
            controller,
            store,
            panel: PanelState::default(),
            cuts: CutList::default(),
            events,
            last_calibration_steps: None,
        }
    }

    pub fn with_cut_list(mut self, cuts: CutList) -> Self {
        self.cuts = cuts;
        self
    }

    pub fn controller(&self) -> &MotionController<D, L> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut MotionController<D, L> {
        &mut self.controller
    }

    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn last_calibration_steps(&self) -> Option<i64> {
        self.last_calibration_steps
    }

    /// Dispatch one panel event. Returns `Err` exactly when a `Fault` was
    /// published.
    pub fn handle(&mut self, event: UiEvent) -> Result<()> {
        debug!(?event, "panel event");
        match event {
            UiEvent::ButtonPressed(b) => self.on_button(b),
            UiEvent::SliderChanged(SliderId::Speed, v) => {
                let sps = self.controller.set_working_speed(v);
                self.events.publish(StatusEvent::SpeedChanged {
                    steps_per_sec: sps,
                    percent: v.clamp(0, 100),
                });
                Ok(())
            }
            UiEvent::SwitchToggled(id, on) => self.on_switch(id, on),
            UiEvent::TextEntered(field, text) => {
                self.on_text(field, &text);
                Ok(())
            }
        }
    }

    fn on_button(&mut self, b: ButtonId) -> Result<()> {
        match b {
            ButtonId::MoveStop => {
                let req = MoveRequest {
                    inches: self.panel.move_inches,
                    mode: self.panel.mode,
                    direction: self.panel.direction,
                };
                self.motion(|c| c.execute(&req)).map(|_| ())
            }
            ButtonId::ZeroToBlade => {
                let kerf = self.panel.kerf;
                self.motion(|c| c.zero_to_blade(kerf)).map(|_| ())
            }
            ButtonId::MoveToZero => self.motion(MotionController::move_to_zero).map(|_| ()),
            ButtonId::NudgeRight => self.motion(|c| c.nudge(Direction::Right)).map(|_| ()),
            ButtonId::NudgeLeft => self.motion(|c| c.nudge(Direction::Left)).map(|_| ()),
            ButtonId::Park => self.motion(MotionController::park).map(|_| ()),
            ButtonId::Next => self.next_cut(),
            ButtonId::RewindCuts => {
                self.cuts.rewind();
                debug!(cuts = self.cuts.len(), "cut list rewound");
                Ok(())
            }
            ButtonId::Calibrate => {
                let report = self.motion(MotionController::calibration_run)?;
                self.last_calibration_steps = Some(report.final_steps - report.start_steps);
                Ok(())
            }
            ButtonId::SetZero => {
                self.controller.set_zero();
                self.publish_position();
                Ok(())
            }
            ButtonId::ApplySettings => {
                self.apply_draft();
                Ok(())
            }
            ButtonId::SaveSettings => {
                match self.controller.calibration().save(&mut self.store) {
                    Ok(()) => {
                        self.events.publish(StatusEvent::SettingsSaved);
                        Ok(())
                    }
                    Err(e) => Err(self.fault(eyre::Report::new(e))),
                }
            }
            ButtonId::ResetFault => match self.controller.reset_fault() {
                Ok(()) => {
                    self.events
                        .publish(StatusEvent::PowerChanged(self.controller.is_enabled()));
                    Ok(())
                }
                Err(e) => Err(self.fault(e)),
            },
        }
    }

    fn on_switch(&mut self, id: SwitchId, on: bool) -> Result<()> {
        match id {
            SwitchId::Power => match self.controller.set_power(on) {
                Ok(()) => {
                    self.events.publish(StatusEvent::PowerChanged(on));
                    Ok(())
                }
                Err(e) => Err(self.fault(e)),
            },
            SwitchId::Travel => {
                self.panel.mode = if on { MoveMode::Relative } else { MoveMode::Exact };
                Ok(())
            }
            SwitchId::LeftRight => {
                self.panel.direction = if on { Direction::Right } else { Direction::Left };
                Ok(())
            }
            SwitchId::Kerf => {
                self.panel.kerf = on;
                Ok(())
            }
        }
    }

    fn on_text(&mut self, field: FieldId, text: &str) {
        match field {
            FieldId::MoveDistance => match parse_inches(text) {
                Some(v) => self.panel.move_inches = v,
                None => self.reject(format!("not a distance: '{}'", text.trim())),
            },
            FieldId::Setting(f) => {
                if let Err(e) = self.panel.draft.set_field(f, text) {
                    self.reject(e.to_string());
                }
            }
            FieldId::CalibrationMeasured => {
                let Some(steps) = self.last_calibration_steps else {
                    self.reject("run a calibration move before entering its distance".into());
                    return;
                };
                let Some(measured) = parse_inches(text) else {
                    self.reject(format!("not a distance: '{}'", text.trim()));
                    return;
                };
                match Calibration::distance_per_step_from_run(measured, steps) {
                    Ok(dps) => self.panel.draft.distance_per_step = Some(dps),
                    Err(e) => self.reject(e.to_string()),
                }
            }
        }
    }

    fn next_cut(&mut self) -> Result<()> {
        let index = self.cuts.position();
        let Some(cut) = self.cuts.next_cut().cloned() else {
            self.reject("cut list exhausted".into());
            return Ok(());
        };
        self.events.publish(StatusEvent::CutSelected {
            index,
            label: cut.label,
            inches: cut.inches,
        });
        self.panel.move_inches = cut.inches;
        self.panel.mode = MoveMode::Exact;
        self.motion(|c| c.move_absolute(cut.inches)).map(|_| ())
    }

    fn apply_draft(&mut self) {
        match self.controller.apply_settings(&self.panel.draft) {
            Ok(()) => {
                self.panel.draft = SettingsUpdate::default();
                self.events.publish(StatusEvent::SettingsApplied);
            }
            Err(e) => {
                warn!(error = %e, "settings rejected");
                self.events.publish(StatusEvent::SettingsRejected(e.to_string()));
            }
        }
    }

    fn motion<F>(&mut self, op: F) -> Result<MoveReport>
    where
        F: FnOnce(&mut MotionController<D, L>) -> Result<MoveReport>,
    {
        let res = op(&mut self.controller);
        self.publish_position();
        res.map_err(|e| self.fault(e))
    }

    fn publish_position(&self) {
        self.events.publish(StatusEvent::PositionChanged(
            self.controller.current_position_inches(),
        ));
    }

    fn reject(&self, reason: String) {
        debug!(%reason, "input rejected");
        self.events.publish(StatusEvent::Rejected(reason));
    }

    fn fault(&self, e: eyre::Report) -> eyre::Report {
        warn!(error = %format!("{e:#}"), "command failed");
        self.events.publish(StatusEvent::Fault(format!("{e:#}")));
        e
    }
}

fn parse_inches(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
