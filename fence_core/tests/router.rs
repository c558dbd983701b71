use std::sync::Arc;

use crossbeam_channel::Receiver;
use fence_core::mocks::{CountingDriver, OpenLimits};
use fence_core::{
    ButtonId, Calibration, CommandRouter, ControllerBuilder, Cut, CutList, FenceError, FieldId,
    MemoryStore, MoveMode, SettingsField, SliderId, StatusEvent, SwitchId, UiEvent, channel,
};
use fence_traits::{Direction, KvStore, ManualClock};

type Router = CommandRouter<CountingDriver, OpenLimits, MemoryStore>;

fn router_with(store: MemoryStore) -> (Router, Receiver<StatusEvent>) {
    let (events, rx) = channel();
    let ctl = ControllerBuilder::new()
        .with_driver(CountingDriver::default())
        .with_limits(OpenLimits)
        .with_calibration(Calibration {
            distance_per_step: 0.01,
            left_travel_inches: 100.0,
            ..Calibration::default()
        })
        .with_clock(Arc::new(ManualClock::new()))
        .with_events(events.clone())
        .build()
        .expect("build controller");
    (CommandRouter::new(ctl, store, events), rx)
}

fn router() -> (Router, Receiver<StatusEvent>) {
    router_with(MemoryStore::new())
}

fn press(r: &mut Router, b: ButtonId) {
    r.handle(UiEvent::ButtonPressed(b))
        .unwrap_or_else(|e| panic!("{b:?}: {e}"));
}

fn text(r: &mut Router, field: FieldId, t: &str) {
    r.handle(UiEvent::TextEntered(field, t.into()))
        .expect("text events never fault");
}

fn last_position(rx: &Receiver<StatusEvent>) -> f64 {
    rx.try_iter()
        .filter_map(|e| match e {
            StatusEvent::PositionChanged(p) => Some(p),
            _ => None,
        })
        .last()
        .expect("a PositionChanged event")
}

#[test]
fn move_stop_runs_exact_move_from_entry() {
    let (mut r, rx) = router();
    text(&mut r, FieldId::MoveDistance, "12.5");
    press(&mut r, ButtonId::MoveStop);
    assert_eq!(r.controller().current_position_steps(), 1250);
    assert!((last_position(&rx) - 12.5).abs() < 1e-9);
}

#[test]
fn switches_select_relative_left_move() {
    let (mut r, rx) = router();
    text(&mut r, FieldId::MoveDistance, "30");
    press(&mut r, ButtonId::MoveStop);
    r.handle(UiEvent::SwitchToggled(SwitchId::Travel, true)).expect("toggle");
    r.handle(UiEvent::SwitchToggled(SwitchId::LeftRight, false)).expect("toggle");
    assert_eq!(r.panel().mode, MoveMode::Relative);
    assert_eq!(r.panel().direction, Direction::Left);
    text(&mut r, FieldId::MoveDistance, "2.5");
    press(&mut r, ButtonId::MoveStop);
    assert_eq!(r.controller().current_position_steps(), 2750);
    assert!((last_position(&rx) - 27.5).abs() < 1e-9);
}

#[test]
fn kerf_checkbox_affects_blade_move() {
    let (mut r, _rx) = router();
    press(&mut r, ButtonId::ZeroToBlade);
    assert_eq!(r.controller().current_position_steps(), 10_000);
    r.handle(UiEvent::SwitchToggled(SwitchId::Kerf, true)).expect("toggle");
    press(&mut r, ButtonId::ZeroToBlade);
    let kerf = r.controller().converter().steps_from_inches(0.125);
    assert_eq!(r.controller().current_position_steps(), 10_000 - kerf);
    press(&mut r, ButtonId::MoveToZero);
    assert_eq!(r.controller().current_position_steps(), 0);
}

#[test]
fn bad_distance_text_is_rejected_without_motion() {
    let (mut r, rx) = router();
    text(&mut r, FieldId::MoveDistance, "ten");
    assert!(matches!(rx.try_recv(), Ok(StatusEvent::Rejected(_))));
    assert!((r.panel().move_inches).abs() < f64::EPSILON);
}

#[test]
fn settings_apply_is_all_or_nothing() {
    let (mut r, rx) = router();
    text(&mut r, FieldId::Setting(SettingsField::Kerf), "0.1");
    text(&mut r, FieldId::Setting(SettingsField::WorkingSpeed), "9000");
    press(&mut r, ButtonId::ApplySettings);
    match rx.try_recv() {
        Ok(StatusEvent::SettingsRejected(reason)) => assert!(reason.contains("working_speed")),
        other => panic!("expected SettingsRejected, got {other:?}"),
    }
    assert!((r.controller().calibration().kerf - 0.125).abs() < f64::EPSILON);

    text(&mut r, FieldId::Setting(SettingsField::WorkingSpeed), "1000");
    press(&mut r, ButtonId::ApplySettings);
    assert_eq!(rx.try_recv().ok(), Some(StatusEvent::SettingsApplied));
    assert_eq!(r.controller().working_speed(), 1000);
    assert!((r.controller().calibration().kerf - 0.1).abs() < f64::EPSILON);
    assert!(r.panel().draft.is_empty());
}

#[test]
fn save_persists_calibration() {
    let (mut r, rx) = router();
    press(&mut r, ButtonId::SaveSettings);
    assert_eq!(rx.try_recv().ok(), Some(StatusEvent::SettingsSaved));
    assert_eq!(r.store().get("distance_per_step").as_deref(), Some("0.01"));
}

#[test]
fn save_failure_is_reported_as_fault() {
    let (mut r, rx) = router_with(MemoryStore::failing());
    let err = r.handle(UiEvent::ButtonPressed(ButtonId::SaveSettings)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<FenceError>(),
        Some(FenceError::Storage(_))
    ));
    assert!(matches!(rx.try_recv(), Ok(StatusEvent::Fault(_))));
}

#[test]
fn slider_sets_speed() {
    let (mut r, rx) = router();
    r.handle(UiEvent::SliderChanged(SliderId::Speed, 50)).expect("slider");
    assert_eq!(
        rx.try_recv().ok(),
        Some(StatusEvent::SpeedChanged {
            steps_per_sec: 2000,
            percent: 50
        })
    );
    r.handle(UiEvent::SliderChanged(SliderId::Speed, 140)).expect("slider");
    assert_eq!(r.controller().working_speed(), 4000);
}

#[test]
fn power_off_then_move_faults_once() {
    let (mut r, rx) = router();
    r.handle(UiEvent::SwitchToggled(SwitchId::Power, false)).expect("power");
    assert_eq!(rx.try_recv().ok(), Some(StatusEvent::PowerChanged(false)));
    text(&mut r, FieldId::MoveDistance, "5");
    let err = r.handle(UiEvent::ButtonPressed(ButtonId::MoveStop)).unwrap_err();
    assert_eq!(
        err.downcast_ref::<FenceError>(),
        Some(&FenceError::MotorDisabled)
    );
    let faults = rx
        .try_iter()
        .filter(|e| matches!(e, StatusEvent::Fault(_)))
        .count();
    assert_eq!(faults, 1);
    assert_eq!(r.controller().driver().pulses, 0);
}

#[test]
fn next_walks_cut_list_without_wrapping() {
    let (r, rx) = router();
    let mut r = r.with_cut_list(CutList::new(vec![
        Cut {
            label: "rail".into(),
            inches: 10.0,
        },
        Cut {
            label: "stile".into(),
            inches: 20.0,
        },
    ]));
    press(&mut r, ButtonId::Next);
    press(&mut r, ButtonId::Next);
    assert_eq!(r.controller().current_position_steps(), 2000);
    press(&mut r, ButtonId::Next);
    assert_eq!(r.controller().current_position_steps(), 2000);

    let selected: Vec<_> = rx
        .try_iter()
        .filter(|e| matches!(e, StatusEvent::CutSelected { .. } | StatusEvent::Rejected(_)))
        .collect();
    assert_eq!(
        selected,
        vec![
            StatusEvent::CutSelected {
                index: 0,
                label: "rail".into(),
                inches: 10.0
            },
            StatusEvent::CutSelected {
                index: 1,
                label: "stile".into(),
                inches: 20.0
            },
            StatusEvent::Rejected("cut list exhausted".into()),
        ]
    );

    press(&mut r, ButtonId::RewindCuts);
    press(&mut r, ButtonId::Next);
    assert_eq!(r.controller().current_position_steps(), 1000);
    assert!(rx.try_iter().any(|e| e
        == StatusEvent::CutSelected {
            index: 0,
            label: "rail".into(),
            inches: 10.0
        }));
}

#[test]
fn calibration_run_feeds_measured_distance_into_draft() {
    let (mut r, rx) = router();
    text(&mut r, FieldId::CalibrationMeasured, "10");
    assert!(matches!(rx.try_recv(), Ok(StatusEvent::Rejected(_))));

    press(&mut r, ButtonId::Calibrate);
    assert_eq!(r.last_calibration_steps(), Some(1000));
    text(&mut r, FieldId::CalibrationMeasured, "12");
    let dps = r.panel().draft.distance_per_step.expect("draft dps");
    assert!((dps - 0.012).abs() < 1e-12);
    press(&mut r, ButtonId::ApplySettings);
    assert!((r.controller().calibration().distance_per_step - 0.012).abs() < 1e-12);
}

#[test]
fn nudge_park_and_set_zero() {
    let (mut r, rx) = router();
    press(&mut r, ButtonId::NudgeRight);
    press(&mut r, ButtonId::NudgeRight);
    press(&mut r, ButtonId::NudgeLeft);
    assert_eq!(r.controller().current_position_steps(), 3);
    press(&mut r, ButtonId::SetZero);
    assert_eq!(r.controller().current_position_steps(), 0);
    assert!(last_position(&rx).abs() < f64::EPSILON);
    // Open switches: parking runs out of travel.
    let err = r.handle(UiEvent::ButtonPressed(ButtonId::Park)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<FenceError>(),
        Some(FenceError::ParkFailed(_))
    ));
}
