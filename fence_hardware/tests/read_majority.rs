use std::cell::Cell;
use std::time::Duration;

use fence_hardware::util::{pulse_width, read_majority, read_switch};
use rstest::rstest;

fn pattern_reader(pattern: &'static [bool]) -> impl FnMut() -> bool {
    let idx = Cell::new(0usize);
    move || {
        let i = idx.get();
        idx.set(i + 1);
        pattern[i.min(pattern.len() - 1)]
    }
}

#[rstest]
#[case(&[true, true, true], 3, true)]
#[case(&[false, false, false], 3, false)]
#[case(&[true, false, true], 3, true)]
#[case(&[false, true, false], 3, false)]
#[case(&[true, false], 2, true)]
#[case(&[false], 1, false)]
fn majority_vote(#[case] pattern: &'static [bool], #[case] samples: u8, #[case] expect: bool) {
    assert_eq!(
        read_majority(pattern_reader(pattern), samples, Duration::ZERO),
        expect
    );
}

// Pin levels, not switch states: with active_low a low pin means closed.
#[rstest]
#[case(&[false, false, false], true, 3, true)]
#[case(&[true, true, true], true, 3, false)]
#[case(&[true, false], true, 2, true)]
#[case(&[false, true], true, 2, true)]
#[case(&[true, false], false, 2, true)]
#[case(&[false, false], false, 2, false)]
fn switch_tie_reads_closed_on_either_wiring(
    #[case] levels: &'static [bool],
    #[case] active_low: bool,
    #[case] samples: u8,
    #[case] closed: bool,
) {
    assert_eq!(
        read_switch(pattern_reader(levels), active_low, samples, Duration::ZERO),
        closed
    );
}

#[test]
fn zero_samples_still_reads_once() {
    let mut calls = 0;
    let closed = read_majority(
        || {
            calls += 1;
            true
        },
        0,
        Duration::ZERO,
    );
    assert!(closed);
    assert_eq!(calls, 1);
}

#[test]
fn pulse_width_has_floor() {
    assert_eq!(pulse_width(0), Duration::from_micros(1));
    assert_eq!(pulse_width(20), Duration::from_micros(20));
}
