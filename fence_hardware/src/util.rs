use std::time::Duration;

/// Sample a digital input `samples` times, `gap` apart, and report whether
/// the majority of samples were active. Ties count as active.
pub fn read_majority(mut is_active: impl FnMut() -> bool, samples: u8, gap: Duration) -> bool {
    let n = samples.max(1);
    let mut active = 0u8;
    for i in 0..n {
        if is_active() {
            active += 1;
        }
        if i + 1 < n && !gap.is_zero() {
            std::thread::sleep(gap);
        }
    }
    u16::from(active) * 2 >= u16::from(n)
}

/// Debounced switch read: `true` means closed. With `active_low` a low pin
/// is closed. A tied vote reads closed on either wiring.
pub fn read_switch(
    mut is_high: impl FnMut() -> bool,
    active_low: bool,
    samples: u8,
    gap: Duration,
) -> bool {
    read_majority(|| is_high() != active_low, samples, gap)
}

/// Time a step pulse must stay high, never shorter than 1 µs.
#[inline]
pub fn pulse_width(us: u32) -> Duration {
    Duration::from_micros(u64::from(us.max(1)))
}
