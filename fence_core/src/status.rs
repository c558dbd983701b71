//! Status events published to the operator panel.

use crossbeam_channel::{Receiver, Sender};
use fence_traits::Limit;

/// One notification for the display.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// Carriage position after a motion command, in inches.
    PositionChanged(f64),
    /// A switch tripped; bounce recovery is running.
    AlertRaised(Limit),
    /// The switch released (or a stuck fault was reset).
    AlertCleared(Limit),
    SettingsApplied,
    SettingsRejected(String),
    SettingsSaved,
    SpeedChanged { steps_per_sec: u32, percent: i32 },
    PowerChanged(bool),
    CutSelected {
        index: usize,
        label: String,
        inches: f64,
    },
    /// Input the router could not act on (bad text, exhausted cut list).
    Rejected(String),
    /// A command failed; the message is the error's display text.
    Fault(String),
}

/// Fire-and-forget sender. Publishing never fails: with no receiver attached
/// (or after it hung up) events are dropped.
#[derive(Debug, Clone, Default)]
pub struct StatusPublisher {
    tx: Option<Sender<StatusEvent>>,
}

impl StatusPublisher {
    pub fn new(tx: Sender<StatusEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A publisher that discards everything.
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn publish(&self, event: StatusEvent) {
        if let Some(tx) = &self.tx
            && tx.send(event).is_err()
        {
            tracing::trace!("status receiver gone; event dropped");
        }
    }
}

/// Unbounded status channel.
pub fn channel() -> (StatusPublisher, Receiver<StatusEvent>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (StatusPublisher::new(tx), rx)
}
