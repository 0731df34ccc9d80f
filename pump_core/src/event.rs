//! Observer contract: typed events on an ordered channel.
//!
//! The controller never touches presentation state; it only publishes
//! these events. Delivery order equals generation order, and Progress
//! is monotone non-decreasing in `injected_ul` within a run.

use crossbeam_channel as xch;

use crate::error::{Advisory, RejectReason};
use crate::session::RunState;

#[derive(Debug, Clone, PartialEq)]
pub enum PumpEvent {
    /// Emitted every tick while running.
    Progress {
        injected_ul: f64,
        target_ul: f64,
        remaining_ul: f64,
    },
    /// Emitted on every state transition.
    StateChanged(RunState),
    Paused {
        injected_ul: f64,
    },
    Stopped {
        injected_ul: f64,
    },
    Finished,
    /// One-shot per run when the reservoir crosses its low threshold.
    LowReservoirAlert,
    Rejected(RejectReason),
    Advisory(Advisory),
    /// Human-readable trace line; observers add their own timestamps.
    Log(String),
}

/// Sending half of the event channel. A disconnected observer is not
/// an error: the controller keeps running and events are dropped.
#[derive(Clone)]
pub(crate) struct EventSender {
    tx: xch::Sender<PumpEvent>,
}

impl EventSender {
    pub(crate) fn channel() -> (Self, xch::Receiver<PumpEvent>) {
        let (tx, rx) = xch::unbounded();
        (Self { tx }, rx)
    }

    pub(crate) fn emit(&self, ev: PumpEvent) {
        if self.tx.send(ev).is_err() {
            tracing::trace!("observer disconnected; event dropped");
        }
    }

    pub(crate) fn log(&self, msg: impl Into<String>) {
        self.emit(PumpEvent::Log(msg.into()));
    }
}
