//! Run lifecycle state and per-run bookkeeping.

use std::fmt;

use crate::nl_to_ul;

/// Lifecycle of an infusion run. `Stopped` and `Finished` are terminal
/// for the run but the controller accepts a fresh `Start` from either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Paused,
    Stopping,
    Stopped,
    Finished,
}

impl RunState {
    /// States from which a fresh (non-resume) run may begin.
    #[inline]
    pub fn accepts_fresh_start(self) -> bool {
        matches!(self, Self::Idle | Self::Stopped | Self::Finished)
    }

    /// Stop is honored from an active run only.
    #[inline]
    pub fn is_stoppable(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Per-run bookkeeping, owned exclusively by the controller.
///
/// `injected_nl` is monotone non-decreasing within a run and never
/// exceeds `target_nl`; both it and `low_alert_fired` reset only on a
/// fresh start, never on resume.
#[derive(Debug)]
pub struct InfusionSession {
    pub(crate) state: RunState,
    pub(crate) target_nl: u64,
    pub(crate) injected_nl: u64,
    pub(crate) speed_nl_s: u64,
    pub(crate) low_alert_fired: bool,
}

impl InfusionSession {
    pub(crate) fn new() -> Self {
        Self {
            state: RunState::Idle,
            target_nl: 0,
            injected_nl: 0,
            speed_nl_s: 0,
            low_alert_fired: false,
        }
    }

    /// Reset volumes and the alert latch for a fresh run. The state
    /// transition itself is the controller's job; resume paths never
    /// call this.
    pub(crate) fn begin_run(&mut self, target_nl: u64, speed_nl_s: u64) {
        self.target_nl = target_nl;
        self.speed_nl_s = speed_nl_s;
        self.injected_nl = 0;
        self.low_alert_fired = false;
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn injected_ul(&self) -> f64 {
        nl_to_ul(self.injected_nl)
    }

    pub fn target_ul(&self) -> f64 {
        nl_to_ul(self.target_nl)
    }

    pub fn speed_ul_s(&self) -> f64 {
        nl_to_ul(self.speed_nl_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_start_accepted_from_terminal_states_only() {
        assert!(RunState::Idle.accepts_fresh_start());
        assert!(RunState::Stopped.accepts_fresh_start());
        assert!(RunState::Finished.accepts_fresh_start());
        assert!(!RunState::Running.accepts_fresh_start());
        assert!(!RunState::Paused.accepts_fresh_start());
        assert!(!RunState::Stopping.accepts_fresh_start());
    }

    #[test]
    fn begin_run_resets_volumes_and_latch() {
        let mut s = InfusionSession::new();
        s.injected_nl = 42;
        s.low_alert_fired = true;
        s.begin_run(100_000, 1_000);
        assert_eq!(s.injected_nl, 0);
        assert_eq!(s.target_nl, 100_000);
        assert_eq!(s.speed_nl_s, 1_000);
        assert!(!s.low_alert_fired);
    }
}
