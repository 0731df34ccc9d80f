//! The infusion state machine (`InfusionController`).
//!
//! Commands and ticks both go through `&mut self`, so whoever owns the
//! controller owns the serialization of all session and reservoir
//! mutations. The `runner` module provides the production owner: one
//! worker thread multiplexing commands and tick deadlines. Tests drive
//! the controller directly for deterministic, sleep-free runs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pump_traits::Clock;

use crate::error::RejectReason;
use crate::event::{EventSender, PumpEvent};
use crate::policy::AcceptancePolicy;
use crate::reservoir::Reservoir;
use crate::session::{InfusionSession, RunState};
use crate::{nl_to_ul, quantize_to_nl};

/// Outcome of one tick of the simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickStatus {
    /// Keep going; the caller should tick again after `next_delay`.
    Running { next_delay: Duration },
    /// Target reached; the run is finalized as `Finished`.
    Finished,
    /// Not running; nothing advanced.
    Idle,
}

pub struct InfusionController {
    pub(crate) session: InfusionSession,
    pub(crate) reservoir: Reservoir,
    pub(crate) policy: AcceptancePolicy,
    pub(crate) increment_nl: u64,
    pub(crate) fallback_delay: Duration,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
    pub(crate) events: EventSender,
}

impl core::fmt::Debug for InfusionController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InfusionController")
            .field("state", &self.session.state)
            .field("injected_ul", &self.session.injected_ul())
            .field("target_ul", &self.session.target_ul())
            .field("remaining_ul", &self.reservoir.remaining_ul())
            .finish()
    }
}

impl InfusionController {
    pub fn builder() -> crate::builder::InfusionControllerBuilder {
        crate::builder::InfusionControllerBuilder::new()
    }

    pub fn state(&self) -> RunState {
        self.session.state
    }

    pub fn session(&self) -> &InfusionSession {
        &self.session
    }

    pub fn injected_ul(&self) -> f64 {
        self.session.injected_ul()
    }

    pub fn target_ul(&self) -> f64 {
        self.session.target_ul()
    }

    pub fn speed_ul_s(&self) -> f64 {
        self.session.speed_ul_s()
    }

    pub fn remaining_ul(&self) -> f64 {
        self.reservoir.remaining_ul()
    }

    /// Handle a `Start` command. Depending on the current state this is
    /// a fresh run, a resume, or a rejection; the volume/speed
    /// arguments are ignored on resume (the paused run keeps its own).
    pub fn start(&mut self, volume_ul: f64, speed_ul_s: f64) -> Result<(), RejectReason> {
        match self.session.state {
            RunState::Running | RunState::Stopping => self.reject(RejectReason::AlreadyRunning),
            RunState::Paused => self.resume(),
            RunState::Idle | RunState::Stopped | RunState::Finished => {
                self.fresh_start(volume_ul, speed_ul_s)
            }
        }
    }

    fn fresh_start(&mut self, volume_ul: f64, speed_ul_s: f64) -> Result<(), RejectReason> {
        let volume_nl = quantize_to_nl(volume_ul);
        let speed_nl_s = quantize_to_nl(speed_ul_s);
        if let Err(r) = self
            .policy
            .check_fresh_start(volume_nl, speed_nl_s, &self.reservoir)
        {
            return self.reject(r);
        }

        // Advisories never block here; the confirmation layer decides.
        for adv in [
            self.policy.volume_advisory(volume_nl),
            self.policy.speed_advisory(speed_nl_s),
        ]
        .into_iter()
        .flatten()
        {
            tracing::warn!(advisory = %adv, "advisory threshold exceeded");
            self.events.log(format!("advisory: {adv}"));
            self.events.emit(PumpEvent::Advisory(adv));
        }

        self.session.begin_run(volume_nl, speed_nl_s);
        self.epoch = self.clock.now();
        self.transition(RunState::Running);
        self.events.log(format!(
            "[start] target {:.1} uL at {:.3} uL/s",
            nl_to_ul(volume_nl),
            nl_to_ul(speed_nl_s)
        ));
        tracing::info!(
            target_ul = nl_to_ul(volume_nl),
            speed_ul_s = nl_to_ul(speed_nl_s),
            "infusion started"
        );
        Ok(())
    }

    /// Resume a paused run with its existing target, speed, and
    /// injected volume.
    fn resume(&mut self) -> Result<(), RejectReason> {
        if self.reservoir.is_empty() {
            return self.reject(RejectReason::ReservoirDepleted);
        }
        self.transition(RunState::Running);
        self.events.log(format!(
            "[resume] continuing at {:.1} of {:.1} uL",
            self.session.injected_ul(),
            self.session.target_ul()
        ));
        tracing::info!(injected_ul = self.session.injected_ul(), "infusion resumed");
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), RejectReason> {
        if self.session.state != RunState::Running {
            return self.reject(RejectReason::NotRunning);
        }
        self.transition(RunState::Paused);
        let injected_ul = self.session.injected_ul();
        self.events.emit(PumpEvent::Paused { injected_ul });
        self.events
            .log(format!("[pause] injected {injected_ul:.1} uL"));
        tracing::info!(injected_ul, "infusion paused");
        Ok(())
    }

    /// Stop is unconditional once the state guard passes and is
    /// terminal-and-resetting: a later Start always begins at 0.
    pub fn stop(&mut self) -> Result<(), RejectReason> {
        if !self.session.state.is_stoppable() {
            return self.reject(RejectReason::NotStoppable {
                state: self.session.state,
            });
        }
        self.transition(RunState::Stopping);
        self.transition(RunState::Stopped);
        let injected_ul = self.session.injected_ul();
        self.events.emit(PumpEvent::Stopped { injected_ul });
        self.events
            .log(format!("[stopped] injected {injected_ul:.1} uL"));
        tracing::info!(
            injected_ul,
            elapsed_ms = self.clock.ms_since(self.epoch),
            "infusion stopped"
        );
        Ok(())
    }

    /// Serialized speed change; takes effect on the next tick's delay
    /// computation, never the one in flight.
    pub fn set_speed(&mut self, speed_ul_s: f64) -> Result<(), RejectReason> {
        let speed_nl_s = quantize_to_nl(speed_ul_s);
        if let Err(r) = self.policy.check_speed(speed_nl_s) {
            return self.reject(r);
        }
        if let Some(adv) = self.policy.speed_advisory(speed_nl_s) {
            tracing::warn!(advisory = %adv, "advisory threshold exceeded");
            self.events.log(format!("advisory: {adv}"));
            self.events.emit(PumpEvent::Advisory(adv));
        }
        self.session.speed_nl_s = speed_nl_s;
        self.events
            .log(format!("speed set to {:.3} uL/s", nl_to_ul(speed_nl_s)));
        tracing::debug!(speed_ul_s = nl_to_ul(speed_nl_s), "speed updated");
        Ok(())
    }

    /// One atomic simulation step: advance injected volume by the tick
    /// increment (clamped to target), drain the reservoir by the same
    /// amount (clamped at empty), fire the one-shot low alert, and
    /// publish progress. Finalizes the run when the target is reached.
    pub fn tick(&mut self) -> TickStatus {
        if self.session.state != RunState::Running {
            return TickStatus::Idle;
        }

        let step = self
            .increment_nl
            .min(self.session.target_nl - self.session.injected_nl);
        self.session.injected_nl += step;
        self.reservoir.drain(step);

        if self.reservoir.is_low() && !self.session.low_alert_fired {
            self.session.low_alert_fired = true;
            self.events.emit(PumpEvent::LowReservoirAlert);
            self.events.log(format!(
                "warning: reservoir low ({:.1} uL remaining, threshold {:.1} uL)",
                self.reservoir.remaining_ul(),
                self.reservoir.low_threshold_ul()
            ));
            tracing::warn!(remaining_ul = self.reservoir.remaining_ul(), "reservoir low");
        }

        self.events.emit(PumpEvent::Progress {
            injected_ul: self.session.injected_ul(),
            target_ul: self.session.target_ul(),
            remaining_ul: self.reservoir.remaining_ul(),
        });

        if self.session.injected_nl >= self.session.target_nl {
            self.transition(RunState::Finished);
            self.events.emit(PumpEvent::Finished);
            let elapsed_ms = self.clock.ms_since(self.epoch);
            self.events.log(format!(
                "[finished] injected {:.1} uL in {elapsed_ms} ms",
                self.session.injected_ul()
            ));
            tracing::info!(
                injected_ul = self.session.injected_ul(),
                elapsed_ms,
                "infusion finished"
            );
            return TickStatus::Finished;
        }

        TickStatus::Running {
            next_delay: self.tick_delay(),
        }
    }

    /// Inter-tick delay: `increment / speed` seconds, or the configured
    /// fallback when the speed is degenerate.
    pub fn tick_delay(&self) -> Duration {
        if self.session.speed_nl_s == 0 {
            return self.fallback_delay;
        }
        Duration::from_secs_f64(self.increment_nl as f64 / self.session.speed_nl_s as f64)
    }

    fn transition(&mut self, to: RunState) {
        self.session.state = to;
        self.events.emit(PumpEvent::StateChanged(to));
    }

    /// Rejections leave the session untouched and are reported both as
    /// an event and as the returned error.
    fn reject(&mut self, reason: RejectReason) -> Result<(), RejectReason> {
        tracing::warn!(reason = %reason, state = %self.session.state, "command rejected");
        self.events.log(format!("rejected: {reason}"));
        self.events.emit(PumpEvent::Rejected(reason.clone()));
        Err(reason)
    }
}
