//! Builder for `InfusionController`.
//!
//! Validates configuration once at construction so the controller can
//! assume well-formed values everywhere else.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use pump_traits::{Clock, MonotonicClock};

use crate::config::{AdvisoryCfg, ReservoirCfg, TickCfg};
use crate::controller::InfusionController;
use crate::error::BuildError;
use crate::event::{EventSender, PumpEvent};
use crate::policy::AcceptancePolicy;
use crate::quantize_to_nl;
use crate::reservoir::Reservoir;
use crate::session::InfusionSession;

pub struct InfusionControllerBuilder {
    reservoir: ReservoirCfg,
    tick: TickCfg,
    advisory: AdvisoryCfg,
    initial_level_ul: Option<f64>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
}

impl Default for InfusionControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InfusionControllerBuilder {
    pub fn new() -> Self {
        Self {
            reservoir: ReservoirCfg::default(),
            tick: TickCfg::default(),
            advisory: AdvisoryCfg::default(),
            initial_level_ul: None,
            clock: None,
        }
    }

    /// Seed every section from a validated TOML config.
    pub fn from_config(cfg: &pump_config::Config) -> Self {
        Self::new()
            .with_reservoir((&cfg.reservoir).into())
            .with_tick((&cfg.tick).into())
            .with_advisory((&cfg.advisory).into())
    }

    pub fn with_reservoir(mut self, cfg: ReservoirCfg) -> Self {
        self.reservoir = cfg;
        self
    }

    pub fn with_tick(mut self, cfg: TickCfg) -> Self {
        self.tick = cfg;
        self
    }

    pub fn with_advisory(mut self, cfg: AdvisoryCfg) -> Self {
        self.advisory = cfg;
        self
    }

    /// Start with a partially depleted reservoir (clamped to capacity).
    pub fn with_initial_level_ul(mut self, level_ul: f64) -> Self {
        self.initial_level_ul = Some(level_ul);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Build the controller and the observer side of its event channel.
    pub fn build(self) -> Result<(InfusionController, Receiver<PumpEvent>), BuildError> {
        let capacity_nl = quantize_to_nl(self.reservoir.capacity_ul);
        if capacity_nl == 0 {
            return Err(BuildError::InvalidConfig("reservoir capacity must be > 0"));
        }
        let lf = self.reservoir.low_fraction;
        if !lf.is_finite() || lf <= 0.0 || lf >= 1.0 {
            return Err(BuildError::InvalidConfig(
                "reservoir low_fraction must be within (0, 1)",
            ));
        }
        let increment_nl = quantize_to_nl(self.tick.increment_ul);
        if increment_nl == 0 {
            return Err(BuildError::InvalidConfig(
                "tick increment must be at least 1 nl",
            ));
        }
        if increment_nl > capacity_nl {
            return Err(BuildError::InvalidConfig(
                "tick increment must not exceed reservoir capacity",
            ));
        }
        if self.tick.fallback_delay_ms == 0 {
            return Err(BuildError::InvalidConfig("fallback delay must be > 0"));
        }
        let advisory_volume_nl = quantize_to_nl(self.advisory.max_volume_ul);
        let advisory_speed_nl_s = quantize_to_nl(self.advisory.max_speed_ul_s);
        if advisory_volume_nl == 0 || advisory_speed_nl_s == 0 {
            return Err(BuildError::InvalidConfig("advisory limits must be > 0"));
        }

        let reservoir = match self.initial_level_ul {
            Some(level_ul) => Reservoir::with_level(capacity_nl, quantize_to_nl(level_ul), lf),
            None => Reservoir::new(capacity_nl, lf),
        };
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let epoch = clock.now();
        let (events, rx) = EventSender::channel();

        let controller = InfusionController {
            session: InfusionSession::new(),
            reservoir,
            policy: AcceptancePolicy {
                advisory_volume_nl,
                advisory_speed_nl_s,
            },
            increment_nl,
            fallback_delay: Duration::from_millis(self.tick.fallback_delay_ms),
            clock,
            epoch,
            events,
        };
        Ok((controller, rx))
    }
}
