//! Mapping from the TOML schema (`pump_config`) to runtime config.

use crate::config::{AdvisoryCfg, ReservoirCfg, TickCfg};

impl From<&pump_config::Reservoir> for ReservoirCfg {
    fn from(r: &pump_config::Reservoir) -> Self {
        Self {
            capacity_ul: r.capacity_ul,
            low_fraction: r.low_fraction,
        }
    }
}

impl From<&pump_config::Tick> for TickCfg {
    fn from(t: &pump_config::Tick) -> Self {
        Self {
            increment_ul: t.increment_ul,
            fallback_delay_ms: t.fallback_delay_ms,
        }
    }
}

impl From<&pump_config::Advisory> for AdvisoryCfg {
    fn from(a: &pump_config::Advisory) -> Self {
        Self {
            max_volume_ul: a.max_volume_ul,
            max_speed_ul_s: a.max_speed_ul_s,
        }
    }
}
