//! Runtime configuration for the controller.
//!
//! These structs carry validated values in the units the builder
//! expects. They are separate from the TOML-deserialized schema in
//! `pump_config`; see `conversions` for the mapping.

/// Reservoir geometry.
#[derive(Debug, Clone)]
pub struct ReservoirCfg {
    /// Capacity in microliters.
    pub capacity_ul: f64,
    /// Fraction of capacity at which the one-shot low alert fires.
    /// Range: (0.0, 1.0). Default: 0.05.
    pub low_fraction: f64,
}

impl Default for ReservoirCfg {
    fn default() -> Self {
        Self {
            capacity_ul: 5000.0,
            low_fraction: 0.05,
        }
    }
}

/// Tick engine parameters.
#[derive(Debug, Clone)]
pub struct TickCfg {
    /// Volume advanced per tick (uL); the simulation's time resolution.
    pub increment_ul: f64,
    /// Inter-tick delay when the session speed is 0. The start guard
    /// makes that unreachable; this is the defensive floor.
    pub fallback_delay_ms: u64,
}

impl Default for TickCfg {
    fn default() -> Self {
        Self {
            increment_ul: 0.1,
            fallback_delay_ms: 100,
        }
    }
}

/// Advisory thresholds (non-blocking warnings).
#[derive(Debug, Clone)]
pub struct AdvisoryCfg {
    pub max_volume_ul: f64,
    pub max_speed_ul_s: f64,
}

impl Default for AdvisoryCfg {
    fn default() -> Self {
        Self {
            max_volume_ul: 200.0,
            max_speed_ul_s: 0.1,
        }
    }
}
