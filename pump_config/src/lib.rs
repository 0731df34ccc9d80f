#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the infusion pump simulator.
//!
//! All sections are optional in the TOML file; absent sections fall back
//! to the defaults below, so a missing config file is equivalent to an
//! empty one. `Config::validate` must be called before handing values to
//! the controller.
use serde::Deserialize;

/// Reservoir geometry for the simulated device.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Reservoir {
    /// Total capacity in microliters.
    pub capacity_ul: f64,
    /// Fraction of capacity at which the one-shot low alert fires.
    pub low_fraction: f64,
}

impl Default for Reservoir {
    fn default() -> Self {
        Self {
            capacity_ul: 5000.0,
            low_fraction: 0.05,
        }
    }
}

/// Tick engine parameters (simulation resolution).
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Tick {
    /// Volume advanced per tick in microliters.
    pub increment_ul: f64,
    /// Inter-tick delay used when the session speed is degenerate (0).
    /// Unreachable past the Start guard; kept as a defensive floor.
    pub fallback_delay_ms: u64,
}

impl Default for Tick {
    fn default() -> Self {
        Self {
            increment_ul: 0.1,
            fallback_delay_ms: 100,
        }
    }
}

/// Advisory thresholds. Crossing one emits a warning event but never
/// blocks the command; blocking is the confirmation layer's call.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Advisory {
    pub max_volume_ul: f64,
    pub max_speed_ul_s: f64,
}

impl Default for Advisory {
    fn default() -> Self {
        Self {
            max_volume_ul: 200.0,
            max_speed_ul_s: 0.1,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub reservoir: Reservoir,
    pub tick: Tick,
    pub advisory: Advisory,
    pub logging: Logging,
}

impl Config {
    /// Check every field the controller will trust.
    pub fn validate(&self) -> eyre::Result<()> {
        let r = &self.reservoir;
        if !r.capacity_ul.is_finite() || r.capacity_ul <= 0.0 {
            eyre::bail!("reservoir.capacity_ul must be > 0");
        }
        if !r.low_fraction.is_finite() || r.low_fraction <= 0.0 || r.low_fraction >= 1.0 {
            eyre::bail!("reservoir.low_fraction must be within (0, 1)");
        }
        let t = &self.tick;
        if !t.increment_ul.is_finite() || t.increment_ul <= 0.0 {
            eyre::bail!("tick.increment_ul must be > 0");
        }
        if t.increment_ul > r.capacity_ul {
            eyre::bail!("tick.increment_ul must not exceed reservoir.capacity_ul");
        }
        if t.fallback_delay_ms == 0 {
            eyre::bail!("tick.fallback_delay_ms must be > 0");
        }
        let a = &self.advisory;
        if !a.max_volume_ul.is_finite() || a.max_volume_ul <= 0.0 {
            eyre::bail!("advisory.max_volume_ul must be > 0");
        }
        if !a.max_speed_ul_s.is_finite() || a.max_speed_ul_s <= 0.0 {
            eyre::bail!("advisory.max_speed_ul_s must be > 0");
        }
        Ok(())
    }
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}
