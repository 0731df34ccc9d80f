//! Remaining-volume bookkeeping for the simulated drug supply.
//!
//! One reservoir outlives every run on the controller; only the start
//! guard reads it and only the tick handler drains it.

use crate::nl_to_ul;

#[derive(Debug)]
pub struct Reservoir {
    capacity_nl: u64,
    remaining_nl: u64,
    low_threshold_nl: u64,
}

impl Reservoir {
    /// Full reservoir. `low_fraction` is the capacity fraction at which
    /// `is_low` starts reporting true (the alert latch lives in the
    /// session, not here).
    pub fn new(capacity_nl: u64, low_fraction: f64) -> Self {
        Self::with_level(capacity_nl, capacity_nl, low_fraction)
    }

    /// Partially filled reservoir, clamped to capacity.
    pub fn with_level(capacity_nl: u64, remaining_nl: u64, low_fraction: f64) -> Self {
        let low_threshold_nl = (capacity_nl as f64 * low_fraction).round() as u64;
        Self {
            capacity_nl,
            remaining_nl: remaining_nl.min(capacity_nl),
            low_threshold_nl,
        }
    }

    /// Remove up to `nl`, clamping at empty; returns the amount
    /// actually drained.
    pub fn drain(&mut self, nl: u64) -> u64 {
        let taken = nl.min(self.remaining_nl);
        self.remaining_nl -= taken;
        taken
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining_nl == 0
    }

    #[inline]
    pub fn is_low(&self) -> bool {
        self.remaining_nl <= self.low_threshold_nl
    }

    #[inline]
    pub fn remaining_nl(&self) -> u64 {
        self.remaining_nl
    }

    pub fn remaining_ul(&self) -> f64 {
        nl_to_ul(self.remaining_nl)
    }

    pub fn capacity_ul(&self) -> f64 {
        nl_to_ul(self.capacity_nl)
    }

    pub fn low_threshold_ul(&self) -> f64 {
        nl_to_ul(self.low_threshold_nl)
    }
}
