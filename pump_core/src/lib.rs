#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core infusion control logic (simulation-only, no hardware).
//!
//! This crate provides the state machine that drives a simulated drug
//! infusion: dose acceptance, tick-by-tick volume advance, reservoir
//! bookkeeping, and a typed event stream for observers.
//!
//! ## Architecture
//!
//! - **Session**: per-run state and lifecycle (`session` module)
//! - **Reservoir**: shared supply with one-shot low alert (`reservoir`)
//! - **Policy**: start guards and advisory thresholds (`policy`)
//! - **Controller**: the state machine itself (`controller`)
//! - **Runner**: actor thread serializing commands and ticks (`runner`)
//! - **Events**: observer contract (`event`)
//!
//! ## Fixed-Point Arithmetic
//!
//! Internals operate in **nanoliters** (nl, 1 uL = 1000 nl) using `u64`
//! for deterministic behavior. See `quantize_to_nl` for the boundary
//! conversion; events and public accessors speak f64 microliters.

// Module declarations
pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod event;
pub mod policy;
pub mod reservoir;
pub mod runner;
pub mod session;

pub use builder::InfusionControllerBuilder;
pub use config::{AdvisoryCfg, ReservoirCfg, TickCfg};
pub use controller::{InfusionController, TickStatus};
pub use error::{Advisory, BuildError, RejectReason};
pub use event::PumpEvent;
pub use reservoir::Reservoir;
pub use runner::{Pump, PumpCommand};
pub use session::{InfusionSession, RunState};

/// Nanoliters per microliter.
pub const NL_PER_UL: f64 = 1000.0;

/// Quantize a floating-point microliter value to integer nanoliters,
/// rounding to nearest and clamping to `u64`. Non-finite or negative
/// inputs map to 0, so a garbage volume fails the positivity guards
/// instead of poisoning the arithmetic downstream.
#[inline]
pub fn quantize_to_nl(x_ul: f64) -> u64 {
    if !x_ul.is_finite() || x_ul <= 0.0 {
        return 0;
    }
    let scaled = (x_ul * NL_PER_UL).round();
    if scaled >= u64::MAX as f64 {
        u64::MAX
    } else {
        scaled as u64
    }
}

/// Convert integer nanoliters back to microliters for display/events.
#[inline]
pub fn nl_to_ul(nl: u64) -> f64 {
    nl as f64 / NL_PER_UL
}
