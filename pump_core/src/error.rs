use thiserror::Error;

use crate::session::RunState;

/// Why a command was refused. Every rejection is synchronous and
/// recoverable: the session is unchanged and the controller stays
/// usable. There is no fatal variant by design of the error taxonomy.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RejectReason {
    #[error("reservoir depleted")]
    ReservoirDepleted,
    #[error("insufficient reservoir: {remaining_ul:.1} uL remaining, {requested_ul:.1} uL requested")]
    InsufficientReservoir {
        remaining_ul: f64,
        requested_ul: f64,
    },
    #[error("target volume must be > 0")]
    InvalidVolume,
    #[error("infusion speed must be > 0")]
    InvalidSpeed,
    #[error("infusion already in progress")]
    AlreadyRunning,
    #[error("no active infusion to pause")]
    NotRunning,
    #[error("cannot stop while {state}")]
    NotStoppable { state: RunState },
}

/// Threshold exceeded but the operator may proceed. Emitted as an event
/// alongside the accepted command; whether to block on it belongs to
/// the confirmation layer, not the controller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Advisory {
    #[error("target volume {volume_ul:.1} uL exceeds advisory limit {limit_ul:.1} uL")]
    VolumeAboveLimit { volume_ul: f64, limit_ul: f64 },
    #[error("speed {speed_ul_s:.3} uL/s exceeds advisory limit {limit_ul_s:.3} uL/s")]
    SpeedAboveLimit { speed_ul_s: f64, limit_ul_s: f64 },
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}
