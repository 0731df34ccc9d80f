//! Dose acceptance: hard guards and advisory thresholds.
//!
//! The UI layer is expected to validate input too, but the controller
//! never trusts the caller; every `Start` passes through these checks
//! regardless of what happened upstream.

use crate::error::{Advisory, RejectReason};
use crate::reservoir::Reservoir;
use crate::{NL_PER_UL, nl_to_ul};

#[derive(Debug, Clone)]
pub struct AcceptancePolicy {
    /// Volumes above this emit a non-blocking advisory (nl).
    pub advisory_volume_nl: u64,
    /// Speeds above this emit a non-blocking advisory (nl/s).
    pub advisory_speed_nl_s: u64,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            advisory_volume_nl: (200.0 * NL_PER_UL) as u64,
            advisory_speed_nl_s: (0.1 * NL_PER_UL) as u64,
        }
    }
}

impl AcceptancePolicy {
    /// Hard guards for a fresh (non-resume) start. Quantized inputs:
    /// zero here covers negative, NaN, and sub-nanoliter originals.
    pub fn check_fresh_start(
        &self,
        volume_nl: u64,
        speed_nl_s: u64,
        reservoir: &Reservoir,
    ) -> Result<(), RejectReason> {
        if volume_nl == 0 {
            return Err(RejectReason::InvalidVolume);
        }
        if speed_nl_s == 0 {
            return Err(RejectReason::InvalidSpeed);
        }
        if reservoir.is_empty() {
            return Err(RejectReason::ReservoirDepleted);
        }
        if volume_nl > reservoir.remaining_nl() {
            return Err(RejectReason::InsufficientReservoir {
                remaining_ul: reservoir.remaining_ul(),
                requested_ul: nl_to_ul(volume_nl),
            });
        }
        Ok(())
    }

    /// Speed guard shared by `SetSpeed` and the start path.
    pub fn check_speed(&self, speed_nl_s: u64) -> Result<(), RejectReason> {
        if speed_nl_s == 0 {
            return Err(RejectReason::InvalidSpeed);
        }
        Ok(())
    }

    pub fn volume_advisory(&self, volume_nl: u64) -> Option<Advisory> {
        (volume_nl > self.advisory_volume_nl).then(|| Advisory::VolumeAboveLimit {
            volume_ul: nl_to_ul(volume_nl),
            limit_ul: nl_to_ul(self.advisory_volume_nl),
        })
    }

    pub fn speed_advisory(&self, speed_nl_s: u64) -> Option<Advisory> {
        (speed_nl_s > self.advisory_speed_nl_s).then(|| Advisory::SpeedAboveLimit {
            speed_ul_s: nl_to_ul(speed_nl_s),
            limit_ul_s: nl_to_ul(self.advisory_speed_nl_s),
        })
    }
}
