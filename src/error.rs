//! Fatal configuration errors.
//!
//! Capacity limits (a full tx queue, an exhausted retry buffer) and
//! decode failures are not errors in this crate; they are modeled as
//! ordinary return values. Only malformed static configuration —
//! the kind of mistake a caller should fix before the simulation runs
//! at all — is represented here.

use thiserror::Error;

/// Fatal, construction-time configuration error.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("unsupported channel bandwidth: {0} MHz")]
    UnsupportedBandwidth(u16),

    #[error("MCS index {mcs} out of range for format (max {max})")]
    McsOutOfRange { mcs: u8, max: u8 },

    #[error("invalid node id: {0}")]
    InvalidNodeId(u16),

    #[error("OBSS-PD threshold {threshold} dBm is below the minimum {min} dBm")]
    ObssPdThresholdTooLow { threshold: f64, min: f64 },

    #[error("fixed transmit power {0} dBm is outside the valid range [0, 30]")]
    FixedPowerOutOfRange(f64),
}
