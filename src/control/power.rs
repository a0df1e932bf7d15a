//! Power-control policy (§4.6): fixed power, expressed through the
//! same abstract contract as rate control.

use crate::consts::{FIXED_POWER_DEFAULT_DBM, FIXED_POWER_RANGE_DBM};
use crate::control::rate::StationId;
use crate::error::SimError;

/// Arbitrary per-transmission control information a power-control
/// policy may consult (ignored by [`FixedPowerControl`]).
#[derive(Debug, Clone, Copy)]
pub struct PowerControlInfo {
    pub station: StationId,
}

pub trait PowerControl {
    fn tx_power_dbm(&self, info: &PowerControlInfo) -> f64;
}

/// Returns the configured `FixedPower`, ignoring the control info
/// entirely (§4.6).
#[derive(Debug)]
pub struct FixedPowerControl {
    fixed_power_dbm: f64,
}

impl FixedPowerControl {
    pub fn new(fixed_power_dbm: f64) -> Result<Self, SimError> {
        let (min, max) = FIXED_POWER_RANGE_DBM;
        if !(min..=max).contains(&fixed_power_dbm) {
            return Err(SimError::FixedPowerOutOfRange(fixed_power_dbm));
        }
        Ok(Self { fixed_power_dbm })
    }
}

impl Default for FixedPowerControl {
    fn default() -> Self {
        Self::new(FIXED_POWER_DEFAULT_DBM).expect("default fixed power is within range")
    }
}

impl PowerControl for FixedPowerControl {
    fn tx_power_dbm(&self, _info: &PowerControlInfo) -> f64 {
        self.fixed_power_dbm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_power() {
        let err = FixedPowerControl::new(31.0).unwrap_err();
        assert_eq!(err, SimError::FixedPowerOutOfRange(31.0));
        assert!(FixedPowerControl::new(-1.0).is_err());
    }

    #[test]
    fn returns_configured_power_regardless_of_info() {
        let pc = FixedPowerControl::new(18.0).unwrap();
        let info = PowerControlInfo { station: StationId(1) };
        assert_eq!(pc.tx_power_dbm(&info), 18.0);
    }
}
