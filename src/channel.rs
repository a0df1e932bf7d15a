//! The channel model (§6): given sender position, receiver position,
//! and transmitted signal power, returns the attenuated received
//! power. Out of scope for THE CORE per §1 but named as a collaborator
//! the receiver depends on; reference implementations are provided so
//! the crate runs standalone.

/// Behavioral contract for a propagation model.
pub trait ChannelModel {
    fn received_power_dbm(
        &self,
        tx_position: (f64, f64),
        rx_position: (f64, f64),
        tx_power_dbm: f64,
        frequency_ghz: f64,
    ) -> f64;
}

/// Free-space path loss: `FSPL(dB) = 20*log10(d_km) + 20*log10(f_MHz) + 32.44`.
pub struct FreeSpacePathLoss;

impl ChannelModel for FreeSpacePathLoss {
    fn received_power_dbm(
        &self,
        tx_position: (f64, f64),
        rx_position: (f64, f64),
        tx_power_dbm: f64,
        frequency_ghz: f64,
    ) -> f64 {
        let dx = tx_position.0 - rx_position.0;
        let dy = tx_position.1 - rx_position.1;
        let distance_m = (dx * dx + dy * dy).sqrt();
        // Avoid -inf at zero distance (co-located transmitter/receiver
        // in a test fixture): floor the distance at 1 cm.
        let distance_km = (distance_m / 1000.0).max(1e-5);
        let frequency_mhz = frequency_ghz * 1000.0;
        let fspl_db = 20.0 * distance_km.log10() + 20.0 * frequency_mhz.log10() + 32.44;
        tx_power_dbm - fspl_db
    }
}

/// Returns the transmitted power unchanged: a test stub used by
/// scenario 2 in §8 ("a test channel stub that returns the transmitted
/// power").
pub struct FixedAttenuation {
    pub attenuation_db: f64,
}

impl Default for FixedAttenuation {
    fn default() -> Self {
        Self { attenuation_db: 0.0 }
    }
}

impl ChannelModel for FixedAttenuation {
    fn received_power_dbm(
        &self,
        _tx_position: (f64, f64),
        _rx_position: (f64, f64),
        tx_power_dbm: f64,
        _frequency_ghz: f64,
    ) -> f64 {
        tx_power_dbm - self.attenuation_db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_attenuation_zero_returns_tx_power_unchanged() {
        let chan = FixedAttenuation::default();
        let rx = chan.received_power_dbm((0.0, 0.0), (100.0, 0.0), 21.0, 5.18);
        assert_eq!(rx, 21.0);
    }

    #[test]
    fn free_space_loss_decreases_with_distance() {
        let chan = FreeSpacePathLoss;
        let near = chan.received_power_dbm((0.0, 0.0), (10.0, 0.0), 20.0, 5.18);
        let far = chan.received_power_dbm((0.0, 0.0), (100.0, 0.0), 20.0, 5.18);
        assert!(near > far);
    }
}
