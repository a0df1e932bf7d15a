//! The interference accounting layer (§3, §4.4): a bounded buffer of
//! concurrent signals with total power, end-time, and per-signal
//! metadata used by the receiver for SINR computation.

use crate::addressing::NodeId;
use crate::consts::INTERFERENCE_BUFFER_SIZE;
use crate::frame_format::{Bandwidth, FrameFormat};
use crate::time::SimInstant;

/// dBm → watts, the unit `addSignal` accumulates power in (§4.4).
pub fn dbm_to_watts(dbm: f64) -> f64 {
    10f64.powf((dbm - 30.0) / 10.0)
}

pub fn watts_to_dbm(watts: f64) -> f64 {
    10.0 * watts.log10() + 30.0
}

/// PHY configuration extracted from a signal, retained after the
/// originating descriptor is gone (§3's "extracted metadata").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalMeta {
    pub start_time: SimInstant,
    pub format: FrameFormat,
    pub bandwidth: Bandwidth,
    pub tx_antennas: u8,
    pub space_time_streams: u8,
}

/// One interference-buffer slot.
#[derive(Debug, Clone, Copy)]
struct Slot {
    active: bool,
    source: NodeId,
    rx_power_w: f64,
    end_time: SimInstant,
    meta: SignalMeta,
}

/// Fixed-capacity interference buffer (§3, §4.4, §9 open question:
/// the source asserts on overflow rather than growing).
pub struct InterferenceBuffer {
    slots: [Option<Slot>; INTERFERENCE_BUFFER_SIZE],
    total_power_w: f64,
    count: usize,
    /// Accumulated overlap time between the current signal-of-interest
    /// and any interferer, maintained by `log_interference_time`.
    interference_time: crate::time::SimDuration,
}

impl InterferenceBuffer {
    pub fn new() -> Self {
        Self {
            slots: [None; INTERFERENCE_BUFFER_SIZE],
            total_power_w: 0.0,
            count: 0,
            interference_time: crate::time::SimDuration::ZERO,
        }
    }

    /// Insert into the first inactive slot. Asserts if the buffer is
    /// full — a capacity violation is a programming error per §7, not
    /// a recoverable condition.
    pub fn add_signal(
        &mut self,
        source: NodeId,
        rx_power_dbm: f64,
        end_time: SimInstant,
        meta: SignalMeta,
    ) {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.is_none())
            .expect("interference buffer overflow: capacity exceeded");

        let rx_power_w = dbm_to_watts(rx_power_dbm);
        *slot = Some(Slot {
            active: true,
            source,
            rx_power_w,
            end_time,
            meta,
        });
        self.total_power_w += rx_power_w;
        self.count += 1;
    }

    /// Clear every slot whose end-time has passed, decrementing total
    /// power and count accordingly.
    pub fn update_signal_buffer(&mut self, now: SimInstant) {
        for slot in self.slots.iter_mut() {
            if let Some(s) = slot {
                if s.end_time <= now {
                    self.total_power_w -= s.rx_power_w;
                    self.count -= 1;
                    *slot = None;
                }
            }
        }
        // Numerical noise from repeated subtraction should never push
        // this negative; clamp defensively rather than let a small
        // float error propagate as a bogus "negative power" signal.
        if self.total_power_w < 0.0 {
            self.total_power_w = 0.0;
        }
    }

    pub fn get_total_signal_power_w(&self) -> f64 {
        self.total_power_w
    }

    pub fn get_total_num_of_signals(&self) -> usize {
        self.count
    }

    pub fn active_signals(&self) -> impl Iterator<Item = (NodeId, f64, SimInstant, SignalMeta)> + '_ {
        self.slots
            .iter()
            .filter_map(|s| s.as_ref())
            .filter(|s| s.active)
            .map(|s| (s.source, s.rx_power_w, s.end_time, s.meta))
    }

    /// Minimum end-time of active slots, or `None` when empty
    /// (the source's "-1" sentinel, mapped to `Option` here).
    pub fn get_interference_timer(&self) -> Option<SimInstant> {
        self.slots
            .iter()
            .filter_map(|s| s.as_ref())
            .filter(|s| s.active)
            .map(|s| s.end_time)
            .min()
    }

    /// Accumulate overlap time between the signal-of-interest
    /// (spanning `[soi_start, soi_end)`) and an interferer spanning
    /// `[interferer_start, interferer_end)`, handling the three
    /// overlap geometries so double counting is avoided (§4.4).
    pub fn log_interference_time(
        &mut self,
        soi_start: SimInstant,
        soi_end: SimInstant,
        interferer_start: SimInstant,
        interferer_end: SimInstant,
    ) {
        let overlap_start = soi_start.max(interferer_start);
        let overlap_end = soi_end.min(interferer_end);
        if overlap_end > overlap_start {
            self.interference_time += overlap_end - overlap_start;
        }
    }

    pub fn interference_time(&self) -> crate::time::SimDuration {
        self.interference_time
    }

    /// Called when the signal-of-interest completes.
    pub fn reset_interference_log_time(&mut self) {
        self.interference_time = crate::time::SimDuration::ZERO;
    }
}

impl Default for InterferenceBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> SignalMeta {
        SignalMeta {
            start_time: SimInstant::ZERO,
            format: FrameFormat::NonHt,
            bandwidth: Bandwidth::Mhz20,
            tx_antennas: 1,
            space_time_streams: 1,
        }
    }

    #[test]
    fn total_power_matches_sum_of_active_slots() {
        let mut buf = InterferenceBuffer::new();
        buf.add_signal(NodeId(1), -60.0, SimInstant::from_micros(100), meta());
        buf.add_signal(NodeId(2), -50.0, SimInstant::from_micros(200), meta());

        let expected = dbm_to_watts(-60.0) + dbm_to_watts(-50.0);
        assert!((buf.get_total_signal_power_w() - expected).abs() / expected < 1e-9);
        assert_eq!(buf.get_total_num_of_signals(), 2);
    }

    #[test]
    fn update_expires_ended_signals() {
        let mut buf = InterferenceBuffer::new();
        buf.add_signal(NodeId(1), -60.0, SimInstant::from_micros(100), meta());
        buf.update_signal_buffer(SimInstant::from_micros(150));

        assert_eq!(buf.get_total_num_of_signals(), 0);
        assert!(buf.get_total_signal_power_w().abs() < 1e-12);
    }

    #[test]
    fn interference_timer_is_min_end_time_or_none() {
        let mut buf = InterferenceBuffer::new();
        assert_eq!(buf.get_interference_timer(), None);

        buf.add_signal(NodeId(1), -60.0, SimInstant::from_micros(300), meta());
        buf.add_signal(NodeId(2), -60.0, SimInstant::from_micros(100), meta());
        assert_eq!(buf.get_interference_timer(), Some(SimInstant::from_micros(100)));
    }

    #[test]
    #[should_panic(expected = "interference buffer overflow")]
    fn overflow_asserts() {
        let mut buf = InterferenceBuffer::new();
        for i in 0..(INTERFERENCE_BUFFER_SIZE as u16 + 1) {
            buf.add_signal(NodeId(i), -60.0, SimInstant::from_micros(1_000_000), meta());
        }
    }
}
