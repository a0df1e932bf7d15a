//! The on-air transmission descriptor and its MAC-frame/A-MPDU payload
//! (§3).

use arrayvec::ArrayVec;

use crate::addressing::MacAddress;
use crate::addressing::NodeId;
use crate::consts::MAX_SUBFRAMES_COUNT;
use crate::frame_format::TxVector;
use crate::time::{SimDuration, SimInstant};

/// One aggregated subframe's layout and decode outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmpduSubframe {
    pub length_bytes: u32,
    pub offset_us: u32,
    pub duration: SimDuration,
    pub overhead_duration: SimDuration,
    pub num_bits: f64,
    pub retransmission: bool,
    pub fcs_pass: bool,
    pub delimiter_fail: bool,
}

impl AmpduSubframe {
    pub fn new(length_bytes: u32, offset_us: u32, duration: SimDuration, overhead_duration: SimDuration, num_bits: f64) -> Self {
        Self {
            length_bytes,
            offset_us,
            duration,
            overhead_duration,
            num_bits,
            retransmission: false,
            fcs_pass: false,
            delimiter_fail: false,
        }
    }
}

/// A-MPDU layout: the fixed-capacity list of subframes carried by one
/// PPDU (§3). Capacity is `MAX_SUBFRAMES_COUNT` per §4.5/§4.6.
#[derive(Debug, Clone)]
pub struct AmpduLayout {
    pub subframes: ArrayVec<AmpduSubframe, MAX_SUBFRAMES_COUNT>,
}

impl AmpduLayout {
    pub fn new() -> Self {
        Self {
            subframes: ArrayVec::new(),
        }
    }

    pub fn subframe_count(&self) -> usize {
        self.subframes.len()
    }

    /// Total payload duration: sum of every subframe's
    /// (duration + overhead_duration), the quantity §8's duration
    /// consistency property checks against the transmitter's reported
    /// total.
    pub fn total_payload_duration(&self) -> SimDuration {
        self.subframes
            .iter()
            .fold(SimDuration::ZERO, |acc, s| acc + s.duration + s.overhead_duration)
    }
}

impl Default for AmpduLayout {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-subframe addressing plus the four-address detection the queue
/// manager's `isFourAddressFrame` depends on (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacFrameMetadata {
    pub source: MacAddress,
    pub destination: MacAddress,
    /// Next-hop address for the over-the-air transmission (may differ
    /// from `destination` under 4-address wireless distribution-system
    /// forwarding).
    pub next_hop: MacAddress,
    /// Final destination beyond the next hop.
    pub final_destination: MacAddress,
}

impl MacFrameMetadata {
    /// `isFourAddressFrame` — true iff the next-hop and final
    /// destination addresses differ (§4.5).
    pub fn is_four_address_frame(&self) -> bool {
        self.next_hop != self.final_destination
    }
}

/// An on-air transmission: the signal descriptor of §3.
#[derive(Debug, Clone)]
pub struct SignalDescriptor {
    pub source_node: NodeId,
    pub source_position: (f64, f64),
    /// Received power in dBm, as set by the channel model prior to
    /// reaching a receiver. Holds the transmitted power on the
    /// originating copy, before distribution.
    pub signal_power_dbm: f64,
    pub start_time: SimInstant,
    pub preamble_duration: SimDuration,
    pub header_duration: SimDuration,
    pub payload_duration: SimDuration,
    pub tx_vector: TxVector,
    pub frame_metadata: MacFrameMetadata,
    pub ampdu: AmpduLayout,
    pub frequency_ghz: f64,
}

impl SignalDescriptor {
    pub fn total_duration(&self) -> SimDuration {
        self.preamble_duration + self.header_duration + self.payload_duration
    }

    pub fn end_time(&self) -> SimInstant {
        self.start_time + self.total_duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_address_detection() {
        let a = MacAddress([1; 6]);
        let b = MacAddress([2; 6]);
        let meta = MacFrameMetadata {
            source: a,
            destination: b,
            next_hop: a,
            final_destination: b,
        };
        assert!(meta.is_four_address_frame());

        let meta_three = MacFrameMetadata {
            next_hop: b,
            ..meta
        };
        assert!(!meta_three.is_four_address_frame());
    }
}
