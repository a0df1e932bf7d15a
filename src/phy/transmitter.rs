//! The PHY transmitter (§4.2): waveform-descriptor assembly, preamble/
//! header/payload duration computation per frame format, A-MPDU
//! padding arithmetic, and OBSS-PD-based transmit-power capping.

use crate::addressing::NodeId;
use crate::consts::{OBSS_PD_THRESHOLD_MIN_DBM, TX_POWER_REFERENCE_AP_HIGH_STS_DBM, TX_POWER_REFERENCE_DEFAULT_DBM};
use crate::frame_format::{preamble_duration, TxVector};
use crate::signal::{AmpduLayout, AmpduSubframe, MacFrameMetadata, SignalDescriptor};
use crate::time::SimInstant;

/// What the MAC hands down to the transmitter: a TxStartRequest
/// (configures the vector) or a frame-to-PHY (triggers emission).
pub enum TxRequest {
    Start { tx_vector: TxVector, is_ap: bool },
    Frame(FrameToSend),
}

/// The payload-bearing half of a transmit request: everything the
/// transmitter needs beyond the already-internalized TX vector.
pub struct FrameToSend {
    pub tx_gain_db: f64,
    pub metadata: MacFrameMetadata,
    pub start_time: SimInstant,
    pub source_node: NodeId,
    pub source_position: (f64, f64),
    pub frequency_ghz: f64,
    /// Whether the MAC driver is re-sending an MSDU that was already
    /// dequeued on a prior tick, carried into every subframe's
    /// `AmpduSubframe::retransmission` (§4.5).
    pub retransmission: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxConfirm {
    TxStartConfirm,
    TxEndConfirm,
}

/// The PHY transmitter. Owns exactly one pending TX vector at a time,
/// internalized by a `TxStartRequest` and consumed by the following
/// frame-to-PHY (§4.2).
pub struct PhyTransmitter {
    tx_power_reference_dbm: f64,
    pending: Option<TxVector>,
}

impl PhyTransmitter {
    pub fn new() -> Self {
        Self {
            tx_power_reference_dbm: TX_POWER_REFERENCE_DEFAULT_DBM,
            pending: None,
        }
    }

    /// Run one step: at most one of a TxStartRequest or a frame-to-PHY
    /// may be presented, producing at most one confirmation and at
    /// most one transmit waveform descriptor (§4.2).
    pub fn run(&mut self, request: Option<TxRequest>) -> (Option<TxConfirm>, Option<SignalDescriptor>) {
        match request {
            None => (None, None),
            Some(TxRequest::Start { tx_vector, is_ap }) => {
                if tx_vector.enable_spatial_reuse {
                    self.tx_power_reference_dbm = if is_ap && tx_vector.num_space_time_streams > 2 {
                        TX_POWER_REFERENCE_AP_HIGH_STS_DBM
                    } else {
                        TX_POWER_REFERENCE_DEFAULT_DBM
                    };
                }
                self.pending = Some(tx_vector);
                (Some(TxConfirm::TxStartConfirm), None)
            }
            Some(TxRequest::Frame(frame)) => {
                let tx_vector = self
                    .pending
                    .take()
                    .expect("frame-to-PHY received with no prior TxStartRequest");

                let descriptor = self.build_descriptor(tx_vector, frame);
                (Some(TxConfirm::TxEndConfirm), Some(descriptor))
            }
        }
    }

    fn build_descriptor(&self, tx_vector: TxVector, frame: FrameToSend) -> SignalDescriptor {
        let base_tx_power = tx_vector.per_user_tx_power[0];
        let signal_power_dbm = self.apply_obss_pd_cap(&tx_vector, base_tx_power + frame.tx_gain_db);

        let preamble_duration = preamble_duration();
        let header_duration = tx_vector.header_duration();
        let plan = tx_vector
            .payload_info()
            .expect("TxVector was validated at construction time");

        let mut ampdu = AmpduLayout::new();
        let mut offset_us: u32 = 0;
        for (i, subframe) in plan.subframes.iter().enumerate() {
            let length_bytes = tx_vector.per_user_psdu_length[0] / plan.subframes.len() as u32;
            let mut ampdu_subframe = AmpduSubframe::new(
                length_bytes,
                offset_us,
                subframe.duration,
                subframe.overhead_duration,
                subframe.num_bits,
            );
            ampdu_subframe.retransmission = frame.retransmission;
            ampdu
                .subframes
                .try_push(ampdu_subframe)
                .expect("subframe count bounded by MAX_SUBFRAMES_COUNT at plan construction");
            offset_us += (subframe.duration.as_micros() + subframe.overhead_duration.as_micros()) as u32;
            let _ = i;
        }

        let payload_duration = plan.total_duration();

        SignalDescriptor {
            source_node: frame.source_node,
            source_position: frame.source_position,
            signal_power_dbm,
            start_time: frame.start_time,
            preamble_duration,
            header_duration,
            payload_duration,
            tx_vector,
            frame_metadata: frame.metadata,
            ampdu,
            frequency_ghz: frame.frequency_ghz,
        }
    }

    /// Apply the OBSS-PD transmit-power cap (§4.2). Only active when
    /// spatial reuse is enabled and the configured threshold exceeds
    /// the floor.
    fn apply_obss_pd_cap(&self, tx_vector: &TxVector, tx_power_dbm: f64) -> f64 {
        if tx_vector.enable_spatial_reuse && tx_vector.obss_pd_threshold > OBSS_PD_THRESHOLD_MIN_DBM {
            let tx_power_max = self.tx_power_reference_dbm - (tx_vector.obss_pd_threshold - OBSS_PD_THRESHOLD_MIN_DBM);
            tx_power_max.min(tx_power_dbm)
        } else {
            tx_power_dbm
        }
    }
}

impl Default for PhyTransmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::MacAddress;
    use crate::frame_format::FrameFormat;

    fn metadata() -> MacFrameMetadata {
        let a = MacAddress([1; 6]);
        MacFrameMetadata {
            source: a,
            destination: a,
            next_hop: a,
            final_destination: a,
        }
    }

    #[test]
    fn scenario_1_single_node_alone() {
        let mut tx = PhyTransmitter::new();
        let tx_vector = TxVector::new_single_user(FrameFormat::NonHt, 20, 1, 1, 7, 1500, 20.0).unwrap();
        let subframe_count = tx_vector.payload_info().unwrap().subframes.len();

        let (start_confirm, descriptor) = tx.run(Some(TxRequest::Start {
            tx_vector,
            is_ap: false,
        }));
        assert_eq!(start_confirm, Some(TxConfirm::TxStartConfirm));
        assert!(descriptor.is_none());

        let (end_confirm, descriptor) = tx.run(Some(TxRequest::Frame(FrameToSend {
            tx_gain_db: 1.0,
            metadata: metadata(),
            start_time: SimInstant::ZERO,
            source_node: NodeId(1),
            source_position: (0.0, 0.0),
            frequency_ghz: 5.18,
            retransmission: false,
        })));
        assert_eq!(end_confirm, Some(TxConfirm::TxEndConfirm));
        let descriptor = descriptor.unwrap();

        assert_eq!(descriptor.signal_power_dbm, 21.0);
        assert_eq!(descriptor.preamble_duration, preamble_duration());
        assert_eq!(descriptor.ampdu.subframe_count(), subframe_count);
    }

    #[test]
    fn obss_pd_caps_transmit_power() {
        let mut tx = PhyTransmitter::new();
        let tx_vector = TxVector::new_single_user(FrameFormat::NonHt, 20, 1, 1, 7, 1500, 30.0)
            .unwrap()
            .with_spatial_reuse(1, -62.0);

        tx.run(Some(TxRequest::Start {
            tx_vector,
            is_ap: false,
        }));
        let (_, descriptor) = tx.run(Some(TxRequest::Frame(FrameToSend {
            tx_gain_db: 0.0,
            metadata: metadata(),
            start_time: SimInstant::ZERO,
            source_node: NodeId(1),
            source_position: (0.0, 0.0),
            frequency_ghz: 5.18,
            retransmission: false,
        })));

        let descriptor = descriptor.unwrap();
        // TxPowerMax = 21 - (-62 - (-82)) = 21 - 20 = 1 dBm, below the
        // requested 30 dBm, so the cap wins.
        assert_eq!(descriptor.signal_power_dbm, 1.0);
    }

    #[test]
    fn duration_consistency_property() {
        let mut tx = PhyTransmitter::new();
        let tx_vector = TxVector::new_single_user(FrameFormat::NonHt, 20, 1, 1, 7, 1500, 20.0).unwrap();
        tx.run(Some(TxRequest::Start {
            tx_vector,
            is_ap: false,
        }));
        let (_, descriptor) = tx.run(Some(TxRequest::Frame(FrameToSend {
            tx_gain_db: 0.0,
            metadata: metadata(),
            start_time: SimInstant::ZERO,
            source_node: NodeId(1),
            source_position: (0.0, 0.0),
            frequency_ghz: 5.18,
            retransmission: false,
        })));
        let descriptor = descriptor.unwrap();

        let reported_total = descriptor.total_duration();
        let subframe_total = descriptor.preamble_duration
            + descriptor.header_duration
            + descriptor.ampdu.total_payload_duration();
        assert_eq!(reported_total, subframe_total);
    }
}
