//! The PHY receiver state machine (§3, §4.3): reception timing,
//! preamble/header vs. payload decoding stages, OBSS spatial-reuse
//! filtering, energy-detection/CCA indication, and per-subframe A-MPDU
//! FCS outcome using probability-of-success from SINR.

use crate::addressing::NodeId;
use crate::consts::ED_THRESHOLD_DBM;
use crate::frame_format::{Coding, FrameFormat, TxVector};
use crate::interference::{dbm_to_watts, watts_to_dbm, InterferenceBuffer, SignalMeta};
use crate::link_quality::{success_probability, ActiveSignal, FieldLabel, LinkPerformanceModel, LinkQualityModel};
use crate::rng::Rng;
use crate::signal::{AmpduLayout, MacFrameMetadata, SignalDescriptor};
use crate::time::{SimDuration, SimInstant};

/// The number of bytes the abstracted preamble+header decode is
/// evaluated over, treating the header as Non-HT MCS 0 BCC per §4.3.
const HEADER_AND_PREAMBLE_BYTES: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    Idle,
    PreambleHeader,
    Payload,
    Undecodable,
}

/// What the receiver reports to the MAC after one `step` call. At most
/// one "content" indication (`RxStart`/`RxError`/`RxEnd`) is produced
/// per call, per §4.3; a CCA indication is only derived when none was.
#[derive(Debug, Clone)]
pub enum RxIndication {
    CcaBusy,
    CcaIdle,
    RxStart(TxVector),
    RxError,
    RxEnd {
        metadata: MacFrameMetadata,
        ampdu: AmpduLayout,
    },
}

struct SignalOfInterest {
    source: NodeId,
    descriptor: SignalDescriptor,
}

fn meta_from(descriptor: &SignalDescriptor) -> SignalMeta {
    SignalMeta {
        start_time: descriptor.start_time,
        format: descriptor.tx_vector.format,
        bandwidth: descriptor.tx_vector.bandwidth,
        tx_antennas: descriptor.tx_vector.num_tx_antennas,
        space_time_streams: descriptor.tx_vector.num_space_time_streams,
    }
}

/// The PHY receiver of one node/interface.
pub struct PhyReceiver {
    stage: DecodeStage,
    /// Absolute time the current stage's timer expires. Meaningless
    /// while `stage == Idle`.
    stage_end: SimInstant,
    received_subframe_count: usize,
    cca_idle: bool,
    limit_tx_power: bool,
    rx_enabled: bool,
    cached_probability: Option<f64>,
    interference: InterferenceBuffer,
    soi: Option<SignalOfInterest>,
    bss_color: u8,
    enable_spatial_reuse: bool,
    total_rx_interference_time: SimDuration,
}

impl PhyReceiver {
    pub fn new(bss_color: u8, enable_spatial_reuse: bool) -> Self {
        Self {
            stage: DecodeStage::Idle,
            stage_end: SimInstant::ZERO,
            received_subframe_count: 0,
            cca_idle: true,
            limit_tx_power: false,
            rx_enabled: true,
            cached_probability: None,
            interference: InterferenceBuffer::new(),
            soi: None,
            bss_color,
            enable_spatial_reuse,
            total_rx_interference_time: SimDuration::ZERO,
        }
    }

    pub fn set_rx_enabled(&mut self, enabled: bool) {
        self.rx_enabled = enabled;
    }

    pub fn cca_idle(&self) -> bool {
        self.cca_idle
    }

    pub fn limit_tx_power(&self) -> bool {
        self.limit_tx_power
    }

    pub fn total_rx_interference_time(&self) -> SimDuration {
        self.total_rx_interference_time
    }

    /// `nextInvokeTime`: minimum of (positive) reception timer and
    /// (positive) interference timer, `-1` otherwise (§4.3).
    pub fn next_invoke_time(&self, now: SimInstant) -> SimDuration {
        let reception = (self.stage != DecodeStage::Idle).then(|| self.stage_end.duration_since(now));
        let interference = self
            .interference
            .get_interference_timer()
            .map(|t| t.duration_since(now));

        crate::time::min_positive([reception, interference].into_iter().flatten())
            .unwrap_or(SimDuration::from_micros(-1))
    }

    /// Advance the receiver by one kernel tick: ingest any signals
    /// that arrived this step, process a stage-timer expiry if due,
    /// refresh the interference buffer, and derive a CCA indication if
    /// nothing else fired.
    pub fn step(
        &mut self,
        now: SimInstant,
        arrivals: Vec<SignalDescriptor>,
        quality: &impl LinkQualityModel,
        performance: &impl LinkPerformanceModel,
        rng: &mut Rng,
    ) -> Vec<RxIndication> {
        let mut indications = Vec::new();
        let mut produced = false;

        for arrival in arrivals {
            self.handle_arrival(arrival);
        }

        if self.stage != DecodeStage::Idle && now >= self.stage_end {
            if let Some(indication) = self.process_stage_expiry(now, quality, performance, rng) {
                indications.push(indication);
                produced = true;
            }
            // A payload expiry that just consumed the last subframe
            // sets stage_end = now and enters Undecodable already
            // expired ("await end of waveform" that already ended);
            // fold its silent cleanup into the same step rather than
            // leaving the receiver stuck until some unrelated future
            // invocation happens to revisit it.
            if self.stage == DecodeStage::Undecodable && now >= self.stage_end {
                self.process_stage_expiry(now, quality, performance, rng);
            }
        }

        self.interference.update_signal_buffer(now);

        if !produced {
            if let Some(indication) = self.derive_cca_indication() {
                indications.push(indication);
            }
        }

        indications
    }

    fn handle_arrival(&mut self, arrival: SignalDescriptor) {
        if !self.rx_enabled {
            // "Rx trigger during Tx" — dropped.
            return;
        }

        let power = arrival.signal_power_dbm;
        let meta = meta_from(&arrival);
        let end_time = arrival.end_time();

        if power < ED_THRESHOLD_DBM {
            // Sub-ED arrival: only logged as interference if a
            // reception is already in progress.
            if self.soi.is_some() {
                self.interference.add_signal(arrival.source_node, power, end_time, meta);
            }
            return;
        }

        if self.stage != DecodeStage::Idle {
            // "Rx trigger during previous Rx" — pushed as interference.
            self.interference.add_signal(arrival.source_node, power, end_time, meta);
            return;
        }

        // Idle, CCA idle implied, power >= ED: start a new reception.
        if self.interference.get_total_num_of_signals() > 0 {
            let header_end = arrival.start_time + arrival.preamble_duration + arrival.header_duration;
            for (_, _, end, interferer_meta) in self.interference.active_signals().collect::<Vec<_>>() {
                self.interference
                    .log_interference_time(arrival.start_time, header_end, interferer_meta.start_time, end);
            }
        }

        self.stage = DecodeStage::PreambleHeader;
        self.stage_end = arrival.start_time + arrival.preamble_duration + arrival.header_duration;
        self.received_subframe_count = 0;
        self.soi = Some(SignalOfInterest {
            source: arrival.source_node,
            descriptor: arrival,
        });
    }

    fn process_stage_expiry(
        &mut self,
        now: SimInstant,
        quality: &impl LinkQualityModel,
        performance: &impl LinkPerformanceModel,
        rng: &mut Rng,
    ) -> Option<RxIndication> {
        match self.stage {
            DecodeStage::Idle => None,
            DecodeStage::PreambleHeader => self.expire_preamble_header(now, quality, performance, rng),
            DecodeStage::Payload => self.expire_payload(now, quality, performance, rng),
            DecodeStage::Undecodable => {
                self.cached_probability = None;
                self.soi = None;
                self.total_rx_interference_time += self.interference.interference_time();
                self.interference.reset_interference_log_time();
                self.stage = DecodeStage::Idle;
                None
            }
        }
    }

    fn interferers_as_active(&self) -> Vec<ActiveSignal> {
        self.interference
            .active_signals()
            .map(|(_, rx_power_w, _, meta)| ActiveSignal {
                rx_power_dbm: watts_to_dbm(rx_power_w),
                field: FieldLabel::Data,
                format: meta.format,
                bandwidth: meta.bandwidth,
                tx_antennas: meta.tx_antennas,
                space_time_streams: meta.space_time_streams,
            })
            .collect()
    }

    fn expire_preamble_header(
        &mut self,
        now: SimInstant,
        quality: &impl LinkQualityModel,
        performance: &impl LinkPerformanceModel,
        rng: &mut Rng,
    ) -> Option<RxIndication> {
        let soi = self.soi.take().expect("PreambleHeader stage with no signal of interest");
        let interferers = self.interferers_as_active();
        let soi_active = ActiveSignal {
            rx_power_dbm: soi.descriptor.signal_power_dbm,
            field: FieldLabel::Preamble,
            format: soi.descriptor.tx_vector.format,
            bandwidth: soi.descriptor.tx_vector.bandwidth,
            tx_antennas: soi.descriptor.tx_vector.num_tx_antennas,
            space_time_streams: soi.descriptor.tx_vector.num_space_time_streams,
        };

        let p = success_probability(
            quality,
            performance,
            &soi_active,
            &interferers,
            HEADER_AND_PREAMBLE_BYTES,
            FrameFormat::NonHt,
            0,
            Coding::Bcc,
        );
        let r = rng.uniform();

        if p > r {
            let inter_bss = self.enable_spatial_reuse && soi.descriptor.tx_vector.bss_color != self.bss_color;
            if inter_bss && soi.descriptor.signal_power_dbm < soi.descriptor.tx_vector.obss_pd_threshold {
                return self.discard_as_obss_pd(soi);
            }

            let tx_vector = soi.descriptor.tx_vector.clone();
            let first = soi
                .descriptor
                .ampdu
                .subframes
                .first()
                .copied()
                .expect("a signal descriptor always carries at least one subframe");
            self.stage = DecodeStage::Payload;
            self.stage_end = now + first.duration + first.overhead_duration;
            self.soi = Some(soi);
            Some(RxIndication::RxStart(tx_vector))
        } else {
            self.stage = DecodeStage::Undecodable;
            self.stage_end = now + soi.descriptor.payload_duration;
            self.soi = Some(soi);
            Some(RxIndication::RxError)
        }
    }

    fn discard_as_obss_pd(&mut self, soi: SignalOfInterest) -> Option<RxIndication> {
        self.limit_tx_power = true;
        let meta = meta_from(&soi.descriptor);
        let threshold_w = dbm_to_watts(soi.descriptor.tx_vector.obss_pd_threshold);
        let end_time = soi.descriptor.end_time();
        self.interference
            .add_signal(soi.source, soi.descriptor.signal_power_dbm, end_time, meta);
        self.stage = DecodeStage::Idle;
        self.soi = None;

        if self.interference.get_total_signal_power_w() < threshold_w {
            self.cca_idle = true;
            Some(RxIndication::CcaIdle)
        } else {
            // Remain "as if busy" without decoding: no indication.
            None
        }
    }

    fn expire_payload(
        &mut self,
        now: SimInstant,
        quality: &impl LinkQualityModel,
        performance: &impl LinkPerformanceModel,
        rng: &mut Rng,
    ) -> Option<RxIndication> {
        let mut soi = self.soi.take().expect("Payload stage with no signal of interest");
        let idx = self.received_subframe_count;
        self.received_subframe_count += 1;

        let subframe = soi.descriptor.ampdu.subframes[idx];
        let bytes = (subframe.num_bits / 8.0).round().max(1.0) as u32;
        let mcs = soi.descriptor.tx_vector.per_user_mcs[0];
        let coding = if matches!(soi.descriptor.tx_vector.format, FrameFormat::NonHt) {
            Coding::Bcc
        } else {
            soi.descriptor.tx_vector.coding
        };

        let p = if let Some(cached) = self.cached_probability.take() {
            cached
        } else {
            let interferers = self.interferers_as_active();
            let soi_active = ActiveSignal {
                rx_power_dbm: soi.descriptor.signal_power_dbm,
                field: FieldLabel::Data,
                format: soi.descriptor.tx_vector.format,
                bandwidth: soi.descriptor.tx_vector.bandwidth,
                tx_antennas: soi.descriptor.tx_vector.num_tx_antennas,
                space_time_streams: soi.descriptor.tx_vector.num_space_time_streams,
            };
            success_probability(quality, performance, &soi_active, &interferers, bytes, soi.descriptor.tx_vector.format, mcs, coding)
        };
        let r = rng.uniform();
        let success = p > r;

        soi.descriptor.ampdu.subframes[idx].fcs_pass = success;
        soi.descriptor.ampdu.subframes[idx].delimiter_fail = !success;

        // Probability cache: zero interferers and the next subframe's
        // bit length matches this one's (§4.3, §9).
        if self.interference.get_total_num_of_signals() == 0 {
            if let Some(next) = soi.descriptor.ampdu.subframes.get(idx + 1) {
                if (next.num_bits - subframe.num_bits).abs() < f64::EPSILON {
                    self.cached_probability = Some(p);
                }
            }
        }

        let total = soi.descriptor.ampdu.subframe_count();
        if idx + 1 >= total {
            self.stage = DecodeStage::Undecodable;
            self.stage_end = now;
            let metadata = soi.descriptor.frame_metadata;
            let ampdu = soi.descriptor.ampdu.clone();
            self.soi = Some(soi);
            Some(RxIndication::RxEnd { metadata, ampdu })
        } else {
            let next = soi.descriptor.ampdu.subframes[idx + 1];
            self.stage_end = now + next.duration + next.overhead_duration;
            self.soi = Some(soi);
            None
        }
    }

    fn derive_cca_indication(&mut self) -> Option<RxIndication> {
        let mut total_power_w = self.interference.get_total_signal_power_w();
        if let Some(soi) = &self.soi {
            total_power_w += dbm_to_watts(soi.descriptor.signal_power_dbm);
        }
        let ed_threshold_w = dbm_to_watts(ED_THRESHOLD_DBM);

        if total_power_w >= ed_threshold_w && self.cca_idle {
            self.cca_idle = false;
            Some(RxIndication::CcaBusy)
        } else if total_power_w < ed_threshold_w && !self.cca_idle {
            self.cca_idle = true;
            self.limit_tx_power = false;
            Some(RxIndication::CcaIdle)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::MacAddress;
    use crate::channel::{ChannelModel, FixedAttenuation};
    use crate::frame_format::{FrameFormat, TxVector};
    use crate::link_quality::MacCalibrationModel;
    use crate::phy::transmitter::{FrameToSend, PhyTransmitter, TxRequest};

    fn send_signal(mcs: u8, psdu_len: u32, source: NodeId, start: SimInstant) -> SignalDescriptor {
        let mut tx = PhyTransmitter::new();
        let tx_vector = TxVector::new_single_user(FrameFormat::NonHt, 20, 1, 1, mcs, psdu_len, 20.0).unwrap();
        tx.run(Some(TxRequest::Start { tx_vector, is_ap: false }));
        let a = MacAddress([1; 6]);
        let (_, descriptor) = tx.run(Some(TxRequest::Frame(FrameToSend {
            tx_gain_db: 0.0,
            metadata: MacFrameMetadata {
                source: a,
                destination: a,
                next_hop: a,
                final_destination: a,
            },
            start_time: start,
            source_node: source,
            source_position: (0.0, 0.0),
            frequency_ghz: 5.18,
            retransmission: false,
        })));
        let mut descriptor = descriptor.unwrap();
        let chan = FixedAttenuation::default();
        descriptor.signal_power_dbm = chan.received_power_dbm((0.0, 0.0), (0.0, 0.0), descriptor.signal_power_dbm, 5.18);
        descriptor
    }

    #[test]
    fn scenario_2_two_nodes_clean_channel() {
        let mut rx = PhyReceiver::new(0, false);
        let quality = MacCalibrationModel;
        let mut rng = Rng::from_seed(1);

        let signal = send_signal(7, 1500, NodeId(1), SimInstant::ZERO);
        let header_end = signal.start_time + signal.preamble_duration + signal.header_duration;

        let indications = rx.step(SimInstant::ZERO, vec![signal.clone()], &quality, &quality, &mut rng);
        assert!(matches!(indications[0], RxIndication::CcaBusy));

        let indications = rx.step(header_end, vec![], &quality, &quality, &mut rng);
        assert!(matches!(indications[0], RxIndication::RxStart(_)));

        let payload_end = header_end + signal.ampdu.subframes[0].duration + signal.ampdu.subframes[0].overhead_duration;
        let indications = rx.step(payload_end, vec![], &quality, &quality, &mut rng);
        match &indications[0] {
            RxIndication::RxEnd { ampdu, .. } => {
                assert!(ampdu.subframes[0].fcs_pass);
            }
            other => panic!("expected RxEnd, got {other:?}"),
        }
    }

    #[test]
    fn scenario_3_hidden_node_collision_forces_failure() {
        // Under MAC-calibration mode a single active interferer is
        // certain failure: arriving after the preamble/header decoded
        // cleanly, a hidden-node collision should corrupt the payload
        // without affecting the header.
        let mut rx = PhyReceiver::new(0, false);
        let model = MacCalibrationModel;
        let mut rng = Rng::from_seed(2);

        let a_signal = send_signal(7, 1500, NodeId(1), SimInstant::ZERO);
        let header_end = a_signal.start_time + a_signal.preamble_duration + a_signal.header_duration;

        rx.step(SimInstant::ZERO, vec![a_signal.clone()], &model, &model, &mut rng);

        let indications = rx.step(header_end, vec![], &model, &model, &mut rng);
        assert!(matches!(indications[0], RxIndication::RxStart(_)));

        let c_signal = send_signal(7, 1500, NodeId(3), header_end + SimDuration::from_micros(1));
        rx.step(header_end + SimDuration::from_micros(1), vec![c_signal], &model, &model, &mut rng);
        assert_eq!(rx.interference.get_total_num_of_signals(), 1);

        let payload_end = header_end + a_signal.ampdu.subframes[0].duration + a_signal.ampdu.subframes[0].overhead_duration;
        let indications = rx.step(payload_end, vec![], &model, &model, &mut rng);
        match &indications[0] {
            RxIndication::RxEnd { ampdu, .. } => {
                assert!(!ampdu.subframes[0].fcs_pass);
            }
            other => panic!("expected RxEnd, got {other:?}"),
        }
    }

    #[test]
    fn scenario_4_obss_pd_filter() {
        let mut rx = PhyReceiver::new(1, true);
        let quality = MacCalibrationModel;
        let mut rng = Rng::from_seed(3);

        let mut tx = PhyTransmitter::new();
        let tx_vector = TxVector::new_single_user(FrameFormat::NonHt, 20, 1, 1, 0, 100, 20.0)
            .unwrap()
            .with_spatial_reuse(2, -72.0);
        tx.run(Some(TxRequest::Start { tx_vector, is_ap: false }));
        let a = MacAddress([9; 6]);
        let (_, descriptor) = tx.run(Some(TxRequest::Frame(FrameToSend {
            tx_gain_db: 0.0,
            metadata: MacFrameMetadata {
                source: a,
                destination: a,
                next_hop: a,
                final_destination: a,
            },
            start_time: SimInstant::ZERO,
            source_node: NodeId(2),
            source_position: (0.0, 0.0),
            frequency_ghz: 5.18,
            retransmission: false,
        })));
        let mut signal = descriptor.unwrap();
        signal.signal_power_dbm = -75.0;
        let header_end = signal.start_time + signal.preamble_duration + signal.header_duration;

        rx.step(SimInstant::ZERO, vec![signal], &quality, &quality, &mut rng);
        let indications = rx.step(header_end, vec![], &quality, &quality, &mut rng);

        assert!(rx.limit_tx_power());
        assert!(indications.iter().any(|i| matches!(i, RxIndication::CcaIdle)) || indications.is_empty());
    }
}
