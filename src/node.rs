//! The node composite (§4.7): one station's PHY receiver/transmitter,
//! MAC queues, and rate/power control behind a single `run` entry
//! point the kernel drives once per tick.
//!
//! The call order within `run` mirrors §4.7: the PHY receiver consumes
//! this tick's channel input first, the MAC state machine (behind the
//! [`MacDriver`] seam) reacts to whatever it reported, and only then
//! does the PHY transmitter get a chance to emit a waveform.

use heapless::Deque;

use crate::addressing::{MacAddress, NodeId, BROADCAST_ADDRESS};
use crate::control::power::{FixedPowerControl, PowerControl, PowerControlInfo};
use crate::control::rate::{ArfRateControl, RateControl, StationId};
use crate::frame_format::{FrameFormat, TxVector};
use crate::link_quality::{LinkPerformanceModel, LinkQualityModel};
use crate::mac_queue::{AccessCategory, QueueManager};
use crate::phy::receiver::{PhyReceiver, RxIndication};
use crate::phy::transmitter::{FrameToSend, PhyTransmitter, TxRequest};
use crate::rng::Rng;
use crate::signal::{MacFrameMetadata, SignalDescriptor};
use crate::time::{SimDuration, SimInstant};

/// Per-tick inbound signal staging buffer. A node never receives more
/// than one descriptor per peer per tick (§5), so a generous bound
/// comfortably covers any topology this crate is sized for.
const INBOX_CAPACITY: usize = 16;

/// Seam a MAC behavior plugs into (§4.7, §9): decide what, if
/// anything, to transmit in response to this tick's PHY indications.
pub trait MacDriver {
    fn on_tick(
        &mut self,
        node: NodeId,
        queues: &mut QueueManager,
        indications: &[RxIndication],
        now: SimInstant,
    ) -> Option<MacTxIntent>;

    /// Duration until this driver next needs `on_tick` called even if
    /// nothing arrives on the channel (e.g. a backoff or NAV timer). A
    /// driver with no internal timer reports "no pending event" with a
    /// non-positive duration, per the `min_positive` convention (§4.1).
    fn next_invoke_time(&self, now: SimInstant) -> SimDuration {
        let _ = now;
        SimDuration::from_micros(-1)
    }
}

/// What the MAC driver asked the PHY to transmit this tick.
pub struct MacTxIntent {
    pub destination: MacAddress,
    pub format: FrameFormat,
    pub bandwidth_mhz: u16,
    pub psdu_length: u32,
    pub is_retransmission: bool,
}

/// A MAC driver that never transmits: a passive receive-only node, as
/// used to isolate the PHY receiver in a scenario with one active
/// transmitter and several silent observers.
#[derive(Debug, Default)]
pub struct NullMacDriver;

impl MacDriver for NullMacDriver {
    fn on_tick(
        &mut self,
        _node: NodeId,
        _queues: &mut QueueManager,
        _indications: &[RxIndication],
        _now: SimInstant,
    ) -> Option<MacTxIntent> {
        None
    }
}

/// A MAC driver that greedily drains one MSDU from its own tx queue
/// whenever the channel was not reported busy this tick.
pub struct QueueDrainMacDriver {
    pub access_category: AccessCategory,
    pub format: FrameFormat,
    pub bandwidth_mhz: u16,
}

impl MacDriver for QueueDrainMacDriver {
    fn on_tick(
        &mut self,
        node: NodeId,
        queues: &mut QueueManager,
        indications: &[RxIndication],
        _now: SimInstant,
    ) -> Option<MacTxIntent> {
        if indications.iter().any(|i| matches!(i, RxIndication::CcaBusy)) {
            return None;
        }
        if queues.fresh_queue_length(node, self.access_category) == 0 {
            return None;
        }

        let selected = queues.dequeue(node, self.access_category, 1);
        let retry_index = *selected.first()?;
        let msdu = queues.msdu_for(node, self.access_category, retry_index)?;
        let is_retransmission = queues.retry_flag(node, self.access_category, retry_index);

        Some(MacTxIntent {
            destination: msdu.destination,
            format: self.format,
            bandwidth_mhz: self.bandwidth_mhz,
            psdu_length: msdu.payload_len,
            is_retransmission,
        })
    }
}

/// One simulated node: a PHY receiver and transmitter, its own MAC
/// queues, and the rate/power control policies governing its
/// transmissions.
pub struct Node {
    pub id: NodeId,
    pub position: (f64, f64),
    receiver: PhyReceiver,
    transmitter: PhyTransmitter,
    pub queues: QueueManager,
    rate_control: ArfRateControl,
    power_control: FixedPowerControl,
    station: StationId,
    inbox: Deque<SignalDescriptor, INBOX_CAPACITY>,
    frequency_ghz: f64,
}

impl Node {
    pub fn new(id: NodeId, position: (f64, f64), bss_color: u8, enable_spatial_reuse: bool) -> Self {
        let station = StationId(id.0);
        let mut rate_control = ArfRateControl::default();
        rate_control.init(station, FrameFormat::NonHt, 1);

        Self {
            id,
            position,
            receiver: PhyReceiver::new(bss_color, enable_spatial_reuse),
            transmitter: PhyTransmitter::new(),
            queues: QueueManager::new(),
            rate_control,
            power_control: FixedPowerControl::default(),
            station,
            inbox: Deque::new(),
            frequency_ghz: 5.18,
        }
    }

    /// Stage a signal the channel has already attenuated for this
    /// node, ready to be consumed on the next `run`. Returns `false`
    /// if the staging buffer is full — a topology-sizing error, since
    /// the buffer is cleared every tick.
    pub fn deliver(&mut self, signal: SignalDescriptor) -> bool {
        self.inbox.push_back(signal).is_ok()
    }

    /// Advance this node by one tick: drain staged arrivals into the
    /// PHY receiver, let the MAC driver react, and transmit if it
    /// asked to. Returns the node's next-invoke duration and, if it
    /// transmitted, the resulting waveform descriptor for the kernel
    /// to distribute.
    pub fn run(
        &mut self,
        now: SimInstant,
        mac: &mut (impl MacDriver + ?Sized),
        quality: &impl LinkQualityModel,
        performance: &impl LinkPerformanceModel,
        rng: &mut Rng,
    ) -> (SimDuration, Option<SignalDescriptor>) {
        let mut arrivals = Vec::new();
        while let Some(signal) = self.inbox.pop_front() {
            arrivals.push(signal);
        }

        let indications = self.receiver.step(now, arrivals, quality, performance, rng);

        let intent = mac.on_tick(self.id, &mut self.queues, &indications, now);

        let outbound = intent.map(|intent| self.transmit(now, intent));

        let next_invoke = crate::time::min_positive([self.receiver.next_invoke_time(now), mac.next_invoke_time(now)])
            .unwrap_or(SimDuration::from_micros(-1));

        (next_invoke, outbound)
    }

    fn transmit(&mut self, now: SimInstant, intent: MacTxIntent) -> SignalDescriptor {
        let tx_power = self.power_control.tx_power_dbm(&PowerControlInfo { station: self.station });
        let mcs = self.rate_control.current_mcs(self.station);

        let tx_vector = TxVector::new_single_user(intent.format, intent.bandwidth_mhz, 1, 1, mcs, intent.psdu_length, tx_power)
            .expect("MAC driver requested a bandwidth/MCS combination the rate control never produces");

        log::trace!("node {:?} transmitting to {} at MCS {mcs}", self.id, intent.destination);
        self.transmitter.run(Some(TxRequest::Start { tx_vector, is_ap: false }));
        self.receiver.set_rx_enabled(false);

        let (_, descriptor) = self.transmitter.run(Some(TxRequest::Frame(FrameToSend {
            tx_gain_db: 0.0,
            metadata: MacFrameMetadata {
                source: BROADCAST_ADDRESS,
                destination: intent.destination,
                next_hop: intent.destination,
                final_destination: intent.destination,
            },
            start_time: now,
            source_node: self.id,
            source_position: self.position,
            frequency_ghz: self.frequency_ghz,
            retransmission: intent.is_retransmission,
        })));

        self.receiver.set_rx_enabled(true);
        descriptor.expect("frame-to-PHY immediately follows its TxStartRequest")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link_quality::MacCalibrationModel;
    use crate::mac_queue::Msdu;

    #[test]
    fn null_driver_never_transmits_even_with_a_full_queue() {
        let mut node = Node::new(NodeId(1), (0.0, 0.0), 0, false);
        node.queues.enqueue(
            NodeId(1),
            AccessCategory::BestEffort,
            Msdu {
                destination: BROADCAST_ADDRESS,
                payload_len: 200,
            },
        );

        let model = MacCalibrationModel;
        let mut rng = Rng::from_seed(1);
        let mut driver = NullMacDriver;
        let (_, outbound) = node.run(SimInstant::ZERO, &mut driver, &model, &model, &mut rng);
        assert!(outbound.is_none());
    }

    #[test]
    fn queue_drain_driver_transmits_a_queued_msdu() {
        let mut node = Node::new(NodeId(2), (0.0, 0.0), 0, false);
        node.queues.enqueue(
            NodeId(2),
            AccessCategory::BestEffort,
            Msdu {
                destination: BROADCAST_ADDRESS,
                payload_len: 200,
            },
        );

        let model = MacCalibrationModel;
        let mut rng = Rng::from_seed(1);
        let mut driver = QueueDrainMacDriver {
            access_category: AccessCategory::BestEffort,
            format: FrameFormat::NonHt,
            bandwidth_mhz: 20,
        };
        let (_, outbound) = node.run(SimInstant::ZERO, &mut driver, &model, &model, &mut rng);
        assert!(outbound.is_some());
        assert_eq!(outbound.unwrap().source_node, NodeId(2));
    }

    #[test]
    fn queue_drain_driver_marks_second_send_as_retransmission() {
        let mut node = Node::new(NodeId(3), (0.0, 0.0), 0, false);
        node.queues.enqueue(
            NodeId(3),
            AccessCategory::BestEffort,
            Msdu {
                destination: BROADCAST_ADDRESS,
                payload_len: 200,
            },
        );

        let model = MacCalibrationModel;
        let mut rng = Rng::from_seed(1);
        let mut driver = QueueDrainMacDriver {
            access_category: AccessCategory::BestEffort,
            format: FrameFormat::NonHt,
            bandwidth_mhz: 20,
        };

        // Never discarded, so it stays in the retry buffer and is
        // re-selected on every subsequent tick (§4.5).
        let (_, first) = node.run(SimInstant::ZERO, &mut driver, &model, &model, &mut rng);
        assert!(!first.unwrap().ampdu.subframes[0].retransmission);

        let (_, second) = node.run(SimInstant::from_micros(1000), &mut driver, &model, &model, &mut rng);
        assert!(second.unwrap().ampdu.subframes[0].retransmission);
    }
}
