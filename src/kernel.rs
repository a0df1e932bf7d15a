//! The simulation kernel (§4.1, §5): the single-threaded, cooperative
//! driver that steps every node once per tick, distributes transmitted
//! waveforms, and advances simulated time.

use crate::channel::ChannelModel;
use crate::link_quality::{LinkPerformanceModel, LinkQualityModel};
use crate::node::{MacDriver, Node};
use crate::rng::Rng;
use crate::time::{min_positive, SimDuration, SimInstant};

/// One node plus the MAC driver that decides its behavior each tick.
/// Kept as a pair here (rather than folding the driver into [`Node`])
/// so the same `Node` type serves drivers of differing policy without
/// a trait object per node.
pub struct Entry<'a> {
    pub node: Node,
    pub mac: &'a mut dyn MacDriver,
}

/// Drives a fixed, stored-order set of nodes through a bounded amount
/// of simulated time (§4.1).
pub struct Kernel<'a, C, Q, P> {
    entries: Vec<Entry<'a>>,
    channel: C,
    quality: Q,
    performance: P,
    rng: Rng,
    now: SimInstant,
}

impl<'a, C, Q, P> Kernel<'a, C, Q, P>
where
    C: ChannelModel,
    Q: LinkQualityModel,
    P: LinkPerformanceModel,
{
    pub fn new(entries: Vec<Entry<'a>>, channel: C, quality: Q, performance: P, seed: u64) -> Self {
        Self {
            entries,
            channel,
            quality,
            performance,
            rng: Rng::from_seed(seed),
            now: SimInstant::ZERO,
        }
    }

    pub fn now(&self) -> SimInstant {
        self.now
    }

    /// Run until `now >= simulation_time` (§4.1). Returns the final
    /// simulated time reached.
    pub fn run(&mut self, simulation_time: SimDuration) -> SimInstant {
        let deadline = SimInstant::ZERO + simulation_time;

        while self.now < deadline {
            let elapsed = self.step();
            if elapsed.is_none() {
                break;
            }
        }

        self.now
    }

    /// Run one kernel iteration: invoke every node in stored order,
    /// distribute any transmitted waveforms, and advance time per the
    /// §4.1 rule. Returns `None` once every node has both stayed
    /// silent and reported no pending event (the simulation is inert
    /// and would never advance again).
    fn step(&mut self) -> Option<SimDuration> {
        let mut outbound: Vec<(usize, crate::signal::SignalDescriptor)> = Vec::new();
        let mut next_invokes = Vec::with_capacity(self.entries.len());

        for (index, entry) in self.entries.iter_mut().enumerate() {
            let (next_invoke, signal) =
                entry
                    .node
                    .run(self.now, &mut *entry.mac, &self.quality, &self.performance, &mut self.rng);
            next_invokes.push(next_invoke);
            if let Some(signal) = signal {
                if signal.ampdu.subframe_count() > 0 {
                    outbound.push((index, signal));
                }
            }
        }

        let any_transmitted = !outbound.is_empty();

        for (sender_index, signal) in outbound {
            let sender_position = self.entries[sender_index].node.position;
            let sender_id = self.entries[sender_index].node.id;
            for (receiver_index, entry) in self.entries.iter_mut().enumerate() {
                if receiver_index == sender_index {
                    continue;
                }
                let mut copy = signal.clone();
                copy.signal_power_dbm = self.channel.received_power_dbm(
                    sender_position,
                    entry.node.position,
                    signal.signal_power_dbm,
                    signal.frequency_ghz,
                );
                if !entry.node.deliver(copy) {
                    log::warn!("node {:?} inbox full, dropping signal from {:?}", entry.node.id, sender_id);
                }
            }
        }

        let elapsed = if any_transmitted {
            SimDuration::ZERO
        } else {
            min_positive(next_invokes)?
        };

        self.now += elapsed;
        log::trace!("advanced to {} (elapsed {})", self.now, elapsed);
        Some(elapsed)
    }
}
