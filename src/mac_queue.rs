//! The MAC queue manager (§3, §4.5): per-node, per-access-category
//! transmission and retransmission queues with selective discard and
//! ordered dequeue.

use std::collections::HashMap;

use arrayvec::ArrayVec;

use crate::addressing::{MacAddress, NodeId};
use crate::consts::{MAX_QUEUE_LENGTH, MAX_SUBFRAMES_COUNT};

/// Access category, fixed at 4 per §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessCategory {
    Voice,
    Video,
    BestEffort,
    Background,
}

/// One MAC Service Data Unit handed down from a higher layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Msdu {
    pub destination: MacAddress,
    pub payload_len: u32,
}

/// An MSDU sitting in the retry buffer, addressed by a retry index
/// that survives selective discard (§4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
struct RetryEntry {
    retry_index: u32,
    msdu: Msdu,
    retry_flag: bool,
}

#[derive(Default)]
struct NodeAcQueue {
    tx_ring: ArrayVec<Msdu, MAX_QUEUE_LENGTH>,
    retry_buffer: [Option<RetryEntry>; MAX_SUBFRAMES_COUNT],
    /// Write-minus-read tx accounting (§4.5): incremented on enqueue,
    /// decremented only on discard. Dequeuing into the retry buffer
    /// does not touch it — an MSDU stays "owned" until it is actually
    /// discarded, whether or not it has been dequeued in the meantime.
    owned: usize,
}

impl NodeAcQueue {
    fn retry_len(&self) -> usize {
        self.retry_buffer.iter().filter(|s| s.is_some()).count()
    }
}

/// Per (node, access category) tx/retry queue manager.
#[derive(Default)]
pub struct QueueManager {
    queues: HashMap<(NodeId, AccessCategory), NodeAcQueue>,
    next_retry_index: u32,
}

impl QueueManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue_mut(&mut self, node: NodeId, ac: AccessCategory) -> &mut NodeAcQueue {
        self.queues.entry((node, ac)).or_default()
    }

    /// Append to the tx ring. Returns `false` when the ring is full
    /// (current length = `MAX_QUEUE_LENGTH`).
    pub fn enqueue(&mut self, node: NodeId, ac: AccessCategory, msdu: Msdu) -> bool {
        let queue = self.queue_mut(node, ac);
        if queue.tx_ring.try_push(msdu).is_ok() {
            queue.owned += 1;
            true
        } else {
            false
        }
    }

    /// `TxQueueLengths` per §4.5/§8: the write-minus-read tx counter,
    /// which only shrinks when a discard removes the MSDU's ownership
    /// entirely. An MSDU already dequeued into the retry buffer still
    /// counts here until it is discarded.
    pub fn tx_queue_length(&self, node: NodeId, ac: AccessCategory) -> usize {
        self.queues.get(&(node, ac)).map_or(0, |q| q.owned)
    }

    /// Count of enqueued MSDUs not yet dequeued into the retry buffer.
    /// Unlike `tx_queue_length`, this shrinks as soon as `dequeue`
    /// pulls an MSDU — a `MacDriver` uses it to tell whether a
    /// `dequeue` call would surface anything it hasn't already seen,
    /// since `dequeue` re-selects retry-buffer residents on every call.
    pub fn fresh_queue_length(&self, node: NodeId, ac: AccessCategory) -> usize {
        self.queues.get(&(node, ac)).map_or(0, |q| q.tx_ring.len())
    }

    pub fn retry_queue_length(&self, node: NodeId, ac: AccessCategory) -> usize {
        self.queues.get(&(node, ac)).map_or(0, |q| q.retry_len())
    }

    /// Build up to `num_msdu` aggregated MSDUs for `(node, ac)`: drain
    /// the retry buffer first (keeping retry indices stable), then
    /// pull fresh MSDUs from the tx ring, assigning them new retry
    /// indices and appending them to the retry buffer (§4.5).
    ///
    /// Returns the retry indices selected, in the order they should be
    /// aggregated.
    pub fn dequeue(&mut self, node: NodeId, ac: AccessCategory, num_msdu: usize) -> Vec<u32> {
        let mut selected = Vec::with_capacity(num_msdu.min(MAX_SUBFRAMES_COUNT));
        let mut next_retry_index = self.next_retry_index;
        let queue = self.queue_mut(node, ac);

        for slot in queue.retry_buffer.iter_mut() {
            if selected.len() >= num_msdu {
                break;
            }
            if let Some(entry) = slot {
                // Already resident from an earlier dequeue: selecting
                // it again means this is a retransmission attempt.
                entry.retry_flag = true;
                selected.push(entry.retry_index);
            }
        }

        while selected.len() < num_msdu {
            if queue.tx_ring.is_empty() {
                break;
            }
            // FIFO: the oldest enqueued MSDU is the one at index 0.
            let msdu = queue.tx_ring.remove(0);
            let Some(free_slot) = queue.retry_buffer.iter_mut().find(|s| s.is_none()) else {
                // Retry buffer full: put it back at the front and stop.
                queue.tx_ring.insert(0, msdu);
                break;
            };
            let retry_index = next_retry_index;
            next_retry_index += 1;
            *free_slot = Some(RetryEntry {
                retry_index,
                msdu,
                retry_flag: false,
            });
            selected.push(retry_index);
        }
        self.next_retry_index = next_retry_index;

        selected
    }

    /// Zero the indicated retry-index slots, decrementing both retry
    /// and tx queue accounting (§4.5). Returns the retry indices
    /// actually discarded (those found).
    pub fn discard_packets(&mut self, node: NodeId, ac: AccessCategory, retry_indices: &[u32]) -> Vec<u32> {
        let queue = self.queue_mut(node, ac);
        let mut discarded = Vec::with_capacity(retry_indices.len());

        for slot in queue.retry_buffer.iter_mut() {
            if let Some(entry) = slot {
                if retry_indices.contains(&entry.retry_index) {
                    discarded.push(entry.retry_index);
                    *slot = None;
                }
            }
        }

        queue.owned = queue.owned.saturating_sub(discarded.len());
        discarded
    }

    /// Total MSDUs still owned by `(node, ac)` — identical to
    /// `tx_queue_length` now that both retry-resident and not-yet-
    /// dequeued MSDUs are counted in the same write-minus-read tally.
    pub fn total_owned(&self, node: NodeId, ac: AccessCategory) -> usize {
        self.tx_queue_length(node, ac)
    }

    fn retry_entry(&self, node: NodeId, ac: AccessCategory, retry_index: u32) -> Option<&RetryEntry> {
        self.queues
            .get(&(node, ac))?
            .retry_buffer
            .iter()
            .flatten()
            .find(|e| e.retry_index == retry_index)
    }

    /// Look up the MSDU a `dequeue`-selected retry index refers to, so
    /// a MAC driver can build a waveform with the actual payload
    /// length/destination rather than a placeholder.
    pub fn msdu_for(&self, node: NodeId, ac: AccessCategory, retry_index: u32) -> Option<&Msdu> {
        self.retry_entry(node, ac, retry_index).map(|e| &e.msdu)
    }

    /// Whether a `dequeue`-selected retry index has been selected
    /// before, i.e. this transmission is a retransmission (§4.5).
    pub fn retry_flag(&self, node: NodeId, ac: AccessCategory, retry_index: u32) -> bool {
        self.retry_entry(node, ac, retry_index).is_some_and(|e| e.retry_flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msdu(n: u8) -> Msdu {
        Msdu {
            destination: MacAddress([n; 6]),
            payload_len: 100,
        }
    }

    #[test]
    fn scenario_5_queue_discard() {
        let mut qm = QueueManager::new();
        let node = NodeId(3);
        let ac = AccessCategory::BestEffort;

        for i in 0..5 {
            assert!(qm.enqueue(node, ac, msdu(i)));
        }

        // Dequeue will only pull as many as the retry buffer (capacity
        // MAX_SUBFRAMES_COUNT == 9) can hold; 5 fits.
        let indices = qm.dequeue(node, ac, 5);
        assert_eq!(indices.len(), 5);
        assert_eq!(qm.tx_queue_length(node, ac), 5);
        assert_eq!(qm.retry_queue_length(node, ac), 5);

        let to_discard = [indices[1], indices[3]];
        let mut discarded = qm.discard_packets(node, ac, &to_discard);
        discarded.sort_unstable();
        let mut expected = to_discard.to_vec();
        expected.sort_unstable();
        assert_eq!(discarded, expected);

        // §8 scenario 5: TxQueueLengths[3,2] = 3, RetryQueueLengths[3,2] = 3.
        assert_eq!(qm.retry_queue_length(node, ac), 3);
        assert_eq!(qm.tx_queue_length(node, ac), 3);
    }

    #[test]
    fn enqueue_fails_when_ring_full() {
        let mut qm = QueueManager::new();
        let node = NodeId(1);
        let ac = AccessCategory::Voice;
        for i in 0..MAX_QUEUE_LENGTH {
            assert!(qm.enqueue(node, ac, msdu(i as u8)));
        }
        assert!(!qm.enqueue(node, ac, msdu(255)));
    }

    #[test]
    fn total_owned_is_conserved_across_dequeue() {
        let mut qm = QueueManager::new();
        let node = NodeId(2);
        let ac = AccessCategory::Video;
        for i in 0..4 {
            qm.enqueue(node, ac, msdu(i));
        }
        let before = qm.total_owned(node, ac);
        qm.dequeue(node, ac, 2);
        let after = qm.total_owned(node, ac);
        assert_eq!(before, after);
    }
}
