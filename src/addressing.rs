//! Node-address registry (§6): the external collaborator mapping a
//! (node id, interface) pair to a 6-byte MAC address.

use std::collections::HashMap;

use crate::error::SimError;

/// Reserved broadcast MAC address (0xFF × 6).
pub const BROADCAST_ADDRESS: MacAddress = MacAddress([0xFF; 6]);

/// Reserved broadcast node id.
pub const BROADCAST_NODE_ID: NodeId = NodeId(65535);

/// A node identifier, unique within one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u16);

impl NodeId {
    pub fn is_broadcast(&self) -> bool {
        *self == BROADCAST_NODE_ID
    }
}

/// A 6-byte IEEE 802 MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub fn is_broadcast(&self) -> bool {
        *self == BROADCAST_ADDRESS
    }
}

impl std::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Maps (node id, interface index) to a MAC address and back, per §6.
///
/// Mutated only during node initialization (§5); all subsequent reads
/// are shared immutably across the receivers and MAC drivers that
/// need to resolve addresses.
#[derive(Debug, Default)]
pub struct AddressBook {
    by_node: HashMap<(NodeId, usize), MacAddress>,
    by_address: HashMap<MacAddress, (NodeId, usize)>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `address` to `(node_id, interface)`. Returns an error if
    /// a node id of `BROADCAST_NODE_ID` or address of
    /// `BROADCAST_ADDRESS` is assigned to a real node.
    pub fn assign(
        &mut self,
        node_id: NodeId,
        interface: usize,
        address: MacAddress,
    ) -> Result<(), SimError> {
        if node_id.is_broadcast() {
            return Err(SimError::InvalidNodeId(node_id.0));
        }
        self.by_node.insert((node_id, interface), address);
        self.by_address.insert(address, (node_id, interface));
        Ok(())
    }

    pub fn lookup_by_id(&self, node_id: NodeId, interface: usize) -> Option<MacAddress> {
        self.by_node.get(&(node_id, interface)).copied()
    }

    pub fn lookup_by_address(&self, address: MacAddress) -> Option<(NodeId, usize)> {
        if address.is_broadcast() {
            return None;
        }
        self.by_address.get(&address).copied()
    }
}
