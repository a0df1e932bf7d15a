//! A discrete-event simulation core for IEEE 802.11 MAC/PHY behavior:
//! a single-threaded kernel stepping a fixed set of nodes, each with a
//! PHY transmitter/receiver, MAC queue manager, and rate/power control
//! (§1, §5).

pub mod addressing;
pub mod channel;
pub mod consts;
pub mod control;
pub mod error;
pub mod frame_format;
pub mod frequency;
pub mod interference;
pub mod kernel;
pub mod link_quality;
pub mod mac_queue;
pub mod node;
pub mod phy;
pub mod rng;
pub mod signal;
pub mod time;

pub use error::SimError;
