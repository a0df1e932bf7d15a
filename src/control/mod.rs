//! Rate-control and power-control policies (§4.6), expressed through a
//! common abstract contract per §9.

pub mod power;
pub mod rate;
