//! Rate-control policy (§4.6): the Auto-Rate-Fallback (ARF) contract
//! and its fixed-rate-adjacent MCS-reporting rules, expressed through
//! a common abstract contract per §9.

use std::collections::HashMap;

use crate::consts::{ARF_FAILURE_THRESHOLD_DEFAULT, ARF_SUCCESS_THRESHOLD_DEFAULT, RTS_CONTROL_MCS};
use crate::frame_format::FrameFormat;

/// Outcome of one A-MPDU transmission, as reported to `update_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmpduStatus {
    pub subframes_succeeded: u32,
    pub subframes_failed: u32,
}

impl AmpduStatus {
    /// A status is a failure iff strictly more subframes failed than
    /// succeeded (§4.6).
    pub fn is_failure(&self) -> bool {
        self.subframes_failed > self.subframes_succeeded
    }
}

/// Station identifier for rate/power control purposes (distinct from
/// `NodeId` since a peer station is addressed, not a simulation node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StationId(pub u16);

/// Behavioral contract shared by every rate-control policy (§9's
/// "class hierarchies → trait + enum").
pub trait RateControl {
    fn init(&mut self, station: StationId, format: FrameFormat, chains: u8);
    /// The reported MCS for data frames: for HT, `(chains-1)*8 + currentIdx`;
    /// other formats return `currentIdx` directly (§4.6).
    fn current_mcs(&self, station: StationId) -> u8;
    fn update_status(&mut self, station: StationId, status: AmpduStatus);
    /// Control-frame rate for RTS: fixed at `RTS_CONTROL_MCS` (§4.6, §9).
    fn rts_control_mcs(&self) -> u8 {
        RTS_CONTROL_MCS
    }
}

#[derive(Debug, Clone, Copy)]
struct ArfState {
    format: FrameFormat,
    chains: u8,
    current_mcs: u8,
    consecutive_success: u32,
    consecutive_failure: u32,
    previous_increment: bool,
}

impl ArfState {
    fn max_mcs(&self) -> u8 {
        self.format.max_mcs(self.chains.max(1))
    }

    fn reported_mcs(&self) -> u8 {
        if matches!(self.format, FrameFormat::Ht) {
            (self.chains.max(1) - 1) * 8 + self.current_mcs
        } else {
            self.current_mcs
        }
    }
}

/// Auto-Rate-Fallback rate control (§4.6).
pub struct ArfRateControl {
    states: HashMap<StationId, ArfState>,
    success_threshold: u32,
    failure_threshold: u32,
}

impl ArfRateControl {
    pub fn new(success_threshold: u32, failure_threshold: u32) -> Self {
        Self {
            states: HashMap::new(),
            success_threshold,
            failure_threshold,
        }
    }

    fn state_mut(&mut self, station: StationId) -> &mut ArfState {
        self.states
            .get_mut(&station)
            .expect("update_status/current_mcs called before init for this station")
    }
}

impl Default for ArfRateControl {
    fn default() -> Self {
        Self::new(ARF_SUCCESS_THRESHOLD_DEFAULT, ARF_FAILURE_THRESHOLD_DEFAULT)
    }
}

impl RateControl for ArfRateControl {
    fn init(&mut self, station: StationId, format: FrameFormat, chains: u8) {
        let max_mcs = format.max_mcs(chains.max(1));
        self.states.insert(
            station,
            ArfState {
                format,
                chains,
                current_mcs: max_mcs,
                consecutive_success: 0,
                consecutive_failure: 0,
                previous_increment: false,
            },
        );
    }

    fn current_mcs(&self, station: StationId) -> u8 {
        self.states
            .get(&station)
            .expect("update_status/current_mcs called before init for this station")
            .reported_mcs()
    }

    fn update_status(&mut self, station: StationId, status: AmpduStatus) {
        let success_threshold = self.success_threshold;
        let failure_threshold = self.failure_threshold;
        let state = self.state_mut(station);

        if status.is_failure() {
            state.consecutive_failure += 1;
            state.consecutive_success = 0;

            if state.previous_increment {
                // Penalize a bad promotion immediately.
                state.current_mcs = state.current_mcs.saturating_sub(1);
                state.consecutive_failure = 0;
                state.previous_increment = false;
            } else if state.consecutive_failure >= failure_threshold.max(1) {
                state.current_mcs = state.current_mcs.saturating_sub(1);
                state.consecutive_failure = 0;
            }
        } else {
            state.consecutive_success += 1;
            state.consecutive_failure = 0;
            state.previous_increment = false;

            if state.consecutive_success >= success_threshold {
                let max_mcs = state.max_mcs();
                state.current_mcs = (state.current_mcs + 1).min(max_mcs);
                state.previous_increment = true;
                state.consecutive_success = 0;
            }
        }
    }
}
