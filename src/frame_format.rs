//! Frame-format tables (§2, §4.2, §6): per-format MCS, rate, symbol
//! duration, and bits-per-symbol lookups, plus the TxTime/duration
//! arithmetic the transmitter and receiver both depend on.

use crate::consts::{
    BCC_TAIL_BITS, HE_NDP_PE_DURATION_US, PREAMBLE_DURATION_US, SERVICE_BITS,
    SYMBOL_DURATION_HE_GI0_8_US, SYMBOL_DURATION_HE_GI1_6_US, SYMBOL_DURATION_HE_GI3_2_US,
    SYMBOL_DURATION_LEGACY_US,
};
use crate::error::SimError;
use crate::time::SimDuration;

/// PPDU frame format. HE-EXT-SU is the extended-range single-user HE
/// variant; multi-user OFDMA scheduling internals are not modeled
/// per §1's Non-goals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    NonHt,
    Ht,
    Vht,
    HeSu,
    HeExtSu,
}

impl FrameFormat {
    pub fn is_aggregated(&self, ampdu_flag: bool) -> bool {
        match self {
            FrameFormat::NonHt => false,
            FrameFormat::Ht => ampdu_flag,
            FrameFormat::Vht | FrameFormat::HeSu | FrameFormat::HeExtSu => true,
        }
    }

    /// Maximum MCS index permitted by this format, per §4.6's `init`
    /// rule (`chains` is the number of space-time streams).
    pub fn max_mcs(&self, chains: u8) -> u8 {
        match self {
            FrameFormat::NonHt | FrameFormat::Ht => 7,
            FrameFormat::Vht => {
                if chains == 3 || chains == 6 {
                    9
                } else {
                    8
                }
            }
            FrameFormat::HeExtSu => 2,
            FrameFormat::HeSu => 11,
        }
    }
}

/// HE guard interval. Non-HE formats use the fixed 4 us legacy symbol
/// duration regardless of this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardInterval {
    Gi0_8,
    Gi1_6,
    #[default]
    Gi3_2,
}

impl GuardInterval {
    pub fn he_symbol_duration_us(&self) -> f64 {
        match self {
            GuardInterval::Gi0_8 => SYMBOL_DURATION_HE_GI0_8_US,
            GuardInterval::Gi1_6 => SYMBOL_DURATION_HE_GI1_6_US,
            GuardInterval::Gi3_2 => SYMBOL_DURATION_HE_GI3_2_US,
        }
    }
}

/// Channel coding. Non-HT payload coding is always forced to BCC
/// per §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coding {
    Bcc,
    Ldpc,
}

impl Coding {
    pub fn tail_bits(&self) -> u32 {
        match self {
            Coding::Bcc => BCC_TAIL_BITS,
            Coding::Ldpc => 0,
        }
    }

    pub fn code_rate(&self) -> f64 {
        // A single representative rate; real 802.11 has several rates
        // per MCS. The receiver only needs code_rate to turn a byte
        // count into a bit count for NumOfBits (§4.2), so one
        // per-coding value is sufficient for the abstracted PHY.
        match self {
            Coding::Bcc => 0.75,
            Coding::Ldpc => 0.83,
        }
    }
}

/// Supported channel bandwidths, in MHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bandwidth {
    Mhz20,
    Mhz40,
    Mhz80,
    Mhz160,
}

impl Bandwidth {
    fn ndbps_scale(&self) -> f64 {
        match self {
            Bandwidth::Mhz20 => 1.0,
            Bandwidth::Mhz40 => 2.0,
            Bandwidth::Mhz80 => 4.0,
            Bandwidth::Mhz160 => 8.0,
        }
    }

    pub fn mhz(&self) -> u16 {
        match self {
            Bandwidth::Mhz20 => 20,
            Bandwidth::Mhz40 => 40,
            Bandwidth::Mhz80 => 80,
            Bandwidth::Mhz160 => 160,
        }
    }

    pub fn from_mhz(mhz: u16) -> Result<Self, SimError> {
        match mhz {
            20 => Ok(Bandwidth::Mhz20),
            40 => Ok(Bandwidth::Mhz40),
            80 => Ok(Bandwidth::Mhz80),
            160 => Ok(Bandwidth::Mhz160),
            other => Err(SimError::UnsupportedBandwidth(other)),
        }
    }
}

/// One row of the rate table (`getRateTable` in §6): the per-symbol
/// bit capacity and data rate for a given (format, MCS, bandwidth,
/// space-time streams) combination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateTableEntry {
    /// Number of data bits per symbol.
    pub ndbps: f64,
    /// Data rate in Mbps.
    pub data_rate_mbps: f64,
}

/// 20 MHz, 1-stream Non-HT NDBPS per MCS 0..=7 (BPSK 1/2 through
/// 64-QAM 3/4), the base table every other bandwidth/stream count
/// scales from.
const NON_HT_NDBPS_20MHZ: [f64; 8] = [24.0, 48.0, 72.0, 96.0, 144.0, 192.0, 216.0, 240.0];

/// Look up the rate table entry for a (format, mcs, bandwidth, streams)
/// configuration. Returns an error for an MCS outside the format's
/// supported range.
pub fn rate_table(
    format: FrameFormat,
    mcs: u8,
    bandwidth: Bandwidth,
    streams: u8,
) -> Result<RateTableEntry, SimError> {
    let max = format.max_mcs(streams.max(1));
    if mcs > max {
        return Err(SimError::McsOutOfRange { mcs, max });
    }

    let base_index = (mcs % 8) as usize;
    let ndbps = NON_HT_NDBPS_20MHZ[base_index] * bandwidth.ndbps_scale() * streams.max(1) as f64;

    let symbol_us = match format {
        FrameFormat::HeSu | FrameFormat::HeExtSu => GuardInterval::default().he_symbol_duration_us(),
        _ => SYMBOL_DURATION_LEGACY_US,
    };

    let data_rate_mbps = ndbps / symbol_us;

    Ok(RateTableEntry {
        ndbps,
        data_rate_mbps,
    })
}

/// The TX vector: the per-transmission PHY configuration named in §3.
#[derive(Debug, Clone)]
pub struct TxVector {
    pub format: FrameFormat,
    pub bandwidth: Bandwidth,
    pub num_tx_antennas: u8,
    pub num_space_time_streams: u8,
    pub guard_interval: GuardInterval,
    pub coding: Coding,
    /// Per-user MCS index (single entry for the SU baseline; up to
    /// `MAX_MU_STATIONS` for the MU-capable structure per §1).
    pub per_user_mcs: Vec<u8>,
    /// Per-user PSDU length in bytes.
    pub per_user_psdu_length: Vec<u32>,
    /// Per-user transmit power in dBm.
    pub per_user_tx_power: Vec<f64>,
    pub aggregated_mpdu: bool,
    pub bss_color: u8,
    pub enable_spatial_reuse: bool,
    pub obss_pd_threshold: f64,
}

impl TxVector {
    /// Construct a single-user TX vector, validating the bandwidth and
    /// MCS eagerly (§4.2: "unsupported channel bandwidth ⇒ fatal").
    #[allow(clippy::too_many_arguments)]
    pub fn new_single_user(
        format: FrameFormat,
        bandwidth_mhz: u16,
        num_tx_antennas: u8,
        num_space_time_streams: u8,
        mcs: u8,
        psdu_length: u32,
        tx_power_dbm: f64,
    ) -> Result<Self, SimError> {
        let bandwidth = Bandwidth::from_mhz(bandwidth_mhz)?;
        let max = format.max_mcs(num_space_time_streams.max(1));
        if mcs > max {
            return Err(SimError::McsOutOfRange { mcs, max });
        }

        let coding = if matches!(format, FrameFormat::NonHt) {
            Coding::Bcc
        } else {
            Coding::Bcc
        };

        Ok(Self {
            format,
            bandwidth,
            num_tx_antennas,
            num_space_time_streams,
            guard_interval: GuardInterval::default(),
            coding,
            per_user_mcs: vec![mcs],
            per_user_psdu_length: vec![psdu_length],
            per_user_tx_power: vec![tx_power_dbm],
            aggregated_mpdu: false,
            bss_color: 0,
            enable_spatial_reuse: false,
            obss_pd_threshold: crate::consts::OBSS_PD_THRESHOLD_MIN_DBM,
        })
    }

    pub fn with_spatial_reuse(mut self, bss_color: u8, obss_pd_threshold: f64) -> Self {
        self.enable_spatial_reuse = true;
        self.bss_color = bss_color;
        self.obss_pd_threshold = obss_pd_threshold;
        self
    }

    pub fn with_aggregation(mut self) -> Self {
        self.aggregated_mpdu = true;
        self
    }

    fn symbol_duration_us(&self) -> f64 {
        match self.format {
            FrameFormat::HeSu | FrameFormat::HeExtSu => self.guard_interval.he_symbol_duration_us(),
            _ => SYMBOL_DURATION_LEGACY_US,
        }
    }

    /// Header duration: "configure with APEP/PSDU length = 0, query
    /// TxTime, subtract preamble (and, for HE, the 4 us NDP PE
    /// overhead)" per §4.2.
    pub fn header_duration(&self) -> SimDuration {
        let symbol_us = self.symbol_duration_us();
        // A zero-length PSDU still carries the SERVICE field and, for
        // BCC, the tail bits; one symbol is always needed to carry them.
        let header_bits = SERVICE_BITS + self.coding.tail_bits();
        let entry = rate_table(self.format, self.per_user_mcs[0], self.bandwidth, self.num_space_time_streams)
            .expect("TxVector was constructed with a validated MCS");
        let header_symbols = (header_bits as f64 / entry.ndbps).ceil().max(1.0);
        let mut duration_us = header_symbols * symbol_us;
        if matches!(self.format, FrameFormat::HeSu | FrameFormat::HeExtSu) {
            duration_us += HE_NDP_PE_DURATION_US;
        }
        SimDuration::from_micros_f64(duration_us)
    }

    /// Full per-subframe payload accounting, per §4.2's per-subframe
    /// accounting rules.
    pub fn payload_info(&self) -> Result<AmpduPayloadPlan, SimError> {
        let entry = rate_table(self.format, self.per_user_mcs[0], self.bandwidth, self.num_space_time_streams)?;
        let symbol_us = self.symbol_duration_us();
        let psdu_bytes = self.per_user_psdu_length[0];

        if !self.format.is_aggregated(self.aggregated_mpdu) {
            let data_bits = SERVICE_BITS as f64 + psdu_bytes as f64 * 8.0 + self.coding.tail_bits() as f64;
            let data_symbols = (data_bits / entry.ndbps).ceil();
            let duration = SimDuration::from_micros_f64(data_symbols * symbol_us);
            let num_bits = (entry.data_rate_mbps * 1_000_000.0) * duration.as_micros_f64() / 1_000_000.0
                * self.coding.code_rate();
            return Ok(AmpduPayloadPlan {
                subframes: vec![SubframePlan {
                    duration,
                    overhead_duration: SimDuration::ZERO,
                    num_bits,
                }],
            });
        }

        // Aggregated formats: service/tail apply only to subframe 1;
        // split the PSDU evenly across MAX_SUBFRAMES_COUNT-bounded
        // subframes using the caller-provided count implicit in
        // per_user_psdu_length being the *aggregate* byte count divided
        // across however many subframes the MAC layer decided on. This
        // crate treats the PSDU length as already the per-aggregate
        // total and derives one subframe per MPDU of equal size, which
        // keeps the "last subframe carries the padding residual" rule
        // well-defined without requiring the MAC codec §1 places out
        // of scope.
        let subframe_count = self.aggregated_subframe_count();
        let per_subframe_bytes = psdu_bytes / subframe_count as u32;

        // The aggregate's true payload duration: subframes share one
        // continuous symbol stream, so only the whole PSDU (plus the
        // once-only service/tail overhead) is quantized to a whole
        // number of symbols, not each subframe individually.
        let total_data_bits =
            SERVICE_BITS as f64 + self.coding.tail_bits() as f64 + per_subframe_bytes as f64 * 8.0 * subframe_count as f64;
        let total_duration_us = (total_data_bits / entry.ndbps).ceil() * symbol_us;

        let mut subframes = Vec::with_capacity(subframe_count);
        let mut cumulative_us = 0.0;

        for i in 0..subframe_count {
            let extra_header_bits = if i == 0 {
                SERVICE_BITS as f64 + self.coding.tail_bits() as f64
            } else {
                0.0
            };
            let data_bits = extra_header_bits + per_subframe_bytes as f64 * 8.0;
            let raw_duration_us = data_bits / entry.ndbps * symbol_us;

            // Last subframe absorbs the residual padding needed to
            // reach the independently-computed aggregate total; the
            // others have no gap to the next subframe's start offset.
            let is_last = i + 1 == subframe_count;
            let overhead_us = if is_last {
                (total_duration_us - (cumulative_us + raw_duration_us)).max(0.0)
            } else {
                0.0
            };

            let num_bits =
                entry.data_rate_mbps * 1_000_000.0 * (raw_duration_us + overhead_us) / 1_000_000.0 * self.coding.code_rate();

            subframes.push(SubframePlan {
                duration: SimDuration::from_micros_f64(raw_duration_us),
                overhead_duration: SimDuration::from_micros_f64(overhead_us),
                num_bits,
            });

            cumulative_us += raw_duration_us + overhead_us;
        }

        Ok(AmpduPayloadPlan { subframes })
    }

    fn aggregated_subframe_count(&self) -> usize {
        // A PSDU under ~1500 bytes is treated as a single MPDU even
        // when the format supports aggregation; larger PSDUs are split
        // into equal MPDUs up to MAX_SUBFRAMES_COUNT, matching the
        // "structures accommodate aggregation" baseline from §1
        // without requiring the external MAC frame codec.
        if !self.aggregated_mpdu {
            return 1;
        }
        let bytes = self.per_user_psdu_length[0];
        let count = (bytes / 1500).clamp(1, crate::consts::MAX_SUBFRAMES_COUNT as u32);
        count as usize
    }
}

/// One planned A-MPDU subframe's duration/overhead/bit-count, prior to
/// being laid out with offsets in [`crate::signal::AmpduLayout`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubframePlan {
    pub duration: SimDuration,
    pub overhead_duration: SimDuration,
    pub num_bits: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmpduPayloadPlan {
    pub subframes: Vec<SubframePlan>,
}

impl AmpduPayloadPlan {
    pub fn total_duration(&self) -> SimDuration {
        self.subframes
            .iter()
            .fold(SimDuration::ZERO, |acc, s| acc + s.duration + s.overhead_duration)
    }
}

pub fn preamble_duration() -> SimDuration {
    SimDuration::from_micros_f64(PREAMBLE_DURATION_US)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_bandwidth_is_fatal() {
        let err = TxVector::new_single_user(FrameFormat::NonHt, 321, 1, 1, 0, 100, 20.0).unwrap_err();
        assert_eq!(err, SimError::UnsupportedBandwidth(321));
    }

    #[test]
    fn mcs_out_of_range_is_fatal() {
        let err = TxVector::new_single_user(FrameFormat::NonHt, 20, 1, 1, 8, 100, 20.0).unwrap_err();
        assert_eq!(err, SimError::McsOutOfRange { mcs: 8, max: 7 });
    }

    #[test]
    fn preamble_is_sixteen_microseconds() {
        assert_eq!(preamble_duration(), SimDuration::from_micros(16));
    }

    #[test]
    fn duration_consistency_single_subframe() {
        let tv = TxVector::new_single_user(FrameFormat::NonHt, 20, 1, 1, 7, 1500, 20.0).unwrap();
        let plan = tv.payload_info().unwrap();
        assert_eq!(plan.subframes.len(), 1);
        assert!(plan.total_duration().as_micros() > 0);
    }
}
