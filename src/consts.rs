//! PHY/MAC constants used across the transmitter, receiver, interference
//! layer, queue manager, and rate control (§3, §4).

/// Preamble duration, identical for every supported frame format.
#[doc(alias = "PreambleDuration")]
pub const PREAMBLE_DURATION_US: f64 = 16.0;

/// OFDM symbol duration for Non-HT, HT, and VHT formats.
#[doc(alias = "SymbolDuration")]
pub const SYMBOL_DURATION_LEGACY_US: f64 = 4.0;

/// HE symbol durations by guard interval, per §4.2.
#[doc(alias = "HeSymbolDuration")]
pub const SYMBOL_DURATION_HE_GI0_8_US: f64 = 13.6;
#[doc(alias = "HeSymbolDuration")]
pub const SYMBOL_DURATION_HE_GI1_6_US: f64 = 14.4;
#[doc(alias = "HeSymbolDuration")]
pub const SYMBOL_DURATION_HE_GI3_2_US: f64 = 16.0;

/// Fixed 4 us PE (packet extension) overhead added for HE NDP header
/// duration computation.
#[doc(alias = "HePeDuration")]
pub const HE_NDP_PE_DURATION_US: f64 = 4.0;

/// Bits in the SERVICE field prepended to every non-aggregated PSDU.
#[doc(alias = "ServiceBits")]
pub const SERVICE_BITS: u32 = 16;

/// Tail bits appended when the coding is BCC (convolutional).
#[doc(alias = "TailBits")]
pub const BCC_TAIL_BITS: u32 = 6;

/// Energy-detection threshold: a receiver treats a signal as "present"
/// (drives CCA busy / may enter PreambleHeader) once total power
/// crosses this value.
#[doc(alias = "EDThreshold")]
pub const ED_THRESHOLD_DBM: f64 = -82.0;

/// Floor of the OBSS-PD threshold range (§4.2, §4.3).
#[doc(alias = "OBSSPDThresholdMin")]
pub const OBSS_PD_THRESHOLD_MIN_DBM: f64 = -82.0;

/// Default `TxPowerReference` for a non-AP station or an AP with at
/// most 2 space-time streams.
#[doc(alias = "TxPowerReference")]
pub const TX_POWER_REFERENCE_DEFAULT_DBM: f64 = 21.0;

/// `TxPowerReference` for an AP transmitting with more than 2
/// space-time streams.
#[doc(alias = "TxPowerReference")]
pub const TX_POWER_REFERENCE_AP_HIGH_STS_DBM: f64 = 25.0;

/// Capacity of the interference buffer (§3, §4.4, §9 open question).
#[doc(alias = "InterferenceBufferSize")]
pub const INTERFERENCE_BUFFER_SIZE: usize = 10;

/// Capacity of a MAC tx ring, per (node, access category).
#[doc(alias = "MaxQueueLength")]
pub const MAX_QUEUE_LENGTH: usize = 64;

/// Maximum subframes aggregated into one A-MPDU / retry batch.
#[doc(alias = "MaxSubframesCount")]
pub const MAX_SUBFRAMES_COUNT: usize = 9;

/// Maximum number of users in one MU PPDU (structurally supported;
/// single-user processing is the mandatory baseline per §1).
#[doc(alias = "MaxMUStations")]
pub const MAX_MU_STATIONS: usize = 9;

/// Fixed number of access categories (voice, video, best-effort,
/// background).
#[doc(alias = "NumAccessCategories")]
pub const NUM_ACCESS_CATEGORIES: usize = 4;

/// ARF default success threshold: consecutive successes needed to
/// promote the rate by one step.
#[doc(alias = "SuccessThreshold")]
pub const ARF_SUCCESS_THRESHOLD_DEFAULT: u32 = 4;

/// ARF default failure threshold: consecutive failures needed to
/// demote the rate by one step (outside the "bad promotion" case).
#[doc(alias = "FailureThreshold")]
pub const ARF_FAILURE_THRESHOLD_DEFAULT: u32 = 2;

/// RTS control frames are always sent at MCS 0 (6 Mbps basic rate);
/// the source notes this is not standard-complete. Preserved per §9.
#[doc(alias = "RtsControlRate")]
pub const RTS_CONTROL_MCS: u8 = 0;

/// Default fixed transmit power used by [`crate::control::power::FixedPowerControl`].
#[doc(alias = "FixedPower")]
pub const FIXED_POWER_DEFAULT_DBM: f64 = 15.0;

/// Valid range for fixed transmit power, inclusive.
#[doc(alias = "FixedPowerRange")]
pub const FIXED_POWER_RANGE_DBM: (f64, f64) = (0.0, 30.0);

/// 5 GHz band default starting factor for the channel→frequency formula.
#[doc(alias = "StartingFactor5GHz")]
pub const STARTING_FACTOR_5GHZ_DEFAULT: u32 = 10000;

/// 6 GHz band default starting factor for the channel→frequency formula.
#[doc(alias = "StartingFactor6GHz")]
pub const STARTING_FACTOR_6GHZ_DEFAULT: u32 = 11880;
