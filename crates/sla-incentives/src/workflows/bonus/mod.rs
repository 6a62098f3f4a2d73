pub mod policy;
pub mod throughput;

pub use policy::{
    BonusInputs, BonusOutcome, BonusPolicy, SlaBasis, SlaMultiplierPolicy, SlaMultiplierTier,
    SweepPoint, VolumeTier, VolumeTierPolicy,
};
pub use throughput::{
    compute_throughput, format_day_key, parse_day_key, HeadcountError, HeadcountLog,
    ThroughputReport,
};

/// Rounds a currency or ratio figure to two decimals.
pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
