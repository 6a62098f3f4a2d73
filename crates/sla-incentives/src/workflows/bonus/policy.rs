use super::round_cents;
use serde::{Deserialize, Serialize};

/// Throughput offsets covered by the what-if sweep.
const SWEEP_RADIUS: i32 = 5;

/// Per-site bonus rule. Sites differ in shape, not just in constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BonusPolicy {
    TierByVolume(VolumeTierPolicy),
    SlaMultiplier(SlaMultiplierPolicy),
}

impl BonusPolicy {
    pub fn label(&self) -> &'static str {
        match self {
            BonusPolicy::TierByVolume(_) => "tier_by_volume",
            BonusPolicy::SlaMultiplier(_) => "sla_multiplier",
        }
    }

    pub fn evaluate(&self, inputs: &BonusInputs) -> BonusOutcome {
        match self {
            BonusPolicy::TierByVolume(policy) => policy.evaluate(inputs),
            BonusPolicy::SlaMultiplier(policy) => policy.evaluate(inputs),
        }
    }
}

/// Figures a bonus rule reads from a scored run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BonusInputs {
    pub shipping_sla: f64,
    pub composite_sla: f64,
    pub throughput: Option<f64>,
    pub shipped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub throughput: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BonusOutcome {
    pub eligible: bool,
    /// 1-based tier reached, 0 when no tier applies.
    pub level: u32,
    /// Volume-tier rate or SLA multiplier, depending on the rule.
    pub factor: f64,
    pub unit_value: f64,
    pub amount: f64,
    pub sla_progress: Option<f64>,
    pub sweep: Vec<SweepPoint>,
}

fn sweep_throughputs(center: f64) -> impl Iterator<Item = f64> {
    let center = center.floor();
    (-SWEEP_RADIUS..=SWEEP_RADIUS)
        .map(move |offset| center + f64::from(offset))
        .filter(|throughput| *throughput >= 0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeTier {
    /// Monthly shipments must exceed this count.
    pub above: u64,
    pub rate: f64,
}

/// Tier chosen by monthly volume, scaled by capped throughput.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeTierPolicy {
    pub tiers: Vec<VolumeTier>,
    #[serde(default = "VolumeTierPolicy::default_cap")]
    pub throughput_cap: f64,
    #[serde(default = "VolumeTierPolicy::default_step")]
    pub throughput_step: f64,
}

impl Default for VolumeTierPolicy {
    fn default() -> Self {
        let tiers = [
            (55_000, 0.01),
            (65_000, 0.05),
            (75_000, 0.10),
            (85_000, 0.15),
            (100_000, 0.25),
        ]
        .into_iter()
        .map(|(above, rate)| VolumeTier { above, rate })
        .collect();

        Self {
            tiers,
            throughput_cap: Self::default_cap(),
            throughput_step: Self::default_step(),
        }
    }
}

impl VolumeTierPolicy {
    fn default_cap() -> f64 {
        100.0
    }

    fn default_step() -> f64 {
        0.01
    }

    /// Highest tier whose threshold the volume strictly exceeds.
    pub fn tier_for(&self, shipped: u64) -> Option<(u32, VolumeTier)> {
        let mut ordered = self.tiers.clone();
        ordered.sort_by_key(|tier| tier.above);
        ordered
            .into_iter()
            .zip(1u32..)
            .filter(|(tier, _)| shipped > tier.above)
            .last()
            .map(|(tier, level)| (level, tier))
    }

    pub fn throughput_multiplier(&self, throughput: f64) -> f64 {
        throughput.clamp(0.0, self.throughput_cap) * self.throughput_step
    }

    pub fn evaluate(&self, inputs: &BonusInputs) -> BonusOutcome {
        let (level, rate) = self
            .tier_for(inputs.shipped)
            .map(|(level, tier)| (level, tier.rate))
            .unwrap_or((0, 0.0));
        let shipped = inputs.shipped as f64;
        let amount_at = |throughput: f64| {
            round_cents(shipped * rate * self.throughput_multiplier(throughput))
        };

        let throughput = inputs.throughput.unwrap_or_default();
        let eligible = inputs.throughput.is_some() && level > 0;
        let unit_value = rate * self.throughput_multiplier(throughput);

        BonusOutcome {
            eligible,
            level,
            factor: rate,
            unit_value,
            amount: if eligible { amount_at(throughput) } else { 0.0 },
            sla_progress: None,
            sweep: sweep_throughputs(throughput)
                .map(|throughput| SweepPoint {
                    throughput,
                    amount: amount_at(throughput),
                })
                .collect(),
        }
    }
}

/// Which SLA figure a multiplier rule reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaBasis {
    #[default]
    Shipping,
    Composite,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlaMultiplierTier {
    pub min_sla: f64,
    pub multiplier: f64,
}

/// Per-unit value grows with throughput above a floor and is multiplied by
/// the tier the SLA reaches. Both floors are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaMultiplierPolicy {
    #[serde(default)]
    pub sla_basis: SlaBasis,
    pub tiers: Vec<SlaMultiplierTier>,
    pub sla_floor: f64,
    pub throughput_floor: f64,
    pub unit_step: f64,
    pub minimum_unit_value: f64,
}

impl Default for SlaMultiplierPolicy {
    fn default() -> Self {
        let tiers = [(90.0, 1.0), (95.0, 1.2), (97.0, 1.5), (99.0, 2.0)]
            .into_iter()
            .map(|(min_sla, multiplier)| SlaMultiplierTier {
                min_sla,
                multiplier,
            })
            .collect();

        Self {
            sla_basis: SlaBasis::Shipping,
            tiers,
            sla_floor: 90.0,
            throughput_floor: 90.0,
            unit_step: 0.01,
            minimum_unit_value: 0.01,
        }
    }
}

impl SlaMultiplierPolicy {
    pub fn sla_for(&self, inputs: &BonusInputs) -> f64 {
        match self.sla_basis {
            SlaBasis::Shipping => inputs.shipping_sla,
            SlaBasis::Composite => inputs.composite_sla,
        }
    }

    /// Highest tier the SLA reaches, with its 1-based level.
    pub fn tier_for(&self, sla: f64) -> Option<(u32, SlaMultiplierTier)> {
        let mut ordered = self.tiers.clone();
        ordered.sort_by(|a, b| a.min_sla.total_cmp(&b.min_sla));
        ordered
            .into_iter()
            .zip(1u32..)
            .filter(|(tier, _)| sla >= tier.min_sla)
            .last()
            .map(|(tier, level)| (level, tier))
    }

    pub fn unit_value(&self, throughput: f64) -> f64 {
        ((throughput - self.throughput_floor) * self.unit_step).max(self.minimum_unit_value)
    }

    /// Share of the way from the SLA floor to 100%, clamped to 0..=100.
    pub fn sla_progress(&self, sla: f64) -> f64 {
        let span = 100.0 - self.sla_floor;
        if span <= 0.0 {
            return if sla >= self.sla_floor { 100.0 } else { 0.0 };
        }
        ((sla - self.sla_floor) * 100.0 / span).clamp(0.0, 100.0)
    }

    pub fn evaluate(&self, inputs: &BonusInputs) -> BonusOutcome {
        let sla = self.sla_for(inputs);
        let tier = self.tier_for(sla);
        let throughput = inputs.throughput.unwrap_or_default();
        let eligible = tier.is_some()
            && sla >= self.sla_floor
            && inputs
                .throughput
                .is_some_and(|value| value >= self.throughput_floor);

        // Below the table the sweep still shows the base multiplier.
        let (level, multiplier) = tier
            .map(|(level, tier)| (level, tier.multiplier))
            .unwrap_or((0, 1.0));
        let shipped = inputs.shipped as f64;
        let amount_at =
            |throughput: f64| round_cents(shipped * self.unit_value(throughput) * multiplier);

        BonusOutcome {
            eligible,
            level,
            factor: multiplier,
            unit_value: self.unit_value(throughput),
            amount: if eligible { amount_at(throughput) } else { 0.0 },
            sla_progress: Some(self.sla_progress(sla)),
            sweep: sweep_throughputs(throughput.max(self.throughput_floor))
                .map(|throughput| SweepPoint {
                    throughput,
                    amount: amount_at(throughput),
                })
                .collect(),
        }
    }
}
