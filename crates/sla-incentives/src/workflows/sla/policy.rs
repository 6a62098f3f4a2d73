use crate::workflows::bonus::{BonusPolicy, SlaMultiplierPolicy, VolumeTierPolicy};
use crate::workflows::ingest::normalize_label;
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Latest time of day that still counts toward same-day handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cutoff {
    pub hour: u32,
    pub minute: u32,
}

impl Cutoff {
    pub const fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    /// True when `time` is at or after the cutoff.
    pub fn is_reached_by(&self, time: NaiveTime) -> bool {
        (time.hour(), time.minute()) >= (self.hour, self.minute)
    }
}

/// Carrier label -> cutoff, with a fallback for carriers not listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierCutoffPolicy {
    pub cutoffs: BTreeMap<String, Cutoff>,
    pub default: Cutoff,
}

impl CarrierCutoffPolicy {
    pub fn cutoff_for(&self, carrier: Option<&str>) -> Cutoff {
        carrier
            .and_then(|carrier| lookup(&self.cutoffs, carrier))
            .copied()
            .unwrap_or(self.default)
    }
}

/// Carrier label -> last hour of the deadline day a shipment may leave and
/// still count as on time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingTimeLimits {
    pub limits: BTreeMap<String, u32>,
    pub default_hour: u32,
}

impl ShippingTimeLimits {
    pub fn limit_for(&self, carrier: Option<&str>) -> u32 {
        carrier
            .and_then(|carrier| lookup(&self.limits, carrier))
            .copied()
            .unwrap_or(self.default_hour)
    }
}

/// Stores whose orders get extra business days before the deadline clock
/// starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedSla {
    pub stores: Vec<String>,
    pub business_days: u32,
    pub snap_hour: u32,
}

impl ExtendedSla {
    pub fn applies_to(&self, store: &str) -> bool {
        contains_label(&self.stores, store)
    }
}

/// Everything that differs between operating sites. One engine, many
/// instances of this value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitePolicy {
    pub id: String,
    pub name: String,
    pub country: String,
    pub cutoffs: CarrierCutoffPolicy,
    pub time_limits: ShippingTimeLimits,
    pub extended_sla: ExtendedSla,
    #[serde(default)]
    pub never_counted_stores: Vec<String>,
    #[serde(default)]
    pub ignored_statuses: Vec<String>,
    pub bonus: BonusPolicy,
}

impl SitePolicy {
    pub fn is_never_counted(&self, store: &str) -> bool {
        contains_label(&self.never_counted_stores, store)
    }

    pub fn ignores_status(&self, status: &str) -> bool {
        self.ignored_statuses
            .iter()
            .any(|ignored| ignored.trim().eq_ignore_ascii_case(status.trim()))
    }

    /// Both operating sites with their production tables.
    pub fn builtin() -> Vec<Self> {
        vec![Self::embu(), Self::extrema()]
    }

    pub fn embu() -> Self {
        Self {
            id: "embu".to_string(),
            name: "Embu das Artes".to_string(),
            country: "BR".to_string(),
            cutoffs: CarrierCutoffPolicy {
                cutoffs: table(&[
                    ("CUBBO", Cutoff::new(16, 30)),
                    ("UELLO", Cutoff::new(16, 0)),
                    ("CORREIOS", Cutoff::new(13, 0)),
                    ("LOGGI", Cutoff::new(16, 0)),
                    ("Mercado Envíos", Cutoff::new(13, 0)),
                    ("JT Express", Cutoff::new(16, 0)),
                ]),
                default: Cutoff::new(16, 0),
            },
            time_limits: ShippingTimeLimits {
                limits: table(&[
                    ("CORREIOS", 15),
                    ("Mercado Envíos", 14),
                    ("Armazém", 17),
                    ("Externo", 17),
                    ("LOGGI", 17),
                ]),
                default_hour: 18,
            },
            extended_sla: publishing_extension(3),
            never_counted_stores: vec!["TAG Livros".to_string()],
            ignored_statuses: default_ignored_statuses(),
            bonus: BonusPolicy::SlaMultiplier(SlaMultiplierPolicy::default()),
        }
    }

    pub fn extrema() -> Self {
        Self {
            id: "extrema".to_string(),
            name: "Extrema".to_string(),
            country: "BR".to_string(),
            cutoffs: CarrierCutoffPolicy {
                cutoffs: table(&[
                    ("CUBBO", Cutoff::new(16, 30)),
                    ("UELLO", Cutoff::new(16, 0)),
                    ("CORREIOS", Cutoff::new(14, 0)),
                    ("LOGGI", Cutoff::new(13, 30)),
                    ("Mercado Envíos", Cutoff::new(13, 0)),
                    ("JT Express", Cutoff::new(16, 0)),
                ]),
                default: Cutoff::new(13, 30),
            },
            time_limits: ShippingTimeLimits {
                limits: table(&[
                    ("LOGGI", 14),
                    ("CORREIOS", 12),
                    ("Mercado Envíos", 14),
                    ("Armazém", 17),
                    ("Externo", 17),
                ]),
                default_hour: 18,
            },
            extended_sla: publishing_extension(2),
            never_counted_stores: vec!["TAG Livros".to_string()],
            ignored_statuses: default_ignored_statuses(),
            bonus: BonusPolicy::TierByVolume(VolumeTierPolicy::default()),
        }
    }
}

fn publishing_extension(business_days: u32) -> ExtendedSla {
    ExtendedSla {
        stores: ["FOSFORO", "Dois Pontos", "Boitempo", "Qura Editora"]
            .into_iter()
            .map(str::to_string)
            .collect(),
        business_days,
        snap_hour: 9,
    }
}

fn default_ignored_statuses() -> Vec<String> {
    vec!["canceled".to_string(), "holded".to_string()]
}

fn table<T: Copy>(entries: &[(&str, T)]) -> BTreeMap<String, T> {
    entries
        .iter()
        .map(|(label, value)| (label.to_string(), *value))
        .collect()
}

fn lookup<'a, T>(entries: &'a BTreeMap<String, T>, label: &str) -> Option<&'a T> {
    let wanted = normalize_label(label);
    entries
        .iter()
        .find(|(key, _)| normalize_label(key) == wanted)
        .map(|(_, value)| value)
}

fn contains_label(labels: &[String], label: &str) -> bool {
    let wanted = normalize_label(label);
    labels.iter().any(|candidate| normalize_label(candidate) == wanted)
}
