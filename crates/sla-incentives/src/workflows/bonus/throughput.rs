use super::round_cents;
use crate::workflows::sla::ProcessingMonth;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

const DAY_KEY_FORMAT: &str = "%d-%m-%Y";

#[derive(Debug, thiserror::Error)]
pub enum HeadcountError {
    #[error("headcount day '{value}' is not a DD-MM-YYYY date")]
    InvalidDay {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

pub fn parse_day_key(value: &str) -> Result<NaiveDate, HeadcountError> {
    NaiveDate::parse_from_str(value.trim(), DAY_KEY_FORMAT).map_err(|source| {
        HeadcountError::InvalidDay {
            value: value.to_string(),
            source,
        }
    })
}

pub fn format_day_key(date: NaiveDate) -> String {
    date.format(DAY_KEY_FORMAT).to_string()
}

/// Operators on the floor per day, persisted as `DD-MM-YYYY -> count`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, u32>",
    into = "BTreeMap<String, u32>"
)]
pub struct HeadcountLog {
    days: BTreeMap<NaiveDate, u32>,
}

impl HeadcountLog {
    pub fn set(&mut self, day: NaiveDate, operators: u32) -> Option<u32> {
        self.days.insert(day, operators)
    }

    pub fn operators_on(&self, day: NaiveDate) -> Option<u32> {
        self.days.get(&day).copied().filter(|operators| *operators > 0)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl FromIterator<(NaiveDate, u32)> for HeadcountLog {
    fn from_iter<T: IntoIterator<Item = (NaiveDate, u32)>>(iter: T) -> Self {
        Self {
            days: iter.into_iter().collect(),
        }
    }
}

impl TryFrom<BTreeMap<String, u32>> for HeadcountLog {
    type Error = HeadcountError;

    fn try_from(raw: BTreeMap<String, u32>) -> Result<Self, Self::Error> {
        raw.into_iter()
            .map(|(key, operators)| parse_day_key(&key).map(|day| (day, operators)))
            .collect()
    }
}

impl From<HeadcountLog> for BTreeMap<String, u32> {
    fn from(log: HeadcountLog) -> Self {
        log.days
            .into_iter()
            .map(|(day, operators)| (format_day_key(day), operators))
            .collect()
    }
}

/// Shipments per operator-day for the processing month.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThroughputReport {
    pub per_day: BTreeMap<NaiveDate, f64>,
    pub average: Option<f64>,
    pub shipped_month: u64,
    pub shipped_today: u64,
    pub outstanding: u64,
    pub missing_headcount: Vec<NaiveDate>,
}

/// Groups shipments by day and divides by that day's headcount. Days with
/// shipments but no headcount are skipped and reported.
pub fn compute_throughput<I>(
    shipments: I,
    outstanding: u64,
    headcount: &HeadcountLog,
    period: ProcessingMonth,
    today: NaiveDate,
) -> ThroughputReport
where
    I: IntoIterator<Item = NaiveDateTime>,
{
    let mut shipped_per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for shipped_at in shipments {
        let day = shipped_at.date();
        if period.contains(day) {
            *shipped_per_day.entry(day).or_default() += 1;
        }
    }

    let mut report = ThroughputReport {
        outstanding,
        shipped_month: shipped_per_day.values().sum(),
        shipped_today: shipped_per_day.get(&today).copied().unwrap_or_default(),
        ..ThroughputReport::default()
    };

    let mut exact = Vec::with_capacity(shipped_per_day.len());
    for (day, shipped) in shipped_per_day {
        match headcount.operators_on(day) {
            Some(operators) => {
                let per_operator = shipped as f64 / f64::from(operators);
                exact.push(per_operator);
                report.per_day.insert(day, round_cents(per_operator));
            }
            None => {
                warn!(
                    day = %format_day_key(day),
                    shipped,
                    "no operator headcount; day skipped in throughput"
                );
                report.missing_headcount.push(day);
            }
        }
    }

    if !exact.is_empty() {
        report.average = Some(exact.iter().sum::<f64>() / exact.len() as f64);
    }

    report
}
