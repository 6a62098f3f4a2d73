use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaStream {
    Shipping,
    Receiving,
    Picking,
}

impl SlaStream {
    pub const fn ordered() -> [Self; 3] {
        [Self::Shipping, Self::Receiving, Self::Picking]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Shipping => "Shipping",
            Self::Receiving => "Receiving",
            Self::Picking => "Picking",
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Shipping => 0,
            Self::Receiving => 1,
            Self::Picking => 2,
        }
    }

    /// Exclusion list that governs this stream. Picking events belong to an
    /// order, so they share the order list.
    pub const fn exclusion_stream(self) -> ExclusionStream {
        match self {
            Self::Shipping | Self::Picking => ExclusionStream::Orders,
            Self::Receiving => ExclusionStream::Receipts,
        }
    }
}

/// Identifier lists curated by operators, one per source record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionStream {
    Orders,
    Receipts,
}

impl ExclusionStream {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Receipts => "receipts",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "orders" | "order" | "pedidos" => Some(Self::Orders),
            "receipts" | "receipt" | "recibos" => Some(Self::Receipts),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaOutcome {
    Hit,
    Miss,
    Pending,
}

impl SlaOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Pending => "PENDING",
        }
    }
}

/// Week-of-month aggregation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekBucket {
    First,
    Second,
    Third,
    Fourth,
}

impl WeekBucket {
    pub const fn ordered() -> [Self; 4] {
        [Self::First, Self::Second, Self::Third, Self::Fourth]
    }

    /// Days 1-8, 9-16, 17-24, and everything after 24.
    pub const fn for_day(day_of_month: u32) -> Self {
        match day_of_month {
            0..=8 => Self::First,
            9..=16 => Self::Second,
            17..=24 => Self::Third,
            _ => Self::Fourth,
        }
    }

    /// One-based position, as used in report keys.
    pub const fn number(self) -> usize {
        self.index() + 1
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
            Self::Third => 2,
            Self::Fourth => 3,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::First => "Week 1 (days 1-8)",
            Self::Second => "Week 2 (days 9-16)",
            Self::Third => "Week 3 (days 17-24)",
            Self::Fourth => "Week 4 (days 25+)",
        }
    }
}

/// Obligation with a start instant and an optional fulfilment instant.
///
/// Timestamps are parsed once at ingestion; nothing downstream re-reads the
/// raw strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaEvent {
    pub identifier: String,
    pub reference_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub carrier: Option<String>,
    pub store: String,
}

/// Order row after ingestion. Carries the shipping obligation plus the
/// picking completion used to derive the picking stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub event: SlaEvent,
    pub status: String,
    pub picked_at: Option<NaiveDateTime>,
}

/// Event after deadline resolution and classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedEvent {
    pub identifier: String,
    pub stream: SlaStream,
    pub store: String,
    pub carrier: Option<String>,
    pub deadline: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub outcome: SlaOutcome,
}

/// Anything the exclusion manager can match against an identifier list.
pub trait Identified {
    fn identifier(&self) -> &str;
}

impl Identified for SlaEvent {
    fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl Identified for OrderRecord {
    fn identifier(&self) -> &str {
        &self.event.identifier
    }
}

impl Identified for ClassifiedEvent {
    fn identifier(&self) -> &str {
        &self.identifier
    }
}
