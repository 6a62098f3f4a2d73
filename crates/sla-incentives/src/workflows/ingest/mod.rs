mod normalizer;
mod parser;

pub use normalizer::normalize_label;
pub use parser::{parse_timestamp, OrderRow, ReceiptRow, RowError};

use crate::workflows::sla::{OrderRecord, SlaEvent};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read event snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid CSV event data: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid JSON event snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rows dropped while reading or normalising a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub malformed_orders: usize,
    pub malformed_receipts: usize,
}

/// Raw rows exactly as the analytics export delivered them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSnapshot {
    #[serde(default)]
    pub orders: Vec<OrderRow>,
    #[serde(default)]
    pub receipts: Vec<ReceiptRow>,
    #[serde(skip)]
    pub unreadable: IngestReport,
}

/// Snapshot with every timestamp parsed once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedSnapshot {
    pub orders: Vec<OrderRecord>,
    pub receipts: Vec<SlaEvent>,
    pub report: IngestReport,
}

impl EventSnapshot {
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, IngestError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_csv_readers<O: Read, C: Read>(orders: O, receipts: C) -> Result<Self, IngestError> {
        let (orders, malformed_orders) = parser::read_csv_rows(orders, "orders")?;
        let (receipts, malformed_receipts) = parser::read_csv_rows(receipts, "receipts")?;
        Ok(Self {
            orders,
            receipts,
            unreadable: IngestReport {
                malformed_orders,
                malformed_receipts,
            },
        })
    }

    pub fn from_csv_paths<P: AsRef<Path>, Q: AsRef<Path>>(
        orders: P,
        receipts: Q,
    ) -> Result<Self, IngestError> {
        let orders = std::fs::File::open(orders)?;
        let receipts = std::fs::File::open(receipts)?;
        Self::from_csv_readers(orders, receipts)
    }

    /// Parses every row into typed events. Rows that fail are logged and
    /// counted; they never fail the snapshot.
    pub fn normalize(&self) -> NormalizedSnapshot {
        let mut report = self.unreadable;

        let orders = self
            .orders
            .iter()
            .filter_map(|row| match row.to_record() {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(stream = "orders", error = %err, "dropping malformed row");
                    report.malformed_orders += 1;
                    None
                }
            })
            .collect();

        let receipts = self
            .receipts
            .iter()
            .filter_map(|row| match row.to_event() {
                Ok(event) => Some(event),
                Err(err) => {
                    warn!(stream = "receipts", error = %err, "dropping malformed row");
                    report.malformed_receipts += 1;
                    None
                }
            })
            .collect();

        NormalizedSnapshot {
            orders,
            receipts,
            report,
        }
    }
}
