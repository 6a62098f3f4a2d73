mod file;
mod memory;

pub use file::JsonFileSiteStore;
pub use memory::InMemorySiteStore;

use crate::workflows::bonus::HeadcountLog;
use crate::workflows::sla::{ExclusionStream, Exclusions, MonthlyAdjustment, SlaAggregateRecord};
use chrono::NaiveDate;

/// Operator-owned state per site plus the last aggregate written for it.
///
/// Implementations are shared across request handlers, so every method takes
/// `&self`.
pub trait SiteStore: Send + Sync {
    fn exclusions(&self, site: &str) -> Result<Exclusions, StoreError>;
    /// `Ok(false)` when the identifier was already excluded.
    fn add_exclusion(
        &self,
        site: &str,
        stream: ExclusionStream,
        id: &str,
    ) -> Result<bool, StoreError>;
    /// `Ok(false)` when the identifier was not excluded.
    fn remove_exclusion(
        &self,
        site: &str,
        stream: ExclusionStream,
        id: &str,
    ) -> Result<bool, StoreError>;
    fn adjustments(&self, site: &str) -> Result<MonthlyAdjustment, StoreError>;
    fn set_adjustments(&self, site: &str, adjustment: MonthlyAdjustment) -> Result<(), StoreError>;
    fn headcount(&self, site: &str) -> Result<HeadcountLog, StoreError>;
    /// Returns the previous count for the day, if any.
    fn set_headcount(
        &self,
        site: &str,
        day: NaiveDate,
        operators: u32,
    ) -> Result<Option<u32>, StoreError>;
    fn save_aggregate(&self, record: &SlaAggregateRecord) -> Result<(), StoreError>;
    fn latest_aggregate(&self, site: &str) -> Result<Option<SlaAggregateRecord>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("site store unavailable: {0}")]
    Unavailable(String),
    #[error("site id '{0}' cannot be used as a storage key")]
    InvalidSite(String),
    #[error("failed to access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{path}' is not a valid {document} document: {source}")]
    Corrupt {
        path: String,
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
