use super::{SiteStore, StoreError};
use crate::workflows::bonus::HeadcountLog;
use crate::workflows::sla::{ExclusionStream, Exclusions, MonthlyAdjustment, SlaAggregateRecord};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
struct SiteState {
    exclusions: Exclusions,
    adjustment: MonthlyAdjustment,
    headcount: HeadcountLog,
    aggregate: Option<SlaAggregateRecord>,
}

/// Process-local store. Used when no data directory is configured and in
/// tests.
#[derive(Debug, Clone, Default)]
pub struct InMemorySiteStore {
    sites: Arc<Mutex<HashMap<String, SiteState>>>,
}

impl InMemorySiteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, SiteState>>, StoreError> {
        self.sites
            .lock()
            .map_err(|_| StoreError::Unavailable("site store mutex poisoned".to_string()))
    }

    fn read<T>(&self, site: &str, read: impl FnOnce(&SiteState) -> T) -> Result<T, StoreError> {
        let guard = self.lock()?;
        Ok(match guard.get(site) {
            Some(state) => read(state),
            None => read(&SiteState::default()),
        })
    }

    fn write<T>(
        &self,
        site: &str,
        write: impl FnOnce(&mut SiteState) -> T,
    ) -> Result<T, StoreError> {
        let mut guard = self.lock()?;
        Ok(write(guard.entry(site.to_string()).or_default()))
    }
}

impl SiteStore for InMemorySiteStore {
    fn exclusions(&self, site: &str) -> Result<Exclusions, StoreError> {
        self.read(site, |state| state.exclusions.clone())
    }

    fn add_exclusion(
        &self,
        site: &str,
        stream: ExclusionStream,
        id: &str,
    ) -> Result<bool, StoreError> {
        self.write(site, |state| state.exclusions.for_stream_mut(stream).insert(id))
    }

    fn remove_exclusion(
        &self,
        site: &str,
        stream: ExclusionStream,
        id: &str,
    ) -> Result<bool, StoreError> {
        self.write(site, |state| state.exclusions.for_stream_mut(stream).remove(id))
    }

    fn adjustments(&self, site: &str) -> Result<MonthlyAdjustment, StoreError> {
        self.read(site, |state| state.adjustment)
    }

    fn set_adjustments(&self, site: &str, adjustment: MonthlyAdjustment) -> Result<(), StoreError> {
        self.write(site, |state| state.adjustment = adjustment)
    }

    fn headcount(&self, site: &str) -> Result<HeadcountLog, StoreError> {
        self.read(site, |state| state.headcount.clone())
    }

    fn set_headcount(
        &self,
        site: &str,
        day: NaiveDate,
        operators: u32,
    ) -> Result<Option<u32>, StoreError> {
        self.write(site, |state| state.headcount.set(day, operators))
    }

    fn save_aggregate(&self, record: &SlaAggregateRecord) -> Result<(), StoreError> {
        self.write(&record.site, |state| state.aggregate = Some(record.clone()))
    }

    fn latest_aggregate(&self, site: &str) -> Result<Option<SlaAggregateRecord>, StoreError> {
        self.read(site, |state| state.aggregate.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusions_are_scoped_per_site_and_stream() {
        let store = InMemorySiteStore::new();
        assert!(store
            .add_exclusion("embu", ExclusionStream::Orders, "1001")
            .expect("add"));
        assert!(!store
            .add_exclusion("embu", ExclusionStream::Orders, "1001")
            .expect("re-add"));

        let embu = store.exclusions("embu").expect("read");
        assert!(embu.orders.contains("1001"));
        assert!(embu.receipts.is_empty());
        assert!(store.exclusions("extrema").expect("read").orders.is_empty());

        assert!(!store
            .remove_exclusion("embu", ExclusionStream::Receipts, "1001")
            .expect("remove"));
    }

    #[test]
    fn adjustments_and_headcount_default_until_written() {
        let store = InMemorySiteStore::new();
        assert_eq!(store.adjustments("embu").expect("read"), MonthlyAdjustment::default());

        let day = NaiveDate::from_ymd_opt(2025, 5, 5).expect("valid date");
        assert_eq!(store.set_headcount("embu", day, 12).expect("set"), None);
        assert_eq!(store.set_headcount("embu", day, 14).expect("set"), Some(12));
        assert_eq!(store.headcount("embu").expect("read").operators_on(day), Some(14));
        assert!(store.latest_aggregate("embu").expect("read").is_none());
    }
}
