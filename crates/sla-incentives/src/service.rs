use crate::config::EngineSettings;
use crate::error::AppError;
use crate::store::SiteStore;
use crate::workflows::bonus::HeadcountLog;
use crate::workflows::ingest::EventSnapshot;
use crate::workflows::sla::{
    ExclusionStream, Exclusions, MonthlyAdjustment, RunInputs, SitePolicy, SlaAggregateRecord,
    SlaEngine, SlaRun,
};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tracing::{info, warn};

/// Binds engine settings to a site store. Shared by the CLI and the HTTP
/// handlers so both paths read and write site state the same way.
#[derive(Clone)]
pub struct SlaService {
    settings: Arc<EngineSettings>,
    store: Arc<dyn SiteStore>,
}

impl SlaService {
    pub fn new(settings: EngineSettings, store: Arc<dyn SiteStore>) -> Self {
        Self {
            settings: Arc::new(settings),
            store,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn site(&self, site: &str) -> Result<&SitePolicy, AppError> {
        self.settings
            .site(site)
            .ok_or_else(|| AppError::UnknownSite(site.to_string()))
    }

    /// Reads operator state once, scores the snapshot, and writes the
    /// aggregate. A store failure aborts before anything is written.
    pub fn run(
        &self,
        site: &str,
        snapshot: &EventSnapshot,
        as_of: NaiveDateTime,
    ) -> Result<SlaRun, AppError> {
        let policy = self.site(site)?;
        let calendar = self.settings.calendar_for(&policy.country)?;
        if !calendar.covers_year(as_of.year()) {
            warn!(
                site = %policy.id,
                country = %policy.country,
                year = as_of.year(),
                "run year has no configured holidays; extend them via SLA_SETTINGS_PATH"
            );
        }
        let exclusions = self.store.exclusions(&policy.id)?;
        let adjustment = self.store.adjustments(&policy.id)?;
        let headcount = self.store.headcount(&policy.id)?;

        let normalized = snapshot.normalize();
        let run = SlaEngine::new(&calendar, policy).run(
            &normalized,
            RunInputs {
                exclusions: &exclusions,
                adjustment,
                headcount: &headcount,
            },
            as_of,
        );

        self.store.save_aggregate(&run.aggregate_record())?;
        Ok(run)
    }

    pub fn latest_aggregate(&self, site: &str) -> Result<SlaAggregateRecord, AppError> {
        let policy = self.site(site)?;
        self.store
            .latest_aggregate(&policy.id)?
            .ok_or_else(|| AppError::NotFound(format!("no aggregate recorded for '{}'", policy.id)))
    }

    pub fn exclusions(&self, site: &str) -> Result<Exclusions, AppError> {
        let policy = self.site(site)?;
        Ok(self.store.exclusions(&policy.id)?)
    }

    pub fn add_exclusion(
        &self,
        site: &str,
        stream: ExclusionStream,
        id: &str,
    ) -> Result<bool, AppError> {
        let policy = self.site(site)?;
        require_identifier(id)?;
        let added = self.store.add_exclusion(&policy.id, stream, id)?;
        info!(site = %policy.id, stream = stream.label(), id, added, "exclusion added");
        Ok(added)
    }

    pub fn remove_exclusion(
        &self,
        site: &str,
        stream: ExclusionStream,
        id: &str,
    ) -> Result<bool, AppError> {
        let policy = self.site(site)?;
        require_identifier(id)?;
        let removed = self.store.remove_exclusion(&policy.id, stream, id)?;
        info!(site = %policy.id, stream = stream.label(), id, removed, "exclusion removed");
        Ok(removed)
    }

    pub fn set_adjustments(
        &self,
        site: &str,
        adjustment: MonthlyAdjustment,
    ) -> Result<MonthlyAdjustment, AppError> {
        let policy = self.site(site)?;
        self.store.set_adjustments(&policy.id, adjustment)?;
        info!(
            site = %policy.id,
            receiving = adjustment.receiving,
            picking = adjustment.picking,
            shipping = adjustment.shipping,
            "monthly adjustment set"
        );
        Ok(adjustment)
    }

    pub fn set_headcount(
        &self,
        site: &str,
        day: NaiveDate,
        operators: u32,
    ) -> Result<(Option<u32>, HeadcountLog), AppError> {
        let policy = self.site(site)?;
        let previous = self.store.set_headcount(&policy.id, day, operators)?;
        Ok((previous, self.store.headcount(&policy.id)?))
    }
}

fn require_identifier(id: &str) -> Result<(), AppError> {
    if id.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "exclusion identifier must not be blank".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySiteStore;
    use std::io::Cursor;

    fn service() -> SlaService {
        let store = Arc::new(InMemorySiteStore::new());
        SlaService::new(EngineSettings::default(), store)
    }

    fn snapshot() -> EventSnapshot {
        EventSnapshot::from_json_reader(Cursor::new(
            r#"{
                "orders": [
                    {"order_number": "1001", "pending_at": "2025-05-05T09:00:00",
                     "shipping_date": "2025-05-05T14:00:00",
                     "picking_complete": "2025-05-05T11:00:00",
                     "carrier_name": "LOGGI", "Stores__name": "Acme", "status": "complete"},
                    {"order_number": "1002", "pending_at": "2025-05-05T09:30:00",
                     "shipping_date": "2025-05-05T15:00:00",
                     "picking_complete": "2025-05-05T12:00:00",
                     "carrier_name": "LOGGI", "Stores__name": "Acme", "status": "complete"}
                ],
                "receipts": []
            }"#,
        ))
        .expect("valid snapshot")
    }

    fn as_of() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 6)
            .and_then(|d| d.and_hms_opt(18, 0, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn unknown_sites_are_rejected_before_touching_the_store() {
        let err = service()
            .run("itapeva", &snapshot(), as_of())
            .expect_err("unknown site");
        assert!(matches!(err, AppError::UnknownSite(ref site) if site == "itapeva"));
    }

    #[test]
    fn run_applies_stored_exclusions_and_saves_the_aggregate() {
        let service = service();
        assert!(service
            .add_exclusion("embu", ExclusionStream::Orders, "1002")
            .expect("add"));

        let run = service.run("embu", &snapshot(), as_of()).expect("run");
        assert_eq!(run.data_quality.orders.excluded, 1);
        assert_eq!(run.data_quality.orders.scored, 1);

        let stored = service.latest_aggregate("embu").expect("aggregate saved");
        assert_eq!(stored, run.aggregate_record());
    }

    #[test]
    fn latest_aggregate_is_not_found_before_any_run() {
        let err = service().latest_aggregate("extrema").expect_err("nothing yet");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn blank_exclusion_identifiers_are_invalid() {
        let err = service()
            .add_exclusion("embu", ExclusionStream::Receipts, "  ")
            .expect_err("blank id");
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[test]
    fn headcount_updates_return_the_previous_value() {
        let service = service();
        let day = NaiveDate::from_ymd_opt(2025, 5, 5).expect("valid date");
        let (previous, _) = service.set_headcount("embu", day, 10).expect("set");
        assert_eq!(previous, None);
        let (previous, log) = service.set_headcount("embu", day, 12).expect("set");
        assert_eq!(previous, Some(10));
        assert_eq!(log.operators_on(day), Some(12));
    }
}
