use chrono::{Local, NaiveDate, NaiveDateTime};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use sla_incentives::config::{AppConfig, EngineConfig};
use sla_incentives::error::AppError;
use sla_incentives::service::SlaService;
use sla_incentives::store::{InMemorySiteStore, JsonFileSiteStore, SiteStore};
use sla_incentives::workflows::bonus::parse_day_key;
use sla_incentives::workflows::ingest::parse_timestamp;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn build_store(config: &EngineConfig) -> Arc<dyn SiteStore> {
    match &config.data_dir {
        Some(dir) => {
            info!(data_dir = %dir.display(), "using file-backed site store");
            Arc::new(JsonFileSiteStore::new(dir.clone()))
        }
        None => {
            warn!("SLA_DATA_DIR not set; site state will not survive a restart");
            Arc::new(InMemorySiteStore::new())
        }
    }
}

pub(crate) fn build_service(config: &AppConfig) -> Result<SlaService, AppError> {
    let settings = config.engine.settings()?;
    Ok(SlaService::new(settings, build_store(&config.engine)))
}

/// Accepts any timestamp layout the event exports use; defaults to now.
pub(crate) fn resolve_as_of(raw: Option<&str>) -> Result<NaiveDateTime, AppError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => parse_timestamp(value)
            .ok_or_else(|| AppError::InvalidRequest(format!("unrecognised as_of '{value}'"))),
        None => Ok(Local::now().naive_local()),
    }
}

pub(crate) fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    parse_day_key(raw.trim())
        .map_err(|err| format!("failed to parse '{raw}' as DD-MM-YYYY ({err})"))
}

pub(crate) fn deserialize_day<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_day(&raw).map_err(serde::de::Error::custom)
}
