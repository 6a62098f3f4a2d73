use super::{SiteStore, StoreError};
use crate::workflows::bonus::HeadcountLog;
use crate::workflows::sla::{ExclusionStream, Exclusions, MonthlyAdjustment, SlaAggregateRecord};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const EXCLUSIONS: &str = "exclusions";
const ADJUSTMENTS: &str = "adjustments";
const HEADCOUNT: &str = "headcount";
const AGGREGATE: &str = "aggregate";

/// One JSON document per site and key: `<data_dir>/<site>/<key>.json`.
///
/// A missing document reads as empty. A document that exists but cannot be
/// read or parsed is an error, never silently replaced.
#[derive(Debug, Clone)]
pub struct JsonFileSiteStore {
    root: PathBuf,
    writes: Arc<Mutex<()>>,
}

impl JsonFileSiteStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, site: &str, document: &str) -> Result<PathBuf, StoreError> {
        let valid = !site.is_empty()
            && site
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidSite(site.to_string()));
        }
        Ok(self.root.join(site).join(format!("{document}.json")))
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.writes
            .lock()
            .map_err(|_| StoreError::Unavailable("file store mutex poisoned".to_string()))
    }

    fn read_document<T: DeserializeOwned>(
        &self,
        site: &str,
        document: &'static str,
    ) -> Result<Option<T>, StoreError> {
        let path = self.document_path(site, document)?;
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: path.display().to_string(),
                document,
                source,
            })
    }

    fn write_document<T: Serialize>(
        &self,
        site: &str,
        document: &'static str,
        value: &T,
    ) -> Result<(), StoreError> {
        let path = self.document_path(site, document)?;
        let io_error = |source| StoreError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let body = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Corrupt {
            path: path.display().to_string(),
            document,
            source,
        })?;

        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, body).map_err(io_error)?;
        if let Err(source) = std::fs::rename(&staging, &path) {
            let _ = std::fs::remove_file(&staging);
            return Err(io_error(source));
        }
        debug!(site, document, path = %path.display(), "site document written");
        Ok(())
    }

    /// Read-modify-write of one document under the store's write lock.
    fn update_document<T, R>(
        &self,
        site: &str,
        document: &'static str,
        update: impl FnOnce(&mut T) -> R,
    ) -> Result<R, StoreError>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let _guard = self.lock_writes()?;
        let mut value: T = self.read_document(site, document)?.unwrap_or_default();
        let result = update(&mut value);
        self.write_document(site, document, &value)?;
        Ok(result)
    }
}

impl SiteStore for JsonFileSiteStore {
    fn exclusions(&self, site: &str) -> Result<Exclusions, StoreError> {
        Ok(self.read_document(site, EXCLUSIONS)?.unwrap_or_default())
    }

    fn add_exclusion(
        &self,
        site: &str,
        stream: ExclusionStream,
        id: &str,
    ) -> Result<bool, StoreError> {
        self.update_document(site, EXCLUSIONS, |exclusions: &mut Exclusions| {
            exclusions.for_stream_mut(stream).insert(id)
        })
    }

    fn remove_exclusion(
        &self,
        site: &str,
        stream: ExclusionStream,
        id: &str,
    ) -> Result<bool, StoreError> {
        self.update_document(site, EXCLUSIONS, |exclusions: &mut Exclusions| {
            exclusions.for_stream_mut(stream).remove(id)
        })
    }

    fn adjustments(&self, site: &str) -> Result<MonthlyAdjustment, StoreError> {
        Ok(self.read_document(site, ADJUSTMENTS)?.unwrap_or_default())
    }

    fn set_adjustments(&self, site: &str, adjustment: MonthlyAdjustment) -> Result<(), StoreError> {
        let _guard = self.lock_writes()?;
        self.write_document(site, ADJUSTMENTS, &adjustment)
    }

    fn headcount(&self, site: &str) -> Result<HeadcountLog, StoreError> {
        Ok(self.read_document(site, HEADCOUNT)?.unwrap_or_default())
    }

    fn set_headcount(
        &self,
        site: &str,
        day: NaiveDate,
        operators: u32,
    ) -> Result<Option<u32>, StoreError> {
        self.update_document(site, HEADCOUNT, |log: &mut HeadcountLog| {
            log.set(day, operators)
        })
    }

    fn save_aggregate(&self, record: &SlaAggregateRecord) -> Result<(), StoreError> {
        let _guard = self.lock_writes()?;
        self.write_document(&record.site, AGGREGATE, record)
    }

    fn latest_aggregate(&self, site: &str) -> Result<Option<SlaAggregateRecord>, StoreError> {
        self.read_document(site, AGGREGATE)
    }
}
