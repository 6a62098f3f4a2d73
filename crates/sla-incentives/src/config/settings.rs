use super::ConfigError;
use crate::workflows::sla::{BusinessCalendar, CalendarError, SitePolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Brazilian national holidays, used when no settings file is supplied.
const BR_HOLIDAYS: [&str; 26] = [
    "2025-01-01",
    "2025-03-03",
    "2025-03-04",
    "2025-04-18",
    "2025-04-21",
    "2025-05-01",
    "2025-06-19",
    "2025-09-07",
    "2025-10-12",
    "2025-11-02",
    "2025-11-15",
    "2025-11-20",
    "2025-12-25",
    "2026-01-01",
    "2026-02-16",
    "2026-02-17",
    "2026-04-03",
    "2026-04-21",
    "2026-05-01",
    "2026-06-04",
    "2026-09-07",
    "2026-10-12",
    "2026-11-02",
    "2026-11-15",
    "2026-11-20",
    "2026-12-25",
];

/// Holiday tables and site policies the engine is parameterised with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Country code -> `YYYY-MM-DD` dates.
    #[serde(default)]
    pub holidays: BTreeMap<String, Vec<String>>,
    pub sites: Vec<SitePolicy>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let holidays = BTreeMap::from([(
            "BR".to_string(),
            BR_HOLIDAYS.iter().map(|date| date.to_string()).collect(),
        )]);

        Self {
            holidays,
            sites: SitePolicy::builtin(),
        }
    }
}

impl EngineSettings {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::SettingsIo {
            path: path.display().to_string(),
            source,
        })?;
        let settings: Self =
            serde_json::from_str(&raw).map_err(|source| ConfigError::InvalidSettings {
                path: path.display().to_string(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Uses the file when a path is given, otherwise the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for dates in self.holidays.values() {
            BusinessCalendar::from_iso_dates(dates).map_err(ConfigError::InvalidHoliday)?;
        }
        Ok(())
    }

    pub fn site(&self, id: &str) -> Option<&SitePolicy> {
        self.sites
            .iter()
            .find(|site| site.id.eq_ignore_ascii_case(id.trim()))
    }

    pub fn site_ids(&self) -> impl Iterator<Item = &str> {
        self.sites.iter().map(|site| site.id.as_str())
    }

    /// Calendar for a country; an unlisted country has weekends only.
    pub fn calendar_for(&self, country: &str) -> Result<BusinessCalendar, CalendarError> {
        match self.holidays.get(country) {
            Some(dates) => BusinessCalendar::from_iso_dates(dates),
            None => Ok(BusinessCalendar::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn defaults_cover_both_sites_and_national_holidays() {
        let settings = EngineSettings::default();
        assert_eq!(settings.site_ids().collect::<Vec<_>>(), vec!["embu", "extrema"]);
        assert!(settings.site("EMBU").is_some());
        assert!(settings.site("itapeva").is_none());

        let calendar = settings.calendar_for("BR").expect("valid holidays");
        let tiradentes = NaiveDate::from_ymd_opt(2025, 4, 21).expect("valid date");
        assert!(!calendar.is_business_day(tiradentes));
        assert!(settings
            .calendar_for("PT")
            .expect("empty calendar")
            .is_business_day(tiradentes));
    }

    #[test]
    fn settings_round_trip_through_json() {
        let settings = EngineSettings::default();
        let json = serde_json::to_string(&settings).expect("serializes");
        let back: EngineSettings = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(back, settings);
    }

    #[test]
    fn settings_file_with_bad_holiday_is_rejected() {
        let dir = std::env::temp_dir().join(format!("sla-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("settings.json");
        std::fs::write(&path, r#"{"holidays": {"BR": ["2025-02-30"]}, "sites": []}"#)
            .expect("write settings");

        let err = EngineSettings::from_path(&path).expect_err("invalid holiday");
        assert!(matches!(err, ConfigError::InvalidHoliday(_)));

        let missing = EngineSettings::from_path(dir.join("missing.json")).expect_err("missing");
        assert!(matches!(missing, ConfigError::SettingsIo { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
