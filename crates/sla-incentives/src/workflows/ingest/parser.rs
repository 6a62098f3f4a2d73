use super::normalizer::non_empty;
use crate::workflows::sla::{OrderRecord, SlaEvent};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::io::Read;
use tracing::warn;

/// Layouts tried in order after RFC 3339. `%.f` also matches no fraction.
const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d-%m-%Y, %H:%M:%S%.f",
];

/// Parses the timestamp layouts the analytics export emits. Offsets are
/// dropped in favour of the local clock reading, which is what deadlines
/// are computed against. Blank input is `None`.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("row has no identifier")]
    MissingIdentifier,
    #[error("{identifier}: missing {field}")]
    MissingTimestamp {
        identifier: String,
        field: &'static str,
    },
    #[error("{identifier}: unreadable {field} '{value}'")]
    InvalidTimestamp {
        identifier: String,
        field: &'static str,
        value: String,
    },
}

fn required_timestamp(
    identifier: &str,
    field: &'static str,
    value: Option<&str>,
) -> Result<NaiveDateTime, RowError> {
    let value = value.ok_or_else(|| RowError::MissingTimestamp {
        identifier: identifier.to_string(),
        field,
    })?;
    optional_timestamp(identifier, field, Some(value))?.ok_or_else(|| {
        RowError::MissingTimestamp {
            identifier: identifier.to_string(),
            field,
        }
    })
}

fn optional_timestamp(
    identifier: &str,
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<NaiveDateTime>, RowError> {
    match value {
        None => Ok(None),
        Some(raw) => parse_timestamp(raw)
            .map(Some)
            .ok_or_else(|| RowError::InvalidTimestamp {
                identifier: identifier.to_string(),
                field,
                value: raw.to_string(),
            }),
    }
}

fn identifier_of(raw: &str) -> Result<String, RowError> {
    let identifier = raw.trim();
    if identifier.is_empty() {
        return Err(RowError::MissingIdentifier);
    }
    Ok(identifier.to_string())
}

/// Order row as exported. Column names of the analytics query are accepted
/// as aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRow {
    #[serde(alias = "order_number", default, deserialize_with = "string_or_number")]
    pub identifier: String,
    #[serde(
        alias = "pending_at",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub reference_at: Option<String>,
    #[serde(
        alias = "shipping_date",
        alias = "shipped_at",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub completed_at: Option<String>,
    #[serde(
        alias = "picking_complete",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub picked_at: Option<String>,
    #[serde(
        alias = "carrier_name",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub carrier: Option<String>,
    #[serde(
        alias = "Stores__name",
        alias = "store_name",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub store: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub status: Option<String>,
}

impl OrderRow {
    pub fn to_record(&self) -> Result<OrderRecord, RowError> {
        let identifier = identifier_of(&self.identifier)?;
        let reference_at =
            required_timestamp(&identifier, "pending_at", self.reference_at.as_deref())?;
        let completed_at =
            optional_timestamp(&identifier, "shipping_date", self.completed_at.as_deref())?;
        let picked_at =
            optional_timestamp(&identifier, "picking_complete", self.picked_at.as_deref())?;

        Ok(OrderRecord {
            event: SlaEvent {
                identifier,
                reference_at,
                completed_at,
                carrier: non_empty(self.carrier.clone()),
                store: non_empty(self.store.clone()).unwrap_or_default(),
            },
            status: non_empty(self.status.clone()).unwrap_or_default(),
            picked_at,
        })
    }
}

/// Inbound receipt row as exported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRow {
    #[serde(alias = "id", default, deserialize_with = "string_or_number")]
    pub identifier: String,
    #[serde(
        alias = "arrived_at",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub reference_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub completed_at: Option<String>,
    #[serde(
        alias = "Stores__name",
        alias = "store_name",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub store: Option<String>,
}

impl ReceiptRow {
    pub fn to_event(&self) -> Result<SlaEvent, RowError> {
        let identifier = identifier_of(&self.identifier)?;
        let reference_at =
            required_timestamp(&identifier, "arrived_at", self.reference_at.as_deref())?;
        let completed_at =
            optional_timestamp(&identifier, "completed_at", self.completed_at.as_deref())?;

        Ok(SlaEvent {
            identifier,
            reference_at,
            completed_at,
            carrier: None,
            store: non_empty(self.store.clone()).unwrap_or_default(),
        })
    }
}

/// Reads every row that deserializes; rows that do not are logged and
/// counted instead of failing the whole file.
///
/// Fields are handed over as text so identifiers such as `00123` keep their
/// leading zeros.
pub(crate) fn read_csv_rows<R, T>(reader: R, source: &str) -> Result<(Vec<T>, usize), csv::Error>
where
    R: Read,
    T: for<'de> Deserialize<'de>,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut rows = Vec::new();
    let mut unreadable = 0;
    for (index, record) in csv_reader.records().enumerate() {
        let row = record.map_err(|err| err.to_string()).and_then(|record| {
            let fields: Map<String, Value> = headers
                .iter()
                .zip(record.iter())
                .map(|(header, field)| (header.to_string(), Value::String(field.to_string())))
                .collect();
            serde_json::from_value::<T>(Value::Object(fields)).map_err(|err| err.to_string())
        });
        match row {
            Ok(row) => rows.push(row),
            Err(error) => {
                warn!(source, line = index + 2, %error, "skipping unreadable row");
                unreadable += 1;
            }
        }
    }

    Ok((rows, unreadable))
}

/// Identifiers arrive as text from CSV and often as integers from the
/// analytics API; both become the same string.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct IdentifierVisitor;

    impl<'de> Visitor<'de> for IdentifierVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or number identifier")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_string<E: de::Error>(self, value: String) -> Result<String, E> {
            Ok(value)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_unit<E: de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(IdentifierVisitor)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
