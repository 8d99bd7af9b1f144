//! Data models for analytics

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Largest magnitude accepted for epoch milliseconds (±100,000,000 days)
const MAX_EPOCH_MILLIS: f64 = 8.64e15;

/// Naive layouts accepted for timestamps that carry no UTC offset
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyticsError {
    /// A redirect timestamp could not be interpreted; the whole batch is rejected
    #[error("invalid timestamp at index {index}: {value}")]
    InvalidTimestamp { index: usize, value: String },
}

/// Redirect timestamp as received from the backend
///
/// The backend sends ISO-8601 strings; epoch milliseconds are accepted as
/// well. Strings without an offset are read in the viewer's time zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(f64),
    Text(String),
}

impl RawTimestamp {
    /// Resolve to an absolute instant, or `None` if malformed
    pub fn resolve<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Millis(ms) => {
                if !ms.is_finite() || ms.abs() > MAX_EPOCH_MILLIS {
                    return None;
                }
                DateTime::from_timestamp_millis(ms.trunc() as i64)
            }
            RawTimestamp::Text(text) => parse_text(text.trim(), tz),
        }
    }
}

impl fmt::Display for RawTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawTimestamp::Millis(ms) => write!(f, "{ms}"),
            RawTimestamp::Text(text) => write!(f, "{text:?}"),
        }
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        RawTimestamp::Text(value.to_rfc3339())
    }
}

fn parse_text<Tz: TimeZone>(text: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return local_to_utc(&naive, tz);
        }
    }

    // Date-only strings are UTC midnight
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn local_to_utc<Tz: TimeZone>(naive: &NaiveDateTime, tz: &Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(naive)
        .earliest()
        // Inside a DST gap: move forward past it
        .or_else(|| tz.from_local_datetime(&(*naive + TimeDelta::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

/// One bucket of a chart series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub count: u64,
}

/// How series points are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelOrder {
    /// By bucket start time
    #[default]
    Chronological,
    /// By label text; "10:15" sorts before "2:15"
    Lexicographic,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_resolve_rfc3339() {
        let raw = RawTimestamp::Text("2024-01-05T10:00:00+02:00".to_string());
        let dt = raw.resolve(&Utc).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-05T08:00:00+00:00");
    }

    #[test]
    fn test_resolve_naive_uses_viewer_zone() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        let raw = RawTimestamp::Text("2024-01-05T10:00:00.123456".to_string());
        let dt = raw.resolve(&tz).unwrap();
        assert_eq!(dt.format("%H:%M:%S").to_string(), "09:00:00");

        let spaced = RawTimestamp::Text("2024-01-05 10:00:00".to_string());
        assert_eq!(
            spaced.resolve(&tz).unwrap().to_rfc3339(),
            "2024-01-05T09:00:00+00:00"
        );
    }

    #[test]
    fn test_resolve_millis() {
        let raw = RawTimestamp::Millis(1_704_448_800_000.0);
        let dt = raw.resolve(&Utc).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-05T10:00:00+00:00");
    }

    #[test]
    fn test_resolve_rejects_garbage() {
        assert!(RawTimestamp::Text("yesterday".to_string()).resolve(&Utc).is_none());
        assert!(RawTimestamp::Text(String::new()).resolve(&Utc).is_none());
        assert!(RawTimestamp::Millis(f64::NAN).resolve(&Utc).is_none());
        assert!(RawTimestamp::Millis(f64::INFINITY).resolve(&Utc).is_none());
        assert!(RawTimestamp::Millis(1e300).resolve(&Utc).is_none());
    }

    #[test]
    fn test_deserialize_mixed_batch() {
        let raw: Vec<RawTimestamp> =
            serde_json::from_str(r#"["2024-01-05T10:00:00", 1704448800000]"#).unwrap();
        assert_eq!(raw[0], RawTimestamp::Text("2024-01-05T10:00:00".to_string()));
        assert_eq!(raw[1], RawTimestamp::Millis(1_704_448_800_000.0));
    }
}
