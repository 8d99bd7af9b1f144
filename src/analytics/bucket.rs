//! Time bucketing for redirect events
//!
//! Converts an instant into the label of the bucket it falls into at a
//! given granularity, in the viewer's time zone.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Width of the buckets used to group redirect events for charting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Minute,
    #[default]
    Hour,
    Day,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Minute => "minute",
            Granularity::Hour => "hour",
            Granularity::Day => "day",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown granularity '{0}', expected one of: minute, hour, day")]
pub struct UnknownGranularity(pub String);

impl FromStr for Granularity {
    type Err = UnknownGranularity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minute" => Ok(Granularity::Minute),
            "hour" => Ok(Granularity::Hour),
            "day" => Ok(Granularity::Day),
            _ => Err(UnknownGranularity(s.to_string())),
        }
    }
}

/// Identifies the bucket a timestamp falls into
///
/// `label` is what the chart shows. `ordinal` increases with time for
/// buckets of the same granularity, so sorting by it is a temporal sort
/// even where the unpadded label text would not be.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub label: String,
    pub ordinal: i64,
}

/// Compute the bucket key of `timestamp` at `granularity`, in `tz`
///
/// Minute buckets carry the time of day only: the same clock minute on
/// two different days lands in the same bucket.
pub fn bucket_key<Tz: TimeZone>(
    timestamp: &DateTime<Utc>,
    granularity: Granularity,
    tz: &Tz,
) -> BucketKey {
    let local = timestamp.with_timezone(tz);
    let day = i64::from(local.date_naive().num_days_from_ce());
    let hour = i64::from(local.hour());
    let minute = i64::from(local.minute());

    match granularity {
        Granularity::Day => BucketKey {
            label: format!("{}-{}-{}", local.year(), local.month(), local.day()),
            ordinal: day,
        },
        Granularity::Hour => BucketKey {
            label: format!(
                "{}-{}-{} {}:00",
                local.year(),
                local.month(),
                local.day(),
                hour
            ),
            ordinal: day * 24 + hour,
        },
        Granularity::Minute => BucketKey {
            label: format!("{}:{:02}", hour, minute),
            ordinal: hour * 60 + minute,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_day_label_is_unpadded() {
        let key = bucket_key(&utc("2024-01-05T10:00:00Z"), Granularity::Day, &Utc);
        assert_eq!(key.label, "2024-1-5");
    }

    #[test]
    fn test_hour_truncates() {
        let a = bucket_key(&utc("2024-01-05T09:15:00Z"), Granularity::Hour, &Utc);
        let b = bucket_key(&utc("2024-01-05T09:59:59Z"), Granularity::Hour, &Utc);
        let c = bucket_key(&utc("2024-01-05T10:00:00Z"), Granularity::Hour, &Utc);
        assert_eq!(a.label, "2024-1-5 9:00");
        assert_eq!(a, b);
        assert_eq!(c.label, "2024-1-5 10:00");
        assert!(c.ordinal > a.ordinal);
    }

    #[test]
    fn test_minute_discards_date() {
        let a = bucket_key(&utc("2024-01-05T14:07:10Z"), Granularity::Minute, &Utc);
        let b = bucket_key(&utc("2024-01-06T14:07:55Z"), Granularity::Minute, &Utc);
        assert_eq!(a.label, "14:07");
        assert_eq!(a, b);

        let early = bucket_key(&utc("2024-01-05T02:05:00Z"), Granularity::Minute, &Utc);
        assert_eq!(early.label, "2:05");
    }

    #[test]
    fn test_uses_viewer_time_zone() {
        // 23:30 UTC is already the next day at UTC+2
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let ts = utc("2024-01-05T23:30:00Z");
        assert_eq!(bucket_key(&ts, Granularity::Day, &tz).label, "2024-1-6");
        assert_eq!(bucket_key(&ts, Granularity::Hour, &tz).label, "2024-1-6 1:00");
        assert_eq!(bucket_key(&ts, Granularity::Minute, &tz).label, "1:30");
    }

    #[test]
    fn test_day_ordinal_is_chronological_across_month_end() {
        let jan31 = bucket_key(&utc("2024-01-31T12:00:00Z"), Granularity::Day, &Utc);
        let feb1 = bucket_key(&utc("2024-02-01T00:00:00Z"), Granularity::Day, &Utc);
        assert_eq!(feb1.ordinal - jan31.ordinal, 1);
    }

    #[test]
    fn test_granularity_parse() {
        assert_eq!("Minute".parse::<Granularity>(), Ok(Granularity::Minute));
        assert_eq!(" day ".parse::<Granularity>(), Ok(Granularity::Day));
        assert!("week".parse::<Granularity>().is_err());
        assert_eq!(Granularity::default(), Granularity::Hour);
    }
}
