//! Chart series aggregation
//!
//! Groups redirect timestamps into buckets and produces the ordered
//! label/count series the dashboard charts. Pure and synchronous: the
//! series is rebuilt from the full event list on every granularity change.

use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;

use crate::analytics::bucket::{bucket_key, Granularity};
use crate::analytics::models::{AnalyticsError, LabelOrder, RawTimestamp, SeriesPoint};

/// Resolve a raw batch of redirect timestamps
///
/// The first malformed entry rejects the whole batch; nothing is dropped
/// silently.
pub fn parse_events<Tz: TimeZone>(
    raw: &[RawTimestamp],
    tz: &Tz,
) -> Result<Vec<DateTime<Utc>>, AnalyticsError> {
    raw.iter()
        .enumerate()
        .map(|(index, value)| {
            value
                .resolve(tz)
                .ok_or_else(|| AnalyticsError::InvalidTimestamp {
                    index,
                    value: value.to_string(),
                })
        })
        .collect()
}

/// Aggregate events into a chronologically ordered series
pub fn aggregate<Tz: TimeZone>(
    events: &[DateTime<Utc>],
    granularity: Granularity,
    tz: &Tz,
) -> Vec<SeriesPoint> {
    aggregate_ordered(events, granularity, tz, LabelOrder::Chronological)
}

/// Aggregate events into a series ordered by `order`
pub fn aggregate_ordered<Tz: TimeZone>(
    events: &[DateTime<Utc>],
    granularity: Granularity,
    tz: &Tz,
    order: LabelOrder,
) -> Vec<SeriesPoint> {
    // label -> (ordinal, count)
    let mut grouped: HashMap<String, (i64, u64)> = HashMap::new();

    for event in events {
        let key = bucket_key(event, granularity, tz);
        grouped
            .entry(key.label)
            .and_modify(|(_, count)| *count += 1)
            .or_insert((key.ordinal, 1));
    }

    let mut buckets: Vec<(String, i64, u64)> = grouped
        .into_iter()
        .map(|(label, (ordinal, count))| (label, ordinal, count))
        .collect();

    match order {
        LabelOrder::Chronological => {
            buckets.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
        }
        LabelOrder::Lexicographic => buckets.sort_by(|a, b| a.0.cmp(&b.0)),
    }

    buckets
        .into_iter()
        .map(|(label, _, count)| SeriesPoint { label, count })
        .collect()
}
