//! Rolling window counts ("clicks in the last 24 hours")

use chrono::{DateTime, TimeDelta, Utc};

/// Count events in the half-open window `(now - window, now]`
///
/// An event exactly `window` before `now` is outside; an event at `now`
/// is inside; events after `now` are ignored.
///
/// A window reaching back past the earliest representable instant has no
/// lower bound.
pub fn count_within(events: &[DateTime<Utc>], window: TimeDelta, now: DateTime<Utc>) -> usize {
    match now.checked_sub_signed(window) {
        Some(start) => events.iter().filter(|e| **e > start && **e <= now).count(),
        None => events.iter().filter(|e| **e <= now).count(),
    }
}

/// A window of `hours` hours, or `None` unless it is positive and fits a `TimeDelta`
pub fn window_from_hours(hours: i64) -> Option<TimeDelta> {
    if hours <= 0 {
        return None;
    }
    TimeDelta::try_hours(hours)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_last_day() {
        let t = now();
        let events = vec![t - TimeDelta::hours(23), t - TimeDelta::hours(25), t];
        assert_eq!(count_within(&events, TimeDelta::hours(24), t), 2);
    }

    #[test]
    fn test_lower_boundary_is_exclusive() {
        let t = now();
        let events = vec![t - TimeDelta::hours(24)];
        assert_eq!(count_within(&events, TimeDelta::hours(24), t), 0);

        let just_inside = vec![t - TimeDelta::hours(24) + TimeDelta::milliseconds(1)];
        assert_eq!(count_within(&just_inside, TimeDelta::hours(24), t), 1);
    }

    #[test]
    fn test_future_events_are_ignored() {
        let t = now();
        let events = vec![t + TimeDelta::seconds(1), t - TimeDelta::minutes(5)];
        assert_eq!(count_within(&events, TimeDelta::hours(24), t), 1);
    }

    #[test]
    fn test_matches_filter_definition() {
        let t = now();
        let window = TimeDelta::hours(6);
        let events: Vec<DateTime<Utc>> = (-20..4)
            .map(|h| t + TimeDelta::minutes(h * 30))
            .collect();
        let expected = events
            .iter()
            .filter(|e| t - window < **e && **e <= t)
            .count();
        assert_eq!(count_within(&events, window, t), expected);
        assert_eq!(count_within(&[], window, t), 0);
    }

    #[test]
    fn test_oversized_window_has_no_lower_bound() {
        let t = now();
        let events = vec![t, t - TimeDelta::days(365 * 100), t + TimeDelta::hours(1)];
        assert_eq!(count_within(&events, TimeDelta::hours(3_000_000_000), t), 2);
        assert_eq!(count_within(&events, TimeDelta::MAX, t), 2);
    }

    #[test]
    fn test_window_from_hours() {
        assert_eq!(window_from_hours(24), Some(TimeDelta::hours(24)));
        assert_eq!(window_from_hours(0), None);
        assert_eq!(window_from_hours(-3), None);
        assert_eq!(window_from_hours(i64::MAX), None);
        assert!(window_from_hours(3_000_000_000).is_some());
    }
}
