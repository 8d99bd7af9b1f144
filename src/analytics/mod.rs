//! Click analytics
//!
//! Turns the raw redirect timestamps of a link into chart-ready series
//! and rolling counts. Everything except `view` is pure and synchronous.

pub mod bucket;
pub mod models;
pub mod series;
pub mod view;
pub mod window;

pub use bucket::{bucket_key, BucketKey, Granularity, UnknownGranularity};
pub use models::{AnalyticsError, LabelOrder, RawTimestamp, SeriesPoint};
pub use series::{aggregate, aggregate_ordered, parse_events};
pub use view::{AnalyticsView, LoadedAnalytics, ViewError, ViewSettings, ViewSnapshot, ViewState};
pub use window::{count_within, window_from_hours};
