//! Per-link analytics view
//!
//! A small state machine over one link's click data:
//!
//! - `mount` enters `Loading` and fetches redirect events and link
//!   metadata concurrently; both must finish before the view becomes
//!   `Loaded`, any failure makes it `Error`.
//! - `set_granularity` rebuilds the series from the full event list
//!   without touching the network.
//! - `Error` is left only through `retry` or another `mount`.
//!
//! Every mount takes a fresh generation number. A response is applied
//! only while the view is still loading that generation, so a slow fetch
//! for a link the user already navigated away from is dropped.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analytics::bucket::Granularity;
use crate::analytics::models::{AnalyticsError, LabelOrder, SeriesPoint};
use crate::analytics::series::{aggregate_ordered, parse_events};
use crate::analytics::window::count_within;
use crate::gateway::{GatewayError, LinkGateway};
use crate::models::Link;
use crate::session::SessionContext;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("failed to retrieve analytics: {0}")]
    Retrieval(#[from] GatewayError),
    #[error(transparent)]
    InvalidTimestamp(#[from] AnalyticsError),
}

#[derive(Debug, Clone, Copy)]
pub struct ViewSettings {
    /// Granularity selected on every mount
    pub default_granularity: Granularity,
    pub label_order: LabelOrder,
    /// Trailing window for the "recent clicks" figure
    pub rolling_window: TimeDelta,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            default_granularity: Granularity::Hour,
            label_order: LabelOrder::Chronological,
            rolling_window: TimeDelta::hours(24),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedAnalytics {
    pub link: Link,
    pub events: Arc<[DateTime<Utc>]>,
    pub series: Vec<SeriesPoint>,
}

#[derive(Debug, Clone)]
pub enum ViewState {
    Unmounted,
    Loading { short_code: String, generation: u64 },
    Loaded(LoadedAnalytics),
    Error { short_code: String, reason: ViewError },
}

/// Serializable picture of the view for the presentation shell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ViewSnapshot {
    Unmounted,
    Loading {
        short_code: String,
        granularity: Granularity,
    },
    Loaded {
        short_code: String,
        link: Link,
        granularity: Granularity,
        series: Vec<SeriesPoint>,
        total_clicks: usize,
        recent_clicks: usize,
        window_hours: i64,
    },
    Error {
        short_code: String,
        granularity: Granularity,
        error: String,
    },
}

struct ViewInner {
    state: ViewState,
    granularity: Granularity,
}

pub struct AnalyticsView<Tz: TimeZone> {
    gateway: Arc<dyn LinkGateway>,
    session: Arc<SessionContext>,
    tz: Tz,
    settings: ViewSettings,
    generation: AtomicU64,
    inner: RwLock<ViewInner>,
}

impl<Tz> AnalyticsView<Tz>
where
    Tz: TimeZone + Send + Sync,
{
    pub fn new(
        gateway: Arc<dyn LinkGateway>,
        session: Arc<SessionContext>,
        tz: Tz,
        settings: ViewSettings,
    ) -> Self {
        Self {
            gateway,
            session,
            tz,
            settings,
            generation: AtomicU64::new(0),
            inner: RwLock::new(ViewInner {
                state: ViewState::Unmounted,
                granularity: settings.default_granularity,
            }),
        }
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    fn read(&self) -> RwLockReadGuard<'_, ViewInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ViewInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Show analytics for `short_code`, fetching fresh data
    pub async fn mount(&self, short_code: &str) -> ViewSnapshot {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut inner = self.write();
            inner.granularity = self.settings.default_granularity;
            inner.state = ViewState::Loading {
                short_code: short_code.to_string(),
                generation,
            };
        }
        debug!(short_code, generation, "Loading analytics");

        let outcome = self.retrieve(short_code).await;

        let mut inner = self.write();
        let current = matches!(
            inner.state,
            ViewState::Loading { generation: g, .. } if g == generation
        );
        if !current {
            debug!(short_code, generation, "Discarding stale analytics response");
            return self.snapshot_of(&inner, self.settings.rolling_window, Utc::now());
        }

        inner.state = match outcome {
            Ok((link, events)) => {
                info!(short_code, clicks = events.len(), "Analytics loaded");
                let series = aggregate_ordered(
                    &events,
                    inner.granularity,
                    &self.tz,
                    self.settings.label_order,
                );
                ViewState::Loaded(LoadedAnalytics {
                    link,
                    events: events.into(),
                    series,
                })
            }
            Err(reason) => {
                warn!(short_code, "Analytics failed to load: {}", reason);
                ViewState::Error {
                    short_code: short_code.to_string(),
                    reason,
                }
            }
        };

        self.snapshot_of(&inner, self.settings.rolling_window, Utc::now())
    }

    /// Return to `Unmounted`, dropping loaded data and any in-flight mount
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.write();
        inner.state = ViewState::Unmounted;
        inner.granularity = self.settings.default_granularity;
        debug!("Analytics view reset");
    }

    /// Mount the failed link again; other states are returned unchanged
    pub async fn retry(&self) -> ViewSnapshot {
        let failed = match &self.read().state {
            ViewState::Error { short_code, .. } => Some(short_code.clone()),
            _ => None,
        };

        match failed {
            Some(short_code) => self.mount(&short_code).await,
            None => self.snapshot(),
        }
    }

    async fn retrieve(&self, short_code: &str) -> Result<(Link, Vec<DateTime<Utc>>), ViewError> {
        let credential = self
            .session
            .credential()
            .await
            .ok_or(GatewayError::Unauthorized)?;

        let (raw, link) = tokio::try_join!(
            self.gateway.fetch_redirect_events(short_code, &credential),
            self.gateway.fetch_link_metadata(short_code, &credential),
        )?;

        let events = parse_events(&raw, &self.tz)?;
        Ok((link, events))
    }

    /// Select a granularity; a loaded view rebuilds its series at once
    pub fn set_granularity(&self, granularity: Granularity) {
        let mut inner = self.write();
        inner.granularity = granularity;

        if let ViewState::Loaded(loaded) = &mut inner.state {
            loaded.series = aggregate_ordered(
                &loaded.events,
                granularity,
                &self.tz,
                self.settings.label_order,
            );
            debug!(
                short_code = %loaded.link.short,
                %granularity,
                buckets = loaded.series.len(),
                "Series rebuilt"
            );
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.read().granularity
    }

    pub fn state(&self) -> ViewState {
        self.read().state.clone()
    }

    pub fn series(&self) -> Option<Vec<SeriesPoint>> {
        match &self.read().state {
            ViewState::Loaded(loaded) => Some(loaded.series.clone()),
            _ => None,
        }
    }

    pub fn total_clicks(&self) -> Option<usize> {
        match &self.read().state {
            ViewState::Loaded(loaded) => Some(loaded.events.len()),
            _ => None,
        }
    }

    pub fn rolling_count(&self, window: TimeDelta) -> Option<usize> {
        self.rolling_count_at(window, Utc::now())
    }

    pub fn rolling_count_at(&self, window: TimeDelta, now: DateTime<Utc>) -> Option<usize> {
        match &self.read().state {
            ViewState::Loaded(loaded) => Some(count_within(&loaded.events, window, now)),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> ViewSnapshot {
        self.snapshot_of(&self.read(), self.settings.rolling_window, now)
    }

    /// Snapshot whose recent-clicks figure covers `window` instead of the configured one
    pub fn snapshot_with_window(&self, window: TimeDelta, now: DateTime<Utc>) -> ViewSnapshot {
        self.snapshot_of(&self.read(), window, now)
    }

    fn snapshot_of(&self, inner: &ViewInner, window: TimeDelta, now: DateTime<Utc>) -> ViewSnapshot {
        let granularity = inner.granularity;
        match &inner.state {
            ViewState::Unmounted => ViewSnapshot::Unmounted,
            ViewState::Loading { short_code, .. } => ViewSnapshot::Loading {
                short_code: short_code.clone(),
                granularity,
            },
            ViewState::Loaded(loaded) => ViewSnapshot::Loaded {
                short_code: loaded.link.short.clone(),
                link: loaded.link.clone(),
                granularity,
                series: loaded.series.clone(),
                total_clicks: loaded.events.len(),
                recent_clicks: count_within(&loaded.events, window, now),
                window_hours: window.num_hours(),
            },
            ViewState::Error { short_code, reason } => ViewSnapshot::Error {
                short_code: short_code.clone(),
                granularity,
                error: reason.to_string(),
            },
        }
    }
}
