//! Analytics API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use super::handlers::{api_error, ApiResult, AppState};
use crate::analytics::{window_from_hours, Granularity, ViewSnapshot};

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    /// Trailing window for the recent-clicks figure; the configured one when absent
    pub window_hours: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct GranularityRequest {
    pub granularity: Granularity,
}

/// Open the analytics view on a link (fetches fresh data)
pub async fn mount_analytics(
    State(state): State<Arc<AppState>>,
    Path(short): Path<String>,
) -> Json<ViewSnapshot> {
    Json(state.view.mount(&short).await)
}

/// Current state of the analytics view
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<ViewSnapshot>> {
    let Some(hours) = query.window_hours else {
        return Ok(Json(state.view.snapshot()));
    };

    let window = window_from_hours(hours).ok_or_else(|| {
        api_error(
            StatusCode::BAD_REQUEST,
            format!("window_hours must be a positive number of hours in range, got {hours}"),
        )
    })?;
    Ok(Json(state.view.snapshot_with_window(window, Utc::now())))
}

/// Switch bucket width; rebuilds the series without a backend call
pub async fn set_granularity(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GranularityRequest>,
) -> Json<ViewSnapshot> {
    state.view.set_granularity(payload.granularity);
    Json(state.view.snapshot())
}

/// Reload a view that failed to load
pub async fn retry_analytics(State(state): State<Arc<AppState>>) -> Json<ViewSnapshot> {
    Json(state.view.retry().await)
}
