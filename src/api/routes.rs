use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use super::analytics::{get_analytics, mount_analytics, retry_analytics, set_granularity};
use super::handlers::{
    create_link, current_user, health_check, hide_link, list_links, login, logout, register,
    session_status, AppState,
};
use crate::config::FrontendConfig;

pub fn create_dashboard_router(state: Arc<AppState>, frontend: &FrontendConfig) -> Router {
    let api_routes = Router::new()
        .route("/session", get(session_status))
        .route("/session/login", post(login))
        .route("/session/logout", post(logout))
        .route("/session/register", post(register))
        .route("/me", get(current_user))
        .route("/links", get(list_links).post(create_link))
        .route("/links/{short}", delete(hide_link))
        .route("/links/{short}/analytics", post(mount_analytics))
        .route("/analytics", get(get_analytics))
        .route("/analytics/granularity", put(set_granularity))
        .route("/analytics/retry", post(retry_analytics))
        .with_state(state);

    let router = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    match &frontend.static_dir {
        // Unknown paths fall back to index.html so client-side routes resolve
        Some(dir) => router.fallback_service(
            ServeDir::new(dir).not_found_service(ServeFile::new(format!("{dir}/index.html"))),
        ),
        None => router,
    }
}
