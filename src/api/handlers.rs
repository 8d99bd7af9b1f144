use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::analytics::{AnalyticsView, ViewSettings};
use crate::dashboard::{
    validate_login, validate_registration, validate_target_url, LinkList, ValidationError,
};
use crate::gateway::{GatewayError, LinkGateway};
use crate::models::{CreateLinkRequest, Link, User};
use crate::session::{Credential, SessionContext, SessionError};

pub struct AppState {
    pub gateway: Arc<dyn LinkGateway>,
    pub session: Arc<SessionContext>,
    pub links: RwLock<LinkList>,
    pub view: AnalyticsView<Local>,
    pub short_link_base_url: String,
}

impl AppState {
    pub fn new(
        gateway: Arc<dyn LinkGateway>,
        session: Arc<SessionContext>,
        settings: ViewSettings,
        short_link_base_url: impl Into<String>,
    ) -> Self {
        let view = AnalyticsView::new(Arc::clone(&gateway), Arc::clone(&session), Local, settings);
        Self {
            gateway,
            session,
            links: RwLock::new(LinkList::new()),
            view,
            short_link_base_url: short_link_base_url.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub authenticated: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// A link as the dashboard list shows it
#[derive(Debug, Serialize, Deserialize)]
pub struct LinkEntry {
    pub short: String,
    pub url: String,
    pub short_url: String,
    pub created_on: Option<String>,
}

impl LinkEntry {
    fn from_link(link: &Link, base_url: &str) -> Self {
        Self {
            short: link.short.clone(),
            url: link.url.clone(),
            short_url: link.short_url(base_url),
            created_on: link.created_on(&Local),
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<T, ApiError>;

pub(super) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn gateway_error(e: GatewayError) -> ApiError {
    let status = match e {
        GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
        GatewayError::NotFound => StatusCode::NOT_FOUND,
        GatewayError::Conflict => StatusCode::CONFLICT,
        GatewayError::Rejected(_) => StatusCode::BAD_REQUEST,
        GatewayError::NetworkFailure(_) => StatusCode::BAD_GATEWAY,
    };
    api_error(status, e.to_string())
}

fn validation_error(e: ValidationError) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, e.to_string())
}

fn session_error(e: SessionError) -> ApiError {
    error!("Session storage failed: {}", e);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update session")
}

async fn require_credential(state: &AppState) -> ApiResult<Credential> {
    state
        .session
        .credential()
        .await
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Not signed in"))
}

/// Sign in and remember the credential
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    validate_login(&payload.username, &payload.password).map_err(validation_error)?;

    let credential = state
        .gateway
        .login(payload.username.trim(), &payload.password)
        .await
        .map_err(|e| match e {
            GatewayError::Unauthorized => {
                api_error(StatusCode::UNAUTHORIZED, "Invalid credentials")
            }
            other => gateway_error(other),
        })?;

    state.links.write().await.clear();
    state.view.reset();
    state.session.login(credential).await.map_err(session_error)?;
    info!("User '{}' signed in", payload.username.trim());

    Ok(Json(SessionResponse {
        authenticated: true,
    }))
}

/// Sign out and forget the credential, the locally held links and the analytics view
pub async fn logout(State(state): State<Arc<AppState>>) -> ApiResult<Json<SessionResponse>> {
    state.session.logout().await.map_err(session_error)?;
    state.links.write().await.clear();
    state.view.reset();
    Ok(Json(SessionResponse {
        authenticated: false,
    }))
}

pub async fn session_status(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: state.session.is_authenticated().await,
    })
}

/// Create an account on the backend
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterForm>,
) -> ApiResult<(StatusCode, Json<SuccessResponse>)> {
    let request = validate_registration(
        &payload.username,
        &payload.password,
        payload.full_name.as_deref(),
    )
    .map_err(validation_error)?;

    state
        .gateway
        .register(&request)
        .await
        .map_err(|e| match e {
            GatewayError::Conflict => api_error(StatusCode::CONFLICT, "Username already taken."),
            other => gateway_error(other),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse {
            message: "Registration successful".to_string(),
        }),
    ))
}

pub async fn current_user(State(state): State<Arc<AppState>>) -> ApiResult<Json<User>> {
    let credential = require_credential(&state).await?;
    let user = state
        .gateway
        .fetch_user(&credential)
        .await
        .map_err(gateway_error)?;
    Ok(Json(user))
}

/// Refresh the link list from the backend and return the visible links
pub async fn list_links(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<LinkEntry>>> {
    let credential = require_credential(&state).await?;
    let fetched = state
        .gateway
        .fetch_links(&credential)
        .await
        .map_err(gateway_error)?;

    let mut links = state.links.write().await;
    links.replace(fetched);
    let entries = links
        .visible()
        .map(|link| LinkEntry::from_link(link, &state.short_link_base_url))
        .collect();
    Ok(Json(entries))
}

/// Shorten a URL and put the new link at the top of the list
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateLinkRequest>,
) -> ApiResult<(StatusCode, Json<LinkEntry>)> {
    let url = validate_target_url(&payload.url).map_err(validation_error)?;
    let credential = require_credential(&state).await?;

    let link = state
        .gateway
        .create_link(&credential, &url)
        .await
        .map_err(gateway_error)?;
    info!("Created short link '{}' for {}", link.short, link.url);

    let entry = LinkEntry::from_link(&link, &state.short_link_base_url);
    state.links.write().await.prepend(link);
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Hide a link from this dashboard; the backend keeps it
pub async fn hide_link(
    State(state): State<Arc<AppState>>,
    Path(short): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    if state.links.write().await.hide_locally(&short) {
        Ok(Json(SuccessResponse {
            message: format!(
                "Link '{short}' hidden from this dashboard; it still exists on the backend"
            ),
        }))
    } else {
        Err(api_error(StatusCode::NOT_FOUND, "Link not found"))
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
