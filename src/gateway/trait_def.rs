use async_trait::async_trait;
use thiserror::Error;

use crate::analytics::RawTimestamp;
use crate::models::{Link, RegisterRequest, User};
use crate::session::Credential;

/// Why a call to the backend failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("not signed in or session expired")]
    Unauthorized,
    #[error("link not found")]
    NotFound,
    #[error("already exists")]
    Conflict,
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("backend unavailable: {0}")]
    NetworkFailure(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// The URL-shortening backend as seen by the dashboard
///
/// Every authenticated call takes the credential explicitly; the gateway
/// never keeps one. A missing or expired credential surfaces as
/// `GatewayError::Unauthorized`.
#[async_trait]
pub trait LinkGateway: Send + Sync {
    /// Exchange username and password for a bearer credential
    async fn login(&self, username: &str, password: &str) -> GatewayResult<Credential>;

    /// Create an account; `Conflict` when the username is taken
    async fn register(&self, request: &RegisterRequest) -> GatewayResult<()>;

    async fn fetch_user(&self, credential: &Credential) -> GatewayResult<User>;

    /// All links owned by the signed-in user, newest first
    async fn fetch_links(&self, credential: &Credential) -> GatewayResult<Vec<Link>>;

    async fn create_link(&self, credential: &Credential, url: &str) -> GatewayResult<Link>;

    /// Raw redirect timestamps recorded for a link, in backend order
    async fn fetch_redirect_events(
        &self,
        short_code: &str,
        credential: &Credential,
    ) -> GatewayResult<Vec<RawTimestamp>>;

    /// Metadata for one link
    ///
    /// The backend has no single-link endpoint, so the default looks the
    /// code up in the owned link list.
    async fn fetch_link_metadata(
        &self,
        short_code: &str,
        credential: &Credential,
    ) -> GatewayResult<Link> {
        self.fetch_links(credential)
            .await?
            .into_iter()
            .find(|link| link.short == short_code)
            .ok_or(GatewayError::NotFound)
    }
}
