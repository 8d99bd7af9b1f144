use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::analytics::RawTimestamp;
use crate::config::BackendConfig;
use crate::gateway::{GatewayError, GatewayResult, LinkGateway};
use crate::models::{CreateLinkRequest, Link, LoginResponse, RegisterRequest, User};
use crate::session::Credential;

/// `LinkGateway` over the backend's HTTP API
#[derive(Clone)]
pub struct HttpGateway {
    base: Url,
    client: Client,
}

impl HttpGateway {
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("linkdash/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client for the backend")?;

        let base = Url::parse(&config.base_url)
            .with_context(|| format!("invalid backend URL '{}'", config.base_url))?;
        if base.cannot_be_a_base() {
            bail!("backend URL '{}' cannot carry a path", config.base_url);
        }

        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Endpoint below one link; the short code is percent-encoded as a single segment
    fn link_endpoint(&self, short_code: &str, tail: &str) -> GatewayResult<Url> {
        // Dot segments would be dropped or resolved instead of encoded
        if short_code.is_empty() || short_code == "." || short_code == ".." {
            return Err(GatewayError::NotFound);
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::NetworkFailure("backend URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["api", "me", "links", short_code, tail]);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder, credential: &Credential) -> RequestBuilder {
        request.bearer_auth(credential.token())
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> GatewayResult<T> {
        let response = check_status(request.send().await?).await?;
        response.json::<T>().await.map_err(|e| {
            warn!("Failed to decode backend response: {}", e);
            GatewayError::NetworkFailure(format!("invalid response body: {e}"))
        })
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::NetworkFailure(e.to_string())
    }
}

/// Map a non-success response onto the gateway error taxonomy
async fn check_status(response: Response) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!("Backend returned {}: {}", status, body);

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthorized,
        StatusCode::NOT_FOUND => GatewayError::NotFound,
        StatusCode::CONFLICT => GatewayError::Conflict,
        s if s.is_client_error() => GatewayError::Rejected(error_detail(&body, s)),
        s => GatewayError::NetworkFailure(format!("backend returned {s}")),
    })
}

/// Pull a readable message out of an error body (`{"detail": "..."}`)
fn error_detail(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| status.to_string())
}

#[async_trait]
impl LinkGateway for HttpGateway {
    async fn login(&self, username: &str, password: &str) -> GatewayResult<Credential> {
        let request = self
            .client
            .post(self.endpoint("/api/login"))
            .form(&[("username", username), ("password", password)]);

        // Bad credentials come back as 400 or 401 depending on the backend
        let response: LoginResponse = self.send_json(request).await.map_err(|e| match e {
            GatewayError::Rejected(_) | GatewayError::NotFound => GatewayError::Unauthorized,
            other => other,
        })?;

        Ok(Credential::new(response.access_token))
    }

    async fn register(&self, request: &RegisterRequest) -> GatewayResult<()> {
        let response = self
            .client
            .post(self.endpoint("/api/register"))
            .json(request)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn fetch_user(&self, credential: &Credential) -> GatewayResult<User> {
        let request = self.authorized(self.client.get(self.endpoint("/api/me")), credential);
        self.send_json(request).await
    }

    async fn fetch_links(&self, credential: &Credential) -> GatewayResult<Vec<Link>> {
        let request = self.authorized(self.client.get(self.endpoint("/api/me/urls")), credential);
        self.send_json(request).await
    }

    async fn create_link(&self, credential: &Credential, url: &str) -> GatewayResult<Link> {
        let request = self
            .authorized(self.client.post(self.endpoint("/api/me/urls")), credential)
            .json(&CreateLinkRequest {
                url: url.to_string(),
            });
        self.send_json(request).await
    }

    async fn fetch_redirect_events(
        &self,
        short_code: &str,
        credential: &Credential,
    ) -> GatewayResult<Vec<RawTimestamp>> {
        let url = self.link_endpoint(short_code, "redirects")?;
        let request = self.authorized(self.client.get(url), credential);
        self.send_json(request).await
    }
}
