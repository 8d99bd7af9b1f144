use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::analytics::{window_from_hours, Granularity, LabelOrder, ViewSettings};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub dashboard_server: ServerConfig,
    pub session: SessionConfig,
    pub analytics: AnalyticsConfig,
    pub frontend: FrontendConfig,
    /// Base under which short codes are published (`{base}/{short}`)
    pub short_link_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default = "BackendConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// File the bearer credential is cached in between runs
    pub credential_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub default_granularity: Granularity,
    pub label_order: LabelOrder,
    pub window_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Directory with a built browser front end, served at `/`
    pub static_dir: Option<String>,
}

impl BackendConfig {
    const fn default_timeout_secs() -> u64 {
        10
    }
}

impl AnalyticsConfig {
    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            default_granularity: self.default_granularity,
            label_order: self.label_order,
            rolling_window: window_from_hours(self.window_hours)
                .unwrap_or_else(|| ViewSettings::default().rolling_window),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build the configuration from a variable lookup
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = var("BACKEND_URL").unwrap_or_else(|| "http://localhost:8000".to_string());
        let short_link_base_url = var("SHORT_LINK_BASE_URL").unwrap_or_else(|| backend_url.clone());

        let timeout_secs = match var("HTTP_TIMEOUT_SECS") {
            Some(v) => v
                .parse::<u64>()
                .with_context(|| format!("HTTP_TIMEOUT_SECS must be a number of seconds, got '{v}'"))?,
            None => BackendConfig::default_timeout_secs(),
        };

        let dashboard_host = var("DASHBOARD_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let dashboard_port = var("DASHBOARD_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .context("DASHBOARD_PORT must be a valid port")?;

        let credential_path =
            var("CREDENTIAL_PATH").unwrap_or_else(|| "./.linkdash-token".to_string());

        let default_granularity = match var("ANALYTICS_DEFAULT_GRANULARITY") {
            Some(v) => v.parse::<Granularity>().unwrap_or_else(|e| {
                tracing::warn!("{e}, falling back to 'hour'");
                Granularity::Hour
            }),
            None => Granularity::Hour,
        };

        let label_order = match var("ANALYTICS_LABEL_ORDER")
            .map(|v| v.to_lowercase())
            .as_deref()
        {
            None | Some("chronological") => LabelOrder::Chronological,
            Some("lexicographic") => LabelOrder::Lexicographic,
            Some(other) => {
                tracing::warn!(
                    "Unknown ANALYTICS_LABEL_ORDER '{other}', falling back to 'chronological'. Supported values: chronological, lexicographic"
                );
                LabelOrder::Chronological
            }
        };

        let window_hours = var("ANALYTICS_WINDOW_HOURS")
            .unwrap_or_else(|| "24".to_string())
            .parse::<i64>()
            .context("ANALYTICS_WINDOW_HOURS must be a whole number of hours")?;
        if window_from_hours(window_hours).is_none() {
            bail!("ANALYTICS_WINDOW_HOURS must be a positive number of hours in range, got {window_hours}");
        }

        Ok(Config {
            backend: BackendConfig {
                base_url: backend_url,
                timeout_secs,
            },
            dashboard_server: ServerConfig {
                host: dashboard_host,
                port: dashboard_port,
            },
            session: SessionConfig { credential_path },
            analytics: AnalyticsConfig {
                default_granularity,
                label_order,
                window_hours,
            },
            frontend: FrontendConfig {
                static_dir: var("FRONTEND_STATIC_DIR"),
            },
            short_link_base_url,
        })
    }
}
