use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use linkdash::api::{self, AppState};
use linkdash::config::Config;
use linkdash::gateway::{HttpGateway, LinkGateway};
use linkdash::session::{CredentialStore, SessionContext};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("linkdash=info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    let gateway: Arc<dyn LinkGateway> = Arc::new(HttpGateway::from_config(&config.backend)?);
    info!("Using backend at {}", config.backend.base_url);

    // Restore the saved session, if any
    let store = CredentialStore::file(&config.session.credential_path);
    let session = Arc::new(SessionContext::restore(store).await?);
    if session.is_authenticated().await {
        info!("🔐 Signed in with saved credential");
    } else {
        info!("🔓 No saved credential - sign in via POST /api/session/login");
    }

    let settings = config.analytics.view_settings();
    info!(
        "📈 Analytics: default granularity {}, {:?} label order, {}h rolling window",
        settings.default_granularity, settings.label_order, config.analytics.window_hours
    );

    let state = Arc::new(AppState::new(
        gateway,
        session,
        settings,
        config.short_link_base_url.clone(),
    ));
    let router = api::create_dashboard_router(state, &config.frontend);

    // Log frontend configuration
    if let Some(ref static_dir) = config.frontend.static_dir {
        info!("🎨 Serving frontend from directory: {}", static_dir);
    } else {
        info!("🎨 No frontend directory configured, serving the JSON API only");
    }

    let addr = format!(
        "{}:{}",
        config.dashboard_server.host, config.dashboard_server.port
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Dashboard listening on http://{}", addr);
    info!("   - API endpoints available at http://{}/api/...", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
