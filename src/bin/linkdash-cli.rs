use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use linkdash::analytics::{
    window_from_hours, AnalyticsView, Granularity, SeriesPoint, ViewSettings, ViewSnapshot,
};
use linkdash::config::Config;
use linkdash::dashboard::{validate_login, validate_registration, validate_target_url};
use linkdash::gateway::{GatewayError, HttpGateway, LinkGateway};
use linkdash::session::{Credential, CredentialStore, SessionContext};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Widest bar drawn by `stats`
const BAR_WIDTH: u64 = 40;

#[derive(Parser)]
#[command(name = "linkdash-cli")]
#[command(about = "Manage short links and inspect click analytics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and save the credential
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the saved credential
    Logout,
    /// Create an account
    Register {
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        full_name: Option<String>,
    },
    /// Show the signed-in user
    Whoami,
    /// List your short links
    List,
    /// Shorten a URL
    Shorten { url: String },
    /// Show click analytics for a short link
    Stats {
        short: String,
        /// Bucket width: minute, hour or day
        #[arg(long, short)]
        granularity: Option<Granularity>,
        /// Trailing window for the recent-clicks count
        #[arg(long)]
        window_hours: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("linkdash=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let gateway: Arc<dyn LinkGateway> = Arc::new(HttpGateway::from_config(&config.backend)?);
    let store = CredentialStore::file(&config.session.credential_path);
    let session = Arc::new(SessionContext::restore(store).await?);

    match cli.command {
        Commands::Login { username, password } => {
            validate_login(&username, &password)?;
            let credential = match gateway.login(&username, &password).await {
                Ok(credential) => credential,
                Err(GatewayError::Unauthorized) => bail!("Invalid credentials"),
                Err(e) => return Err(e.into()),
            };
            session.login(credential).await?;
            println!("✓ Signed in as '{}'", username);
        }
        Commands::Logout => {
            session.logout().await?;
            println!("✓ Signed out");
        }
        Commands::Register {
            username,
            password,
            full_name,
        } => {
            let request = validate_registration(&username, &password, full_name.as_deref())?;
            match gateway.register(&request).await {
                Ok(()) => println!("✓ Registered '{}', you can now log in", request.username),
                Err(GatewayError::Conflict) => bail!("Username already taken."),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Whoami => {
            let credential = require_credential(&session).await?;
            let user = gateway.fetch_user(&credential).await?;
            match user.full_name {
                Some(name) => println!("{} ({})", user.username, name),
                None => println!("{}", user.username),
            }
        }
        Commands::List => {
            let credential = require_credential(&session).await?;
            let links = gateway.fetch_links(&credential).await?;
            if links.is_empty() {
                println!("No links yet");
            } else {
                println!("{:<40} {:<18} {}", "Short URL", "Created", "Target");
                println!("{}", "-".repeat(100));
                for link in links {
                    println!(
                        "{:<40} {:<18} {}",
                        link.short_url(&config.short_link_base_url),
                        link.created_on(&Local).unwrap_or_else(|| "-".to_string()),
                        link.url
                    );
                }
            }
        }
        Commands::Shorten { url } => {
            let url = validate_target_url(&url)?;
            let credential = require_credential(&session).await?;
            let link = gateway
                .create_link(&credential, &url)
                .await
                .context("failed to shorten URL")?;
            println!("{}", link.short_url(&config.short_link_base_url));
        }
        Commands::Stats {
            short,
            granularity,
            window_hours,
        } => {
            let mut settings: ViewSettings = config.analytics.view_settings();
            if let Some(hours) = window_hours {
                settings.rolling_window = window_from_hours(hours).with_context(|| {
                    format!("--window-hours must be a positive number of hours in range, got {hours}")
                })?;
            }

            let view = AnalyticsView::new(gateway, session, Local, settings);
            view.mount(&short).await;
            if let Some(granularity) = granularity {
                view.set_granularity(granularity);
            }
            print_stats(&view.snapshot(), &config.short_link_base_url)?;
        }
    }

    Ok(())
}

async fn require_credential(session: &SessionContext) -> Result<Credential> {
    session
        .credential()
        .await
        .context("not signed in, run `linkdash-cli login` first")
}

fn print_stats(snapshot: &ViewSnapshot, base_url: &str) -> Result<()> {
    match snapshot {
        ViewSnapshot::Loaded {
            link,
            granularity,
            series,
            total_clicks,
            recent_clicks,
            window_hours,
            ..
        } => {
            println!("Short URL:    {}", link.short_url(base_url));
            println!("Original URL: {}", link.url);
            println!("Total clicks: {}", total_clicks);
            println!("Clicks in last {}h: {}", window_hours, recent_clicks);
            println!();
            println!("Clicks per {}:", granularity);
            print_series(series);
            Ok(())
        }
        ViewSnapshot::Error { error, .. } => bail!("{}", error),
        ViewSnapshot::Unmounted | ViewSnapshot::Loading { .. } => {
            bail!("analytics did not finish loading")
        }
    }
}

fn print_series(series: &[SeriesPoint]) {
    if series.is_empty() {
        println!("  (no clicks yet)");
        return;
    }

    let peak = series.iter().map(|p| p.count).max().unwrap_or(1).max(1);
    let label_width = series.iter().map(|p| p.label.len()).max().unwrap_or(0);
    for point in series {
        let bar = (point.count * BAR_WIDTH).div_ceil(peak);
        println!(
            "  {:<width$}  {:>6}  {}",
            point.label,
            point.count,
            "#".repeat(bar as usize),
            width = label_width
        );
    }
}
