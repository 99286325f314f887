//! Wisp server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wisp_core::config::AppConfig;
use wisp_server::{AppState, create_router};
use wisp_storage::MediaStore;

/// Wisp - an ephemeral wish-sharing server
#[derive(Parser, Debug)]
#[command(name = "wispd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "WISP_CONFIG", default_value = "config/wisp.toml")]
    config: String,
}

/// Load configuration from an optional TOML file plus WISP_* env overrides.
fn load_config(config_path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();
    let path = std::path::Path::new(config_path);
    if path.exists() {
        tracing::info!(config_path = %config_path, "Loading configuration from file");
        figment = figment.merge(Toml::file(config_path));
    } else {
        tracing::debug!("No config file found at {}, using defaults", config_path);
    }
    figment
        .merge(Env::prefixed("WISP_").split("__"))
        .extract()
        .context("failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Startup banner
    tracing::info!("Wisp v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    // Initialize media storage
    let storage = wisp_storage::from_config(&config.storage)
        .await
        .context("failed to initialize media storage")?;
    storage
        .health_check()
        .await
        .context("media storage health check failed")?;
    tracing::info!("Media storage initialized");

    // Initialize wish store
    let metadata = wisp_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize wish store")?;
    tracing::info!("Wish store initialized");

    // Create application state
    let state = AppState::new(config.clone(), storage, metadata);

    // Spawn rate limiter cleanup task if rate limiting is enabled
    if let Some(cleanup_interval) = state.rate_limit_cleanup_interval() {
        wisp_server::ratelimit::spawn_cleanup_task(state.rate_limit.clone(), cleanup_interval);
        tracing::info!(
            interval_secs = cleanup_interval.as_secs(),
            "Rate limiter cleanup task spawned"
        );
    }

    // Spawn the reclamation sweep scheduler unless disabled
    match state.sweeper.clone().spawn_scheduler() {
        Some(_handle) => tracing::info!(
            interval_minutes = config.cleanup.sweep_interval_minutes,
            "Reclamation sweep scheduler spawned"
        ),
        None => tracing::info!("Reclamation sweep scheduling disabled"),
    }

    // Create router
    let app = create_router(state);

    // Parse bind address
    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;

    tracing::info!("Listening on {}", addr);

    // Start server with ConnectInfo for client IP extraction
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
