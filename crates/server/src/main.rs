use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mixtape_core::{
    load_config, validate_config, HttpCoverFetcher, Id3TagWriter, SessionOrchestrator,
    SpotifyClient, TrackProcessor, TrackResolver, YtDlpFetcher, ZipArchiver,
};
use mixtape_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("MIXTAPE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Downloads directory: {:?}", config.orchestrator.downloads_dir);

    if !config.spotify.has_credentials() {
        warn!("Spotify credentials not configured, session creation will be rejected");
    }

    // Metadata provider
    let spotify = SpotifyClient::new(config.spotify.clone())
        .context("Failed to create Spotify client")?;

    // Audio fetcher
    let fetcher = YtDlpFetcher::new(config.fetcher.clone());
    match fetcher.validate().await {
        Ok(()) => info!("yt-dlp available at {:?}", config.fetcher.binary_path),
        Err(e) => warn!("yt-dlp unavailable, every track will be skipped: {}", e),
    }

    let covers =
        HttpCoverFetcher::new(config.covers.clone()).context("Failed to create cover fetcher")?;

    tokio::fs::create_dir_all(&config.orchestrator.downloads_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create downloads directory {:?}",
                config.orchestrator.downloads_dir
            )
        })?;

    let orchestrator = Arc::new(SessionOrchestrator::new(
        config.orchestrator.clone(),
        TrackResolver::new(Arc::new(spotify)),
        TrackProcessor::new(
            Arc::new(fetcher),
            Arc::new(covers),
            Arc::new(Id3TagWriter::new()),
        ),
        Arc::new(ZipArchiver::new()),
    ));
    info!("Session orchestrator initialized");

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&orchestrator)));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    orchestrator.shutdown().await;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
