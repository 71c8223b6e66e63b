//! speakwell-assess - Pronunciation Assessment Service
//!
//! Serves the practice pipeline over HTTP:
//! - `POST /api/assess` - assess and reward one practice submission
//! - `GET /api/level/:total_xp` - level standing for an XP total
//! - `GET /health` - health check

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use speakwell_assess::config::{resolve_speech_credentials, resolve_transcription_api_key};
use speakwell_assess::providers::{SpeechAssessmentClient, TranscriptionClient};
use speakwell_assess::{build_coach, build_router, AppState};
use speakwell_common::config::load_config;
use speakwell_common::logging::init_tracing;

/// Command-line arguments for speakwell-assess
#[derive(Parser, Debug)]
#[command(name = "speakwell-assess")]
#[command(about = "Pronunciation assessment and reward service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "SPEAKWELL_PORT")]
    port: Option<u16>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging).context("Failed to initialize logging")?;

    info!("Starting speakwell-assess");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let providers = &config.providers;

    // Missing credentials are not fatal: the provider reports NotConfigured
    // and submissions fall through to the next stage.
    let speech_client = match resolve_speech_credentials(providers) {
        Ok(creds) => match &providers.speech_endpoint {
            Some(endpoint) => SpeechAssessmentClient::new(
                endpoint.clone(),
                Some(creds.subscription_key),
                providers.language.clone(),
            ),
            None => SpeechAssessmentClient::for_region(
                &creds.region,
                Some(creds.subscription_key),
                providers.language.clone(),
            ),
        },
        Err(e) => {
            warn!("{}", e);
            SpeechAssessmentClient::new(
                providers.speech_endpoint.clone().unwrap_or_default(),
                None,
                providers.language.clone(),
            )
        }
    }
    .context("Failed to create speech assessment client")?;

    let transcription_key = match resolve_transcription_api_key(providers) {
        Ok(key) => Some(key),
        Err(e) => {
            warn!("{}", e);
            None
        }
    };
    let transcription_client = TranscriptionClient::new(
        providers.transcription_endpoint.clone(),
        transcription_key,
        providers.transcription_model.clone(),
        &providers.language,
    )
    .context("Failed to create transcription client")?;

    let coach = build_coach(&config, Arc::new(speech_client), Arc::new(transcription_client));
    let app = build_router(AppState::new(coach));

    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", config.server.host, port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
