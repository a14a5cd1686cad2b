//! credvault server
//!
//! Loads the key configuration, resolves every configured key against the
//! stored canaries, and serves the status API. Startup aborts if the keys
//! cannot be resolved unambiguously.
//!
//! Usage:
//!   credvault-server --config credvault.json --port 9000

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use credvault_model::EncryptionKeyRotator;
use credvault_server::{build_router, AppState, ServerConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "credvault-server")]
#[command(about = "credvault credential server")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, env = "CREDVAULT_CONFIG")]
    config: PathBuf,

    /// HTTP port to listen on
    #[arg(short, long, default_value = "9000")]
    port: u16,

    /// Re-encrypt stored credentials under the active key before serving
    #[arg(long)]
    rotate: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("credvault starting...");
    let config = ServerConfig::from_file(&args.config)?;

    let state = AppState::open(&config)?;
    if args.rotate {
        EncryptionKeyRotator::new(state.encryptor.clone())
            .rotate(state.credentials.as_ref())
            .context("Key rotation failed")?;
    }
    let active = state.encryptor.active_key_uuid()?;
    let known = state.encryptor.key_set()?.len();

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port))
        .await
        .with_context(|| format!("Failed to bind HTTP port {}", args.port))?;
    info!(port = args.port, active_key = %active, known_keys = known, "HTTP API listening");

    axum::serve(listener, build_router(Arc::new(state)))
        .await
        .context("HTTP server failed")?;
    Ok(())
}
