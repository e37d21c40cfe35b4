//! Durak Game Server
//!
//! Loads configuration (optional JSON file named by `DURAK_CONFIG`, then
//! `DURAK_*` environment overrides) and serves until Ctrl-C.

use std::sync::Arc;
use anyhow::Context;
use tracing::{info, error};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use durak::{GameServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Durak Server v{}", VERSION);

    let mut config = match std::env::var("DURAK_CONFIG") {
        Ok(path) => ServerConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        Err(_) => ServerConfig::default(),
    };
    config.apply_env().context("reading DURAK_* environment")?;
    info!("Config: {:?}", config);

    let server = Arc::new(GameServer::new(config));

    let signal_server = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => signal_server.shutdown(),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    server.run().await.context("server stopped")?;
    info!("Server stopped");
    Ok(())
}
