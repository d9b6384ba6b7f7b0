//! OmniFS Server - Entry Point
//!
//! An in-memory multi-user file store served over a line protocol.

use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

use omnifs_server::config::ServerConfig;
use omnifs_server::engine;
use omnifs_server::error::ServerError;
use omnifs_server::error::handlers::handle_error;
use omnifs_server::server::Server;

const CONFIG_FILE: &str = "config.toml";

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    if let Err(e) = run().await {
        handle_error(&e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    info!("Launching OmniFS server...");

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Invalid configuration ({}), using defaults", e);
            ServerConfig::default()
        }
    };

    let engine = Arc::new(engine::open_or_format(
        &config.storage.store_path,
        Path::new(CONFIG_FILE),
    )?);

    let header = engine.header();
    info!(
        "Store ready: {} bytes, {} byte blocks, up to {} users",
        header.total_size, header.block_size, header.max_users
    );

    let server = Server::bind(&config, Arc::clone(&engine)).await?;

    tokio::select! {
        _ = server.start() => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown requested");
        }
    }

    engine.shutdown();
    Ok(())
}
