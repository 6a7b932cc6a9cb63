//! Application entry point.

mod auth;
mod cache;
mod config;
mod database;
mod error;
mod models;
mod ranking;
mod server;

use crate::config::{DEFAULT_CONFIG_PATH, HubConfig};
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("MAIN: Booting rvsrg-hub {}...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("HUB_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = match HubConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("CONFIG: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server::start_server(config).await {
        log::error!("SERVER: {}", e);
        std::process::exit(1);
    }
}
