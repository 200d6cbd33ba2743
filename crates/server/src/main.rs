//! # ledgerline-server
//!
//! HTTP API over the metering ledger spreadsheet: project listing and
//! statistics for the dashboard, ledger history, new readings with derived
//! billing, raw row patches, and xlsx report export.

mod cache;
mod config;
mod routes;
mod service;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use ledgerline_store::SheetsStore;
use service::LedgerService;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let store = SheetsStore::open(config.sheets_config(), config.credential_source())
        .context("Failed to open spreadsheet client")?;
    let service = LedgerService::new(Arc::new(store), config.table_names(), config.cache_ttl());
    let app = routes::create_router(Arc::new(service));

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    tracing::info!(
        addr = %config.bind,
        spreadsheet = %config.spreadsheet,
        "ledgerline-server listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}
