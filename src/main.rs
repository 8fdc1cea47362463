//! Noisemap - crowdsourced noise-pollution reporting and analytics.
//!
//! # API Endpoints
//!
//! - `POST /reports` - Submit a noise report
//! - `GET /reports` - List reports matching a filter
//! - `GET /reports/:id` - Fetch one report
//! - `PATCH /reports/:id/status` - Set a report's review status
//! - `PATCH /reports/:id/flag` - Flag or unflag a report
//! - `DELETE /reports/:id` - Delete a report
//! - `POST /reports/sample` - Generate synthetic reports
//! - `GET /analytics` - Summary, trend, distribution and heat points
//! - `GET /analytics/heatmap` - Heat points as tuples
//! - `GET /analytics/categories` - Category distribution
//! - `GET /health` - Health check

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use noisemap::api::{AppState, router, seed_reports};
use noisemap::config::Config;
use noisemap::storage::{ReportStore, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("noisemap=info".parse()?))
        .init();

    let config = Config::from_env()?;

    info!(
        port = config.port,
        database_url = %config.database_url,
        strict_filters = config.strict_filters,
        "Starting Noisemap server"
    );

    let storage = Storage::connect(&config.database_url).await?;
    info!(kind = storage.kind(), "Report store initialized");

    if config.sample_reports > 0 && storage.list().await?.is_empty() {
        seed_reports(&storage, config.sample_reports).await?;
    }

    let state = AppState {
        storage,
        filter_mode: config.filter_mode(),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Noisemap is listening");

    axum::serve(listener, router(state)).await?;

    Ok(())
}
