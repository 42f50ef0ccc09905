//! Job Aggregator binary entrypoint
//! Boots the Axum HTTP server, wiring configuration, shared state, and metrics.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use job_aggregator::clock::SystemClock;
use job_aggregator::config::AggregatorConfig;
use job_aggregator::metrics::Metrics;

/// Compact text logs by default; `LOG_FORMAT=json` for structured output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("job_aggregator=info,tower_http=info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AggregatorConfig::load().context("loading configuration")?;
    let metrics = Metrics::init()?;
    let state = job_aggregator::build_state(&cfg, Arc::new(SystemClock))?;

    let app = job_aggregator::router(state).merge(metrics.router());

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "server running");

    axum::serve(listener, app).await.context("http server")?;
    Ok(())
}
