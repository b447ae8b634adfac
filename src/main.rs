//! CyberIntel Aggregator — Binary Entrypoint
//! Boots the background aggregation scheduler and the Axum HTTP server
//! serving snapshot reads, stats, deltas, and the manual-refresh trigger.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cyberintel_aggregator::api::{self, AppState};
use cyberintel_aggregator::ingest::config::AggregatorConfig;
use cyberintel_aggregator::ingest::scheduler::Scheduler;
use cyberintel_aggregator::metrics::Metrics;
use cyberintel_aggregator::snapshot::SnapshotCache;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cyberintel_aggregator=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = AggregatorConfig::load_default().context("loading aggregator config")?;
    tracing::info!(
        feeds = cfg.feeds.len(),
        interval_secs = cfg.interval_secs,
        "configuration loaded"
    );

    let metrics = Metrics::init(cfg.interval_secs);

    let cache = Arc::new(SnapshotCache::new());
    let scheduler = Scheduler::new(cfg, cache.clone());

    // First cycle runs immediately, rebuilding the snapshot from scratch.
    let _scheduler_task = scheduler.clone().spawn();

    let state = AppState::new(cache, scheduler);
    let router = api::create_router(state).merge(metrics.router());

    let addr = std::env::var("INTEL_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "serving");

    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
