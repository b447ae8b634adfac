// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod scheduler;
pub mod types;

use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;

use crate::categorize::categorize;
use crate::dedup::{deduplicate, fingerprint};
use crate::ingest::config::AggregatorConfig;
use crate::ingest::types::{CycleOutcome, CycleResult, FeedProvider, FetchError, RawItem};
use crate::normalize::normalize;
use crate::record::IntelRecord;
use crate::snapshot::SnapshotCache;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("intel_items_total", "Raw items parsed from providers.");
        describe_counter!("intel_kept_total", "Items kept after normalization.");
        describe_counter!(
            "intel_dropped_total",
            "Items dropped by the normalizer (missing title / bad timestamp)."
        );
        describe_counter!(
            "intel_dedup_merged_total",
            "Records merged away by deduplication."
        );
        describe_counter!(
            "intel_provider_errors_total",
            "Adapter fetch/parse failures (after retries)."
        );
        describe_counter!("intel_cycles_total", "Aggregation cycles started.");
        describe_counter!(
            "intel_cycles_degraded_total",
            "Cycles that published with at least one failed adapter."
        );
        describe_counter!(
            "intel_cycles_failed_total",
            "Cycles with zero records that did not publish."
        );
        describe_histogram!("intel_fetch_ms", "Provider fetch+parse time in milliseconds.");
        describe_gauge!("intel_snapshot_records", "Records in the current snapshot.");
        describe_gauge!("intel_snapshot_generation", "Current snapshot generation.");
        describe_gauge!("intel_last_cycle_ts", "Unix ts when the last cycle finished.");
    });
}

/// Fetch from one provider with the shared per-adapter timeout and a bounded
/// number of attempts. Only transient errors are retried.
async fn fetch_one(
    provider: Arc<dyn FeedProvider>,
    cfg: &AggregatorConfig,
) -> (Vec<RawItem>, CycleResult) {
    let timeout = cfg.fetch_timeout();
    let max_attempts = cfg.max_attempts.max(1);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let attempt = tokio::time::timeout(timeout, provider.fetch(timeout)).await;
        let result = match attempt {
            Ok(r) => r,
            Err(_elapsed) => Err(FetchError::Timeout(timeout)),
        };

        match result {
            Ok(items) => {
                let n = items.len();
                return (
                    items,
                    CycleResult {
                        provider: provider.name().to_string(),
                        outcome: Ok(n),
                        attempts,
                    },
                );
            }
            Err(e) if e.is_retryable() && attempts < max_attempts => {
                tracing::debug!(provider = provider.name(), error = %e, attempts, "retrying fetch");
            }
            Err(e) => {
                tracing::warn!(provider = provider.name(), error = %e, attempts, "provider failed");
                counter!("intel_provider_errors_total").increment(1);
                return (
                    Vec::new(),
                    CycleResult {
                        provider: provider.name().to_string(),
                        outcome: Err(e),
                        attempts,
                    },
                );
            }
        }
    }
}

/// Fan out to all providers concurrently; one failing adapter never aborts
/// its siblings. Returns each adapter's raw items and its `CycleResult`.
async fn fetch_all(
    providers: &[Arc<dyn FeedProvider>],
    cfg: &AggregatorConfig,
) -> Vec<(String, Vec<RawItem>, CycleResult)> {
    let mut set = JoinSet::new();
    for provider in providers {
        let provider = provider.clone();
        let cfg = cfg.clone();
        set.spawn(async move {
            let name = provider.name().to_string();
            let (items, result) = fetch_one(provider, &cfg).await;
            (name, items, result)
        });
    }

    let mut out = Vec::with_capacity(providers.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(v) => out.push(v),
            // A panicking adapter counts as an unreachable one.
            Err(e) => tracing::error!(error = %e, "adapter task panicked"),
        }
    }
    out
}

/// Normalize, categorize, and fingerprint one adapter's raw items.
pub fn build_records(
    feed_name: &str,
    raw: &[RawItem],
    cfg: &AggregatorConfig,
) -> Vec<IntelRecord> {
    let now = Utc::now();
    let mut out = Vec::with_capacity(raw.len());

    for item in raw {
        let normalized = match normalize(item, feed_name) {
            Ok(n) => n,
            Err(reason) => {
                tracing::debug!(feed = feed_name, ?reason, "item dropped");
                counter!("intel_dropped_total").increment(1);
                continue;
            }
        };

        let categories = categorize(&normalized.title, &normalized.summary);
        let id = fingerprint(
            &normalized.title,
            &normalized.source_url,
            normalized.published_at.timestamp(),
            cfg.dedup_bucket_secs,
        );

        out.push(IntelRecord {
            id,
            title: normalized.title,
            summary: normalized.summary,
            source_name: normalized.source_name,
            source_url: normalized.source_url,
            published_at: normalized.published_at,
            categories,
            first_seen_at: now,
            // Assigned at publish; see SnapshotCache::publish.
            first_seen_generation: 0,
            merged_source_count: 1,
        });
    }

    counter!("intel_kept_total").increment(out.len() as u64);
    out
}

/// Run one full cycle: fan out, normalize, categorize, deduplicate, publish.
///
/// Adapter failures are isolated; a cycle publishes as long as it produced at
/// least one record (marked degraded when any adapter failed). Zero records
/// means no publish — stale data is preferred to empty data.
pub async fn run_cycle(
    providers: &[Arc<dyn FeedProvider>],
    cfg: &AggregatorConfig,
    cache: &SnapshotCache,
) -> CycleOutcome {
    ensure_metrics_described();
    counter!("intel_cycles_total").increment(1);

    let fetched = fetch_all(providers, cfg).await;

    let mut results = Vec::with_capacity(fetched.len());
    let mut records = Vec::new();
    for (name, raw, result) in fetched {
        records.extend(build_records(&name, &raw, cfg));
        results.push(result);
    }

    let failed = results.iter().filter(|r| r.is_failure()).count();
    let degraded = failed > 0;
    if failed > results.len() / 2 && !results.is_empty() {
        tracing::warn!(failed, total = results.len(), "majority of sources unreachable");
    }

    gauge!("intel_last_cycle_ts").set(Utc::now().timestamp() as f64);

    if records.is_empty() {
        counter!("intel_cycles_failed_total").increment(1);
        tracing::warn!(failed, "cycle produced zero records; keeping prior snapshot");
        return CycleOutcome::Failed { results };
    }

    let before = records.len();
    let deduped = deduplicate(records, &cfg.dedup());
    counter!("intel_dedup_merged_total").increment((before - deduped.len()) as u64);

    let record_count = deduped.len();
    let generation = cache.publish(deduped);
    cache.set_last_cycle_degraded(degraded);
    if degraded {
        counter!("intel_cycles_degraded_total").increment(1);
    }
    gauge!("intel_snapshot_records").set(record_count as f64);
    gauge!("intel_snapshot_generation").set(generation as f64);

    tracing::info!(
        generation,
        records = record_count,
        merged = before - record_count,
        failed_adapters = failed,
        degraded,
        "cycle published"
    );

    CycleOutcome::Published {
        generation,
        record_count,
        degraded,
        results,
    }
}
