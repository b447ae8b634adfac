// tests/snapshot_generations.rs
//
// Generation semantics across cycles: a cycle with zero records never
// publishes, readers keep the last good snapshot, and the delta endpoint's
// backing query only reports fingerprints first seen after a generation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cyberintel_aggregator::ingest::config::AggregatorConfig;
use cyberintel_aggregator::ingest::run_cycle;
use cyberintel_aggregator::ingest::types::{FeedProvider, FetchError, RawItem};
use cyberintel_aggregator::snapshot::{delta_since, SnapshotCache};

struct StaticProvider {
    name: &'static str,
    items: Vec<RawItem>,
}

#[async_trait]
impl FeedProvider for StaticProvider {
    async fn fetch(&self, _timeout: Duration) -> Result<Vec<RawItem>, FetchError> {
        Ok(self.items.clone())
    }
    fn name(&self) -> &str {
        self.name
    }
}

struct DownProvider;

#[async_trait]
impl FeedProvider for DownProvider {
    async fn fetch(&self, _timeout: Duration) -> Result<Vec<RawItem>, FetchError> {
        Err(FetchError::Unreachable("dns failure".into()))
    }
    fn name(&self) -> &str {
        "Down"
    }
}

fn item(title: &str, link: &str, published: &str) -> RawItem {
    RawItem {
        title: Some(title.to_string()),
        link: Some(link.to_string()),
        summary: Some("A phishing campaign report.".to_string()),
        published: Some(published.to_string()),
    }
}

fn cfg() -> AggregatorConfig {
    AggregatorConfig {
        fetch_timeout_secs: 1,
        max_attempts: 1,
        ..AggregatorConfig::default()
    }
}

#[tokio::test]
async fn failed_cycles_keep_the_last_good_generation() {
    let cache = SnapshotCache::new();

    let good: Vec<Arc<dyn FeedProvider>> = vec![Arc::new(StaticProvider {
        name: "Feed",
        items: vec![item("Story one", "https://feed.example/1", "2025-06-03T09:00:00Z")],
    })];
    let down: Vec<Arc<dyn FeedProvider>> = vec![Arc::new(DownProvider)];

    assert!(run_cycle(&good, &cfg(), &cache).await.published());
    let held = cache.current();
    assert_eq!(held.generation, 1);

    // Every adapter fails: no publish, readers keep generation 1.
    assert!(!run_cycle(&down, &cfg(), &cache).await.published());
    assert_eq!(cache.current().generation, 1);
    assert_eq!(cache.current().records.len(), 1);

    // Recovery publishes the next strictly-increasing generation.
    assert!(run_cycle(&good, &cfg(), &cache).await.published());
    assert_eq!(cache.current().generation, 2);
    assert_eq!(held.generation, 1); // held reference is untouched
}

#[tokio::test]
async fn delta_reports_only_records_new_since_a_generation() {
    let cache = SnapshotCache::new();

    let first: Vec<Arc<dyn FeedProvider>> = vec![Arc::new(StaticProvider {
        name: "Feed",
        items: vec![item("Story one", "https://feed.example/1", "2025-06-03T09:00:00Z")],
    })];
    run_cycle(&first, &cfg(), &cache).await;

    let both: Vec<Arc<dyn FeedProvider>> = vec![Arc::new(StaticProvider {
        name: "Feed",
        items: vec![
            item("Story one", "https://feed.example/1", "2025-06-03T09:00:00Z"),
            item("Story two", "https://feed.example/2", "2025-06-03T10:00:00Z"),
        ],
    })];
    run_cycle(&both, &cfg(), &cache).await;

    let snap = cache.current();
    assert_eq!(snap.generation, 2);

    let new_since_1 = delta_since(&snap, 1);
    assert_eq!(new_since_1.len(), 1);
    assert_eq!(new_since_1[0].title, "Story two");

    assert_eq!(delta_since(&snap, 0).len(), 2);
    assert!(delta_since(&snap, 2).is_empty());
}
