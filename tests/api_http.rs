// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /api/news (full, category, free-text query, limit)
// - GET /api/stats
// - GET /api/delta
// - POST /api/refresh

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use cyberintel_aggregator::api::{self, AppState};
use cyberintel_aggregator::ingest::config::AggregatorConfig;
use cyberintel_aggregator::ingest::providers::{atom::AtomProvider, rss::RssProvider};
use cyberintel_aggregator::ingest::scheduler::Scheduler;
use cyberintel_aggregator::ingest::types::FeedProvider;
use cyberintel_aggregator::ingest::run_cycle;
use cyberintel_aggregator::snapshot::SnapshotCache;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn fixture_providers() -> Vec<Arc<dyn FeedProvider>> {
    vec![
        Arc::new(RssProvider::from_fixture(
            "BleepingComputer Ransomware",
            include_str!("fixtures/bleeping_ransomware.xml"),
        )),
        Arc::new(AtomProvider::from_fixture(
            "The Hacker News Vulnerabilities",
            include_str!("fixtures/hackernews_vuln.xml"),
        )),
        Arc::new(RssProvider::from_fixture(
            "DataBreaches.net",
            include_str!("fixtures/databreaches.xml"),
        )),
    ]
}

/// Build the same Router the binary uses, seeded with one fixture cycle.
async fn test_router() -> Router {
    let cfg = AggregatorConfig::default();
    let cache = Arc::new(SnapshotCache::new());
    let providers = fixture_providers();
    run_cycle(&providers, &cfg, &cache).await;

    let scheduler = Scheduler::with_providers(cfg, cache.clone(), providers);
    api::create_router(AppState::new(cache, scheduler))
}

async fn get_json(app: Router, uri: &str) -> Json {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    assert!(resp.status().is_success(), "GET {uri} -> {}", resp.status());
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router().await;

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "ok");
}

#[tokio::test]
async fn api_news_serves_the_whole_snapshot_with_generation() {
    let app = test_router().await;
    let v = get_json(app, "/api/news").await;

    assert_eq!(v["generation"], 1);
    assert_eq!(v["total"], 5);
    assert_eq!(v["items"].as_array().unwrap().len(), 5);
    assert!(v["built_at"].is_string());

    // Display ordering: most recent first.
    let items = v["items"].as_array().unwrap();
    assert_eq!(items[0]["title"], "NewRansomwareX hits HealthCo");
    assert_eq!(items[0]["merged_source_count"], 3);
}

#[tokio::test]
async fn api_news_filters_by_category_and_query() {
    let app = test_router().await;
    let v = get_json(app.clone(), "/api/news?category=Ransomware").await;
    let titles: Vec<_> = v["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["title"].as_str().unwrap().to_string())
        .collect();
    assert!(titles.contains(&"NewRansomwareX hits HealthCo".to_string()));
    assert!(titles.iter().all(|t| !t.starts_with("Weekly roundup")));

    // Unknown category -> empty result, not an error.
    let v = get_json(app.clone(), "/api/news?category=Nonsense").await;
    assert_eq!(v["total"], 0);

    // Free-text query over title/summary/source, case-insensitive.
    let v = get_json(app.clone(), "/api/news?q=RETAILER").await;
    assert_eq!(v["total"], 1);

    // Category and query compose.
    let v = get_json(app, "/api/news?category=Vulnerabilities&q=widgetos").await;
    assert_eq!(v["total"], 1);
}

#[tokio::test]
async fn api_news_limit_caps_items_but_reports_full_total() {
    let app = test_router().await;
    let v = get_json(app, "/api/news?limit=2").await;
    assert_eq!(v["items"].as_array().unwrap().len(), 2);
    assert_eq!(v["total"], 5);
}

#[tokio::test]
async fn api_stats_reports_per_category_counts() {
    let app = test_router().await;
    let v = get_json(app, "/api/stats").await;

    assert_eq!(v["counts"]["__all"], 5);
    assert!(v["counts"]["Ransomware"].as_u64().unwrap() >= 1);
    assert!(v["counts"]["Uncategorized"].as_u64().unwrap() >= 1);
    assert_eq!(v["generation"], 1);
    assert_eq!(v["degraded"], false);
}

#[tokio::test]
async fn api_delta_reports_new_records_since_generation() {
    let app = test_router().await;

    let v = get_json(app.clone(), "/api/delta?since=0").await;
    assert_eq!(v["items"].as_array().unwrap().len(), 5);
    assert_eq!(v["since"], 0);

    let v = get_json(app, "/api/delta?since=1").await;
    assert!(v["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn api_refresh_is_fire_and_forget() {
    let app = test_router().await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/refresh")
        .body(Body::empty())
        .expect("build POST /api/refresh");

    let resp = app.oneshot(req).await.expect("oneshot /api/refresh");
    assert!(resp.status().is_success());

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("parse json");
    assert_eq!(v["status"], "scheduled");
    assert_eq!(v["generation"], 1);
}
