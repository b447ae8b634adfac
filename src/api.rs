//! # HTTP API
//! Read-only snapshot endpoints for the presentation collaborator, plus the
//! fire-and-forget manual-refresh trigger. Readers never see an error from a
//! failed cycle; every read serves the last good snapshot and reports its
//! `generation`/`built_at` so the UI can show "updated N seconds ago".

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::ingest::scheduler::Scheduler;
use crate::record::{Category, IntelRecord};
use crate::snapshot::{delta_since, SnapshotCache};

#[derive(Clone)]
pub struct AppState {
    cache: Arc<SnapshotCache>,
    scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new(cache: Arc<SnapshotCache>, scheduler: Arc<Scheduler>) -> Self {
        Self { cache, scheduler }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/news", get(news))
        .route("/api/stats", get(stats))
        .route("/api/delta", get(delta))
        .route("/api/refresh", post(refresh))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

const DEFAULT_LIMIT: usize = 60;
const MAX_LIMIT: usize = 200;

#[derive(Deserialize)]
struct NewsQuery {
    category: Option<String>,
    q: Option<String>,
    limit: Option<usize>,
}

#[derive(serde::Serialize)]
struct NewsResponse {
    items: Vec<IntelRecord>,
    total: usize,
    generation: u64,
    built_at: DateTime<Utc>,
}

async fn news(State(state): State<AppState>, Query(q): Query<NewsQuery>) -> Json<NewsResponse> {
    let snap = state.cache.current();

    // Unknown category names yield an empty list, not an error.
    let category = q.category.as_deref().map(|s| s.parse::<Category>());
    let base: Vec<&IntelRecord> = match category {
        Some(Ok(cat)) => crate::snapshot::by_category(&snap, cat),
        Some(Err(())) => Vec::new(),
        None => snap.records.iter().collect(),
    };

    let needle = q.q.unwrap_or_default().trim().to_lowercase();
    let matched: Vec<&IntelRecord> = base
        .into_iter()
        .filter(|r| {
            needle.is_empty()
                || r.title.to_lowercase().contains(&needle)
                || r.summary.to_lowercase().contains(&needle)
                || r.source_name.to_lowercase().contains(&needle)
        })
        .collect();

    let total = matched.len();
    let limit = q.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let items = matched.into_iter().take(limit).cloned().collect();

    Json(NewsResponse {
        items,
        total,
        generation: snap.generation,
        built_at: snap.built_at,
    })
}

#[derive(serde::Serialize)]
struct StatsResponse {
    counts: BTreeMap<String, usize>,
    generation: u64,
    built_at: DateTime<Utc>,
    degraded: bool,
    refreshing: bool,
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let snap = state.cache.current();

    let mut counts = BTreeMap::new();
    for cat in Category::ALL {
        counts.insert(
            cat.as_str().to_string(),
            crate::snapshot::by_category(&snap, cat).len(),
        );
    }
    counts.insert("__all".to_string(), snap.records.len());

    Json(StatsResponse {
        counts,
        generation: snap.generation,
        built_at: snap.built_at,
        degraded: state.cache.last_cycle_degraded(),
        refreshing: state.scheduler.is_running(),
    })
}

#[derive(Deserialize)]
struct DeltaQuery {
    #[serde(default)]
    since: u64,
}

#[derive(serde::Serialize)]
struct DeltaResponse {
    items: Vec<IntelRecord>,
    since: u64,
    generation: u64,
    built_at: DateTime<Utc>,
}

/// "New intel since generation G" — polled by the notification collaborator.
async fn delta(State(state): State<AppState>, Query(q): Query<DeltaQuery>) -> Json<DeltaResponse> {
    let snap = state.cache.current();
    let items = delta_since(&snap, q.since).into_iter().cloned().collect();
    Json(DeltaResponse {
        items,
        since: q.since,
        generation: snap.generation,
        built_at: snap.built_at,
    })
}

#[derive(serde::Serialize)]
struct RefreshResponse {
    status: &'static str,
    generation: u64,
}

/// Fire-and-forget: schedules a cycle and returns immediately with the
/// generation currently being served.
async fn refresh(State(state): State<AppState>) -> Json<RefreshResponse> {
    state.scheduler.trigger_refresh();
    Json(RefreshResponse {
        status: "scheduled",
        generation: state.cache.current().generation,
    })
}
