// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod categorize;
pub mod dedup;
pub mod metrics;
pub mod normalize;
pub mod record;
pub mod snapshot;

// Ingestion pipeline (providers, config, scheduler, cycle orchestration)
pub mod ingest;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::ingest::scheduler::Scheduler;
pub use crate::record::{Category, IntelRecord, Snapshot};
pub use crate::snapshot::SnapshotCache;
