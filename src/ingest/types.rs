// src/ingest/types.rs
use std::time::Duration;

use thiserror::Error;

/// Provider-specific payload for one feed entry, as parsed off the wire.
/// Owned by its adapter; discarded after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    /// Provider timestamp string (RFC 2822 for RSS, RFC 3339 for Atom).
    pub published: Option<String>,
}

/// Typed failure at the adapter boundary. Adapters return promptly with one
/// of these rather than blocking past the caller-supplied timeout.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("provider unreachable: {0}")]
    Unreachable(String),
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("rate limited by provider")]
    RateLimited,
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Transient failures are worth one more attempt within the same cycle;
    /// malformed payloads and rate limits are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Unreachable(_) | FetchError::Timeout(_))
    }
}

/// Capability: fetch raw items from one named feed. Concrete adapters differ
/// only in transport and payload parsing; the pipeline is adapter-agnostic.
#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    async fn fetch(&self, timeout: Duration) -> Result<Vec<RawItem>, FetchError>;
    fn name(&self) -> &str;
}

/// Per-adapter outcome of one fetch within a cycle. Transient; used for
/// cycle-level logging and degradation accounting, never persisted.
#[derive(Debug)]
pub struct CycleResult {
    pub provider: String,
    pub outcome: Result<usize, FetchError>,
    pub attempts: u32,
}

impl CycleResult {
    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Outcome of one full cycle across all adapters.
#[derive(Debug)]
pub enum CycleOutcome {
    /// A new snapshot generation was published. `degraded` is set when at
    /// least one adapter failed but the cycle still produced records.
    Published {
        generation: u64,
        record_count: usize,
        degraded: bool,
        results: Vec<CycleResult>,
    },
    /// Zero records from all adapters; the prior snapshot stays in place.
    Failed { results: Vec<CycleResult> },
}

impl CycleOutcome {
    pub fn published(&self) -> bool {
        matches!(self, CycleOutcome::Published { .. })
    }

    pub fn degraded(&self) -> bool {
        matches!(
            self,
            CycleOutcome::Published { degraded: true, .. } | CycleOutcome::Failed { .. }
        )
    }
}
