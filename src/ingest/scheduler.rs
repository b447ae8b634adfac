// src/ingest/scheduler.rs
//
// Background loop driving periodic and on-demand aggregation cycles.
//
// State machine: Idle -> Running -> (Idle | Running again). A manual refresh
// arriving while a cycle is in flight never spawns a second concurrent
// cycle; `tokio::sync::Notify` holds at most one permit, so any number of
// triggers during a cycle coalesce into exactly one follow-up run.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::ingest::config::AggregatorConfig;
use crate::ingest::types::FeedProvider;
use crate::ingest::{providers, run_cycle};
use crate::snapshot::SnapshotCache;

pub struct Scheduler {
    providers: Vec<Arc<dyn FeedProvider>>,
    cfg: AggregatorConfig,
    cache: Arc<SnapshotCache>,
    refresh: Notify,
    running: AtomicBool,
}

impl Scheduler {
    /// Build providers from the configured feed list.
    pub fn new(cfg: AggregatorConfig, cache: Arc<SnapshotCache>) -> Arc<Self> {
        let provs = cfg
            .feeds
            .iter()
            .map(|f| Arc::from(providers::build(f)))
            .collect();
        Self::with_providers(cfg, cache, provs)
    }

    /// Inject providers directly; used by tests and fixture setups.
    pub fn with_providers(
        cfg: AggregatorConfig,
        cache: Arc<SnapshotCache>,
        providers: Vec<Arc<dyn FeedProvider>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            providers,
            cfg,
            cache,
            refresh: Notify::new(),
            running: AtomicBool::new(false),
        })
    }

    /// Fire-and-forget manual refresh. Never cancels an in-flight cycle;
    /// requests arriving mid-cycle coalesce into one immediate follow-up.
    pub fn trigger_refresh(&self) {
        self.refresh.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    /// Spawn the scheduling loop. The first cycle runs immediately, so the
    /// snapshot is rebuilt from scratch on startup (no persisted state).
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.cfg.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = self.refresh.notified() => {}
                }

                self.running.store(true, Ordering::Relaxed);
                let outcome = run_cycle(&self.providers, &self.cfg, &self.cache).await;
                self.running.store(false, Ordering::Relaxed);

                tracing::debug!(published = outcome.published(), "scheduler cycle done");
            }
        })
    }
}
