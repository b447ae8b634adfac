//! # Snapshot Cache
//! Holds the current merged, categorized, deduplicated record set and serves
//! concurrent readers a consistent view while the next generation is built
//! in the background.
//!
//! The only shared mutable state is the pointer to the current `Snapshot`,
//! swapped by the scheduler at the end of a successful cycle. Readers clone
//! the `Arc` and keep their generation for as long as they need it; a reader
//! mid-request while a new generation publishes is unaffected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;

use crate::record::{Category, IntelRecord, Snapshot};

#[derive(Debug)]
pub struct SnapshotCache {
    current: RwLock<Arc<Snapshot>>,
    last_cycle_degraded: AtomicBool,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotCache {
    /// Start at generation 0 with no records; the first successful cycle
    /// publishes generation 1.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
            last_cycle_degraded: AtomicBool::new(false),
        }
    }

    /// Latest published generation. Never blocks on an in-progress cycle.
    pub fn current(&self) -> Arc<Snapshot> {
        self.current.read().expect("snapshot rwlock poisoned").clone()
    }

    /// Publish a new generation built from one cycle's deduplicated output.
    ///
    /// Records whose fingerprint already existed in the prior generation
    /// inherit its `first_seen_at`/`first_seen_generation`, so "new since
    /// generation G" stays meaningful across refreshes. Only the scheduler
    /// calls this; generations are strictly increasing.
    pub fn publish(&self, mut records: Vec<IntelRecord>) -> u64 {
        let prior = self.current();
        let generation = prior.generation + 1;

        for rec in records.iter_mut() {
            if let Some(seen) = prior.records.iter().find(|p| p.id == rec.id) {
                rec.first_seen_at = seen.first_seen_at.min(rec.first_seen_at);
                rec.first_seen_generation = seen.first_seen_generation;
            } else {
                rec.first_seen_generation = generation;
            }
        }

        sort_display(&mut records);

        let next = Arc::new(Snapshot {
            generation,
            built_at: Utc::now(),
            records,
        });

        let mut cur = self.current.write().expect("snapshot rwlock poisoned");
        *cur = next;
        generation
    }

    pub fn set_last_cycle_degraded(&self, degraded: bool) {
        self.last_cycle_degraded.store(degraded, Ordering::Relaxed);
    }

    pub fn last_cycle_degraded(&self) -> bool {
        self.last_cycle_degraded.load(Ordering::Relaxed)
    }
}

/// Display order: `published_at` descending, ties by `id` ascending.
fn sort_display(records: &mut [IntelRecord]) {
    records.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Case-insensitive substring match over title, summary, and source name.
/// An empty query matches everything.
pub fn filter<'a>(snapshot: &'a Snapshot, query: &str) -> Vec<&'a IntelRecord> {
    let q = query.trim().to_lowercase();
    snapshot
        .records
        .iter()
        .filter(|r| {
            q.is_empty()
                || r.title.to_lowercase().contains(&q)
                || r.summary.to_lowercase().contains(&q)
                || r.source_name.to_lowercase().contains(&q)
        })
        .collect()
}

/// All records carrying the given category tag, in display order.
pub fn by_category<'a>(snapshot: &'a Snapshot, category: Category) -> Vec<&'a IntelRecord> {
    snapshot
        .records
        .iter()
        .filter(|r| r.categories.contains(&category))
        .collect()
}

/// Records first seen after generation `since` — the delta the notification
/// collaborator polls for. The core never sends emails itself.
pub fn delta_since<'a>(snapshot: &'a Snapshot, since: u64) -> Vec<&'a IntelRecord> {
    snapshot
        .records
        .iter()
        .filter(|r| r.first_seen_generation > since)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    fn rec(id: &str, title: &str, unix: i64, cat: Category) -> IntelRecord {
        IntelRecord {
            id: id.to_string(),
            title: title.to_string(),
            summary: format!("summary of {title}"),
            source_name: "FeedA".to_string(),
            source_url: "https://a.com/x".to_string(),
            published_at: Utc.timestamp_opt(unix, 0).unwrap(),
            categories: BTreeSet::from([cat]),
            first_seen_at: Utc.timestamp_opt(unix, 0).unwrap(),
            first_seen_generation: 0,
            merged_source_count: 1,
        }
    }

    #[test]
    fn publish_bumps_generation_and_sorts_display_order() {
        let cache = SnapshotCache::new();
        assert_eq!(cache.current().generation, 0);

        let g = cache.publish(vec![
            rec("bbb", "older", 1000, Category::Phishing),
            rec("aaa", "tied", 2000, Category::Ransomware),
            rec("ccc", "tied", 2000, Category::Ransomware),
        ]);
        assert_eq!(g, 1);

        let snap = cache.current();
        assert_eq!(snap.generation, 1);
        let ids: Vec<_> = snap.records.iter().map(|r| r.id.as_str()).collect();
        // published_at desc, ties broken by id asc
        assert_eq!(ids, vec!["aaa", "ccc", "bbb"]);
    }

    #[test]
    fn readers_keep_their_generation_across_publish() {
        let cache = SnapshotCache::new();
        cache.publish(vec![rec("a", "one", 1000, Category::Phishing)]);

        let held = cache.current();
        cache.publish(vec![rec("a", "one", 1000, Category::Phishing)]);

        assert_eq!(held.generation, 1);
        assert_eq!(cache.current().generation, 2);
    }

    #[test]
    fn first_seen_is_inherited_for_known_fingerprints() {
        let cache = SnapshotCache::new();
        cache.publish(vec![rec("a", "one", 1000, Category::Phishing)]);

        let mut again = rec("a", "one", 1000, Category::Phishing);
        again.first_seen_at = Utc.timestamp_opt(9000, 0).unwrap();
        let fresh = rec("b", "two", 1500, Category::Apt);
        cache.publish(vec![again, fresh]);

        let snap = cache.current();
        let a = snap.records.iter().find(|r| r.id == "a").unwrap();
        let b = snap.records.iter().find(|r| r.id == "b").unwrap();
        assert_eq!(a.first_seen_generation, 1);
        assert_eq!(a.first_seen_at.timestamp(), 1000);
        assert_eq!(b.first_seen_generation, 2);
    }

    #[test]
    fn filter_matches_title_summary_and_source() {
        let cache = SnapshotCache::new();
        cache.publish(vec![
            rec("a", "LockBit hits HealthCo", 1000, Category::Ransomware),
            rec("b", "Quiet day", 2000, Category::Uncategorized),
        ]);
        let snap = cache.current();

        assert_eq!(filter(&snap, "lockbit").len(), 1);
        assert_eq!(filter(&snap, "summary of").len(), 2); // summary hit
        assert_eq!(filter(&snap, "feeda").len(), 2); // source hit
        assert_eq!(filter(&snap, "").len(), 2);
        assert!(filter(&snap, "no-such-term").is_empty());
    }

    #[test]
    fn by_category_filters_and_keeps_order() {
        let cache = SnapshotCache::new();
        cache.publish(vec![
            rec("a", "one", 1000, Category::Phishing),
            rec("b", "two", 3000, Category::Phishing),
            rec("c", "three", 2000, Category::Apt),
        ]);
        let snap = cache.current();
        let hits = by_category(&snap, Category::Phishing);
        let ids: Vec<_> = hits.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn delta_since_returns_only_new_fingerprints() {
        let cache = SnapshotCache::new();
        cache.publish(vec![rec("a", "one", 1000, Category::Phishing)]);
        cache.publish(vec![
            rec("a", "one", 1000, Category::Phishing),
            rec("b", "two", 1500, Category::Apt),
        ]);

        let snap = cache.current();
        let fresh = delta_since(&snap, 1);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].id, "b");
        assert!(delta_since(&snap, 2).is_empty());
    }
}
