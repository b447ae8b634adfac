//! # Deduplicator
//! Collapses records that describe the same underlying event across sources.
//!
//! Two mechanisms, run once per cycle over the union of all adapters' output:
//! 1. Exact fingerprint: SHA-256 over (normalized lowercased title with
//!    whitespace collapsed, source domain, publish time rounded to a bucket).
//!    Catches provider-side duplicates and repeat entries from one feed.
//! 2. Fuzzy pass within one time bucket: titles that are identical or
//!    Jaro-Winkler similar above a threshold merge regardless of domain.
//!    This is what turns "five feeds report the same campaign" into one
//!    record.
//!
//! Bucket width and similarity threshold are policy parameters, configurable
//! because the right values are a product decision (defaults: 6 h, 0.90).

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::record::IntelRecord;

#[derive(Debug, Clone, Copy)]
pub struct DedupConfig {
    /// Width of the publish-time bucket in seconds.
    pub bucket_secs: u64,
    /// Jaro-Winkler threshold for the cross-domain fuzzy pass, in [0, 1].
    pub title_similarity: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            bucket_secs: 6 * 3600,
            title_similarity: 0.90,
        }
    }
}

/// Lowercase a title and collapse runs of whitespace to single spaces.
pub fn normalize_title(title: &str) -> String {
    title.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract the host from a URL, without scheme or a leading `www.`.
/// Returns an empty string for unparseable input (still hashes stably).
pub fn source_domain(url: &str) -> String {
    let rest = url.split("://").nth(1).unwrap_or(url);
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = host.split('@').last().unwrap_or_default(); // strip userinfo
    let host = host.split(':').next().unwrap_or_default(); // strip port
    host.trim().to_lowercase().trim_start_matches("www.").to_string()
}

/// Bucket index for a publish timestamp (floor division).
fn bucket_index(unix_secs: i64, bucket_secs: u64) -> i64 {
    unix_secs.div_euclid(bucket_secs.max(1) as i64)
}

/// Stable fingerprint for one record: hex SHA-256 over normalized title,
/// source domain, and the publish-time bucket. This is the record `id`.
pub fn fingerprint(title: &str, source_url: &str, published_unix: i64, bucket_secs: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_title(title).as_bytes());
    hasher.update([0u8]);
    hasher.update(source_domain(source_url).as_bytes());
    hasher.update([0u8]);
    hasher.update(bucket_index(published_unix, bucket_secs).to_be_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Merge `other` into `base`: earliest timestamps, category union, summed
/// source count, longest summary as representative text.
fn merge_into(base: &mut IntelRecord, other: IntelRecord) {
    if other.published_at < base.published_at {
        base.published_at = other.published_at;
    }
    if other.first_seen_at < base.first_seen_at {
        base.first_seen_at = other.first_seen_at;
    }
    if other.first_seen_generation < base.first_seen_generation {
        base.first_seen_generation = other.first_seen_generation;
    }
    if other.summary.chars().count() > base.summary.chars().count() {
        base.summary = other.summary;
    }
    base.categories.extend(other.categories);
    base.merged_source_count += other.merged_source_count;
}

/// Deduplicate one cycle's worth of records.
///
/// Output order is deterministic: `published_at` ascending, ties by `id`;
/// the snapshot cache applies display ordering itself.
pub fn deduplicate(records: Vec<IntelRecord>, cfg: &DedupConfig) -> Vec<IntelRecord> {
    // Deterministic processing order; also makes the earliest record in any
    // duplicate group the merge base.
    let mut records = records;
    records.sort_by(|a, b| {
        a.published_at
            .cmp(&b.published_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    // Pass 1: exact fingerprint (the record id).
    let mut by_id: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<IntelRecord> = Vec::with_capacity(records.len());
    for rec in records {
        match by_id.get(&rec.id) {
            Some(&idx) => merge_into(&mut merged[idx], rec),
            None => {
                by_id.insert(rec.id.clone(), merged.len());
                merged.push(rec);
            }
        }
    }

    // Pass 2: fuzzy title match within the same bucket, across domains.
    let mut out: Vec<IntelRecord> = Vec::with_capacity(merged.len());
    for rec in merged {
        let rec_bucket = bucket_index(rec.published_at.timestamp(), cfg.bucket_secs);
        let rec_title = normalize_title(&rec.title);

        let target = out.iter_mut().find(|kept| {
            bucket_index(kept.published_at.timestamp(), cfg.bucket_secs) == rec_bucket
                && titles_match(&normalize_title(&kept.title), &rec_title, cfg.title_similarity)
        });
        match target {
            Some(kept) => merge_into(kept, rec),
            None => out.push(rec),
        }
    }

    out
}

fn titles_match(a: &str, b: &str, threshold: f64) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || strsim::jaro_winkler(a, b) >= threshold
}
