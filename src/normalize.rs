//! # Normalizer
//! Maps provider-specific `RawItem`s into the common record shape: cleans
//! markup out of text fields, enforces length caps, and derives a canonical
//! UTC timestamp. Items missing a title or a parseable timestamp are dropped
//! (an expected filtering outcome, not an error).
//!
//! Deterministic: the same raw item always normalizes to the same output.

use chrono::{DateTime, TimeZone, Utc};
use time::format_description::well_known::Rfc2822;
use time::{OffsetDateTime, UtcOffset};

use crate::ingest::types::RawItem;

/// Title cap in characters; longer titles are truncated, not rejected.
pub const MAX_TITLE_CHARS: usize = 300;
/// Summary cap in characters.
pub const MAX_SUMMARY_CHARS: usize = 1500;

/// Why the normalizer dropped an item. Not an error — dropped items are
/// counted and logged at debug level, never surfaced to readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingTitle,
    UnparseableTimestamp,
}

/// A normalized item before categorization and fingerprinting.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedItem {
    pub title: String,
    pub summary: String,
    pub source_name: String,
    pub source_url: String,
    pub published_at: DateTime<Utc>,
}

/// Normalize one raw item from the named feed.
pub fn normalize(raw: &RawItem, source_name: &str) -> Result<NormalizedItem, DropReason> {
    let title = clean_text(raw.title.as_deref().unwrap_or_default(), MAX_TITLE_CHARS);
    if title.is_empty() {
        return Err(DropReason::MissingTitle);
    }

    let published_at = raw
        .published
        .as_deref()
        .and_then(parse_timestamp)
        .ok_or(DropReason::UnparseableTimestamp)?;

    let summary = clean_text(
        raw.summary.as_deref().unwrap_or_default(),
        MAX_SUMMARY_CHARS,
    );

    Ok(NormalizedItem {
        title,
        summary,
        source_name: source_name.to_string(),
        source_url: raw.link.clone().unwrap_or_default(),
        published_at,
    })
}

/// Clean text: decode HTML entities, strip tags and control characters,
/// fold typographic quotes to ASCII, collapse whitespace, cap length.
pub fn clean_text(s: &str, max_chars: usize) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Fold “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Drop control characters (keep plain whitespace for the collapse step)
    out.retain(|c| !c.is_control() || c == ' ' || c == '\t' || c == '\n');

    // 5) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 6) Length cap (truncate, never reject)
    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect();
        out = out.trim_end().to_string();
    }

    out
}

/// Parse a provider timestamp into canonical UTC.
///
/// RSS 2.0 uses RFC 2822 (`Tue, 03 Jun 2025 09:00:00 GMT`), Atom uses
/// RFC 3339 (`2025-06-03T09:00:00Z`); both are accepted from any provider.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }

    if let Ok(dt) = OffsetDateTime::parse(ts, &Rfc2822) {
        let unix = dt.to_offset(UtcOffset::UTC).unix_timestamp();
        return Utc.timestamp_opt(unix, 0).single();
    }

    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
