// src/ingest/config.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::dedup::DedupConfig;

const ENV_PATH: &str = "INTEL_CONFIG_PATH";

/// Parser variant for one configured feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    #[default]
    Rss,
    Atom,
}

/// One external feed: display name, endpoint, and payload format.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub kind: FeedKind,
}

/// Aggregator configuration, loaded from TOML or JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Seconds between periodic cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Per-adapter fetch timeout, seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Dedup time-bucket width, seconds.
    #[serde(default = "default_dedup_bucket_secs")]
    pub dedup_bucket_secs: u64,
    /// Jaro-Winkler threshold for cross-domain title merging.
    #[serde(default = "default_title_similarity")]
    pub title_similarity: f64,
    /// Fetch attempts per adapter per cycle (retries only transient errors).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

fn default_interval_secs() -> u64 {
    600
}
fn default_fetch_timeout_secs() -> u64 {
    10
}
fn default_dedup_bucket_secs() -> u64 {
    6 * 3600
}
fn default_title_similarity() -> f64 {
    0.90
}
fn default_max_attempts() -> u32 {
    2
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            dedup_bucket_secs: default_dedup_bucket_secs(),
            title_similarity: default_title_similarity(),
            max_attempts: default_max_attempts(),
            feeds: Vec::new(),
        }
    }
}

impl AggregatorConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn dedup(&self) -> DedupConfig {
        DedupConfig {
            bucket_secs: self.dedup_bucket_secs,
            title_similarity: self.title_similarity,
        }
    }

    /// Load from an explicit path. Supports TOML or JSON.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_config(&content, ext.as_str())
    }

    /// Load using env var + fallbacks:
    /// 1) $INTEL_CONFIG_PATH
    /// 2) config/feeds.toml
    /// 3) config/feeds.json
    /// 4) built-in production feed set
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("INTEL_CONFIG_PATH points to non-existent path"));
            }
        }
        let toml_p = PathBuf::from("config/feeds.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/feeds.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default_seed())
    }

    /// The production feed set served when no config file is present.
    pub fn default_seed() -> Self {
        let feeds = [
            ("BleepingComputer Ransomware", "https://www.bleepingcomputer.com/tag/ransomware/feed/", FeedKind::Rss),
            ("The Hacker News Vulnerabilities", "https://thehackernews.com/feeds/posts/default/-/Vulnerability", FeedKind::Atom),
            ("Packet Storm Vulnerabilities", "https://packetstormsecurity.com/files/tags/vulnerabilities/feed", FeedKind::Rss),
            ("BleepingComputer Data Breaches", "https://www.bleepingcomputer.com/tag/data-breach/feed/", FeedKind::Rss),
            ("DataBreaches.net", "https://www.databreaches.net/feed/", FeedKind::Rss),
            ("The Hacker News APT", "https://thehackernews.com/feeds/posts/default/-/APT", FeedKind::Atom),
            ("BleepingComputer Phishing", "https://www.bleepingcomputer.com/tag/phishing/feed/", FeedKind::Rss),
            ("The Hacker News Phishing", "https://thehackernews.com/feeds/posts/default/-/Phishing", FeedKind::Atom),
            ("Google Cloud Security Blog", "https://cloud.google.com/blog/topics/security/rss/", FeedKind::Rss),
            ("BleepingComputer Malware", "https://www.bleepingcomputer.com/tag/malware/feed/", FeedKind::Rss),
        ];
        Self {
            feeds: feeds
                .into_iter()
                .map(|(name, url, kind)| FeedConfig {
                    name: name.to_string(),
                    url: url.to_string(),
                    kind,
                })
                .collect(),
            ..Self::default()
        }
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AggregatorConfig> {
    let try_toml = hint_ext == "toml" || s.contains("[[feeds]]");
    if try_toml {
        if let Ok(v) = toml::from_str(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = serde_json::from_str(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = toml::from_str(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported config format"))
}
