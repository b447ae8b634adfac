//! # Canonical records
//! The common record shape every feed item is normalized into, plus the
//! immutable published `Snapshot` that readers consume.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Threat categories assigned by the rule-based categorizer.
///
/// The set is fixed; items matching nothing fall back to `Uncategorized`
/// rather than being dropped.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Category {
    Ransomware,
    Vulnerabilities,
    #[serde(rename = "Data Breaches")]
    DataBreaches,
    #[serde(rename = "APT")]
    Apt,
    Phishing,
    #[serde(rename = "Cloud/SaaS")]
    CloudSaas,
    #[serde(rename = "Malware/Tools")]
    MalwareTools,
    Uncategorized,
}

impl Category {
    /// All categories in display order (tabs in the UI collaborator).
    pub const ALL: [Category; 8] = [
        Category::Ransomware,
        Category::Vulnerabilities,
        Category::DataBreaches,
        Category::Apt,
        Category::Phishing,
        Category::CloudSaas,
        Category::MalwareTools,
        Category::Uncategorized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Ransomware => "Ransomware",
            Category::Vulnerabilities => "Vulnerabilities",
            Category::DataBreaches => "Data Breaches",
            Category::Apt => "APT",
            Category::Phishing => "Phishing",
            Category::CloudSaas => "Cloud/SaaS",
            Category::MalwareTools => "Malware/Tools",
            Category::Uncategorized => "Uncategorized",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive parse; accepts the display names used by the API.
impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or(())
    }
}

/// One aggregated intel item, the canonical unit served to readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelRecord {
    /// Stable fingerprint (hex SHA-256), identical across refresh cycles
    /// for the same real-world event.
    pub id: String,
    pub title: String,
    pub summary: String,
    pub source_name: String,
    pub source_url: String,
    /// Canonical publish time, UTC.
    pub published_at: DateTime<Utc>,
    /// Never empty after categorization.
    pub categories: BTreeSet<Category>,
    /// When the aggregator first saw this fingerprint (carried across cycles).
    pub first_seen_at: DateTime<Utc>,
    /// Generation in which this fingerprint first appeared.
    pub first_seen_generation: u64,
    /// How many raw items were collapsed into this record in the last cycle.
    pub merged_source_count: u32,
}

/// One immutable, versioned published state of the aggregated record set.
///
/// Created by a completed cycle, published atomically, never mutated after
/// publication. Readers may hold different generations concurrently.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub generation: u64,
    pub built_at: DateTime<Utc>,
    pub records: Vec<IntelRecord>,
}

impl Snapshot {
    /// The initial, pre-first-cycle snapshot (generation 0, no records).
    pub fn empty() -> Self {
        Self {
            generation: 0,
            built_at: Utc::now(),
            records: Vec::new(),
        }
    }
}
