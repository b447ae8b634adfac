//! # Categorizer
//! Rule-based, multi-label threat categorization.
//!
//! A fixed, ordered table of `(category, keyword set)` is evaluated against
//! the lowercased concatenation of title + summary. Every category with at
//! least one matching keyword is assigned — real intel items frequently span
//! multiple threat types (a phishing campaign delivering ransomware gets
//! both tags). Items matching nothing get `Uncategorized`.
//!
//! Pure function of its input; no state between calls.

use std::collections::BTreeSet;

use crate::record::Category;

/// Ordered rule table. Order is fixed so evaluation is deterministic;
/// membership does not depend on it because matching is multi-label.
const RULES: &[(Category, &[&str])] = &[
    (
        Category::Ransomware,
        &[
            "ransomware",
            "ransom",
            "lockbit",
            "blackcat",
            "alphv",
            "extortion",
            "encryptor",
            "double extortion",
        ],
    ),
    (
        Category::Vulnerabilities,
        &[
            "vulnerability",
            "vulnerabilities",
            "cve-",
            "zero-day",
            "0-day",
            "exploit",
            "rce",
            "remote code execution",
            "privilege escalation",
            "patch tuesday",
            "security update",
        ],
    ),
    (
        Category::DataBreaches,
        &[
            "data breach",
            "breach",
            "leaked",
            "data leak",
            "exposed database",
            "stolen data",
            "exfiltrat",
        ],
    ),
    (
        Category::Apt,
        &[
            "apt",
            "nation-state",
            "state-sponsored",
            "espionage",
            "lazarus",
            "apt28",
            "apt29",
            "threat actor group",
        ],
    ),
    (
        Category::Phishing,
        &[
            "phishing",
            "spearphishing",
            "spear-phishing",
            "credential harvest",
            "business email compromise",
            "bec",
            "smishing",
        ],
    ),
    (
        Category::CloudSaas,
        &[
            "cloud",
            "saas",
            "aws",
            "azure",
            "google cloud",
            "gcp",
            "kubernetes",
            "oauth",
            "okta",
            "microsoft 365",
            "m365",
        ],
    ),
    (
        Category::MalwareTools,
        &[
            "malware",
            "trojan",
            "botnet",
            "infostealer",
            "stealer",
            "loader",
            "backdoor",
            "rootkit",
            "spyware",
            "rat",
            "c2 framework",
        ],
    ),
];

/// Assign categories by keyword match over lowercased `title` + `summary`.
///
/// Keywords shorter than four characters (e.g. "apt", "bec", "rat", "rce")
/// only match on word boundaries so they do not fire inside unrelated words
/// like "adaptive" or "decorate".
pub fn categorize(title: &str, summary: &str) -> BTreeSet<Category> {
    let haystack = format!("{} {}", title, summary).to_lowercase();
    let mut out = BTreeSet::new();

    for (cat, keywords) in RULES {
        let hit = keywords.iter().any(|kw| {
            if kw.len() < 4 {
                word_match(&haystack, kw)
            } else {
                haystack.contains(kw)
            }
        });
        if hit {
            out.insert(*cat);
        }
    }

    if out.is_empty() {
        out.insert(Category::Uncategorized);
    }
    out
}

/// Whole-word containment check for short keywords.
fn word_match(haystack: &str, word: &str) -> bool {
    haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|tok| tok == word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_label_when_item_spans_threat_types() {
        let cats = categorize(
            "Phishing campaign delivers LockBit ransomware",
            "Spearphishing emails drop an encryptor on victim hosts.",
        );
        assert!(cats.contains(&Category::Phishing));
        assert!(cats.contains(&Category::Ransomware));
        assert!(!cats.contains(&Category::Uncategorized));
    }

    #[test]
    fn uncategorized_fallback_when_nothing_matches() {
        let cats = categorize("Quarterly newsletter", "Conference dates announced.");
        assert_eq!(cats.len(), 1);
        assert!(cats.contains(&Category::Uncategorized));
    }

    #[test]
    fn short_keywords_need_word_boundaries() {
        // "rat" must not fire inside "decorate", "apt" not inside "adaptive".
        let cats = categorize("Adaptive UI helps you decorate faster", "");
        assert!(cats.contains(&Category::Uncategorized));

        let cats = categorize("New RAT spotted in the wild", "");
        assert!(cats.contains(&Category::MalwareTools));
    }

    #[test]
    fn cve_ids_map_to_vulnerabilities() {
        let cats = categorize("CVE-2026-12345 under active exploitation", "");
        assert!(cats.contains(&Category::Vulnerabilities));
    }

    #[test]
    fn categorize_is_idempotent() {
        let a = categorize("Cloud breach exposes data", "AWS bucket leaked records");
        let b = categorize("Cloud breach exposes data", "AWS bucket leaked records");
        assert_eq!(a, b);
    }
}
