use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::providers::{http_get, scrub_html_entities_for_xml};
use crate::ingest::types::{FeedProvider, FetchError, RawItem};

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    title: Option<Text>,
    #[serde(rename = "link", default)]
    link: Vec<Link>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<Text>,
    content: Option<Text>,
}

/// Atom text constructs carry a `type` attribute; only the text matters here.
#[derive(Debug, Deserialize)]
struct Text {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@rel")]
    rel: Option<String>,
    #[serde(rename = "@href")]
    href: Option<String>,
}

/// Atom feed adapter (e.g. Blogger-hosted security feeds).
pub struct AtomProvider {
    name: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl AtomProvider {
    pub fn from_url(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            mode: Mode::Http {
                url: url.to_string(),
                client: reqwest::Client::new(),
            },
        }
    }

    /// Parse from an in-memory payload; used by tests and fixtures.
    pub fn from_fixture(name: &str, xml: &str) -> Self {
        Self {
            name: name.to_string(),
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    fn parse_items(&self, body: &str) -> Result<Vec<RawItem>, FetchError> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(body);
        let feed: Feed =
            from_str(&xml_clean).map_err(|e| FetchError::Malformed(format!("atom: {e}")))?;

        let out: Vec<RawItem> = feed
            .entry
            .into_iter()
            .map(|e| RawItem {
                title: e.title.and_then(|t| t.value),
                link: pick_link(&e.link),
                summary: e
                    .summary
                    .and_then(|t| t.value)
                    .or(e.content.and_then(|t| t.value)),
                // `published` is optional in Atom; `updated` is mandatory.
                published: e.published.or(e.updated),
            })
            .collect();

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("intel_fetch_ms").record(ms);
        counter!("intel_items_total").increment(out.len() as u64);
        Ok(out)
    }
}

/// Prefer the `alternate` link (or one without a rel), falling back to any.
fn pick_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .and_then(|l| l.href.clone())
}

#[async_trait]
impl FeedProvider for AtomProvider {
    async fn fetch(&self, timeout: Duration) -> Result<Vec<RawItem>, FetchError> {
        match &self.mode {
            Mode::Fixture(xml) => self.parse_items(xml),
            Mode::Http { url, client } => {
                let body = http_get(client, url, timeout, &self.name).await?;
                self.parse_items(&body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
