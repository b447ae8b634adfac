use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::providers::{http_get, scrub_html_entities_for_xml};
use crate::ingest::types::{FeedProvider, FetchError, RawItem};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// RSS 2.0 feed adapter.
pub struct RssProvider {
    name: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssProvider {
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
        let rss: Rss =
            from_str(&xml_clean).map_err(|e| FetchError::Malformed(format!("rss: {e}")))?;

        let out: Vec<RawItem> = rss
            .channel
            .item
            .into_iter()
            .map(|it| RawItem {
                title: it.title,
                link: it.link,
                summary: it.description,
                published: it.pub_date,
            })
            .collect();

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("intel_fetch_ms").record(ms);
        counter!("intel_items_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl FeedProvider for RssProvider {
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
