// src/ingest/providers/mod.rs
//
// One provider per configured feed. Two parser variants cover the feed
// ecosystem: RSS 2.0 (`rss`) and Atom (`atom`); both expose an HTTP mode for
// production and a fixture mode fed from a string payload for tests.
pub mod atom;
pub mod rss;

use std::time::Duration;

use crate::ingest::config::{FeedConfig, FeedKind};
use crate::ingest::types::{FeedProvider, FetchError};

/// Build the concrete provider for one configured feed.
pub fn build(feed: &FeedConfig) -> Box<dyn FeedProvider> {
    match feed.kind {
        FeedKind::Rss => Box::new(rss::RssProvider::from_url(&feed.name, &feed.url)),
        FeedKind::Atom => Box::new(atom::AtomProvider::from_url(&feed.name, &feed.url)),
    }
}

/// Fetch a feed body over HTTP, mapping transport failures onto the typed
/// adapter error taxonomy. Honors the caller-supplied timeout per request.
pub(crate) async fn http_get(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    provider: &str,
) -> Result<String, FetchError> {
    let resp = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_reqwest(e, timeout))?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::RateLimited);
    }
    if !resp.status().is_success() {
        return Err(FetchError::Unreachable(format!(
            "{provider}: HTTP {}",
            resp.status()
        )));
    }

    resp.text()
        .await
        .map_err(|e| classify_reqwest(e, timeout))
}

fn classify_reqwest(e: reqwest::Error, timeout: Duration) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(timeout)
    } else if e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
        FetchError::RateLimited
    } else {
        FetchError::Unreachable(e.to_string())
    }
}

/// Replace HTML entities that are not valid XML entities before handing the
/// document to the XML parser (feeds routinely embed them unescaped).
pub(crate) fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
