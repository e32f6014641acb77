use std::future::Future;
use std::time::Duration;

use feed_rs::model::{Entry, Feed};
use feed_rs::parser;
use reqwest::Client;
use tracing::{debug, info};

use crate::error::FetchError;
use crate::report::Article;

/// Turns a feed URL into a parsed feed, or fails.
///
/// Implementations must be safe to call concurrently with different URLs.
pub trait FeedFetcher: Send + Sync + 'static {
    fn fetch_feed(&self, url: &str) -> impl Future<Output = Result<Feed, FetchError>> + Send;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }
}

impl FeedFetcher for HttpFetcher {
    async fn fetch_feed(&self, url: &str) -> Result<Feed, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        debug!("Fetched {} bytes from {}", bytes.len(), url);

        Ok(parser::parse(&bytes[..])?)
    }
}

/// Fetch one source and normalize its first `limit` entries.
pub async fn fetch_articles<F: FeedFetcher>(
    fetcher: &F,
    source: &str,
    url: &str,
    limit: usize,
) -> Result<Vec<Article>, FetchError> {
    info!("Fetching feed: {} ({})", source, url);
    let feed = fetcher.fetch_feed(url).await?;
    Ok(articles_from_feed(source, &feed, limit))
}

pub fn articles_from_feed(source: &str, feed: &Feed, limit: usize) -> Vec<Article> {
    feed.entries
        .iter()
        .take(limit)
        .map(|entry| article_from_entry(source, entry))
        .collect()
}

fn article_from_entry(source: &str, entry: &Entry) -> Article {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.clone())
        .unwrap_or_default();

    let url = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_default();

    Article {
        source: source.to_string(),
        title,
        url,
        summary: entry_summary(entry),
    }
}

/// The entry description, or its content body when the description is empty.
pub fn entry_summary(entry: &Entry) -> String {
    match entry.summary.as_ref().map(|s| s.content.as_str()) {
        Some(summary) if !summary.is_empty() => summary.to_string(),
        _ => entry
            .content
            .as_ref()
            .and_then(|c| c.body.clone())
            .unwrap_or_default(),
    }
}
