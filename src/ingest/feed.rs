//! Per-stock news feed adapter.
//!
//! Talks to a JSON feed endpoint that returns recent articles for one
//! stock code. Articles older than the feed window are dropped; items
//! whose timestamp cannot be parsed are kept.

use super::{parse_publish_time, truncate_chars, SourceAdapter};
use crate::config::FeedConfig;
use crate::error::Result;
use crate::types::{RawNewsItem, StockIdent};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;

/// Articles older than this are stale for sentiment purposes.
const FEED_MAX_AGE_DAYS: i64 = 5;

/// Per-item content cap before prompt assembly.
const MAX_CONTENT_CHARS: usize = 1000;

pub struct FeedAdapter {
    http: Client,
    base_url: String,
    search_depth: usize,
}

#[derive(Debug, Deserialize)]
struct FeedArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    publish_time: String,
    #[serde(default)]
    source: Option<String>,
}

impl FeedAdapter {
    pub fn new(config: &FeedConfig, search_depth: usize) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            search_depth,
        })
    }
}

#[async_trait]
impl SourceAdapter for FeedAdapter {
    fn name(&self) -> &str {
        "feed"
    }

    async fn fetch(&self, stock: &StockIdent) -> Result<Vec<RawNewsItem>> {
        let url = format!("{}/news", self.base_url);
        let articles: Vec<FeedArticle> = self
            .http
            .get(&url)
            .query(&[("code", stock.code.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let cutoff = Utc::now() - Duration::days(FEED_MAX_AGE_DAYS);
        let items: Vec<RawNewsItem> = articles
            .into_iter()
            .filter_map(|a| {
                let published_at = parse_publish_time(&a.publish_time);
                // Unparseable timestamps pass through; only confirmed
                // stale articles are dropped.
                if matches!(published_at, Some(ts) if ts < cutoff) {
                    return None;
                }
                Some(RawNewsItem {
                    title: a.title,
                    content: truncate_chars(&a.content, MAX_CONTENT_CHARS),
                    url: a.url,
                    published_at,
                    source: a.source.unwrap_or_else(|| "feed".to_string()),
                })
            })
            .take(self.search_depth)
            .collect();

        tracing::debug!(
            "feed returned {} recent articles for {}",
            items.len(),
            stock.code
        );
        Ok(items)
    }
}
