//! Web-search adapter.
//!
//! Drives a self-hosted search/scrape deployment: a `/search` call per
//! stock first, and when that comes back empty, a `/scrape` pass over
//! the configured board pages with link mining on the returned
//! markdown or HTML. Degrades to an empty result rather than failing;
//! the board pages are noisy and any one of them going away is routine.

use super::{truncate_chars, SourceAdapter};
use crate::config::SearchConfig;
use crate::error::Result;
use crate::types::{RawNewsItem, StockIdent};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Url};
use serde_json::Value;

const MAX_CONTENT_CHARS: usize = 1000;

/// Cap on link matches mined per pattern per page.
const MAX_MATCHES_PER_PATTERN: usize = 15;

/// Cap on total mined posts per stock.
const MAX_MINED_POSTS: usize = 20;

static MARKDOWN_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\[([^\]]+)\]\((/?[^)\s"]*news[^)\s"]*)\)"#).unwrap());
static HTML_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a[^>]*href="([^"]*news[^"]*)"[^>]*>([^<]+)</a>"#).unwrap());

pub struct SearchAdapter {
    http: Client,
    base_url: String,
    board_url_templates: Vec<String>,
    search_depth: usize,
}

impl SearchAdapter {
    pub fn new(config: &SearchConfig, search_depth: usize) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            board_url_templates: config.board_url_templates.clone(),
            search_depth,
        })
    }

    async fn search(&self, stock: &StockIdent) -> Vec<RawNewsItem> {
        let query = format!("{} {} stock news analysis", stock.name, stock.code);
        let url = format!("{}/search", self.base_url);

        let resp = match self
            .http
            .post(&url)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("search request failed for '{}': {}", query, e);
                return Vec::new();
            }
        };

        if !resp.status().is_success() {
            tracing::warn!("search returned {} for '{}'", resp.status(), query);
            return Vec::new();
        }

        let body: Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("failed to parse search results for '{}': {}", query, e);
                return Vec::new();
            }
        };

        let results = body["data"].as_array().cloned().unwrap_or_default();
        results
            .iter()
            .take(self.search_depth)
            .map(|item| RawNewsItem {
                title: item["title"].as_str().unwrap_or_default().to_string(),
                content: truncate_chars(
                    item["content"].as_str().unwrap_or_default(),
                    MAX_CONTENT_CHARS,
                ),
                url: item["url"].as_str().unwrap_or_default().to_string(),
                published_at: item["publishedAt"]
                    .as_str()
                    .and_then(super::parse_publish_time),
                source: "web_search".to_string(),
            })
            .collect()
    }

    /// Scrape the configured board pages and mine post links out of the
    /// returned markdown or HTML.
    async fn scrape_boards(&self, stock: &StockIdent) -> Vec<RawNewsItem> {
        let mut posts = Vec::new();
        let mut seen_urls = std::collections::HashSet::new();
        let url = format!("{}/scrape", self.base_url);

        for template in &self.board_url_templates {
            let page_url = template.replace("{code}", &stock.code);

            let resp = match self
                .http
                .post(&url)
                .json(&serde_json::json!({ "url": page_url }))
                .send()
                .await
            {
                Ok(r) if r.status().is_success() => r,
                Ok(r) => {
                    tracing::warn!("scrape returned {} for {}", r.status(), page_url);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("scrape request failed for {}: {}", page_url, e);
                    continue;
                }
            };

            let body: Value = match resp.json().await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!("failed to parse scrape result for {}: {}", page_url, e);
                    continue;
                }
            };

            let content = body["data"]["markdown"]
                .as_str()
                .or_else(|| body["data"]["html"].as_str())
                .unwrap_or_default();
            if content.is_empty() {
                tracing::warn!("no content in scrape result for {}", page_url);
                continue;
            }

            for (title, href) in mine_links(content) {
                let full_url = absolutize(&page_url, &href);
                if posts.len() >= MAX_MINED_POSTS {
                    break;
                }
                if seen_urls.insert(full_url.clone()) {
                    posts.push(RawNewsItem {
                        title,
                        content: format!("Post from {}", full_url),
                        url: full_url,
                        published_at: None,
                        source: "board".to_string(),
                    });
                }
            }
        }

        posts
    }
}

#[async_trait]
impl SourceAdapter for SearchAdapter {
    fn name(&self) -> &str {
        "search"
    }

    async fn fetch(&self, stock: &StockIdent) -> Result<Vec<RawNewsItem>> {
        let results = self.search(stock).await;
        if !results.is_empty() {
            return Ok(results);
        }
        if self.board_url_templates.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(
            "search empty for {}, falling back to board scraping",
            stock.code
        );
        Ok(self.scrape_boards(stock).await)
    }
}

/// Extract `(title, href)` pairs from page content, markdown links
/// first, then HTML anchors.
fn mine_links(content: &str) -> Vec<(String, String)> {
    let mut links = Vec::new();
    for caps in MARKDOWN_LINK
        .captures_iter(content)
        .take(MAX_MATCHES_PER_PATTERN)
    {
        links.push((caps[1].trim().to_string(), caps[2].to_string()));
    }
    for caps in HTML_LINK
        .captures_iter(content)
        .take(MAX_MATCHES_PER_PATTERN)
    {
        links.push((caps[2].trim().to_string(), caps[1].to_string()));
    }
    links
}

/// Resolve a possibly-relative href against the page it was mined from.
fn absolutize(page_url: &str, href: &str) -> String {
    if href.starts_with("http") {
        return href.to_string();
    }
    match Url::parse(page_url).and_then(|base| base.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => href.to_string(),
    }
}
