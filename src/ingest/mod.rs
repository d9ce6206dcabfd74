//! News collection and aggregation.
//!
//! Source adapters pull raw text evidence about a stock from external
//! backends; the aggregator weights each item by recency and merges
//! everything into one ranked corpus. A failing source is logged and
//! skipped, never fatal: partial corpora are valid output.

mod feed;
mod recency;
mod search;

pub use feed::FeedAdapter;
pub use recency::{RecencyWeighter, MAX_WEIGHT, MIN_WEIGHT};
pub use search::SearchAdapter;

use crate::error::Result;
use crate::types::{Corpus, NewsItem, RawNewsItem, StockIdent};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// A named producer of raw news items for one stock.
///
/// Implementations may return an empty list or fail; either way the
/// aggregation continues with the remaining sources.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, stock: &StockIdent) -> Result<Vec<RawNewsItem>>;
}

/// Merges all adapters' output into one ranked corpus.
pub struct Aggregator {
    weighter: RecencyWeighter,
}

impl Aggregator {
    pub fn new(time_window_hours: i64) -> Self {
        Self {
            weighter: RecencyWeighter::new(time_window_hours),
        }
    }

    /// Collect from every adapter, weight by recency, and rank.
    ///
    /// Content duplication across sources is accepted; the minimum item
    /// count is enforced by the orchestrator, not here.
    pub async fn collect(
        &self,
        stock: &StockIdent,
        adapters: &[Box<dyn SourceAdapter>],
    ) -> Corpus {
        let now = Utc::now();
        let mut items: Vec<NewsItem> = Vec::new();

        for adapter in adapters {
            match adapter.fetch(stock).await {
                Ok(raw) => {
                    tracing::debug!(
                        "source '{}' returned {} items for {}",
                        adapter.name(),
                        raw.len(),
                        stock.code
                    );
                    items.extend(raw.into_iter().map(|r| {
                        let weight = self.weighter.weight(r.published_at, now);
                        NewsItem::weighted(r, weight)
                    }));
                }
                Err(e) => {
                    tracing::warn!(
                        "source '{}' unavailable for {}: {}",
                        adapter.name(),
                        stock.code,
                        e
                    );
                }
            }
        }

        Corpus::ranked(items)
    }
}

/// Parse the publish-time formats seen across source backends.
///
/// Accepts RFC 3339 (with `Z` or offset), `YYYY-MM-DD HH:MM:SS`, and a
/// bare `YYYY-MM-DD`. Anything else is `None` and the item is treated
/// as fresh by the recency weighter.
pub fn parse_publish_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Truncate to at most `max_chars` characters, respecting char
/// boundaries. Source content fields are capped before prompt assembly.
pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
