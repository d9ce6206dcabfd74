//! Shared domain types for the sentiment pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Clamp a score-like value into the unit interval.
///
/// Idempotent: re-clamping an already-clamped value is a no-op.
pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Identity of the stock under analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockIdent {
    pub code: String,
    pub name: String,
}

impl StockIdent {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// One unit of raw text evidence as returned by a source adapter,
/// before recency weighting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNewsItem {
    pub title: String,
    pub content: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Tag of the producing source, e.g. "feed" or "web_search".
    pub source: String,
}

/// A weighted news item. Immutable once created; owned by the aggregator
/// until consumed by the prompt builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub content: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub source: String,
    /// Recency weight in [0.1, 1.0].
    pub time_weight: f64,
}

impl NewsItem {
    pub fn weighted(raw: RawNewsItem, time_weight: f64) -> Self {
        Self {
            title: raw.title,
            content: raw.content,
            url: raw.url,
            published_at: raw.published_at,
            source: raw.source,
            time_weight,
        }
    }
}

/// Ranked collection of news items used to build one inference prompt.
///
/// Items are ordered descending by `time_weight`; rank order decides
/// which items survive prompt truncation. Ties keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    items: Vec<NewsItem>,
}

impl Corpus {
    /// Build a corpus from weighted items, sorting descending by weight.
    pub fn ranked(mut items: Vec<NewsItem>) -> Self {
        items.sort_by(|a, b| b.time_weight.total_cmp(&a.time_weight));
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NewsItem> {
        self.items.iter()
    }

    pub fn items(&self) -> &[NewsItem] {
        &self.items
    }
}

/// Direction of the sentiment over the analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentTrend {
    #[serde(rename = "rising")]
    Rising,
    #[serde(rename = "falling")]
    Falling,
    #[serde(rename = "flat")]
    Flat,
    #[serde(rename = "no clear trend")]
    NoClearTrend,
}

impl SentimentTrend {
    /// Lenient mapping from whatever string the model produced.
    pub fn from_wire(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "rising" | "up" | "positive" | "improving" => Self::Rising,
            "falling" | "down" | "negative" | "deteriorating" => Self::Falling,
            "flat" | "stable" | "sideways" | "neutral" => Self::Flat,
            _ => Self::NoClearTrend,
        }
    }
}

/// Expected strength of the market reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketImpact {
    High,
    Medium,
    Low,
    Unknown,
}

impl MarketImpact {
    pub fn from_wire(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" | "strong" => Self::High,
            "medium" | "moderate" => Self::Medium,
            "low" | "weak" => Self::Low,
            _ => Self::Unknown,
        }
    }
}

/// Action suggested by the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Buy,
    Hold,
    Sell,
    Watch,
}

impl Recommendation {
    pub fn from_wire(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "buy" | "accumulate" => Self::Buy,
            "hold" => Self::Hold,
            "sell" | "reduce" => Self::Sell,
            _ => Self::Watch,
        }
    }
}

/// Structured verdict recovered from one inference response.
///
/// Produced once per invocation and never mutated: a failed or partial
/// extraction yields [`AnalysisResult::neutral`], not a patched partial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Sentiment score in [0, 1]; 0 extremely negative, 1 extremely
    /// positive, 0.5 neutral.
    pub score: f64,
    pub sentiment_trend: SentimentTrend,
    pub key_events: Vec<String>,
    pub market_impact: MarketImpact,
    /// Model confidence in [0, 1].
    pub confidence_level: f64,
    pub summary: String,
    pub recommendation: Recommendation,
    pub risk_factors: Vec<String>,
}

impl AnalysisResult {
    /// The neutral fallback returned when nothing usable could be
    /// recovered from the inference output.
    pub fn neutral() -> Self {
        Self {
            score: 0.5,
            sentiment_trend: SentimentTrend::NoClearTrend,
            key_events: Vec::new(),
            market_impact: MarketImpact::Unknown,
            confidence_level: 0.0,
            summary: "insufficient information".to_string(),
            recommendation: Recommendation::Watch,
            risk_factors: Vec::new(),
        }
    }
}

/// Terminal accept/reject verdict for one stock in one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub stock_code: String,
    pub stock_name: String,
    pub meets_criteria: bool,
    pub reason: String,
    pub result: AnalysisResult,
    pub decided_at: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn accepted(stock: &StockIdent, reason: String, result: AnalysisResult) -> Self {
        Self {
            stock_code: stock.code.clone(),
            stock_name: stock.name.clone(),
            meets_criteria: true,
            reason,
            result,
            decided_at: Utc::now(),
        }
    }

    pub fn rejected(stock: &StockIdent, reason: String, result: AnalysisResult) -> Self {
        Self {
            stock_code: stock.code.clone(),
            stock_name: stock.name.clone(),
            meets_criteria: false,
            reason,
            result,
            decided_at: Utc::now(),
        }
    }
}

/// Metadata recorded alongside one persisted batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchMeta {
    pub strategy: String,
    pub execution_secs: f64,
    pub accepted: usize,
    pub total: usize,
}
