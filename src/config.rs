//! Typed configuration for the sentiment pipeline.
//!
//! All options live in one validated struct populated at startup from a
//! TOML file plus `OPINION_BOT_*` environment overrides. Unknown keys are
//! rejected rather than silently coerced. API keys never live in the
//! file: each provider section names the environment variable that holds
//! its key.

use crate::error::{BotError, Result};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub strategy: StrategyConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    pub database: Option<DatabaseConfig>,
}

impl Config {
    /// Load from a TOML file, overlaying `OPINION_BOT_*` env vars
    /// (e.g. `OPINION_BOT_LLM__MODEL`).
    pub fn load(path: &str) -> Result<Self> {
        let raw = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("OPINION_BOT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| BotError::Config(e.to_string()))?;

        let cfg: Config = raw
            .try_deserialize()
            .map_err(|e| BotError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.strategy;
        if !(0.0..=1.0).contains(&s.sentiment_threshold) {
            return Err(BotError::Config(format!(
                "sentiment_threshold must be in [0, 1], got {}",
                s.sentiment_threshold
            )));
        }
        if s.time_window_hours < 1 {
            return Err(BotError::Config(format!(
                "time_window_hours must be at least 1, got {}",
                s.time_window_hours
            )));
        }
        if self.llm.api_url.is_empty() {
            return Err(BotError::Config("llm.api_url must not be empty".into()));
        }
        if self.llm.max_retries == 0 {
            return Err(BotError::Config("llm.max_retries must be at least 1".into()));
        }
        for kind in &s.enabled_sources {
            match kind {
                SourceKind::Feed if self.sources.feed.is_none() => {
                    return Err(BotError::Config(
                        "source 'feed' enabled but [sources.feed] is missing".into(),
                    ));
                }
                SourceKind::Search if self.sources.search.is_none() => {
                    return Err(BotError::Config(
                        "source 'search' enabled but [sources.search] is missing".into(),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Thresholds and windows for the public-opinion strategy.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    /// Minimum sentiment score for a stock to be selected.
    #[serde(default = "default_sentiment_threshold")]
    pub sentiment_threshold: f64,
    /// Minimum number of collected items required before inference runs.
    #[serde(default = "default_news_count_threshold")]
    pub news_count_threshold: usize,
    /// Maximum items requested from each source.
    #[serde(default = "default_search_depth")]
    pub search_depth: usize,
    /// Recency window driving the decay weight.
    #[serde(default = "default_time_window_hours")]
    pub time_window_hours: i64,
    /// Upper bound on the rendered corpus section of the prompt.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
    #[serde(default = "default_enabled_sources")]
    pub enabled_sources: Vec<SourceKind>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            sentiment_threshold: default_sentiment_threshold(),
            news_count_threshold: default_news_count_threshold(),
            search_depth: default_search_depth(),
            time_window_hours: default_time_window_hours(),
            max_prompt_chars: default_max_prompt_chars(),
            enabled_sources: default_enabled_sources(),
        }
    }
}

fn default_sentiment_threshold() -> f64 {
    0.6
}
fn default_news_count_threshold() -> usize {
    5
}
fn default_search_depth() -> usize {
    10
}
fn default_time_window_hours() -> i64 {
    24
}
fn default_max_prompt_chars() -> usize {
    2000
}
fn default_enabled_sources() -> Vec<SourceKind> {
    vec![SourceKind::Feed, SourceKind::Search]
}

/// Named source adapters that can be switched on per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Feed,
    Search,
}

/// Supported inference provider wire shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// `contents`/`generationConfig` envelope, API key as query param.
    Gemini,
    /// OpenAI-style `messages` array, API key as bearer header.
    OpenAi,
}

/// Inference endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    /// Full endpoint URL, e.g. the model's generateContent URL for
    /// Gemini or the chat completions URL for OpenAI-compatible servers.
    pub api_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts, including the first.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl LlmConfig {
    /// Resolve the API key from the configured environment variable.
    /// Empty when unset; local deployments often need no key.
    pub fn api_key(&self) -> String {
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .unwrap_or_default()
    }
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    3
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    1500
}

/// Endpoint configuration for the concrete source adapters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    pub feed: Option<FeedConfig>,
    pub search: Option<SearchConfig>,
}

/// Per-stock news feed (JSON list endpoint).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    pub api_url: String,
    #[serde(default = "default_source_timeout_secs")]
    pub timeout_secs: u64,
}

/// Web-search deployment exposing `/search` and `/scrape`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    pub api_url: String,
    #[serde(default = "default_source_timeout_secs")]
    pub timeout_secs: u64,
    /// Board/forum page URL templates scraped when search returns
    /// nothing; `{code}` is replaced with the stock code.
    #[serde(default)]
    pub board_url_templates: Vec<String>,
}

fn default_source_timeout_secs() -> u64 {
    30
}

/// Location of the SQLite selections store.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: String,
}
