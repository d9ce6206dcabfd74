//! Error types for the sentiment pipeline.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BotError>;

/// Pipeline error taxonomy.
///
/// Per-stock failures are converted into REJECT decisions at the
/// orchestrator boundary; none of these escape to the batch caller.
#[derive(Debug, Error)]
pub enum BotError {
    /// A single news source failed. Non-fatal: aggregation continues
    /// with the remaining sources.
    #[error("source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// Too few items collected to justify an inference call.
    #[error("insufficient data: found {found} items, need at least {needed}")]
    InsufficientData { found: usize, needed: usize },

    /// Inference request exceeded the configured timeout. Retried.
    #[error("inference request timed out")]
    InferenceTimeout,

    /// Connection-level failure talking to the inference endpoint. Retried.
    #[error("inference transport error: {0}")]
    InferenceTransport(String),

    /// Non-2xx status from the inference endpoint. Never retried: a bad
    /// status is a configuration or provider fault, not a transient one.
    #[error("inference endpoint returned HTTP {status}: {body}")]
    InferenceHttp { status: u16, body: String },

    /// 2xx response whose text-bearing field path is missing.
    #[error("malformed inference response: {0}")]
    MalformedResponse(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BotError {
    /// Whether the inference retry loop may try again after this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BotError::InferenceTimeout | BotError::InferenceTransport(_)
        )
    }
}
