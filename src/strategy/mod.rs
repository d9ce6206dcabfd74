//! Per-stock orchestration and batch execution.
//!
//! One stock runs through a single-pass pipeline:
//! collect → (insufficient? reject) → build prompt → infer → extract →
//! threshold check. Every pipeline error is converted into a REJECT
//! decision at this boundary; nothing propagates to the batch caller.

#[cfg(test)]
mod tests;

use crate::config::StrategyConfig;
use crate::error::{BotError, Result};
use crate::ingest::{Aggregator, SourceAdapter};
use crate::llm::{extract, InferenceClient, PromptBuilder, SYSTEM_PROMPT};
use crate::store::SelectionStore;
use crate::types::{AnalysisResult, BatchMeta, DecisionRecord, StockIdent};
use chrono::Utc;

pub const STRATEGY_NAME: &str = "public_opinion";

/// Sequences collection, inference, and extraction for one stock and
/// applies the acceptance thresholds.
///
/// Holds no state beyond configuration and collaborator handles, so
/// callers may run one orchestrator invocation per stock concurrently
/// without locking.
pub struct Orchestrator {
    config: StrategyConfig,
    aggregator: Aggregator,
    prompt_builder: PromptBuilder,
    inference: InferenceClient,
    adapters: Vec<Box<dyn SourceAdapter>>,
}

impl Orchestrator {
    pub fn new(
        config: StrategyConfig,
        inference: InferenceClient,
        adapters: Vec<Box<dyn SourceAdapter>>,
    ) -> Self {
        let aggregator = Aggregator::new(config.time_window_hours);
        let prompt_builder = PromptBuilder::new(config.max_prompt_chars);
        Self {
            config,
            aggregator,
            prompt_builder,
            inference,
            adapters,
        }
    }

    /// Analyze one stock to a terminal decision. Never fails: pipeline
    /// errors become REJECT records with the error as the reason.
    pub async fn analyze(&self, stock: &StockIdent) -> DecisionRecord {
        match self.run_pipeline(stock).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("analysis failed for {}: {}", stock.code, e);
                DecisionRecord::rejected(stock, e.to_string(), AnalysisResult::neutral())
            }
        }
    }

    async fn run_pipeline(&self, stock: &StockIdent) -> Result<DecisionRecord> {
        let corpus = self.aggregator.collect(stock, &self.adapters).await;
        let item_count = corpus.len();

        // Below the count threshold there is nothing worth paying an
        // inference call for.
        if item_count < self.config.news_count_threshold {
            return Err(BotError::InsufficientData {
                found: item_count,
                needed: self.config.news_count_threshold,
            });
        }

        let prompt = self.prompt_builder.build(stock, &corpus);
        let raw = self.inference.call(SYSTEM_PROMPT, &prompt).await?;
        let result = extract(&raw);

        Ok(self.decide(stock, item_count, result))
    }

    fn decide(
        &self,
        stock: &StockIdent,
        item_count: usize,
        result: AnalysisResult,
    ) -> DecisionRecord {
        let threshold = self.config.sentiment_threshold;
        if result.score >= threshold {
            let reason = format!(
                "sentiment score {:.2} >= threshold {:.2} across {} items",
                result.score, threshold, item_count
            );
            DecisionRecord::accepted(stock, reason, result)
        } else {
            let reason = format!(
                "sentiment score {:.2} below threshold {:.2}",
                result.score, threshold
            );
            DecisionRecord::rejected(stock, reason, result)
        }
    }

    /// Process a batch of stocks strictly sequentially and persist the
    /// outcome once at the end. A store failure is logged and does not
    /// roll back or alter the decisions.
    pub async fn run_batch(
        &self,
        stocks: &[StockIdent],
        store: &dyn SelectionStore,
    ) -> Vec<DecisionRecord> {
        let started = std::time::Instant::now();
        let mut records = Vec::with_capacity(stocks.len());

        for stock in stocks {
            tracing::info!("analyzing {} ({})", stock.code, stock.name);
            let record = self.analyze(stock).await;
            if record.meets_criteria {
                tracing::info!("{} accepted: score {:.2}", stock.code, record.result.score);
            } else {
                tracing::info!("{} rejected: {}", stock.code, record.reason);
            }
            records.push(record);
        }

        let meta = BatchMeta {
            strategy: STRATEGY_NAME.to_string(),
            execution_secs: started.elapsed().as_secs_f64(),
            accepted: records.iter().filter(|r| r.meets_criteria).count(),
            total: records.len(),
        };
        if let Err(e) = store.save(&records, Utc::now().date_naive(), &meta).await {
            tracing::error!("failed to persist selections: {}", e);
        }

        records
    }
}
