//! Unit tests for the orchestrator and batch runner

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::{LlmConfig, ProviderKind, StrategyConfig};
    use crate::error::BotError;
    use crate::ingest::MockSourceAdapter;
    use crate::llm::InferenceClient;
    use crate::types::{BatchMeta, DecisionRecord, RawNewsItem, StockIdent};
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate, Utc};
    use std::sync::Mutex;

    fn analysis_json(score: f64) -> String {
        format!(
            r#"{{
    "sentiment_score": {score},
    "sentiment_trend": "rising",
    "key_events": ["earnings beat"],
    "market_impact": "high",
    "confidence_level": 0.8,
    "analysis_summary": "mostly positive coverage",
    "recommendation": "buy",
    "risk_factors": ["volatility"]
}}"#
        )
    }

    fn openai_body(content: &str) -> String {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
        .to_string()
    }

    fn adapter_with_items(recent: usize, old: usize) -> Box<dyn crate::ingest::SourceAdapter> {
        let mut mock = MockSourceAdapter::new();
        mock.expect_name().return_const("mock".to_string());
        mock.expect_fetch().returning(move |_| {
            let now = Utc::now();
            let mut items = Vec::new();
            for i in 0..recent {
                items.push(RawNewsItem {
                    title: format!("recent-{}", i),
                    content: "fresh coverage".to_string(),
                    url: format!("https://example.com/r{}", i),
                    published_at: Some(now - Duration::hours(1 + i as i64)),
                    source: "mock".to_string(),
                });
            }
            for i in 0..old {
                items.push(RawNewsItem {
                    title: format!("old-{}", i),
                    content: "stale coverage".to_string(),
                    url: format!("https://example.com/o{}", i),
                    published_at: Some(now - Duration::days(2)),
                    source: "mock".to_string(),
                });
            }
            Ok(items)
        });
        Box::new(mock)
    }

    fn test_config() -> StrategyConfig {
        StrategyConfig {
            sentiment_threshold: 0.6,
            news_count_threshold: 5,
            search_depth: 10,
            time_window_hours: 24,
            max_prompt_chars: 2000,
            enabled_sources: Vec::new(),
        }
    }

    fn inference_for(url: &str) -> InferenceClient {
        InferenceClient::new(LlmConfig {
            provider: ProviderKind::OpenAi,
            api_url: url.to_string(),
            api_key_env: None,
            model: "test-model".to_string(),
            timeout_secs: 5,
            max_retries: 3,
            temperature: 0.7,
            max_tokens: 256,
        })
        .unwrap()
    }

    struct RecordingStore {
        calls: Mutex<Vec<(usize, BatchMeta)>>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SelectionStore for RecordingStore {
        async fn save(
            &self,
            records: &[DecisionRecord],
            _date: NaiveDate,
            meta: &BatchMeta,
        ) -> crate::error::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((records.len(), meta.clone()));
            Ok(())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl SelectionStore for FailingStore {
        async fn save(
            &self,
            _records: &[DecisionRecord],
            _date: NaiveDate,
            _meta: &BatchMeta,
        ) -> crate::error::Result<()> {
            Err(BotError::Config("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn test_sufficient_corpus_proceeds_to_inference_and_accepts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(openai_body(&analysis_json(0.82)))
            .expect(1)
            .create_async()
            .await;

        let url = format!("{}/v1/chat/completions", server.url());
        let orchestrator = Orchestrator::new(
            test_config(),
            inference_for(&url),
            vec![adapter_with_items(6, 4)],
        );
        let stock = StockIdent::new("600519", "Kweichow Moutai");

        let record = orchestrator.analyze(&stock).await;

        assert!(record.meets_criteria);
        assert_eq!(record.result.score, 0.82);
        assert!(record.reason.contains("10 items"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_insufficient_corpus_rejects_without_inference() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let url = format!("{}/v1/chat/completions", server.url());
        let orchestrator = Orchestrator::new(
            test_config(),
            inference_for(&url),
            vec![adapter_with_items(3, 0)],
        );
        let stock = StockIdent::new("000001", "Ping An Bank");

        let record = orchestrator.analyze(&stock).await;

        assert!(!record.meets_criteria);
        assert!(record.reason.contains("insufficient data"));
        assert!(record.reason.contains("3"));
        assert_eq!(record.result.score, 0.5);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_inference_http_error_surfaces_in_reject_reason() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("upstream exploded")
            .expect(1)
            .create_async()
            .await;

        let url = format!("{}/v1/chat/completions", server.url());
        let orchestrator = Orchestrator::new(
            test_config(),
            inference_for(&url),
            vec![adapter_with_items(6, 0)],
        );
        let stock = StockIdent::new("600519", "Kweichow Moutai");

        let record = orchestrator.analyze(&stock).await;

        assert!(!record.meets_criteria);
        assert!(record.reason.contains("500"));
        // Exactly one attempt: HTTP status errors are never retried.
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_low_score_rejects_with_result_attached() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(openai_body(&analysis_json(0.3)))
            .create_async()
            .await;

        let url = format!("{}/v1/chat/completions", server.url());
        let orchestrator = Orchestrator::new(
            test_config(),
            inference_for(&url),
            vec![adapter_with_items(6, 0)],
        );
        let stock = StockIdent::new("000002", "Vanke");

        let record = orchestrator.analyze(&stock).await;

        assert!(!record.meets_criteria);
        assert!(record.reason.contains("below threshold"));
        assert_eq!(record.result.score, 0.3);
    }

    #[tokio::test]
    async fn test_garbage_response_falls_back_to_neutral_and_rejects() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(openai_body("the model refused to answer properly"))
            .create_async()
            .await;

        let url = format!("{}/v1/chat/completions", server.url());
        let orchestrator = Orchestrator::new(
            test_config(),
            inference_for(&url),
            vec![adapter_with_items(6, 0)],
        );
        let stock = StockIdent::new("600036", "CMB");

        let record = orchestrator.analyze(&stock).await;

        // Neutral 0.5 sits below the 0.6 threshold.
        assert!(!record.meets_criteria);
        assert_eq!(record.result.score, 0.5);
    }

    #[tokio::test]
    async fn test_run_batch_saves_once_with_metadata() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(openai_body(&analysis_json(0.9)))
            .expect(2)
            .create_async()
            .await;

        let url = format!("{}/v1/chat/completions", server.url());
        let orchestrator = Orchestrator::new(
            test_config(),
            inference_for(&url),
            vec![adapter_with_items(6, 0)],
        );
        let stocks = vec![
            StockIdent::new("600519", "Kweichow Moutai"),
            StockIdent::new("000001", "Ping An Bank"),
        ];
        let store = RecordingStore::new();

        let records = orchestrator.run_batch(&stocks, &store).await;

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.meets_criteria));

        let calls = store.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (saved, meta) = &calls[0];
        assert_eq!(*saved, 2);
        assert_eq!(meta.strategy, STRATEGY_NAME);
        assert_eq!(meta.accepted, 2);
        assert_eq!(meta.total, 2);
    }

    #[tokio::test]
    async fn test_run_batch_survives_store_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(openai_body(&analysis_json(0.9)))
            .create_async()
            .await;

        let url = format!("{}/v1/chat/completions", server.url());
        let orchestrator = Orchestrator::new(
            test_config(),
            inference_for(&url),
            vec![adapter_with_items(6, 0)],
        );
        let stocks = vec![StockIdent::new("600519", "Kweichow Moutai")];

        let records = orchestrator.run_batch(&stocks, &FailingStore).await;

        // Computed decisions are returned even when persistence fails.
        assert_eq!(records.len(), 1);
        assert!(records[0].meets_criteria);
    }
}
