//! Tests for configuration

#[cfg(test)]
mod tests {
    use super::super::config::*;

    #[test]
    fn test_strategy_config_defaults() {
        let config: StrategyConfig = toml::from_str("").unwrap();
        assert_eq!(config.sentiment_threshold, 0.6);
        assert_eq!(config.news_count_threshold, 5);
        assert_eq!(config.search_depth, 10);
        assert_eq!(config.time_window_hours, 24);
        assert_eq!(config.max_prompt_chars, 2000);
        assert_eq!(
            config.enabled_sources,
            vec![SourceKind::Feed, SourceKind::Search]
        );
    }

    #[test]
    fn test_strategy_config_deserialize() {
        let toml_str = r#"
sentiment_threshold = 0.75
news_count_threshold = 8
search_depth = 20
time_window_hours = 48
max_prompt_chars = 4000
enabled_sources = ["feed"]
"#;
        let config: StrategyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.sentiment_threshold, 0.75);
        assert_eq!(config.news_count_threshold, 8);
        assert_eq!(config.search_depth, 20);
        assert_eq!(config.time_window_hours, 48);
        assert_eq!(config.max_prompt_chars, 4000);
        assert_eq!(config.enabled_sources, vec![SourceKind::Feed]);
    }

    #[test]
    fn test_strategy_config_rejects_unknown_keys() {
        let toml_str = r#"
sentiment_treshold = 0.75
"#;
        assert!(toml::from_str::<StrategyConfig>(toml_str).is_err());
    }

    #[test]
    fn test_llm_config_minimal() {
        let toml_str = r#"
provider = "openai"
api_url = "https://api.example.com/v1/chat/completions"
"#;
        let config: LlmConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_tokens, 1500);
        assert!(config.api_key_env.is_none());
    }

    #[test]
    fn test_llm_config_gemini() {
        let toml_str = r#"
provider = "gemini"
api_url = "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
api_key_env = "GEMINI_API_KEY"
model = "gemini-2.0-flash"
timeout_secs = 30
"#;
        let config: LlmConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider, ProviderKind::Gemini);
        assert_eq!(config.api_key_env, Some("GEMINI_API_KEY".to_string()));
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_llm_config_api_key_from_env() {
        std::env::set_var("OPINION_BOT_TEST_LLM_KEY", "sk-test");
        let toml_str = r#"
provider = "openai"
api_url = "https://api.example.com"
api_key_env = "OPINION_BOT_TEST_LLM_KEY"
"#;
        let config: LlmConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_key(), "sk-test");
    }

    #[test]
    fn test_llm_config_api_key_defaults_to_empty() {
        let toml_str = r#"
provider = "openai"
api_url = "http://localhost:11434/v1/chat/completions"
"#;
        let config: LlmConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_key(), "");
    }

    #[test]
    fn test_sources_config() {
        let toml_str = r#"
[feed]
api_url = "https://feed.example.com"

[search]
api_url = "http://192.168.1.2:8080/v1"
timeout_secs = 20
board_url_templates = ["https://boards.example.com/list,{code}.html"]
"#;
        let config: SourcesConfig = toml::from_str(toml_str).unwrap();
        let feed = config.feed.unwrap();
        assert_eq!(feed.api_url, "https://feed.example.com");
        assert_eq!(feed.timeout_secs, 30);
        let search = config.search.unwrap();
        assert_eq!(search.timeout_secs, 20);
        assert_eq!(search.board_url_templates.len(), 1);
    }

    #[test]
    fn test_full_config_parse() {
        let toml_str = r#"
[strategy]
sentiment_threshold = 0.65

[llm]
provider = "openai"
api_url = "http://localhost:8000/v1/chat/completions"
model = "deepseek-chat"

[sources.feed]
api_url = "https://feed.example.com"

[sources.search]
api_url = "http://192.168.1.2:8080/v1"

[database]
path = "data/selections.db"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        config.validate().unwrap();
        assert_eq!(config.strategy.sentiment_threshold, 0.65);
        assert_eq!(config.llm.model, "deepseek-chat");
        assert_eq!(config.database.unwrap().path, "data/selections.db");
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let toml_str = r#"
[strategy]
sentiment_threshold = 1.4

[llm]
provider = "openai"
api_url = "http://localhost:8000"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let toml_str = r#"
[strategy]
enabled_sources = []

[llm]
provider = "openai"
api_url = "http://localhost:8000"
max_retries = 0
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_enabled_source_sections() {
        // 'feed' enabled by default but [sources.feed] is missing.
        let toml_str = r#"
[llm]
provider = "openai"
api_url = "http://localhost:8000"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_allows_no_sources_when_disabled() {
        let toml_str = r#"
[strategy]
enabled_sources = []

[llm]
provider = "openai"
api_url = "http://localhost:8000"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        config.validate().unwrap();
    }
}
