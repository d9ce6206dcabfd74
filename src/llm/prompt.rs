//! Prompt assembly for the sentiment analysis call.

use crate::types::{Corpus, StockIdent};

/// Fixed system role for every inference call.
pub const SYSTEM_PROMPT: &str = "You are a professional public-opinion analyst for equity \
markets. Evaluate the supplied material and respond with a single JSON object in exactly \
the requested format. Output only valid JSON, no surrounding prose.";

/// Appended when the corpus does not fit within the prompt budget.
const TRUNCATION_MARKER: &str = "... (remaining items omitted)";

/// Renders the corpus and stock identity into a bounded-length
/// instruction for the inference service.
///
/// The corpus section is truncated only at item boundaries, never
/// mid-field; since the corpus arrives ranked by recency weight, the
/// freshest items always survive truncation.
pub struct PromptBuilder {
    max_chars: usize,
}

impl PromptBuilder {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn build(&self, stock: &StockIdent, corpus: &Corpus) -> String {
        let mut body = String::new();
        let mut truncated = false;

        for item in corpus.iter() {
            let published = item
                .published_at
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string());
            let block = format!(
                "source: {} | title: {} | content: {} | published_at: {}\n",
                item.source, item.title, item.content, published
            );
            if body.chars().count() + block.chars().count() > self.max_chars {
                truncated = true;
                break;
            }
            body.push_str(&block);
        }
        if truncated {
            body.push_str(TRUNCATION_MARKER);
            body.push('\n');
        }

        format!(
            r#"Analyze the following public-opinion material about stock {name} ({code}) and score its sentiment from 0 to 1:

Material:
{body}
Requirements:
1. Assess the overall sentiment polarity (positive, negative, or neutral) across all items.
2. Weigh each item by its significance and likely market influence.
3. Weigh each item by its recency.
4. Give detailed reasoning for the verdict.

Respond strictly with a JSON object in this format:
{{
    "score": 0.72,
    "reason": "overall assessment ...",
    "details": {{
        "policy": {{"score": 0.6, "reason": "..."}},
        "finance": {{"score": 0.7, "reason": "..."}},
        "industry": {{"score": 0.65, "reason": "..."}},
        "price_action": {{"score": 0.6, "reason": "..."}},
        "sentiment": {{"score": 0.8, "reason": "..."}}
    }},
    "weights": {{"policy": 0.15, "finance": 0.30, "industry": 0.25, "price_action": 0.20, "sentiment": 0.10}},
    "sentiment_score": 0.72,
    "sentiment_trend": "rising",
    "key_events": ["earnings beat", "sector tailwind"],
    "market_impact": "high",
    "confidence_level": 0.85,
    "analysis_summary": "detailed reasoning ...",
    "recommendation": "buy",
    "risk_factors": ["market volatility", "policy risk"]
}}

sentiment_score is a value between 0 and 1: 0 means extremely negative, 1 extremely positive, 0.5 neutral."#,
            name = stock.name,
            code = stock.code,
            body = body,
        )
    }
}
