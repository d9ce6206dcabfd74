//! Recovery of a structured verdict from unreliable inference output.
//!
//! The service returns, in decreasing order of likelihood: clean JSON,
//! JSON behind a reasoning block, JSON inside a code fence, JSON buried
//! in prose, a bare score field, or nothing usable at all. Each failure
//! mode gets its own strategy; [`extract`] walks them in order and takes
//! the first success, so it is total — worst case it returns the
//! neutral default.

use crate::ingest::truncate_chars;
use crate::types::{
    clamp_unit, AnalysisResult, MarketImpact, Recommendation, SentimentTrend,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";
const FENCE: &str = "```";

/// Field set the inference service is contractually required to emit.
const REQUIRED_FIELDS: &[&str] = &[
    "sentiment_score",
    "sentiment_trend",
    "key_events",
    "market_impact",
    "confidence_level",
    "analysis_summary",
    "recommendation",
    "risk_factors",
];

static SCORE_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(?:sentiment_score|score)"\s*:\s*"?(\d+(?:\.\d+)?)"#).unwrap());
static NUMBER_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

type Strategy = fn(&str) -> Option<AnalysisResult>;

/// Ordered fallback chain; first success wins.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("direct", direct_parse),
    ("reasoning_block", strip_reasoning_block),
    ("fenced_code", strip_code_fence),
    ("brace_scan", brace_scan),
    ("score_field", score_field),
    ("bare_number", bare_number),
];

/// Recover an [`AnalysisResult`] from raw inference output.
///
/// Never fails: when every strategy comes up empty the neutral default
/// is returned. Every recovered score and confidence is clamped to
/// [0, 1] before it leaves this module.
pub fn extract(raw: &str) -> AnalysisResult {
    for (name, strategy) in STRATEGIES {
        if let Some(result) = strategy(raw) {
            tracing::debug!("extraction strategy '{}' recovered a result", name);
            return result;
        }
    }
    tracing::warn!("all extraction strategies failed, returning neutral result");
    AnalysisResult::neutral()
}

/// Parse a candidate JSON string and validate the full field contract.
/// JSON that parses but misses a required field counts as a failure.
fn parse_validated(candidate: &str) -> Option<AnalysisResult> {
    let value: Value = serde_json::from_str(candidate.trim()).ok()?;
    let obj = value.as_object()?;
    if !REQUIRED_FIELDS.iter().all(|f| obj.contains_key(*f)) {
        return None;
    }

    let score = number_field(&value["sentiment_score"])?;
    let confidence = number_field(&value["confidence_level"])?;

    Some(AnalysisResult {
        score: clamp_unit(score),
        sentiment_trend: value["sentiment_trend"]
            .as_str()
            .map(SentimentTrend::from_wire)
            .unwrap_or(SentimentTrend::NoClearTrend),
        key_events: string_list(&value["key_events"]),
        market_impact: value["market_impact"]
            .as_str()
            .map(MarketImpact::from_wire)
            .unwrap_or(MarketImpact::Unknown),
        confidence_level: clamp_unit(confidence),
        summary: value["analysis_summary"].as_str().unwrap_or_default().to_string(),
        recommendation: value["recommendation"]
            .as_str()
            .map(Recommendation::from_wire)
            .unwrap_or(Recommendation::Watch),
        risk_factors: string_list(&value["risk_factors"]),
    })
}

/// Numeric field that may arrive as a number or a quoted number.
fn number_field(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Layer 1: the whole response is the JSON object.
fn direct_parse(raw: &str) -> Option<AnalysisResult> {
    parse_validated(raw)
}

/// Layer 2: response carries a reasoning block. Try the first balanced
/// object anywhere in the text; if that fails validation, rescan the
/// content after the closing marker.
fn strip_reasoning_block(raw: &str) -> Option<AnalysisResult> {
    if !raw.contains(THINK_OPEN) {
        return None;
    }
    let close = raw.find(THINK_CLOSE)?;

    if let Some(result) = first_balanced_object(raw).and_then(parse_validated) {
        return Some(result);
    }

    let after = &raw[close + THINK_CLOSE.len()..];
    first_balanced_object(after).and_then(parse_validated)
}

/// Layer 3: response is wrapped in a code fence, with or without a
/// language tag.
fn strip_code_fence(raw: &str) -> Option<AnalysisResult> {
    let open = raw.find(FENCE)?;
    let rest = &raw[open + FENCE.len()..];
    let close = rest.find(FENCE)?;
    let mut inner = &rest[..close];

    // Drop a bare language tag on the first line (```json and friends).
    if let Some(newline) = inner.find('\n') {
        let tag = inner[..newline].trim();
        if !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric()) {
            inner = &inner[newline + 1..];
        }
    }

    parse_validated(inner)
}

/// Layer 4: first `{` to last `}` anywhere in the text.
fn brace_scan(raw: &str) -> Option<AnalysisResult> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    parse_validated(&raw[start..=end])
}

/// Layer 5: pull the score field out by regex, bypassing JSON parsing.
/// All other fields take their neutral defaults.
fn score_field(raw: &str) -> Option<AnalysisResult> {
    let caps = SCORE_FIELD.captures(raw)?;
    let score: f64 = caps[1].parse().ok()?;
    Some(AnalysisResult {
        score: clamp_unit(score),
        summary: truncate_chars(raw.trim(), 1000),
        ..AnalysisResult::neutral()
    })
}

/// Layer 6: first standalone numeric token that looks like a score —
/// within [0, 1] and at most two decimal digits.
fn bare_number(raw: &str) -> Option<AnalysisResult> {
    for m in NUMBER_TOKEN.find_iter(raw) {
        if let Some(prev) = raw[..m.start()].chars().next_back() {
            if prev.is_ascii_alphanumeric() || prev == '.' || prev == '_' || prev == '-' {
                continue;
            }
        }
        if let Some(next) = raw[m.end()..].chars().next() {
            if next.is_ascii_alphanumeric() || next == '.' || next == '_' {
                continue;
            }
        }

        let token = m.as_str();
        let decimals = token.split('.').nth(1).map_or(0, str::len);
        if decimals > 2 {
            continue;
        }
        let value: f64 = match token.parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        if (0.0..=1.0).contains(&value) {
            return Some(AnalysisResult {
                score: value,
                summary: truncate_chars(raw.trim(), 1000),
                ..AnalysisResult::neutral()
            });
        }
    }
    None
}

/// Find the first balanced `{...}` substring anywhere in the text.
/// Candidate start braces are tried left to right; braces inside JSON
/// strings do not count toward the depth.
fn first_balanced_object(text: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(found) = text[search_from..].find('{') {
        let start = search_from + found;
        if let Some(end) = balanced_end(&text[start..]) {
            return Some(&text[start..start + end]);
        }
        search_from = start + 1;
    }
    None
}

/// Length of the balanced object at the start of `text`, if any.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}
