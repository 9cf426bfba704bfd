//! Pull a JSON value out of free-form model output.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{HelmError, Result};

static FENCED_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json)?\s*\n?([\s\S]*?)\n?```").expect("fenced block regex must compile")
});

/// Which extraction strategy produced the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractStrategy {
    /// First fenced code block, optionally tagged `json`.
    FencedBlock,
    /// Span from the first `{` to the last `}`.
    BraceSpan,
    /// The whole text, trimmed.
    WholeText,
}

/// Parse JSON out of a model response.
///
/// Tries, in order: the first fenced code block, the first-`{`-to-last-`}`
/// span, then the trimmed whole text. The first strategy that parses wins.
/// Only a failure of the last strategy is reported, as
/// [`HelmError::MalformedResponse`].
pub fn extract_json(text: &str) -> Result<serde_json::Value> {
    extract_json_with_strategy(text).map(|(value, _)| value)
}

/// Like [`extract_json`], also reporting the strategy that succeeded.
pub fn extract_json_with_strategy(text: &str) -> Result<(serde_json::Value, ExtractStrategy)> {
    if let Some(body) = FENCED_BLOCK_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
    {
        match serde_json::from_str(body) {
            Ok(value) => return Ok((value, ExtractStrategy::FencedBlock)),
            Err(e) => tracing::debug!(error = %e, "fenced block is not valid JSON; trying brace span"),
        }
    }

    if let Some(span) = brace_span(text) {
        match serde_json::from_str(span) {
            Ok(value) => return Ok((value, ExtractStrategy::BraceSpan)),
            Err(e) => tracing::debug!(error = %e, "brace span is not valid JSON; trying whole text"),
        }
    }

    serde_json::from_str(text.trim())
        .map(|value| (value, ExtractStrategy::WholeText))
        .map_err(|source| HelmError::MalformedResponse {
            raw: text.to_string(),
            source,
        })
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
