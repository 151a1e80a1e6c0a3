//! Salvage extraction of JSON from free-form model output.
//!
//! Models are inconsistent about wrapping: they fence the payload in
//! markdown, prepend an introduction, or append commentary even when told not
//! to.  [`extract`] tries an ordered list of [`SalvageStrategy`] values and
//! returns the first one that parses.  When every strategy misses, the call
//! fails with [`WorkflowError::MalformedResponse`] carrying the original
//! text.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, WorkflowError};

/// Opening marker of a fenced JSON block, compared ASCII-case-insensitively.
const JSON_FENCE: &str = "```json";

/// Closing marker of any fenced block.
const FENCE: &str = "```";

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// One way of locating a JSON payload inside model text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalvageStrategy {
    /// Content of the first ```` ```json ```` fenced block.
    FencedBlock,
    /// Span from the first `{` to the last `}`, inclusive.
    BraceSpan,
    /// The whole text, trimmed.
    WholeText,
}

impl SalvageStrategy {
    /// Evaluation order.  The first strategy that parses wins.
    pub const ORDER: [Self; 3] = [Self::FencedBlock, Self::BraceSpan, Self::WholeText];

    /// Short name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FencedBlock => "fenced-block",
            Self::BraceSpan => "brace-span",
            Self::WholeText => "whole-text",
        }
    }

    /// The substring this strategy would parse, or `None` when the text has
    /// nothing for it to work on.
    pub fn candidate(self, text: &str) -> Option<&str> {
        match self {
            Self::FencedBlock => fenced_json_block(text),
            Self::BraceSpan => brace_span(text),
            Self::WholeText => Some(text.trim()),
        }
    }

    /// Run this strategy alone.
    pub fn attempt(self, text: &str) -> Option<Value> {
        let Some(candidate) = self.candidate(text) else {
            debug!(strategy = self.as_str(), "salvage strategy not applicable");
            return None;
        };

        match serde_json::from_str(candidate) {
            Ok(value) => {
                debug!(strategy = self.as_str(), "salvage strategy succeeded");
                Some(value)
            }
            Err(e) => {
                warn!(
                    strategy = self.as_str(),
                    error = %e,
                    "could not parse salvage candidate, falling back"
                );
                None
            }
        }
    }
}

impl std::fmt::Display for SalvageStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful salvage: the parsed value and the strategy that found it.
#[derive(Debug, Clone, PartialEq)]
pub struct Salvaged {
    pub strategy: SalvageStrategy,
    pub value: Value,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Recover structured data from `text`, reporting which strategy succeeded.
pub fn salvage(text: &str) -> Result<Salvaged> {
    SalvageStrategy::ORDER
        .into_iter()
        .find_map(|strategy| {
            strategy
                .attempt(text)
                .map(|value| Salvaged { strategy, value })
        })
        .ok_or_else(|| WorkflowError::MalformedResponse {
            raw: text.to_owned(),
        })
}

/// Recover structured data from `text`.
pub fn extract(text: &str) -> Result<Value> {
    salvage(text).map(|salvaged| salvaged.value)
}

// ---------------------------------------------------------------------------
// Candidate locators
// ---------------------------------------------------------------------------

/// Inner content of the first ```` ```json ```` block, trimmed.  An opening
/// fence without a closing one, or an empty block, yields `None`.
fn fenced_json_block(text: &str) -> Option<&str> {
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let start = text.to_ascii_lowercase().find(JSON_FENCE)? + JSON_FENCE.len();
    let len = text[start..].find(FENCE)?;
    let inner = text[start..start + len].trim();
    (!inner.is_empty()).then_some(inner)
}

/// Inclusive span from the first `{` to the last `}`, when the opening brace
/// comes strictly first.
fn brace_span(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let close = text.rfind('}')?;
    (open < close).then(|| &text[open..=close])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn plain_json_matches_direct_parse() {
        let text = r#"{"title": "Invoice bot", "components": [{"name": "Assign"}]}"#;
        let direct: Value = serde_json::from_str(text).unwrap();
        assert_eq!(extract(text).unwrap(), direct);
    }

    #[test]
    fn fenced_block_wins_over_surrounding_text() {
        let text = "Here you go:\n```json\n{\"title\": \"A\"}\n```\nLet me know {if} you need more.";
        let salvaged = salvage(text).unwrap();
        assert_eq!(salvaged.strategy, SalvageStrategy::FencedBlock);
        assert_eq!(salvaged.value, json!({"title": "A"}));
    }

    #[test]
    fn fence_tag_is_case_insensitive() {
        let text = "```JSON\n{\"ok\": true}\n```";
        assert_eq!(
            SalvageStrategy::FencedBlock.candidate(text),
            Some("{\"ok\": true}")
        );
    }

    #[test]
    fn fence_without_newline_is_accepted() {
        let text = "```json{\"ok\": true}```";
        assert_eq!(extract(text).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn broken_fence_falls_through_to_brace_span() {
        let text = "```json\nnote: {\"title\": \"E\"}\n```";
        assert!(SalvageStrategy::FencedBlock.attempt(text).is_none());
        let salvaged = salvage(text).unwrap();
        assert_eq!(salvaged.strategy, SalvageStrategy::BraceSpan);
        assert_eq!(salvaged.value, json!({"title": "E"}));
    }

    #[test]
    fn span_covering_two_objects_is_malformed() {
        // The fence is invalid, the brace span runs from the first object to
        // the end of the second, and the whole text is prose.
        let text = "```json\n{\"title\": oops}\n```\nCorrected: {\"title\": \"B\"}";
        assert!(matches!(
            extract(text),
            Err(WorkflowError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn brace_span_strips_commentary() {
        let text = "Sure! Here is the workflow: {\"title\": \"C\", \"n\": {\"x\": 1}} Hope it helps.";
        let salvaged = salvage(text).unwrap();
        assert_eq!(salvaged.strategy, SalvageStrategy::BraceSpan);
        assert_eq!(salvaged.value, json!({"title": "C", "n": {"x": 1}}));
    }

    #[test]
    fn unclosed_fence_is_not_applicable() {
        let text = "```json\n{\"title\": \"D\"}";
        assert!(SalvageStrategy::FencedBlock.candidate(text).is_none());
        assert_eq!(extract(text).unwrap(), json!({"title": "D"}));
    }

    #[test]
    fn closing_brace_before_opening_is_not_applicable() {
        assert!(SalvageStrategy::BraceSpan.candidate("} then {").is_none());
    }

    #[test]
    fn whole_text_handles_non_object_json() {
        let salvaged = salvage("  [1, 2, 3]  ").unwrap();
        assert_eq!(salvaged.strategy, SalvageStrategy::WholeText);
        assert_eq!(salvaged.value, json!([1, 2, 3]));
    }

    #[test]
    fn nothing_parseable_carries_raw_text() {
        let text = "I'm sorry, I can't help with that.";
        match extract(text) {
            Err(WorkflowError::MalformedResponse { raw }) => assert_eq!(raw, text),
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[test]
    fn empty_text_is_malformed() {
        assert!(matches!(
            extract("   "),
            Err(WorkflowError::MalformedResponse { .. })
        ));
    }
}
