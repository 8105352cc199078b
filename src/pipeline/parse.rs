//! Response parsing: strip markdown fences, decode JSON, build the invoice.
//!
//! Despite the instruction saying "do not wrap the JSON in fences", vision
//! models regularly return ```` ```json … ``` ```` anyway. Stripping is
//! deliberately narrow: only the exact ```` ```json ```` opening tag is
//! removed (a ```` ```xml ```` or bare ```` ``` ```` prefix is left alone so
//! the parse error shows what actually arrived), only one trailing
//! ```` ``` ```` is removed, and input without fences passes through
//! untouched.

use crate::error::DocumentError;
use crate::invoice::Invoice;
use serde_json::Value;

/// Opening fence tag the model tends to emit despite instruction.
const OPENING_FENCE: &str = "```json";
/// Closing fence marker.
const CLOSING_FENCE: &str = "```";

/// Remove a leading ```` ```json ```` and a single trailing ```` ``` ```` if
/// present, trimming surrounding whitespace at each step.
///
/// A no-op when no fence markers are present. Never strips a leading fence
/// with a different language tag and never double-strips repeated trailing
/// fences — the inner content is returned exactly as the model produced it.
pub fn strip_json_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix(OPENING_FENCE) {
        text = rest.trim();
    }
    if let Some(rest) = text.strip_suffix(CLOSING_FENCE) {
        text = rest.trim();
    }
    text
}

/// Parse raw model output into an [`Invoice`].
///
/// Fails only on JSON syntax errors; missing or extra keys are absorbed by
/// [`Invoice::from_value`]. The returned error carries the exact
/// fence-stripped text that the parser rejected.
pub fn parse_invoice(document: &str, raw: &str) -> Result<Invoice, DocumentError> {
    let text = strip_json_fences(raw);

    let value: Value = serde_json::from_str(text).map_err(|e| DocumentError::ParseFailed {
        document: document.to_string(),
        detail: e.to_string(),
        snippet: text.to_string(),
    })?;

    Ok(Invoice::from_value(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strip_is_noop_without_fences() {
        assert_eq!(strip_json_fences(r#"{"a": 1}"#), r#"{"a": 1}"#);
        assert_eq!(strip_json_fences("  {\"a\": 1}\n"), r#"{"a": 1}"#);
    }

    #[test]
    fn strip_removes_matching_fences() {
        let raw = "```json\n{\"seller_name\": \"X\"}\n```";
        assert_eq!(strip_json_fences(raw), r#"{"seller_name": "X"}"#);
    }

    #[test]
    fn strip_removes_trailing_fence_alone() {
        assert_eq!(strip_json_fences("{\"a\": 1}\n```"), r#"{"a": 1}"#);
    }

    #[test]
    fn strip_leaves_other_language_tags() {
        let raw = "```xml\n<a/>\n```";
        // Only the trailing fence matches; the opening tag is preserved so
        // the parse error shows the real payload.
        assert_eq!(strip_json_fences(raw), "```xml\n<a/>");
    }

    #[test]
    fn strip_does_not_double_strip_trailing_fences() {
        let raw = "{\"a\": 1}\n```\n```";
        assert_eq!(strip_json_fences(raw), "{\"a\": 1}\n```");
    }

    #[test]
    fn parse_fenced_response() {
        let inv = parse_invoice("doc.pdf", "```json\n{\"seller_name\":\"X\"}\n```").unwrap();
        assert_eq!(inv.seller_name, Some(json!("X")));
    }

    #[test]
    fn parse_plain_response() {
        let inv = parse_invoice("doc.pdf", "{\"seller_name\":\"X\"}").unwrap();
        assert_eq!(inv.seller_name, Some(json!("X")));
    }

    #[test]
    fn parse_failure_reports_stripped_text() {
        let err = parse_invoice("doc.pdf", "```json\nI could not find an invoice.\n```")
            .unwrap_err();
        match err {
            DocumentError::ParseFailed { snippet, document, .. } => {
                assert_eq!(document, "doc.pdf");
                assert_eq!(snippet, "I could not find an invoice.");
            }
            other => panic!("expected ParseFailed, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_non_json() {
        assert!(parse_invoice("doc.pdf", "not json at all").is_err());
    }

    #[test]
    fn parse_tolerates_unknown_and_missing_keys() {
        let inv = parse_invoice("doc.pdf", r#"{"unexpected": true}"#).unwrap();
        assert!(inv.seller_name.is_none());
        assert!(inv.items.is_empty());
    }
}
