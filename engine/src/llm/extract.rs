//! Response extraction helpers
//!
//! Pulls the flattened text, reasoning summary, token usage and embedded JSON
//! out of a Responses-style payload. The payload may carry a convenience
//! `output_text` field, a list of typed `output` items, or both.

use super::schema::OutputSchema;
use super::TokenUsage;
use serde_json::Value;

/// Flatten the textual output of a response
///
/// Prefers a non-empty `output_text`; otherwise concatenates every text block
/// found in `output[].content[]`.
pub fn flatten_output_text(response: &Value) -> String {
    if let Some(text) = response.get("output_text").and_then(Value::as_str) {
        if !text.is_empty() {
            return text.to_string();
        }
    }

    let mut text = String::new();
    let items = response
        .get("output")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for item in items {
        let Some(blocks) = item.get("content").and_then(Value::as_array) else {
            continue;
        };
        for block in blocks {
            let kind = block.get("type").and_then(Value::as_str).unwrap_or("");
            if kind != "output_text" && kind != "text" {
                continue;
            }
            if let Some(segment) = block.get("text").and_then(Value::as_str) {
                text.push_str(segment);
            }
        }
    }

    text
}

/// Collect reasoning summary segments, if the response carries any
pub fn reasoning_summary(response: &Value) -> Option<String> {
    let items = response.get("output").and_then(Value::as_array)?;

    let segments: Vec<&str> = items
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("reasoning"))
        .filter_map(|item| item.get("summary").and_then(Value::as_array))
        .flatten()
        .filter_map(|s| s.get("text").and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
        .collect();

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("\n\n"))
    }
}

/// Read usage counters, defaulting each absent counter to zero
pub fn parse_usage(response: &Value) -> TokenUsage {
    let Some(usage) = response.get("usage") else {
        return TokenUsage::default();
    };

    let count = |v: Option<&Value>| v.and_then(Value::as_u64).unwrap_or(0);

    TokenUsage {
        input: count(usage.get("input_tokens")),
        output: count(usage.get("output_tokens")),
        reasoning: count(
            usage
                .get("output_tokens_details")
                .and_then(|d| d.get("reasoning_tokens")),
        ),
        total: count(usage.get("total_tokens")),
    }
}

/// Locate and parse the JSON object embedded in model text
///
/// Candidates are tried in order: a fenced block labeled `json`, the first
/// fenced block of any language, then the trimmed whole text. The first
/// candidate that parses as a JSON object wins.
pub fn extract_json(text: &str) -> Option<Value> {
    let candidates = [
        fenced_block(text, Some("json")),
        fenced_block(text, None),
        Some(text.trim()),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(|c| serde_json::from_str::<Value>(c.trim()).ok())
        .find(Value::is_object)
}

/// Extract and validate a structured answer
///
/// Returns `None` when no JSON object can be found or the object breaks the
/// schema. Violations are logged; they are not errors.
pub fn parse_structured(text: &str, schema: &OutputSchema) -> Option<Value> {
    let Some(value) = extract_json(text) else {
        tracing::warn!(schema = %schema.name, "no JSON object found in structured output");
        return None;
    };

    match schema.validate(&value) {
        Ok(()) => Some(value),
        Err(violations) => {
            let summary: Vec<String> = violations.iter().map(ToString::to_string).collect();
            tracing::warn!(
                schema = %schema.name,
                violations = %summary.join("; "),
                "structured output does not satisfy schema"
            );
            None
        }
    }
}

/// Body of the first fenced block, optionally restricted to a language tag
///
/// Only a fence at the start of a line opens a block; inline backticks are
/// ignored. A candidate without a closing fence is skipped.
fn fenced_block<'a>(text: &'a str, language: Option<&str>) -> Option<&'a str> {
    let mut search_from = 0;

    while let Some(rel) = text[search_from..].find("```") {
        let fence_start = search_from + rel;
        let open_end = fence_start + 3;

        let at_line_start = fence_start == 0 || text[..fence_start].ends_with('\n');
        if !at_line_start {
            search_from = open_end;
            continue;
        }

        let Some(close_rel) = text[open_end..].find("```") else {
            search_from = open_end;
            continue;
        };
        let close_start = open_end + close_rel;
        let (tag, body) = split_fence(&text[open_end..close_start]);

        let matches = match language {
            Some(lang) => tag.eq_ignore_ascii_case(lang),
            None => true,
        };
        if matches {
            return Some(body);
        }

        // Skip past the closing fence of the block we just rejected
        search_from = close_start + 3;
    }

    None
}

/// Split a fenced block's inner text into its language tag and body
///
/// A one-line block (```` ```json {..}``` ````) takes its tag from the
/// leading word.
fn split_fence(inner: &str) -> (&str, &str) {
    match inner.find('\n') {
        Some(nl) => (inner[..nl].trim(), &inner[nl + 1..]),
        None => {
            let inner = inner.trim_start();
            let tag_len = inner
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
                .unwrap_or(inner.len());
            (&inner[..tag_len], &inner[tag_len..])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::schema::SchemaField;
    use serde_json::json;

    #[test]
    fn test_flatten_prefers_output_text() {
        let response = json!({
            "output_text": "flat",
            "output": [{"type": "message", "content": [{"type": "output_text", "text": "blocks"}]}]
        });
        assert_eq!(flatten_output_text(&response), "flat");
    }

    #[test]
    fn test_flatten_concatenates_blocks() {
        let response = json!({
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "Hello, "},
                    {"type": "refusal", "refusal": "no"},
                    {"type": "output_text", "text": "board."}
                ]}
            ]
        });
        assert_eq!(flatten_output_text(&response), "Hello, board.");
    }

    #[test]
    fn test_flatten_empty_response() {
        assert_eq!(flatten_output_text(&json!({})), "");
    }

    #[test]
    fn test_reasoning_summary_joined() {
        let response = json!({
            "output": [{"type": "reasoning", "summary": [
                {"type": "summary_text", "text": "First."},
                {"type": "summary_text", "text": "Second."}
            ]}]
        });
        assert_eq!(reasoning_summary(&response).as_deref(), Some("First.\n\nSecond."));
        assert_eq!(reasoning_summary(&json!({"output": []})), None);
    }

    #[test]
    fn test_usage_missing_defaults_to_zero() {
        assert_eq!(parse_usage(&json!({"id": "resp_1"})), TokenUsage::default());
    }

    #[test]
    fn test_usage_partial_counters() {
        let usage = parse_usage(&json!({
            "usage": {"input_tokens": 120, "total_tokens": 200,
                      "output_tokens_details": {"reasoning_tokens": 30}}
        }));
        assert_eq!(
            usage,
            TokenUsage {
                input: 120,
                output: 0,
                reasoning: 30,
                total: 200
            }
        );
    }

    #[test]
    fn test_extract_json_prefers_json_fence() {
        let text = "```text\n{\"a\": 1}\n```\nthen\n```json\n{\"b\": 2}\n```";
        assert_eq!(extract_json(text), Some(json!({"b": 2})));
    }

    #[test]
    fn test_extract_json_any_fence() {
        let text = "Here you go:\n```\n{\"a\": 1}\n```\nDone.";
        assert_eq!(extract_json(text), Some(json!({"a": 1})));
    }

    #[test]
    fn test_extract_json_ignores_inline_backticks() {
        let text = "Use ``` to fence code.\n```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json(text), Some(json!({"a": 1})));
    }

    #[test]
    fn test_extract_json_single_line_fence() {
        assert_eq!(extract_json("```json {\"a\": 1}```"), Some(json!({"a": 1})));
        assert_eq!(extract_json("```{\"a\": 2}```"), Some(json!({"a": 2})));
    }

    #[test]
    fn test_extract_json_skips_unclosed_fence() {
        let text = "```text\n{\"a\": 1}";
        assert_eq!(fenced_block(text, None), None);
        assert_eq!(extract_json(text), None);
    }

    #[test]
    fn test_extract_json_whole_text() {
        assert_eq!(extract_json("  {\"a\": [1, 2]}\n"), Some(json!({"a": [1, 2]})));
    }

    #[test]
    fn test_extract_json_falls_through_bad_fence() {
        let text = "```json\nnot json\n```";
        assert_eq!(extract_json(text), None);
    }

    #[test]
    fn test_extract_json_rejects_non_objects() {
        assert_eq!(extract_json("[1, 2, 3]"), None);
        assert_eq!(extract_json("just prose"), None);
    }

    #[test]
    fn test_parse_structured_validates() {
        let schema = OutputSchema::new("s", vec![SchemaField::text("position", "p")]);
        assert_eq!(
            parse_structured("{\"position\": \"support\"}", &schema),
            Some(json!({"position": "support"}))
        );
        assert_eq!(parse_structured("{\"position\": 3}", &schema), None);
        assert_eq!(parse_structured("nope", &schema), None);
    }
}
