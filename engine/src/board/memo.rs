//! Prompt text builders
//!
//! Rendering is pure and deterministic: the same memo always produces the
//! same bytes, and absent fields are spelled out as "Not specified" so later
//! phases always see the same section layout.

use crate::llm::CompletionOutcome;
use sdk::Memo;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write;

const NOT_SPECIFIED: &str = "Not specified";
const NOT_AVAILABLE: &str = "N/A";

/// Reasons and risks quoted per reviewer in the synthesis input
const TOP_ITEMS: usize = 3;

/// Render a memo as the text every persona reads
pub fn render_memo(memo: &Memo) -> String {
    let sections = [
        ("Context", bullet_list(&memo.context)),
        ("Decision Required", or_placeholder(&memo.decision_required)),
        ("Options", render_options(memo)),
        ("Constraints", render_constraints(memo)),
        ("Success Metrics", bullet_list(&memo.success_metrics)),
        ("Questions", bullet_list(&memo.questions)),
    ];

    sections
        .iter()
        .map(|(title, body)| format!("## {}\n{}", title, body))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn or_placeholder(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        trimmed.to_string()
    }
}

fn bullet_list(items: &[String]) -> String {
    let items: Vec<&str> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if items.is_empty() {
        return NOT_SPECIFIED.to_string();
    }

    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_options(memo: &Memo) -> String {
    if memo.options.is_empty() {
        return NOT_SPECIFIED.to_string();
    }

    memo.options
        .iter()
        .map(|o| format!("- {}: {}", o.id.trim(), or_placeholder(&o.description)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_constraints(memo: &Memo) -> String {
    let c = &memo.constraints;
    let value = |v: &Option<String>| or_placeholder(v.as_deref().unwrap_or(""));

    let mut lines = vec![
        format!("- Time: {}", value(&c.time)),
        format!("- Budget: {}", value(&c.budget)),
        format!("- Risk tolerance: {}", value(&c.risk_tolerance)),
    ];

    // BTreeMap iteration keeps extra constraints in a stable order
    for (key, v) in &c.extra {
        lines.push(format!("- {}: {}", key, or_placeholder(v)));
    }

    lines.join("\n")
}

/// Build the synthesis prompt from the memo and each reviewer's outcome
///
/// Each block is derived only from that reviewer's parsed output. A reviewer
/// with no parsed output, or no outcome at all, renders every field as "N/A".
pub fn build_synthesis_input(
    memo_text: &str,
    reviewer_ids: &[String],
    reviews: &BTreeMap<String, CompletionOutcome>,
) -> String {
    let mut out = String::with_capacity(memo_text.len() + 512 * reviewer_ids.len());
    out.push_str(memo_text);
    out.push_str("\n\n# Board Reviews");

    for id in reviewer_ids {
        let parsed = reviews.get(id).and_then(|o| o.parsed.as_ref());

        // Writing into a String cannot fail
        let _ = write!(
            out,
            "\n\n## {}\nPosition: {}\nTop reasons:\n{}\nTop risks:\n{}\nConfidence: {}",
            id,
            text_field(parsed, "position"),
            top_items(parsed, "reasons"),
            top_items(parsed, "risks"),
            text_field(parsed, "confidence"),
        );
    }

    out
}

fn text_field(parsed: Option<&Value>, field: &str) -> String {
    parsed
        .and_then(|p| p.get(field))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

fn top_items(parsed: Option<&Value>, field: &str) -> String {
    let items: Vec<&str> = parsed
        .and_then(|p| p.get(field))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .take(TOP_ITEMS)
                .collect()
        })
        .unwrap_or_default();

    if items.is_empty() {
        return format!("- {}", NOT_AVAILABLE);
    }

    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}
