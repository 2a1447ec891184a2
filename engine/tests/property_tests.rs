use boardroom_engine::board::{build_synthesis_input, render_memo};
use boardroom_engine::llm::retry::RetryPolicy;
use boardroom_engine::llm::CompletionOutcome;
use proptest::prelude::*;
use sdk::types::{Memo, MemoOption};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

fn memo_strategy() -> impl Strategy<Value = Memo> {
    (
        "[A-Za-z ]{0,40}",
        prop::collection::vec("[a-z ]{0,30}", 0..4),
        prop::collection::vec(("[A-Z]", "[a-z ]{0,20}"), 0..4),
        prop::option::of("[0-9]{1,3} weeks"),
        prop::collection::btree_map("[a-z]{1,8}", "[a-z ]{0,12}", 0..3),
        prop::collection::vec("[a-z ]{0,20}", 0..3),
    )
        .prop_map(|(decision, context, options, time, extra, questions)| {
            let mut memo = Memo::new(decision);
            memo.context = context;
            memo.options = options
                .into_iter()
                .map(|(id, desc)| MemoOption::new(id, desc))
                .collect();
            memo.constraints.time = time;
            memo.constraints.extra = extra;
            memo.questions = questions;
            memo
        })
}

// Rendering is a pure function of the memo and always keeps the six sections
proptest! {
    #[test]
    fn test_render_memo_is_deterministic(memo in memo_strategy()) {
        let first = render_memo(&memo);
        let second = render_memo(&memo.clone());
        prop_assert_eq!(&first, &second);

        let titles = ["## Context", "## Decision Required", "## Options",
                      "## Constraints", "## Success Metrics", "## Questions"];
        let mut cursor = 0;
        for title in titles {
            let found = first[cursor..].find(title);
            prop_assert!(found.is_some(), "missing section {}", title);
            cursor += found.unwrap_or(0) + title.len();
        }
    }
}

// Every reviewer gets exactly one block, in lineup order, whatever it returned
proptest! {
    #[test]
    fn test_synthesis_input_has_one_block_per_reviewer(
        ids in prop::collection::btree_set("[a-z]{3,10}", 1..6),
        reasons in prop::collection::vec("[a-z]{1,10}", 0..6),
        parsed_mask in prop::collection::vec(any::<bool>(), 6),
    ) {
        let ids: Vec<String> = ids.into_iter().collect();
        let reviews: BTreeMap<String, CompletionOutcome> = ids
            .iter()
            .zip(parsed_mask.iter())
            .map(|(id, parsed)| {
                let mut outcome = CompletionOutcome::text("raw");
                if *parsed {
                    outcome.parsed = Some(json!({
                        "position": "support",
                        "reasons": reasons,
                        "risks": [],
                        "confidence": "high"
                    }));
                }
                (id.clone(), outcome)
            })
            .collect();

        let text = build_synthesis_input("MEMO", &ids, &reviews);
        prop_assert!(text.starts_with("MEMO\n\n# Board Reviews"));
        prop_assert_eq!(text.matches("\nPosition: ").count(), ids.len());

        let mut cursor = 0;
        for id in &ids {
            let header = format!("\n\n## {}\n", id);
            let found = text[cursor..].find(&header);
            prop_assert!(found.is_some(), "block for {} out of order", id);
            cursor += found.unwrap_or(0) + header.len();
        }

        // At most three reasons per reviewer
        let quoted = reasons.len().min(3);
        for id in &ids {
            let start = text.find(&format!("\n\n## {}\n", id)).unwrap_or(0);
            let block = &text[start..];
            let end = block[2..].find("\n\n## ").map(|i| i + 2).unwrap_or(block.len());
            let block = &block[..end];
            let bullets = block
                .split("Top risks:")
                .next()
                .unwrap_or("")
                .lines()
                .filter(|l| l.starts_with("- "))
                .count();
            prop_assert!(bullets <= quoted.max(1));
        }
    }
}

// Backoff doubles with every failed attempt
proptest! {
    #[test]
    fn test_backoff_is_monotonic(base_ms in 1u64..5_000, attempt in 1u32..10) {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(base_ms),
            ..RetryPolicy::default()
        };

        let current = policy.backoff_for(attempt);
        let next = policy.backoff_for(attempt + 1);
        prop_assert_eq!(next, current * 2);
        prop_assert_eq!(policy.backoff_for(1), Duration::from_millis(base_ms * 2));
    }
}
