use proptest::prelude::*;
use sdk::errors::{BoardErrorExt, EngineError};
use sdk::types::{Memo, MemoOption};

// Every error variant carries a non-empty hint that never echoes the raw detail
proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "[a-z]{12,40}") {
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::PersonaNotFound(error_str.clone()),
            EngineError::InvalidMemo(error_str.clone()),
            EngineError::Database(error_str.clone()),
            EngineError::LLMProvider(error_str.clone()),
            EngineError::Orchestration(error_str.clone()),
            EngineError::KeyringError(error_str.clone()),
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            prop_assert!(!hint.contains(&error_str));
        }
    }
}

// Memo JSON survives serialization unchanged
proptest! {
    #[test]
    fn test_memo_json_roundtrip(
        decision in "[A-Za-z ]{1,40}[A-Za-z?]",
        context in prop::collection::vec("[a-z ]{1,30}", 0..4),
        option_ids in prop::collection::vec("[A-Z]", 0..4),
        metrics in prop::collection::vec("[a-z ]{1,20}", 0..3),
        risk in prop::option::of("low|medium|high"),
    ) {
        let mut memo = Memo::new(decision);
        memo.context = context;
        memo.options = option_ids
            .iter()
            .map(|id| MemoOption::new(id.clone(), format!("Option {}", id)))
            .collect();
        memo.success_metrics = metrics;
        memo.constraints.risk_tolerance = risk;

        let json = serde_json::to_string(&memo).unwrap();
        let parsed = Memo::from_json_str(&json).unwrap();
        prop_assert_eq!(memo, parsed);
    }
}
