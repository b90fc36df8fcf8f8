//! Backend step → UI progress stage classification
//!
//! The backend reports fine-grained step names; the UI groups them into six
//! coarse stages. Unknown steps get a low default so the bar still moves.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Step identifier that carries the final answer
pub const FINAL_ANSWER_STEP: &str = "final_answer";

/// User-facing phase of the backend pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Start = 0,
    IntentAnalysis = 1,
    FieldIdentification = 2,
    DataRetrieval = 3,
    Generation = 4,
    Complete = 5,
}

impl Stage {
    /// Stages shown as indicators (everything after `Start`)
    pub const INDICATED: [Stage; 5] = [
        Stage::IntentAnalysis,
        Stage::FieldIdentification,
        Stage::DataRetrieval,
        Stage::Generation,
        Stage::Complete,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

/// Result of classifying one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub stage: Stage,
    pub percent: f32,
}

impl Classification {
    const fn new(stage: Stage, percent: f32) -> Self {
        Self { stage, percent }
    }
}

/// Fallback for step names the table does not know
pub const DEFAULT_CLASSIFICATION: Classification = Classification::new(Stage::Start, 10.0);

lazy_static! {
    static ref STEP_TABLE: HashMap<&'static str, Classification> = {
        let mut m = HashMap::new();
        m.insert("_analyze_user_intent", Classification::new(Stage::IntentAnalysis, 15.0));
        m.insert("identify_column", Classification::new(Stage::FieldIdentification, 25.0));
        m.insert("process_start", Classification::new(Stage::DataRetrieval, 35.0));
        m.insert("opensearch_retriever", Classification::new(Stage::DataRetrieval, 45.0));
        m.insert("postgresql_retriever", Classification::new(Stage::DataRetrieval, 50.0));
        m.insert("neo4j_retriever", Classification::new(Stage::DataRetrieval, 55.0));
        m.insert("docs_retrieved", Classification::new(Stage::DataRetrieval, 65.0));
        m.insert("_process_with_llm", Classification::new(Stage::Generation, 75.0));
        m.insert("llm_process_complete", Classification::new(Stage::Generation, 85.0));
        m.insert("generating_document", Classification::new(Stage::Generation, 90.0));
        m.insert(FINAL_ANSWER_STEP, Classification::new(Stage::Complete, 100.0));
        m
    };
}

/// Map a backend step identifier to its stage and percentage. Never fails.
pub fn classify(step_id: &str) -> Classification {
    STEP_TABLE
        .get(step_id)
        .copied()
        .unwrap_or(DEFAULT_CLASSIFICATION)
}

/// Whether the step is in the classification table
pub fn is_known(step_id: &str) -> bool {
    STEP_TABLE.contains_key(step_id)
}

pub fn is_terminal(step_id: &str) -> bool {
    step_id == FINAL_ANSWER_STEP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_steps() {
        assert_eq!(classify("_analyze_user_intent").stage, Stage::IntentAnalysis);
        assert_eq!(classify("neo4j_retriever").stage, Stage::DataRetrieval);
        assert_eq!(classify("generating_document").percent, 90.0);
        assert_eq!(classify(FINAL_ANSWER_STEP), Classification::new(Stage::Complete, 100.0));
    }

    #[test]
    fn test_unknown_steps_fall_back() {
        for step in ["", "something_new", "FINAL_ANSWER", " final_answer"] {
            assert_eq!(classify(step), DEFAULT_CLASSIFICATION);
            assert!(!is_known(step));
        }
    }

    #[test]
    fn test_table_is_ordered_by_pipeline() {
        let pipeline = [
            "_analyze_user_intent",
            "identify_column",
            "process_start",
            "opensearch_retriever",
            "postgresql_retriever",
            "neo4j_retriever",
            "docs_retrieved",
            "_process_with_llm",
            "llm_process_complete",
            "generating_document",
            FINAL_ANSWER_STEP,
        ];

        for pair in pipeline.windows(2) {
            let (a, b) = (classify(pair[0]), classify(pair[1]));
            assert!(a.stage <= b.stage, "{} -> {}", pair[0], pair[1]);
            assert!(a.percent < b.percent, "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_terminal() {
        assert!(is_terminal("final_answer"));
        assert!(!is_terminal("llm_process_complete"));
    }
}
