//! Progress model for one chat session

use super::classifier::{Classification, Stage};
use serde::{Deserialize, Serialize};

/// Last known progress of the active session.
///
/// `stage` and `percent` only move forward; `complete()` is the one place the
/// percentage jumps straight to 100.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressState {
    pub stage: Stage,
    pub percent: f32,
    pub current_step: Option<String>,
    pub complete: bool,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one classified step, keeping both values non-decreasing
    pub fn advance(&mut self, step: &str, classification: Classification) {
        if self.complete {
            return;
        }

        self.stage = self.stage.max(classification.stage);
        self.percent = self.percent.max(classification.percent.clamp(0.0, 100.0));
        self.current_step = Some(step.to_string());
    }

    /// Force the terminal state
    pub fn complete(&mut self, step: Option<&str>) {
        self.stage = Stage::Complete;
        self.percent = 100.0;
        self.complete = true;
        if let Some(step) = step {
            self.current_step = Some(step.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::classifier::classify;

    #[test]
    fn test_starts_at_zero() {
        let state = ProgressState::new();
        assert_eq!(state.stage, Stage::Start);
        assert_eq!(state.percent, 0.0);
        assert!(state.current_step.is_none());
        assert!(!state.complete);
    }

    #[test]
    fn test_never_moves_backwards() {
        let mut state = ProgressState::new();
        state.advance("docs_retrieved", classify("docs_retrieved"));
        assert_eq!(state.stage, Stage::DataRetrieval);
        assert_eq!(state.percent, 65.0);

        // an earlier step arriving late, and an unknown step
        state.advance("identify_column", classify("identify_column"));
        state.advance("brand_new_step", classify("brand_new_step"));
        assert_eq!(state.stage, Stage::DataRetrieval);
        assert_eq!(state.percent, 65.0);
        assert_eq!(state.current_step.as_deref(), Some("brand_new_step"));
    }

    #[test]
    fn test_complete_is_final() {
        let mut state = ProgressState::new();
        state.advance("process_start", classify("process_start"));
        state.complete(Some("final_answer"));
        assert_eq!(state.percent, 100.0);
        assert_eq!(state.stage, Stage::Complete);

        state.advance("process_start", classify("process_start"));
        assert_eq!(state.current_step.as_deref(), Some("final_answer"));
        assert_eq!(state.percent, 100.0);
    }
}
