//! Render-ready view of a session's progress, independent of the UI toolkit

use super::classifier::Stage;
use super::progress::ProgressState;
use crate::i18n::{step_message, Locale, Text};

/// Highest percentage shown before the terminal frame has arrived
pub const MAX_PENDING_PERCENT: f32 = 99.0;

/// One of the stage dots under the progress bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageIndicator {
    pub stage: Stage,
    pub label: &'static str,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    /// Bar width in percent, clamped to 99 until completion
    pub percent: f32,
    /// Current step message, or the stage label when no step is known
    pub label: String,
    pub stages: [StageIndicator; 5],
}

impl ProgressView {
    pub fn derive(state: &ProgressState, locale: Locale) -> Self {
        let percent = if state.complete {
            100.0
        } else {
            state.percent.clamp(0.0, MAX_PENDING_PERCENT)
        };

        let label = match state.current_step.as_deref() {
            Some(step) => step_message(locale, step)
                .map(str::to_string)
                .unwrap_or_else(|| step.to_string()),
            None => stage_label(state.stage, locale).to_string(),
        };

        let stages = Stage::INDICATED.map(|stage| StageIndicator {
            stage,
            label: indicator_label(stage, locale),
            active: state.stage >= stage,
        });

        Self {
            percent,
            label,
            stages,
        }
    }

    pub fn rounded_percent(&self) -> u8 {
        self.percent.round() as u8
    }

    /// `"{label} ({percent}%)"`
    pub fn status_line(&self) -> String {
        format!("{} ({}%)", self.label, self.rounded_percent())
    }

    /// Text progress bar of `width` cells
    pub fn bar(&self, width: usize) -> String {
        let filled = ((self.percent / 100.0) * width as f32).round() as usize;
        let filled = filled.min(width);
        format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
    }

    /// Indicator row, active stages marked with `●`
    pub fn indicator_line(&self) -> String {
        self.stages
            .iter()
            .map(|s| format!("{} {}", if s.active { "●" } else { "○" }, s.label))
            .collect::<Vec<_>>()
            .join("  ")
    }
}

/// Phase label for a stage
pub fn stage_label(stage: Stage, locale: Locale) -> &'static str {
    let text = match stage {
        Stage::Start => Text::StageStart,
        Stage::IntentAnalysis => Text::StageIntentAnalysis,
        Stage::FieldIdentification => Text::StageFieldIdentification,
        Stage::DataRetrieval => Text::StageDataRetrieval,
        Stage::Generation => Text::StageGeneration,
        Stage::Complete => Text::StageComplete,
    };
    locale.t(text)
}

fn indicator_label(stage: Stage, locale: Locale) -> &'static str {
    let text = match stage {
        Stage::Start | Stage::IntentAnalysis => Text::IndicatorIntent,
        Stage::FieldIdentification => Text::IndicatorField,
        Stage::DataRetrieval => Text::IndicatorRetrieval,
        Stage::Generation => Text::IndicatorGeneration,
        Stage::Complete => Text::IndicatorComplete,
    };
    locale.t(text)
}
