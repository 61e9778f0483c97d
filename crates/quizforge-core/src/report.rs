//! Attempt outcome with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::grading::GradingResult;
use crate::model::QuizDefinition;

/// Everything the caller learns about a finished attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptOutcome {
    /// Unique attempt identifier.
    pub attempt_id: Uuid,
    pub quiz_title: String,
    pub result: GradingResult,
    /// Attempts left after this one.
    pub attempts_remaining: u32,
    /// Failed and attempts remain.
    pub can_retry: bool,
    /// Whether per-question details may be shown right away.
    pub show_details: bool,
}

impl AttemptOutcome {
    pub fn new(quiz: &QuizDefinition, result: GradingResult) -> Self {
        let attempts_remaining = quiz.attempts_remaining(result.attempt_number);
        Self {
            attempt_id: Uuid::new_v4(),
            quiz_title: quiz.title.clone(),
            can_retry: !result.passed && attempts_remaining > 0,
            show_details: quiz.show_results_immediately,
            attempts_remaining,
            result,
        }
    }

    /// One-line verdict for the learner.
    pub fn headline(&self) -> &'static str {
        if self.result.passed {
            "Congratulations! You passed."
        } else {
            "Keep practicing."
        }
    }

    /// What the learner may do next, if anything.
    pub fn next_step_message(&self) -> Option<String> {
        if self.result.unlock_next {
            return Some("Next task unlocked.".to_string());
        }
        if self.result.passed {
            return None;
        }
        Some(match self.attempts_remaining {
            0 => "No attempts remaining.".to_string(),
            1 => "You have 1 attempt remaining.".to_string(),
            n => format!("You have {n} attempts remaining."),
        })
    }

    /// File name used when saving into a directory.
    pub fn file_name(&self) -> String {
        format!(
            "attempt-{}-{}.json",
            self.result.attempt_number,
            self.attempt_id.simple()
        )
    }

    /// Save the outcome as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize attempt")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write attempt to {}", path.display()))?;
        Ok(())
    }

    /// Load an outcome from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read attempt from {}", path.display()))?;
        let outcome: AttemptOutcome =
            serde_json::from_str(&content).context("failed to parse attempt JSON")?;
        Ok(outcome)
    }
}
