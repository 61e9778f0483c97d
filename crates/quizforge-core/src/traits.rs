//! Seams between the session engine and its collaborators.
//!
//! A [`Grader`] turns a finished attempt into a [`GradingResult`]; an
//! [`AttemptRecorder`] receives the outcome once the attempt is over.
//! Implementations live in [`crate::grading`] and [`crate::recorder`].

use async_trait::async_trait;

use crate::grading::GradingResult;
use crate::model::{AnswerMap, Question, QuizDefinition};
use crate::report::AttemptOutcome;

/// Grades a submitted attempt.
pub trait Grader: Send + Sync {
    /// Grade `questions`, given in presentation order, against `answers`.
    fn grade(
        &self,
        quiz: &QuizDefinition,
        questions: &[Question],
        answers: &AnswerMap,
        attempt_number: u32,
    ) -> GradingResult;
}

/// Receives graded attempts, e.g. to persist them or forward them upstream.
#[async_trait]
pub trait AttemptRecorder: Send + Sync {
    /// Human-readable recorder name (e.g. "memory").
    fn name(&self) -> &str;

    /// Record one graded attempt. Called exactly once per submitted session.
    async fn record(&self, outcome: &AttemptOutcome) -> anyhow::Result<()>;
}
