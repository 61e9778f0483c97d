//! Error types.
//!
//! Most core operations are total and have no error path at all; these
//! cover the few places where a caller needs to know something was refused.

use thiserror::Error;

use crate::session::SessionState;

/// A learner input arrived after the session stopped accepting input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The session was submitted or abandoned.
    #[error("session is {0}, no further input is accepted")]
    Closed(SessionState),
}

/// Failure talking to a session running under the timer driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The driver task has exited; the session is over.
    #[error("session driver has stopped")]
    Stopped,

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Problems found while turning external files into model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// An answer sheet names a question the quiz does not have.
    #[error("answer sheet references unknown question '{0}'")]
    UnknownQuestion(String),

    /// An answer's shape does not fit its question type.
    #[error("question '{question_id}' ({question_type}) expects {expected}")]
    AnswerShape {
        question_id: String,
        question_type: String,
        expected: &'static str,
    },
}

impl LoadError {
    /// Returns `true` if the offending entry can be skipped without
    /// invalidating the rest of the input.
    pub fn is_skippable(&self) -> bool {
        matches!(self, LoadError::UnknownQuestion(_))
    }
}
