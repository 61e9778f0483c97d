//! Delivery session: one learner's attempt at a quiz.
//!
//! A session owns its presentation order, answers, flags, position and
//! countdown. It starts `InProgress` and ends either `Submitted` (graded
//! exactly once) or `Abandoned` (never graded). Manual submit and timer
//! expiry go through the same guarded transition, so a duplicate submit is
//! a no-op rather than a regrade.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::grading::{GradingResult, StandardGrader};
use crate::model::{Answer, AnswerMap, Question, QuestionType, QuizDefinition};
use crate::shuffle;
use crate::traits::Grader;

/// Remaining time below which the countdown is shown as low.
pub const LOW_TIME_SECS: u32 = 300;
/// Remaining time below which the countdown is shown as critical.
pub const CRITICAL_TIME_SECS: u32 = 60;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    InProgress,
    Submitted,
    Abandoned,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::InProgress => write!(f, "in progress"),
            SessionState::Submitted => write!(f, "submitted"),
            SessionState::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// What the learner should be told before submitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitCheck {
    pub answered: usize,
    pub unanswered: usize,
    /// Unanswered questions remain; the caller should confirm first.
    pub needs_confirmation: bool,
}

/// Result of a submit request.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Unanswered questions remain and the submit was not forced.
    NeedsConfirmation { unanswered: usize },
    /// The session was graded by this call.
    Graded(GradingResult),
    /// The session had already been graded; nothing was recomputed.
    AlreadySubmitted(GradingResult),
    /// The session was abandoned and will never be graded.
    Abandoned,
}

impl SubmitOutcome {
    pub fn result(&self) -> Option<&GradingResult> {
        match self {
            SubmitOutcome::Graded(r) | SubmitOutcome::AlreadySubmitted(r) => Some(r),
            _ => None,
        }
    }
}

/// Result of one timer tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The quiz has no time limit.
    Untimed,
    Running { remaining_seconds: u32 },
    /// Time ran out on this tick and the session was submitted.
    Expired(GradingResult),
    /// The session no longer runs a clock.
    Stopped,
}

/// How urgently the countdown should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerUrgency {
    Normal,
    Low,
    Critical,
}

/// An option as the learner sees it: no correctness data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionView {
    pub id: String,
    pub text: String,
}

/// A question as the learner sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: String,
    pub question_type: QuestionType,
    pub question: String,
    pub marks: u32,
    pub options: Vec<OptionView>,
    pub answer: Option<Answer>,
    pub flagged: bool,
}

/// Snapshot of a session for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub state: SessionState,
    pub title: String,
    pub attempt_number: u32,
    pub current_index: usize,
    pub total_questions: usize,
    pub current_question: Option<QuestionView>,
    pub answered_count: usize,
    /// Share of questions answered, 0-100.
    pub progress_percent: f64,
    pub flagged: Vec<String>,
    pub remaining_seconds: Option<u32>,
    /// `MM:SS`, when timed.
    pub remaining_display: Option<String>,
    pub urgency: Option<TimerUrgency>,
}

/// One learner's attempt.
#[derive(Debug, Clone)]
pub struct QuizSession<G: Grader = StandardGrader> {
    quiz: Arc<QuizDefinition>,
    attempt_number: u32,
    grader: G,
    /// Presentation position -> index into `quiz.questions`.
    question_order: Vec<usize>,
    /// Presented copies, options already in presentation order.
    questions: Vec<Question>,
    answers: AnswerMap,
    flagged: BTreeSet<String>,
    current_index: usize,
    remaining_seconds: Option<u32>,
    state: SessionState,
    result: Option<GradingResult>,
}

impl QuizSession<StandardGrader> {
    /// Start an attempt, shuffling with the thread RNG when the quiz asks for it.
    pub fn new(quiz: Arc<QuizDefinition>, attempt_number: u32) -> Self {
        Self::with_rng(quiz, attempt_number, &mut rand::thread_rng())
    }

    /// Start an attempt with an explicit RNG, e.g. a seeded one.
    pub fn with_rng<R: Rng + ?Sized>(
        quiz: Arc<QuizDefinition>,
        attempt_number: u32,
        rng: &mut R,
    ) -> Self {
        Self::with_grader(quiz, attempt_number, StandardGrader, rng)
    }
}

impl<G: Grader> QuizSession<G> {
    /// Start an attempt graded by `grader`.
    pub fn with_grader<R: Rng + ?Sized>(
        quiz: Arc<QuizDefinition>,
        attempt_number: u32,
        grader: G,
        rng: &mut R,
    ) -> Self {
        let question_order = if quiz.shuffle_questions {
            shuffle::permutation(quiz.questions.len(), rng)
        } else {
            shuffle::identity(quiz.questions.len())
        };

        let questions = question_order
            .iter()
            .map(|&i| {
                let mut question = quiz.questions[i].clone();
                if quiz.shuffle_options && question.question_type.is_choice() {
                    let order = shuffle::permutation(question.options.len(), rng);
                    question.options = shuffle::apply(&question.options, &order);
                }
                question
            })
            .collect();

        tracing::debug!(
            attempt_number,
            questions = quiz.questions.len(),
            shuffled = quiz.shuffle_questions,
            "starting quiz session"
        );

        Self {
            remaining_seconds: quiz.time_limit_secs(),
            quiz,
            attempt_number,
            grader,
            question_order,
            questions,
            answers: AnswerMap::new(),
            flagged: BTreeSet::new(),
            current_index: 0,
            state: SessionState::InProgress,
            result: None,
        }
    }

    pub fn quiz(&self) -> &QuizDefinition {
        &self.quiz
    }

    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_submitted(&self) -> bool {
        self.state == SessionState::Submitted
    }

    /// The grading result, once submitted.
    pub fn result(&self) -> Option<&GradingResult> {
        self.result.as_ref()
    }

    /// Questions in presentation order.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// For each presented position, the index of the question in the definition.
    pub fn question_order(&self) -> &[usize] {
        &self.question_order
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn flagged(&self) -> &BTreeSet<String> {
        &self.flagged
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub fn remaining_seconds(&self) -> Option<u32> {
        self.remaining_seconds
    }

    /// Questions with a non-blank answer.
    pub fn answered_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| self.answers.get(&q.id).is_some_and(Answer::is_answered))
            .count()
    }

    pub fn unanswered_count(&self) -> usize {
        self.questions.len() - self.answered_count()
    }

    /// Record (overwrite) the answer to a question.
    pub fn set_answer(&mut self, question_id: &str, answer: Answer) -> Result<(), SessionError> {
        self.ensure_open()?;
        if self.presented(question_id).is_none() {
            tracing::debug!(question_id, "set_answer: question not in this session");
            return Ok(());
        }
        self.answers.insert(question_id.to_string(), answer);
        Ok(())
    }

    /// Pick an option: replaces the choice on single-answer questions and
    /// toggles membership on multi-answer questions.
    pub fn select_option(&mut self, question_id: &str, option_id: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        let Some(question) = self.presented(question_id) else {
            tracing::debug!(question_id, "select_option: question not in this session");
            return Ok(());
        };
        if question.option(option_id).is_none() {
            tracing::debug!(question_id, option_id, "select_option: no such option");
            return Ok(());
        }
        let question_type = question.question_type.clone();

        match question_type {
            QuestionType::SingleChoice | QuestionType::TrueFalse => {
                self.answers
                    .insert(question_id.to_string(), Answer::Choice(option_id.to_string()));
            }
            QuestionType::MultiChoice => {
                let entry = self
                    .answers
                    .entry(question_id.to_string())
                    .or_insert_with(|| Answer::Choices(BTreeSet::new()));
                if !matches!(entry, Answer::Choices(_)) {
                    *entry = Answer::Choices(BTreeSet::new());
                }
                if let Answer::Choices(selected) = entry {
                    if !selected.remove(option_id) {
                        selected.insert(option_id.to_string());
                    }
                }
            }
            _ => {
                tracing::debug!(question_id, "select_option: question takes a text answer");
            }
        }
        Ok(())
    }

    /// Toggle the review flag on a question. Returns whether it is now flagged.
    pub fn toggle_flag(&mut self, question_id: &str) -> Result<bool, SessionError> {
        self.ensure_open()?;
        if self.presented(question_id).is_none() {
            return Ok(false);
        }
        if self.flagged.remove(question_id) {
            Ok(false)
        } else {
            self.flagged.insert(question_id.to_string());
            Ok(true)
        }
    }

    /// Jump to a position, clamped to the available questions.
    pub fn navigate(&mut self, index: usize) -> Result<usize, SessionError> {
        self.ensure_open()?;
        self.current_index = index.min(self.questions.len().saturating_sub(1));
        Ok(self.current_index)
    }

    pub fn next(&mut self) -> Result<usize, SessionError> {
        self.navigate(self.current_index.saturating_add(1))
    }

    pub fn previous(&mut self) -> Result<usize, SessionError> {
        self.navigate(self.current_index.saturating_sub(1))
    }

    /// Advance the countdown by one second, submitting when it reaches zero.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != SessionState::InProgress {
            return TickOutcome::Stopped;
        }
        let Some(remaining) = self.remaining_seconds else {
            return TickOutcome::Untimed;
        };

        let remaining = remaining.saturating_sub(1);
        self.remaining_seconds = Some(remaining);
        if remaining > 0 {
            return TickOutcome::Running {
                remaining_seconds: remaining,
            };
        }

        tracing::info!(attempt_number = self.attempt_number, "time limit reached, submitting");
        match self.submit(true) {
            SubmitOutcome::Graded(result) => TickOutcome::Expired(result),
            _ => TickOutcome::Stopped,
        }
    }

    /// Check whether a submit needs the learner's confirmation. Changes nothing.
    pub fn request_submit(&self) -> SubmitCheck {
        let answered = self.answered_count();
        let unanswered = self.questions.len() - answered;
        SubmitCheck {
            answered,
            unanswered,
            needs_confirmation: unanswered > 0,
        }
    }

    /// Grade and close the session.
    ///
    /// Without `force`, a session with unanswered questions is not submitted
    /// and [`SubmitOutcome::NeedsConfirmation`] is returned instead. Calling
    /// this on a submitted session returns the stored result untouched.
    pub fn submit(&mut self, force: bool) -> SubmitOutcome {
        match self.state {
            SessionState::Submitted => {
                return match &self.result {
                    Some(result) => SubmitOutcome::AlreadySubmitted(result.clone()),
                    None => SubmitOutcome::Abandoned,
                };
            }
            SessionState::Abandoned => return SubmitOutcome::Abandoned,
            SessionState::InProgress => {}
        }

        let check = self.request_submit();
        if !force && check.needs_confirmation {
            return SubmitOutcome::NeedsConfirmation {
                unanswered: check.unanswered,
            };
        }

        let result = self
            .grader
            .grade(&self.quiz, &self.questions, &self.answers, self.attempt_number);
        tracing::info!(
            attempt_number = self.attempt_number,
            score = result.total_score,
            total = result.total_marks,
            passed = result.passed,
            "quiz submitted"
        );

        self.state = SessionState::Submitted;
        self.result = Some(result.clone());
        SubmitOutcome::Graded(result)
    }

    /// Walk away from the attempt. Nothing is graded or reported.
    /// Returns `false` if the session had already ended.
    pub fn abandon(&mut self) -> bool {
        if self.state != SessionState::InProgress {
            return false;
        }
        tracing::debug!(attempt_number = self.attempt_number, "session abandoned");
        self.state = SessionState::Abandoned;
        self.answers.clear();
        self.flagged.clear();
        true
    }

    /// Snapshot for rendering.
    pub fn view(&self) -> SessionView {
        let answered_count = self.answered_count();
        let total_questions = self.questions.len();
        let progress_percent = if total_questions == 0 {
            0.0
        } else {
            answered_count as f64 / total_questions as f64 * 100.0
        };

        SessionView {
            state: self.state,
            title: self.quiz.title.clone(),
            attempt_number: self.attempt_number,
            current_index: self.current_index,
            total_questions,
            current_question: self.current_question().map(|q| self.question_view(q)),
            answered_count,
            progress_percent,
            flagged: self.flagged.iter().cloned().collect(),
            remaining_seconds: self.remaining_seconds,
            remaining_display: self.remaining_seconds.map(format_time),
            urgency: self.remaining_seconds.map(urgency),
        }
    }

    fn question_view(&self, question: &Question) -> QuestionView {
        QuestionView {
            id: question.id.clone(),
            question_type: question.question_type.clone(),
            question: question.question.clone(),
            marks: question.marks,
            options: question
                .options
                .iter()
                .map(|o| OptionView {
                    id: o.id.clone(),
                    text: o.text.clone(),
                })
                .collect(),
            answer: self.answers.get(&question.id).cloned(),
            flagged: self.flagged.contains(&question.id),
        }
    }

    fn presented(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::InProgress => Ok(()),
            state => Err(SessionError::Closed(state)),
        }
    }
}

/// Format seconds as `MM:SS`.
pub fn format_time(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn urgency(remaining: u32) -> TimerUrgency {
    if remaining < CRITICAL_TIME_SECS {
        TimerUrgency::Critical
    } else if remaining < LOW_TIME_SECS {
        TimerUrgency::Low
    } else {
        TimerUrgency::Normal
    }
}
