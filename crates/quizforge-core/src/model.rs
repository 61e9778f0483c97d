//! Core data model types for quizforge.
//!
//! These are the fundamental types shared by the authoring engine, delivery
//! sessions and the grading engine: quiz definitions, questions, options and
//! learner answers.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed option id for the "True" option of a true/false question.
pub const TRUE_OPTION_ID: &str = "opt_true";
/// Fixed option id for the "False" option of a true/false question.
pub const FALSE_OPTION_ID: &str = "opt_false";

/// Number of blank options a new choice question starts with.
pub const DEFAULT_CHOICE_OPTIONS: usize = 4;
/// Choice questions never drop below this many options.
pub const MIN_CHOICE_OPTIONS: usize = 2;

/// Default passing threshold, in percent.
pub const DEFAULT_PASSING_MARKS: u32 = 60;

/// The kind of a question, which decides both its shape and how it is graded.
///
/// Unrecognized type names are kept as [`QuestionType::Unsupported`] so a
/// definition written by a newer editor still loads; such questions grade as
/// incorrect with zero marks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    SingleChoice,
    MultiChoice,
    OneWord,
    ShortAnswer,
    TrueFalse,
    Unsupported(String),
}

impl QuestionType {
    /// Canonical wire name.
    pub fn as_str(&self) -> &str {
        match self {
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultiChoice => "multi_choice",
            QuestionType::OneWord => "one_word",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::TrueFalse => "true_false",
            QuestionType::Unsupported(name) => name,
        }
    }

    /// Human-readable label for editor surfaces.
    pub fn label(&self) -> &str {
        match self {
            QuestionType::SingleChoice => "Multiple Choice (Single Answer)",
            QuestionType::MultiChoice => "Multiple Choice (Multiple Answers)",
            QuestionType::OneWord => "One Word Answer",
            QuestionType::ShortAnswer => "Short Answer",
            QuestionType::TrueFalse => "True / False",
            QuestionType::Unsupported(_) => "Unsupported",
        }
    }

    /// Single or multi choice: options are author-editable and may be shuffled.
    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultiChoice)
    }

    /// Question types answered by picking options.
    pub fn uses_options(&self) -> bool {
        self.is_choice() || *self == QuestionType::TrueFalse
    }

    /// Question types answered with free text.
    pub fn is_text(&self) -> bool {
        matches!(self, QuestionType::OneWord | QuestionType::ShortAnswer)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, QuestionType::Unsupported(_))
    }
}

impl From<&str> for QuestionType {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "single_choice" | "mcq" => QuestionType::SingleChoice,
            "multi_choice" | "mcq_multiple" => QuestionType::MultiChoice,
            "one_word" => QuestionType::OneWord,
            "short_answer" => QuestionType::ShortAnswer,
            "true_false" => QuestionType::TrueFalse,
            _ => QuestionType::Unsupported(s.to_string()),
        }
    }
}

impl From<String> for QuestionType {
    fn from(s: String) -> Self {
        QuestionType::from(s.as_str())
    }
}

impl From<QuestionType> for String {
    fn from(t: QuestionType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One selectable option of a choice or true/false question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    /// Stable identifier, unique within its question.
    pub id: String,
    /// Display text. May be empty while a question is being authored.
    #[serde(default)]
    pub text: String,
    /// Whether selecting this option is (part of) the right answer.
    #[serde(default)]
    pub is_correct: bool,
}

impl AnswerOption {
    /// A blank, non-correct option with a fresh id.
    pub fn blank() -> Self {
        Self {
            id: generate_id("opt"),
            text: String::new(),
            is_correct: false,
        }
    }
}

/// A single quiz question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Stable identifier, unique within its quiz.
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// Prompt text.
    #[serde(default)]
    pub question: String,
    /// Ordered options; empty for text questions.
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    /// Accepted answer for text questions (`|`-separated alternatives for
    /// one-word, keyword source text for short answer).
    #[serde(default)]
    pub correct_answer: String,
    /// Marks awarded for a fully correct answer. Always at least 1.
    #[serde(default = "default_marks")]
    pub marks: u32,
    /// Shown to the learner after grading.
    #[serde(default)]
    pub explanation: String,
}

fn default_marks() -> u32 {
    1
}

impl Question {
    /// A new question of `question_type` with type-appropriate default options.
    pub fn empty(question_type: QuestionType) -> Self {
        let options = match question_type {
            QuestionType::TrueFalse => true_false_options(),
            QuestionType::SingleChoice | QuestionType::MultiChoice => {
                (0..DEFAULT_CHOICE_OPTIONS).map(|_| AnswerOption::blank()).collect()
            }
            _ => Vec::new(),
        };

        Self {
            id: generate_id("q"),
            question_type,
            question: String::new(),
            options,
            correct_answer: String::new(),
            marks: default_marks(),
            explanation: String::new(),
        }
    }

    pub fn option(&self, option_id: &str) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    /// Ids of all options flagged correct, in stored order.
    pub fn correct_option_ids(&self) -> Vec<&str> {
        self.options
            .iter()
            .filter(|o| o.is_correct)
            .map(|o| o.id.as_str())
            .collect()
    }
}

/// The fixed True/False option pair.
pub fn true_false_options() -> Vec<AnswerOption> {
    vec![
        AnswerOption {
            id: TRUE_OPTION_ID.to_string(),
            text: "True".to_string(),
            is_correct: false,
        },
        AnswerOption {
            id: FALSE_OPTION_ID.to_string(),
            text: "False".to_string(),
            is_correct: false,
        },
    ]
}

/// An authored quiz: settings plus ordered questions.
///
/// `total_marks` is derived from the questions and is kept in sync by the
/// authoring engine; it is never set directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizDefinition {
    /// Whether this quiz gates progression at all.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Percentage (0-100) needed to pass.
    #[serde(default = "default_passing_marks")]
    pub passing_marks: u32,
    /// Sum of `marks` over `questions`.
    #[serde(default)]
    pub total_marks: u32,
    /// Minutes; 0 means untimed.
    #[serde(default)]
    pub time_limit: u32,
    #[serde(default = "default_attempts")]
    pub attempts_allowed: u32,
    #[serde(default = "default_true")]
    pub show_results_immediately: bool,
    #[serde(default)]
    pub shuffle_questions: bool,
    #[serde(default)]
    pub shuffle_options: bool,
    #[serde(default = "default_true")]
    pub require_pass_to_unlock_next: bool,
    /// Authoring order; the stable base order for delivery.
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Bumped by every authoring operation that changes the definition.
    #[serde(default)]
    pub revision: u64,
}

fn default_passing_marks() -> u32 {
    DEFAULT_PASSING_MARKS
}

fn default_attempts() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl Default for QuizDefinition {
    fn default() -> Self {
        Self::empty()
    }
}

impl QuizDefinition {
    /// A disabled quiz with no questions and the editor's default settings.
    pub fn empty() -> Self {
        Self {
            enabled: false,
            title: String::new(),
            description: String::new(),
            passing_marks: DEFAULT_PASSING_MARKS,
            total_marks: 0,
            time_limit: 0,
            attempts_allowed: 1,
            show_results_immediately: true,
            shuffle_questions: false,
            shuffle_options: false,
            require_pass_to_unlock_next: true,
            questions: Vec::new(),
            revision: 0,
        }
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// Sum of marks over all questions.
    pub fn marks_sum(&self) -> u32 {
        self.questions
            .iter()
            .fold(0u32, |acc, q| acc.saturating_add(q.marks))
    }

    pub fn is_timed(&self) -> bool {
        self.time_limit > 0
    }

    /// Time limit in seconds, or `None` when untimed.
    pub fn time_limit_secs(&self) -> Option<u32> {
        self.is_timed().then(|| self.time_limit.saturating_mul(60))
    }

    /// Score needed to pass, rounded up to whole marks.
    pub fn passing_score(&self) -> u32 {
        let needed = (u64::from(self.passing_marks) * u64::from(self.total_marks)).div_ceil(100);
        u32::try_from(needed).unwrap_or(u32::MAX)
    }

    /// Attempts left after `attempt_number` has been used.
    pub fn attempts_remaining(&self, attempt_number: u32) -> u32 {
        self.attempts_allowed.saturating_sub(attempt_number)
    }

    /// Overview of the quiz as shown alongside the editor.
    pub fn summary(&self) -> QuizSummary {
        let mut type_counts = BTreeMap::new();
        for q in &self.questions {
            *type_counts
                .entry(q.question_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        QuizSummary {
            title: self.title.clone(),
            question_count: self.questions.len(),
            total_marks: self.total_marks,
            passing_marks: self.passing_marks,
            passing_score: self.passing_score(),
            time_limit: self.time_limit,
            attempts_allowed: self.attempts_allowed,
            type_counts,
        }
    }
}

/// Summary of a quiz definition (without the questions themselves).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSummary {
    pub title: String,
    pub question_count: usize,
    pub total_marks: u32,
    pub passing_marks: u32,
    /// Marks needed to pass.
    pub passing_score: u32,
    /// Minutes; 0 means untimed.
    pub time_limit: u32,
    pub attempts_allowed: u32,
    /// Question count per type name.
    pub type_counts: BTreeMap<String, usize>,
}

/// A learner's answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    /// One option id (single choice, true/false).
    Choice(String),
    /// A set of option ids (multi choice).
    Choices(BTreeSet<String>),
    /// Free text (one word, short answer).
    Text(String),
}

impl Answer {
    /// Whether the answer carries anything the learner actually entered.
    pub fn is_answered(&self) -> bool {
        match self {
            Answer::Choice(id) => !id.is_empty(),
            Answer::Choices(ids) => !ids.is_empty(),
            Answer::Text(text) => !text.trim().is_empty(),
        }
    }
}

/// Answers keyed by question id.
pub type AnswerMap = HashMap<String, Answer>;

/// Generate a fresh identifier such as `q_1f0c...`.
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}
