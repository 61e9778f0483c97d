//! TOML quiz parser.
//!
//! Loads quiz definitions and answer sheets from TOML files and
//! directories, and checks definitions for authoring gaps.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::authoring::{coerce_marks, recompute_total_marks};
use crate::error::LoadError;
use crate::model::{
    generate_id, true_false_options, Answer, AnswerMap, AnswerOption, Question, QuestionType,
    QuizDefinition, DEFAULT_PASSING_MARKS, FALSE_OPTION_ID, MIN_CHOICE_OPTIONS, TRUE_OPTION_ID,
};

/// Intermediate TOML structure for quiz files.
#[derive(Debug, Deserialize)]
struct TomlQuizFile {
    quiz: TomlQuizHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuizHeader {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_passing_marks")]
    passing_marks: u32,
    #[serde(default)]
    time_limit: u32,
    #[serde(default = "default_attempts")]
    attempts_allowed: u32,
    #[serde(default = "default_true")]
    show_results_immediately: bool,
    #[serde(default)]
    shuffle_questions: bool,
    #[serde(default)]
    shuffle_options: bool,
    #[serde(default = "default_true")]
    require_pass_to_unlock_next: bool,
}

fn default_true() -> bool {
    true
}

fn default_passing_marks() -> u32 {
    DEFAULT_PASSING_MARKS
}

fn default_attempts() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    question_type: String,
    question: String,
    #[serde(default)]
    marks: Option<TomlMarks>,
    #[serde(default)]
    correct_answer: String,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    options: Vec<TomlOption>,
}

/// Marks may be written as a number or, as editors export them, a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TomlMarks {
    Number(i64),
    Float(f64),
    Text(String),
}

impl TomlMarks {
    fn coerce(&self) -> u32 {
        match self {
            TomlMarks::Number(n) => coerce_marks(&n.to_string()),
            // Truncates toward zero; the saturating cast keeps huge values in range.
            TomlMarks::Float(f) => coerce_marks(&(f.trunc() as i64).to_string()),
            TomlMarks::Text(s) => coerce_marks(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TomlOption {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    is_correct: bool,
}

/// Intermediate TOML structure for answer sheets.
#[derive(Debug, Deserialize)]
struct TomlAnswerSheet {
    #[serde(default)]
    answers: BTreeMap<String, TomlAnswer>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TomlAnswer {
    One(String),
    Many(Vec<String>),
}

/// Parse a single TOML file into a `QuizDefinition`.
pub fn parse_quiz(path: &Path) -> Result<QuizDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz file: {}", path.display()))?;

    parse_quiz_str(&content, path)
}

/// Parse a TOML string into a `QuizDefinition` (useful for testing).
///
/// Missing question and option ids are generated, marks are coerced to at
/// least 1, and `total_marks` is computed from the questions.
pub fn parse_quiz_str(content: &str, source_path: &Path) -> Result<QuizDefinition> {
    let parsed: TomlQuizFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let header = parsed.quiz;
    let questions = parsed.questions.into_iter().map(convert_question).collect();

    let quiz = QuizDefinition {
        enabled: header.enabled,
        title: header.title,
        description: header.description,
        passing_marks: header.passing_marks.min(100),
        total_marks: 0,
        time_limit: header.time_limit,
        attempts_allowed: header.attempts_allowed.max(1),
        show_results_immediately: header.show_results_immediately,
        shuffle_questions: header.shuffle_questions,
        shuffle_options: header.shuffle_options,
        require_pass_to_unlock_next: header.require_pass_to_unlock_next,
        questions,
        revision: 0,
    };
    Ok(recompute_total_marks(quiz))
}

fn convert_question(q: TomlQuestion) -> Question {
    let question_type = QuestionType::from(q.question_type);

    let options = match question_type {
        QuestionType::TrueFalse if q.options.is_empty() => {
            // `correct_answer = "true"` is shorthand for the fixed pair.
            let correct = q.correct_answer.trim().to_lowercase();
            true_false_options()
                .into_iter()
                .map(|mut o| {
                    o.is_correct = (o.id == TRUE_OPTION_ID && correct == "true")
                        || (o.id == FALSE_OPTION_ID && correct == "false");
                    o
                })
                .collect()
        }
        QuestionType::OneWord | QuestionType::ShortAnswer => Vec::new(),
        _ => q
            .options
            .into_iter()
            .map(|o| AnswerOption {
                id: o.id.unwrap_or_else(|| generate_id("opt")),
                text: o.text,
                is_correct: o.is_correct,
            })
            .collect(),
    };

    Question {
        id: q.id.unwrap_or_else(|| generate_id("q")),
        question_type,
        question: q.question,
        options,
        correct_answer: q.correct_answer,
        marks: q.marks.as_ref().map_or(1, TomlMarks::coerce),
        explanation: q.explanation,
    }
}

/// Recursively load all `.toml` quiz files from a directory.
pub fn load_quiz_directory(dir: &Path) -> Result<Vec<QuizDefinition>> {
    let mut quizzes = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            quizzes.extend(load_quiz_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_quiz(&path) {
                Ok(quiz) => quizzes.push(quiz),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(quizzes)
}

/// Read an answer sheet for `quiz` from a TOML file.
pub fn parse_answer_sheet(path: &Path, quiz: &QuizDefinition) -> Result<AnswerMap> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answer sheet: {}", path.display()))?;

    parse_answer_sheet_str(&content, quiz)
        .with_context(|| format!("invalid answer sheet: {}", path.display()))
}

/// Parse an `[answers]` table into an answer map.
///
/// Entries for questions the quiz does not have are skipped with a warning.
/// An entry whose shape cannot fit its question is an error.
pub fn parse_answer_sheet_str(content: &str, quiz: &QuizDefinition) -> Result<AnswerMap> {
    let parsed: TomlAnswerSheet =
        toml::from_str(content).context("failed to parse answer sheet TOML")?;

    let mut answers = AnswerMap::new();
    for (question_id, value) in parsed.answers {
        match convert_answer(quiz, &question_id, value) {
            Ok(answer) => {
                answers.insert(question_id, answer);
            }
            Err(e) if e.is_skippable() => tracing::warn!("{e}, skipping"),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(answers)
}

fn convert_answer(
    quiz: &QuizDefinition,
    question_id: &str,
    value: TomlAnswer,
) -> Result<Answer, LoadError> {
    let question = quiz
        .question(question_id)
        .ok_or_else(|| LoadError::UnknownQuestion(question_id.to_string()))?;

    let shape_error = |expected: &'static str| LoadError::AnswerShape {
        question_id: question_id.to_string(),
        question_type: question.question_type.to_string(),
        expected,
    };

    match (&question.question_type, value) {
        (QuestionType::TrueFalse, TomlAnswer::One(v)) => {
            let id = match v.trim().to_lowercase().as_str() {
                "true" => TRUE_OPTION_ID.to_string(),
                "false" => FALSE_OPTION_ID.to_string(),
                _ => v,
            };
            Ok(Answer::Choice(id))
        }
        (QuestionType::SingleChoice, TomlAnswer::One(v)) => Ok(Answer::Choice(v)),
        (QuestionType::SingleChoice | QuestionType::TrueFalse, TomlAnswer::Many(_)) => {
            Err(shape_error("a single option id"))
        }
        (QuestionType::MultiChoice, TomlAnswer::One(v)) => {
            Ok(Answer::Choices(BTreeSet::from([v])))
        }
        (QuestionType::MultiChoice, TomlAnswer::Many(vs)) => {
            Ok(Answer::Choices(vs.into_iter().collect()))
        }
        (QuestionType::OneWord | QuestionType::ShortAnswer, TomlAnswer::One(v)) => {
            Ok(Answer::Text(v))
        }
        (QuestionType::OneWord | QuestionType::ShortAnswer, TomlAnswer::Many(_)) => {
            Err(shape_error("a text answer"))
        }
        (QuestionType::Unsupported(_), TomlAnswer::One(v)) => Ok(Answer::Text(v)),
        (QuestionType::Unsupported(_), TomlAnswer::Many(vs)) => {
            Ok(Answer::Choices(vs.into_iter().collect()))
        }
    }
}

/// A warning from quiz validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.question_id {
            Some(id) => write!(f, "[{id}] {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Validate a quiz for authoring gaps that would make it unfair to deliver.
pub fn validate_quiz(quiz: &QuizDefinition) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut warn = |question_id: Option<&str>, message: String| {
        warnings.push(ValidationWarning {
            question_id: question_id.map(str::to_string),
            message,
        });
    };

    if quiz.questions.is_empty() {
        if quiz.enabled {
            warn(None, "quiz is enabled but has no questions".into());
        } else {
            warn(None, "quiz has no questions".into());
        }
    }

    let mut seen_ids = HashSet::new();
    for q in &quiz.questions {
        let id = Some(q.id.as_str());

        if !seen_ids.insert(&q.id) {
            warn(id, format!("duplicate question ID: {}", q.id));
        }
        if q.question.trim().is_empty() {
            warn(id, "question text is empty".into());
        }

        match &q.question_type {
            QuestionType::Unsupported(name) => {
                warn(id, format!("unsupported question type '{name}' will always score 0"));
            }
            t if t.is_text() => {
                if q.correct_answer.trim().is_empty() {
                    warn(id, "no correct answer provided".into());
                }
            }
            t => {
                if *t == QuestionType::TrueFalse {
                    let ids: Vec<&str> = q.options.iter().map(|o| o.id.as_str()).collect();
                    if ids != [TRUE_OPTION_ID, FALSE_OPTION_ID] {
                        warn(
                            id,
                            format!("true/false options must be {TRUE_OPTION_ID} and {FALSE_OPTION_ID}"),
                        );
                    }
                } else if q.options.len() < MIN_CHOICE_OPTIONS {
                    warn(
                        id,
                        format!(
                            "{} option(s), expected at least {MIN_CHOICE_OPTIONS}",
                            q.options.len()
                        ),
                    );
                }

                let correct = q.options.iter().filter(|o| o.is_correct).count();
                if correct == 0 {
                    warn(id, "no option is marked correct".into());
                } else if correct > 1 && *t != QuestionType::MultiChoice {
                    warn(id, format!("{correct} options are marked correct, expected one"));
                }
                for o in q.options.iter().filter(|o| o.text.trim().is_empty()) {
                    warn(id, format!("option {} has no text", o.id));
                }
            }
        }
    }

    warnings
}
