//! Authoring engine: pure update functions over a [`QuizDefinition`].
//!
//! Every operation takes the definition by value and hands back the updated
//! value, so a preview or delivery session holding an earlier clone never
//! observes a half-edited quiz. Operations that reference an unknown question
//! or option id leave the definition untouched; editors routinely race a
//! delete against an edit.
//!
//! `total_marks` is recomputed from the questions after every operation that
//! can change marks, so it always equals the sum over `questions`.

use crate::model::{AnswerOption, Question, QuestionType, QuizDefinition, MIN_CHOICE_OPTIONS};

/// Fields of a question that an editor may change. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionPatch {
    pub question: Option<String>,
    pub options: Option<Vec<AnswerOption>>,
    pub correct_answer: Option<String>,
    /// Coerced to at least 1.
    pub marks: Option<u32>,
    pub explanation: Option<String>,
}

/// Fields of an option that an editor may change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionPatch {
    /// Ignored on true/false questions, whose option texts are fixed.
    pub text: Option<String>,
    pub is_correct: Option<bool>,
}

/// Quiz-level settings. `total_marks` is deliberately absent: it is derived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub enabled: Option<bool>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Clamped to 0..=100.
    pub passing_marks: Option<u32>,
    pub time_limit: Option<u32>,
    /// Coerced to at least 1.
    pub attempts_allowed: Option<u32>,
    pub show_results_immediately: Option<bool>,
    pub shuffle_questions: Option<bool>,
    pub shuffle_options: Option<bool>,
    pub require_pass_to_unlock_next: Option<bool>,
}

/// Parse author-entered marks from their leading integer, so `"5.5"` and
/// `"5 pts"` both give 5. Anything without leading digits, or below 1,
/// becomes 1. Values past `u32::MAX` saturate.
pub fn coerce_marks(input: &str) -> u32 {
    let trimmed = input.trim_start();
    if trimmed.starts_with('-') {
        return 1;
    }
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    unsigned[..end]
        .bytes()
        .fold(0u32, |acc, d| {
            acc.saturating_mul(10).saturating_add(u32::from(d - b'0'))
        })
        .max(1)
}

/// Append a new default question of `question_type`.
pub fn add_question(mut quiz: QuizDefinition, question_type: QuestionType) -> QuizDefinition {
    let question = Question::empty(question_type);
    tracing::debug!(question_id = %question.id, "adding {} question", question.question_type);
    quiz.questions.push(question);
    commit(quiz)
}

/// Remove a question. Unknown ids are ignored.
pub fn remove_question(mut quiz: QuizDefinition, question_id: &str) -> QuizDefinition {
    let before = quiz.questions.len();
    quiz.questions.retain(|q| q.id != question_id);
    if quiz.questions.len() == before {
        tracing::debug!(question_id, "remove_question: no such question");
        return quiz;
    }
    commit(quiz)
}

/// Merge `patch` into a question, then recompute the quiz total.
pub fn update_question(
    mut quiz: QuizDefinition,
    question_id: &str,
    patch: QuestionPatch,
) -> QuizDefinition {
    let Some(question) = quiz.questions.iter_mut().find(|q| q.id == question_id) else {
        tracing::debug!(question_id, "update_question: no such question");
        return quiz;
    };

    if let Some(text) = patch.question {
        question.question = text;
    }
    if let Some(options) = patch.options {
        match question.question_type {
            QuestionType::SingleChoice | QuestionType::MultiChoice
                if options.len() >= MIN_CHOICE_OPTIONS =>
            {
                question.options = options;
            }
            _ => {
                tracing::debug!(
                    question_id,
                    "update_question: options patch rejected for {} question with {} options",
                    question.question_type,
                    options.len()
                );
            }
        }
    }
    if let Some(answer) = patch.correct_answer {
        question.correct_answer = answer;
    }
    if let Some(marks) = patch.marks {
        question.marks = marks.max(1);
    }
    if let Some(explanation) = patch.explanation {
        question.explanation = explanation;
    }

    commit(quiz)
}

/// Append a blank, non-correct option to a choice question.
pub fn add_option(mut quiz: QuizDefinition, question_id: &str) -> QuizDefinition {
    let Some(question) = find_question_mut(&mut quiz, question_id) else {
        tracing::debug!(question_id, "add_option: no such question");
        return quiz;
    };
    if !question.question_type.is_choice() {
        tracing::debug!(question_id, "add_option: {} questions have fixed options", question.question_type);
        return quiz;
    }
    question.options.push(AnswerOption::blank());
    commit(quiz)
}

/// Remove an option, but only while the question keeps at least two.
pub fn remove_option(mut quiz: QuizDefinition, question_id: &str, option_id: &str) -> QuizDefinition {
    let Some(question) = find_question_mut(&mut quiz, question_id) else {
        return quiz;
    };
    if question.options.len() <= MIN_CHOICE_OPTIONS {
        tracing::debug!(question_id, option_id, "remove_option: option floor reached");
        return quiz;
    }
    let before = question.options.len();
    question.options.retain(|o| o.id != option_id);
    if question.options.len() == before {
        return quiz;
    }
    commit(quiz)
}

/// Merge `patch` into one option of a question.
pub fn update_option(
    mut quiz: QuizDefinition,
    question_id: &str,
    option_id: &str,
    patch: OptionPatch,
) -> QuizDefinition {
    let Some(question) = find_question_mut(&mut quiz, question_id) else {
        return quiz;
    };
    let fixed_text = question.question_type == QuestionType::TrueFalse;
    let Some(option) = question.options.iter_mut().find(|o| o.id == option_id) else {
        tracing::debug!(question_id, option_id, "update_option: no such option");
        return quiz;
    };

    if let Some(text) = patch.text {
        if fixed_text {
            tracing::debug!(question_id, option_id, "update_option: true/false text is fixed");
        } else {
            option.text = text;
        }
    }
    if let Some(is_correct) = patch.is_correct {
        option.is_correct = is_correct;
    }

    commit(quiz)
}

/// Mark an option correct.
///
/// With `is_multiple == false` the target becomes the only correct option.
/// With `is_multiple == true` only the target's flag is toggled.
pub fn set_correct_option(
    mut quiz: QuizDefinition,
    question_id: &str,
    option_id: &str,
    is_multiple: bool,
) -> QuizDefinition {
    let Some(question) = find_question_mut(&mut quiz, question_id) else {
        return quiz;
    };
    if question.option(option_id).is_none() {
        tracing::debug!(question_id, option_id, "set_correct_option: no such option");
        return quiz;
    }

    for option in &mut question.options {
        if is_multiple {
            if option.id == option_id {
                option.is_correct = !option.is_correct;
            }
        } else {
            option.is_correct = option.id == option_id;
        }
    }

    commit(quiz)
}

/// Apply quiz-level settings.
pub fn update_settings(mut quiz: QuizDefinition, patch: SettingsPatch) -> QuizDefinition {
    if let Some(enabled) = patch.enabled {
        quiz.enabled = enabled;
    }
    if let Some(title) = patch.title {
        quiz.title = title;
    }
    if let Some(description) = patch.description {
        quiz.description = description;
    }
    if let Some(passing) = patch.passing_marks {
        quiz.passing_marks = passing.min(100);
    }
    if let Some(minutes) = patch.time_limit {
        quiz.time_limit = minutes;
    }
    if let Some(attempts) = patch.attempts_allowed {
        quiz.attempts_allowed = attempts.max(1);
    }
    if let Some(v) = patch.show_results_immediately {
        quiz.show_results_immediately = v;
    }
    if let Some(v) = patch.shuffle_questions {
        quiz.shuffle_questions = v;
    }
    if let Some(v) = patch.shuffle_options {
        quiz.shuffle_options = v;
    }
    if let Some(v) = patch.require_pass_to_unlock_next {
        quiz.require_pass_to_unlock_next = v;
    }
    commit(quiz)
}

/// Recompute `total_marks` as the sum of question marks.
pub fn recompute_total_marks(mut quiz: QuizDefinition) -> QuizDefinition {
    quiz.total_marks = quiz.marks_sum();
    quiz
}

fn find_question_mut<'a>(quiz: &'a mut QuizDefinition, question_id: &str) -> Option<&'a mut Question> {
    quiz.questions.iter_mut().find(|q| q.id == question_id)
}

fn commit(quiz: QuizDefinition) -> QuizDefinition {
    let mut quiz = recompute_total_marks(quiz);
    quiz.revision += 1;
    quiz
}
