//! Grading engine.
//!
//! A pure function from (ordered questions, answers) to a [`GradingResult`].
//! Each question type has its own correctness rule; short answers earn
//! partial credit from a keyword match ratio.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Answer, AnswerMap, Question, QuestionType, QuizDefinition};
use crate::traits::Grader;

/// Keyword match ratio at or above which a short answer counts as correct.
pub const SHORT_ANSWER_PASS_RATIO: f64 = 0.7;

/// Keywords of this many characters or fewer are ignored.
pub const MAX_IGNORED_KEYWORD_LEN: usize = 2;

/// Grading outcome for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: String,
    /// Prompt text, copied for display.
    pub question: String,
    pub question_type: QuestionType,
    /// What the learner submitted, if anything.
    pub user_answer: Option<Answer>,
    /// The canonical right answer, shaped like the answer type.
    pub correct_answer: Option<Answer>,
    pub is_correct: bool,
    pub earned_marks: u32,
    pub max_marks: u32,
    pub explanation: String,
    /// Keyword match ratio, for short answers only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_ratio: Option<f64>,
}

/// Aggregate result of grading one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    pub total_score: u32,
    pub total_marks: u32,
    /// Score as a percentage of `total_marks`, rounded to one decimal place.
    pub percentage: f64,
    pub correct_count: usize,
    pub total_questions: usize,
    pub passed: bool,
    /// Passed, and the quiz gates the next unit on passing.
    pub unlock_next: bool,
    /// One entry per question, in presentation order.
    pub question_results: Vec<QuestionResult>,
    pub attempt_number: u32,
    pub completed_at: DateTime<Utc>,
}

/// The built-in grader: [`grade`] stamped with the current time.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardGrader;

impl Grader for StandardGrader {
    fn grade(
        &self,
        quiz: &QuizDefinition,
        questions: &[Question],
        answers: &AnswerMap,
        attempt_number: u32,
    ) -> GradingResult {
        grade(quiz, questions, answers, attempt_number, Utc::now())
    }
}

/// Grade `questions` (in presentation order) against `answers`.
///
/// Totals and the pass threshold come from `quiz`. `passed` compares the
/// rounded percentage, so 59.95% passes a 60% threshold.
pub fn grade(
    quiz: &QuizDefinition,
    questions: &[Question],
    answers: &AnswerMap,
    attempt_number: u32,
    completed_at: DateTime<Utc>,
) -> GradingResult {
    let question_results: Vec<QuestionResult> = questions
        .iter()
        .map(|q| grade_question(q, answers.get(&q.id)))
        .collect();

    let total_score = question_results
        .iter()
        .fold(0u32, |acc, r| acc.saturating_add(r.earned_marks));
    let correct_count = question_results.iter().filter(|r| r.is_correct).count();
    let percentage = percentage(total_score, quiz.total_marks);
    let passed = percentage >= f64::from(quiz.passing_marks);

    GradingResult {
        total_score,
        total_marks: quiz.total_marks,
        percentage,
        correct_count,
        total_questions: questions.len(),
        passed,
        unlock_next: passed && quiz.require_pass_to_unlock_next,
        question_results,
        attempt_number,
        completed_at,
    }
}

/// Grade a single question.
pub fn grade_question(question: &Question, answer: Option<&Answer>) -> QuestionResult {
    let mut match_ratio = None;

    let is_correct = match &question.question_type {
        QuestionType::SingleChoice | QuestionType::TrueFalse => {
            let correct_id = question.correct_option_ids().first().copied();
            match (answer, correct_id) {
                (Some(Answer::Choice(chosen)), Some(correct)) => chosen == correct,
                _ => false,
            }
        }
        QuestionType::MultiChoice => {
            let correct: BTreeSet<&str> = question.correct_option_ids().into_iter().collect();
            let selected: BTreeSet<&str> = match answer {
                Some(Answer::Choices(ids)) => ids.iter().map(String::as_str).collect(),
                _ => BTreeSet::new(),
            };
            selected == correct
        }
        QuestionType::OneWord => match answer {
            Some(Answer::Text(text)) => one_word_matches(&question.correct_answer, text),
            _ => false,
        },
        QuestionType::ShortAnswer => {
            let text = match answer {
                Some(Answer::Text(text)) => text.as_str(),
                _ => "",
            };
            let ratio = keyword_match_ratio(&question.correct_answer, text);
            match_ratio = Some(ratio);
            ratio >= SHORT_ANSWER_PASS_RATIO
        }
        QuestionType::Unsupported(name) => {
            tracing::debug!(question_id = %question.id, "grading unsupported question type '{name}' as zero");
            false
        }
    };

    // Short answers earn partial credit regardless of the correctness cutoff.
    let earned_marks = match match_ratio {
        Some(ratio) => (f64::from(question.marks) * ratio).round() as u32,
        None if is_correct => question.marks,
        None => 0,
    };

    QuestionResult {
        question_id: question.id.clone(),
        question: question.question.clone(),
        question_type: question.question_type.clone(),
        user_answer: answer.cloned(),
        correct_answer: canonical_answer(question),
        is_correct,
        earned_marks,
        max_marks: question.marks,
        explanation: question.explanation.clone(),
        match_ratio,
    }
}

/// The right answer for `question`, shaped like a learner answer.
pub fn canonical_answer(question: &Question) -> Option<Answer> {
    match &question.question_type {
        QuestionType::SingleChoice | QuestionType::TrueFalse => question
            .correct_option_ids()
            .first()
            .map(|id| Answer::Choice((*id).to_string())),
        QuestionType::MultiChoice => Some(Answer::Choices(
            question
                .correct_option_ids()
                .into_iter()
                .map(str::to_string)
                .collect(),
        )),
        QuestionType::OneWord | QuestionType::ShortAnswer => {
            Some(Answer::Text(question.correct_answer.clone()))
        }
        QuestionType::Unsupported(_) => None,
    }
}

/// Whether `answer` equals any `|`-separated alternative, ignoring case and
/// surrounding whitespace. A blank alternative accepts a blank answer.
pub fn one_word_matches(accepted: &str, answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    accepted
        .split('|')
        .any(|alt| alt.trim().to_lowercase() == answer)
}

/// Split on runs of whitespace and commas, lowercased.
///
/// Text that is empty, or starts or ends with a separator, yields an empty
/// first or last token. An empty token is contained in every keyword.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let pieces: Vec<&str> = lower
        .split(|c: char| c == ',' || c.is_whitespace())
        .collect();
    let last = pieces.len() - 1;
    pieces
        .iter()
        .enumerate()
        .filter(|(i, t)| *i == 0 || *i == last || !t.is_empty())
        .map(|(_, t)| t.to_string())
        .collect()
}

/// Grading keywords of a short-answer reference text. The length bound is
/// the only filter, so empty tokens never become keywords.
pub fn keywords(reference: &str) -> Vec<String> {
    tokenize(reference)
        .into_iter()
        .filter(|k| k.chars().count() > MAX_IGNORED_KEYWORD_LEN)
        .collect()
}

/// Fraction of keywords of `reference` found in `answer`.
///
/// A keyword counts as found when it contains, or is contained in, any
/// answer token. This is a loose heuristic: short answer tokens can match
/// inside longer keywords, and a blank answer matches every keyword.
/// Returns 0 when the reference has no keywords.
pub fn keyword_match_ratio(reference: &str, answer: &str) -> f64 {
    let keywords = keywords(reference);
    if keywords.is_empty() {
        return 0.0;
    }
    let tokens = tokenize(answer);
    let matched = keywords
        .iter()
        .filter(|k| tokens.iter().any(|w| w.contains(k.as_str()) || k.contains(w.as_str())))
        .count();
    matched as f64 / keywords.len() as f64
}

/// `100 * score / total` rounded to one decimal place; 0 when `total` is 0.
pub fn percentage(score: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(100.0 * f64::from(score) / f64::from(total))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerOption, FALSE_OPTION_ID, TRUE_OPTION_ID};
    use chrono::TimeZone;

    fn opt(id: &str, is_correct: bool) -> AnswerOption {
        AnswerOption {
            id: id.into(),
            text: id.to_uppercase(),
            is_correct,
        }
    }

    fn question(id: &str, question_type: QuestionType, options: Vec<AnswerOption>, marks: u32) -> Question {
        Question {
            id: id.into(),
            question_type,
            question: format!("Question {id}"),
            options,
            correct_answer: String::new(),
            marks,
            explanation: format!("because {id}"),
        }
    }

    fn text_question(id: &str, question_type: QuestionType, correct: &str, marks: u32) -> Question {
        Question {
            correct_answer: correct.into(),
            ..question(id, question_type, vec![], marks)
        }
    }

    fn quiz_of(questions: Vec<Question>, passing_marks: u32) -> QuizDefinition {
        let total_marks = questions.iter().map(|q| q.marks).sum();
        QuizDefinition {
            passing_marks,
            total_marks,
            questions,
            ..QuizDefinition::empty()
        }
    }

    fn choices(ids: &[&str]) -> Answer {
        Answer::Choices(ids.iter().map(|s| s.to_string()).collect())
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn single_choice_scenario() {
        let q = question(
            "q1",
            QuestionType::SingleChoice,
            vec![opt("a", false), opt("b", true), opt("c", false)],
            2,
        );
        let r = grade_question(&q, Some(&Answer::Choice("b".into())));
        assert!(r.is_correct);
        assert_eq!(r.earned_marks, 2);
        assert_eq!(r.correct_answer, Some(Answer::Choice("b".into())));

        let r = grade_question(&q, Some(&Answer::Choice("a".into())));
        assert!(!r.is_correct);
        assert_eq!(r.earned_marks, 0);
    }

    #[test]
    fn single_choice_without_correct_option_never_matches() {
        let q = question("q1", QuestionType::SingleChoice, vec![opt("a", false), opt("b", false)], 1);
        assert!(!grade_question(&q, None).is_correct);
        assert!(!grade_question(&q, Some(&Answer::Choice("a".into()))).is_correct);
    }

    #[test]
    fn true_false_uses_fixed_ids() {
        let q = question(
            "tf",
            QuestionType::TrueFalse,
            vec![opt(TRUE_OPTION_ID, false), opt(FALSE_OPTION_ID, true)],
            1,
        );
        assert!(grade_question(&q, Some(&Answer::Choice(FALSE_OPTION_ID.into()))).is_correct);
        assert!(!grade_question(&q, Some(&Answer::Choice(TRUE_OPTION_ID.into()))).is_correct);
    }

    #[test]
    fn multi_choice_requires_exact_set() {
        let q = question(
            "m",
            QuestionType::MultiChoice,
            vec![opt("a", true), opt("b", false), opt("c", true), opt("d", false)],
            3,
        );

        let partial = grade_question(&q, Some(&choices(&["a"])));
        assert!(!partial.is_correct);
        assert_eq!(partial.earned_marks, 0);

        let superset = grade_question(&q, Some(&choices(&["a", "c", "d"])));
        assert!(!superset.is_correct);
        assert_eq!(superset.earned_marks, 0);

        let exact = grade_question(&q, Some(&choices(&["c", "a"])));
        assert!(exact.is_correct);
        assert_eq!(exact.earned_marks, 3);
        assert_eq!(exact.correct_answer, Some(choices(&["a", "c"])));
    }

    #[test]
    fn one_word_alternatives_ignore_case_and_whitespace() {
        let q = text_question("w", QuestionType::OneWord, "react | React | ReactJS", 1);
        let r = grade_question(&q, Some(&Answer::Text("  REACTJS  ".into())));
        assert!(r.is_correct);
        assert_eq!(r.earned_marks, 1);
        assert!(!grade_question(&q, Some(&Answer::Text("vue".into()))).is_correct);
        assert!(!grade_question(&q, None).is_correct);
    }

    #[test]
    fn one_word_blank_alternative_accepts_blank_answer() {
        assert!(one_word_matches("", ""));
        assert!(one_word_matches("rust | ", ""));
        assert!(one_word_matches("rust | ", "   "));
        assert!(one_word_matches("rust | ", "Rust"));
        assert!(!one_word_matches("rust | go", ""));
    }

    #[test]
    fn short_answer_partial_credit_below_cutoff() {
        let q = text_question("s", QuestionType::ShortAnswer, "closures, hoisting, scope", 3);
        let r = grade_question(&q, Some(&Answer::Text("Closures and lexical scope".into())));
        let ratio = r.match_ratio.unwrap();
        assert!((ratio - 2.0 / 3.0).abs() < 1e-9, "ratio was {ratio}");
        assert_eq!(r.earned_marks, 2);
        assert!(!r.is_correct);
    }

    #[test]
    fn short_answer_full_match_is_correct() {
        let q = text_question("s", QuestionType::ShortAnswer, "closures, hoisting, scope", 3);
        let r = grade_question(&q, Some(&Answer::Text("scope,hoisting closures".into())));
        assert!(r.is_correct);
        assert_eq!(r.earned_marks, 3);
    }

    #[test]
    fn short_answer_matches_substrings_both_ways() {
        // "scoped" contains "scope"; "hoist" is contained in "hoisting".
        let ratio = keyword_match_ratio("scope hoisting", "scoped hoist");
        assert!((ratio - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn short_answer_ignores_short_keywords() {
        assert_eq!(keywords("a is the JS, of it"), vec!["the".to_string()]);
        assert_eq!(keyword_match_ratio("is an of", "anything"), 0.0);
    }

    #[test]
    fn short_answer_blank_text_matches_every_keyword() {
        let q = text_question("s", QuestionType::ShortAnswer, "ownership borrowing", 4);
        let r = grade_question(&q, None);
        assert_eq!(r.match_ratio, Some(1.0));
        assert_eq!(r.earned_marks, 4);
        assert!(r.is_correct);

        assert_eq!(keyword_match_ratio("closures, hoisting, scope", ""), 1.0);
        assert_eq!(keyword_match_ratio("closures, hoisting, scope", "closures, "), 1.0);
    }

    #[test]
    fn tokenize_keeps_edge_empties_only() {
        assert_eq!(tokenize(""), vec![String::new()]);
        assert_eq!(tokenize("Closures, "), vec!["closures".to_string(), String::new()]);
        assert_eq!(tokenize(" a,,b "), vec!["", "a", "b", ""]);
        assert_eq!(tokenize("move"), vec!["move".to_string()]);
        assert_eq!(keyword_match_ratio("ownership borrowing", "ownership"), 0.5);
    }

    #[test]
    fn total_score_saturates() {
        let questions = vec![
            text_question("a", QuestionType::OneWord, "x", u32::MAX),
            text_question("b", QuestionType::OneWord, "y", u32::MAX),
        ];
        let quiz = QuizDefinition {
            total_marks: u32::MAX,
            ..QuizDefinition::empty()
        };
        let answers: AnswerMap = [
            ("a".to_string(), Answer::Text("x".into())),
            ("b".to_string(), Answer::Text("y".into())),
        ]
        .into_iter()
        .collect();
        let result = grade(&quiz, &questions, &answers, 1, fixed_time());
        assert_eq!(result.total_score, u32::MAX);
        assert_eq!(result.percentage, 100.0);
    }

    #[test]
    fn pass_uses_rounded_percentage() {
        // 11991 of 20000 is 59.955%, shown and compared as 60.0.
        let questions = vec![
            text_question("a", QuestionType::OneWord, "x", 11991),
            text_question("b", QuestionType::OneWord, "y", 8009),
        ];
        let quiz = quiz_of(questions.clone(), 60);
        let answers: AnswerMap = [("a".to_string(), Answer::Text("x".into()))]
            .into_iter()
            .collect();
        let result = grade(&quiz, &questions, &answers, 1, fixed_time());
        assert_eq!(result.percentage, 60.0);
        assert!(result.passed);
    }

    #[test]
    fn unsupported_type_grades_zero() {
        let q = text_question("x", QuestionType::Unsupported("essay".into()), "anything", 5);
        let r = grade_question(&q, Some(&Answer::Text("anything".into())));
        assert!(!r.is_correct);
        assert_eq!(r.earned_marks, 0);
        assert_eq!(r.correct_answer, None);
    }

    #[test]
    fn mismatched_answer_shape_is_incorrect() {
        let q = question("q", QuestionType::SingleChoice, vec![opt("a", true), opt("b", false)], 1);
        assert!(!grade_question(&q, Some(&Answer::Text("a".into()))).is_correct);
    }

    fn ten_one_mark_questions() -> Vec<Question> {
        (0..10)
            .map(|i| {
                question(
                    &format!("q{i}"),
                    QuestionType::SingleChoice,
                    vec![opt("right", true), opt("wrong", false)],
                    1,
                )
            })
            .collect()
    }

    fn answer_first(n: usize, questions: &[Question]) -> AnswerMap {
        questions
            .iter()
            .enumerate()
            .map(|(i, q)| {
                let pick = if i < n { "right" } else { "wrong" };
                (q.id.clone(), Answer::Choice(pick.into()))
            })
            .collect()
    }

    #[test]
    fn aggregate_pass_at_threshold() {
        let questions = ten_one_mark_questions();
        let quiz = quiz_of(questions.clone(), 60);

        let result = grade(&quiz, &questions, &answer_first(6, &questions), 1, fixed_time());
        assert_eq!(result.total_score, 6);
        assert_eq!(result.total_marks, 10);
        assert_eq!(result.percentage, 60.0);
        assert!(result.passed);
        assert!(result.unlock_next);
        assert_eq!(result.correct_count, 6);
        assert_eq!(result.total_questions, 10);

        let result = grade(&quiz, &questions, &answer_first(5, &questions), 1, fixed_time());
        assert_eq!(result.percentage, 50.0);
        assert!(!result.passed);
        assert!(!result.unlock_next);
    }

    #[test]
    fn unlock_requires_gating_flag() {
        let questions = ten_one_mark_questions();
        let mut quiz = quiz_of(questions.clone(), 60);
        quiz.require_pass_to_unlock_next = false;
        let result = grade(&quiz, &questions, &answer_first(10, &questions), 2, fixed_time());
        assert!(result.passed);
        assert!(!result.unlock_next);
        assert_eq!(result.attempt_number, 2);
    }

    #[test]
    fn percentage_rounds_to_one_decimal() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(57, 100), 57.0);
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn empty_quiz_grades_to_zero() {
        let quiz = QuizDefinition::empty();
        let result = grade(&quiz, &[], &AnswerMap::new(), 1, fixed_time());
        assert_eq!(result.total_score, 0);
        assert_eq!(result.percentage, 0.0);
        assert!(!result.passed);
    }

    #[test]
    fn grading_is_deterministic() {
        let questions = vec![
            question("a", QuestionType::MultiChoice, vec![opt("x", true), opt("y", true)], 2),
            text_question("b", QuestionType::ShortAnswer, "memory safety guarantees", 5),
            text_question("c", QuestionType::OneWord, "cargo", 1),
        ];
        let quiz = quiz_of(questions.clone(), 50);
        let answers: AnswerMap = [
            ("a".to_string(), choices(&["x"])),
            ("b".to_string(), Answer::Text("safety of memory".into())),
            ("c".to_string(), Answer::Text("Cargo".into())),
        ]
        .into_iter()
        .collect();

        let first = grade(&quiz, &questions, &answers, 1, fixed_time());
        let second = grade(&quiz, &questions, &answers, 1, fixed_time());
        assert_eq!(first, second);
        assert_eq!(first.question_results.len(), 3);
        assert_eq!(first.question_results[1].earned_marks, 3);
    }
}
