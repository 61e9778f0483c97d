use std::collections::BTreeSet;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use quizforge_core::grading::{grade, keyword_match_ratio};
use quizforge_core::model::{Answer, AnswerMap, AnswerOption, Question, QuestionType, QuizDefinition};

fn make_quiz(n: usize) -> QuizDefinition {
    let questions = (0..n)
        .map(|i| {
            let question_type = match i % 4 {
                0 => QuestionType::SingleChoice,
                1 => QuestionType::MultiChoice,
                2 => QuestionType::OneWord,
                _ => QuestionType::ShortAnswer,
            };
            let options = if question_type.is_choice() {
                (0..4)
                    .map(|o| AnswerOption {
                        id: format!("o{o}"),
                        text: format!("Option {o}"),
                        is_correct: o % 2 == 0,
                    })
                    .collect()
            } else {
                vec![]
            };
            Question {
                id: format!("q{i}"),
                question_type,
                question: format!("Question {i}"),
                options,
                correct_answer: "ownership borrowing lifetimes|own".into(),
                marks: 1 + (i % 3) as u32,
                explanation: String::new(),
            }
        })
        .collect::<Vec<_>>();

    let total_marks = questions.iter().map(|q| q.marks).sum();
    QuizDefinition {
        title: "Benchmark".into(),
        total_marks,
        questions,
        ..QuizDefinition::empty()
    }
}

fn make_answers(quiz: &QuizDefinition) -> AnswerMap {
    quiz.questions
        .iter()
        .map(|q| {
            let answer = match q.question_type {
                QuestionType::SingleChoice => Answer::Choice("o0".into()),
                QuestionType::MultiChoice => {
                    Answer::Choices(BTreeSet::from(["o0".to_string(), "o2".to_string()]))
                }
                QuestionType::OneWord => Answer::Text("Own".into()),
                _ => Answer::Text("rust enforces ownership and borrowing at compile time".into()),
            };
            (q.id.clone(), answer)
        })
        .collect()
}

fn bench_grade(c: &mut Criterion) {
    let mut group = c.benchmark_group("grade");

    for n in [10, 100, 1000] {
        let quiz = make_quiz(n);
        let answers = make_answers(&quiz);
        group.bench_function(format!("{n}_questions"), |b| {
            b.iter(|| {
                grade(
                    black_box(&quiz),
                    black_box(&quiz.questions),
                    black_box(&answers),
                    1,
                    Utc::now(),
                )
            })
        });
    }

    group.finish();
}

fn bench_keyword_ratio(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyword_match_ratio");

    let reference = "The borrow checker enforces that references never outlive the data they point to";
    let short = "references cannot outlive data";
    let long = reference.repeat(20);

    group.bench_function("short_answer", |b| {
        b.iter(|| keyword_match_ratio(black_box(reference), black_box(short)))
    });

    group.bench_function("long_answer", |b| {
        b.iter(|| keyword_match_ratio(black_box(reference), black_box(&long)))
    });

    group.finish();
}

criterion_group!(benches, bench_grade, bench_keyword_ratio);
criterion_main!(benches);
