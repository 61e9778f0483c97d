//! The `quizforge grade` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use quizforge_core::config::load_config_from;
use quizforge_core::grading::QuestionResult;
use quizforge_core::model::{Answer, Question};
use quizforge_core::parser;
use quizforge_core::recorder::JsonDirRecorder;
use quizforge_core::report::AttemptOutcome;
use quizforge_core::session::SubmitOutcome;
use quizforge_core::traits::AttemptRecorder;

use crate::OutputFormat;

pub struct GradeArgs {
    pub quiz: PathBuf,
    pub answers: PathBuf,
    pub attempt: u32,
    pub seed: Option<u64>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub no_save: bool,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: GradeArgs) -> Result<()> {
    anyhow::ensure!(args.attempt >= 1, "attempt must be at least 1");

    let config = load_config_from(args.config.as_deref())?;
    let quiz = Arc::new(parser::parse_quiz(&args.quiz)?);
    let answers = parser::parse_answer_sheet(&args.answers, &quiz)?;

    if args.attempt > quiz.attempts_allowed {
        tracing::warn!(
            "attempt {} exceeds the {} allowed for this quiz",
            args.attempt,
            quiz.attempts_allowed
        );
    }

    let mut session = super::start_session(
        Arc::clone(&quiz),
        args.attempt,
        args.seed.or(config.shuffle_seed),
    );
    for (question_id, answer) in answers {
        session.set_answer(&question_id, answer)?;
    }

    let result = match session.submit(true) {
        SubmitOutcome::Graded(result) => result,
        other => anyhow::bail!("session could not be graded: {other:?}"),
    };
    let outcome = AttemptOutcome::new(&quiz, result);

    match args.format {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&outcome).context("failed to serialize attempt")?;
            println!("{json}");
        }
        OutputFormat::Text => print_outcome(&outcome, session.questions()),
    }

    if !args.no_save {
        let dir = args.output.unwrap_or(config.output_dir);
        let recorder = JsonDirRecorder::new(&dir);
        recorder.record(&outcome).await?;
        eprintln!(
            "Attempt saved to: {}",
            dir.join(outcome.file_name()).display()
        );
    }

    Ok(())
}

/// Print a graded attempt as tables.
pub(crate) fn print_outcome(outcome: &AttemptOutcome, questions: &[Question]) {
    let result = &outcome.result;

    println!("Quiz: {} (attempt {})", outcome.quiz_title, result.attempt_number);
    println!(
        "Score: {}/{} ({:.1}%) {}",
        result.total_score,
        result.total_marks,
        result.percentage,
        if result.passed { "PASSED" } else { "FAILED" }
    );
    println!(
        "Correct: {}/{}",
        result.correct_count, result.total_questions
    );
    println!("{}", outcome.headline());
    if let Some(message) = outcome.next_step_message() {
        println!("{message}");
    }

    if !outcome.show_details {
        println!("Per-question results are hidden for this quiz.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Type", "Your answer", "Correct", "Marks"]);
    for (i, r) in result.question_results.iter().enumerate() {
        let question = questions.iter().find(|q| q.id == r.question_id);
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&r.question),
            Cell::new(r.question_type.label()),
            Cell::new(describe(r.user_answer.as_ref(), question)),
            Cell::new(if r.is_correct { "yes" } else { "no" }),
            Cell::new(format!("{}/{}", r.earned_marks, r.max_marks)),
        ]);
    }
    println!("{table}");

    for r in result.question_results.iter().filter(|r| !r.is_correct) {
        print_explanation(r);
    }
}

fn print_explanation(r: &QuestionResult) {
    if r.explanation.is_empty() {
        return;
    }
    println!("  {}: {}", r.question_id, r.explanation);
}

/// Render an answer using option texts where possible.
fn describe(answer: Option<&Answer>, question: Option<&Question>) -> String {
    let option_text = |id: &str| {
        question
            .and_then(|q| q.option(id))
            .map(|o| o.text.clone())
            .unwrap_or_else(|| id.to_string())
    };

    match answer {
        None => "-".to_string(),
        Some(Answer::Choice(id)) => option_text(id),
        Some(Answer::Choices(ids)) if ids.is_empty() => "-".to_string(),
        Some(Answer::Choices(ids)) => ids
            .iter()
            .map(|id| option_text(id))
            .collect::<Vec<_>>()
            .join(", "),
        Some(Answer::Text(text)) if text.trim().is_empty() => "-".to_string(),
        Some(Answer::Text(text)) => text.clone(),
    }
}
