//! The `quizforge take` command.
//!
//! Presents one question at a time and reads answers from stdin. Choice
//! questions take option numbers (`2`, or `1,3` for multiple answers), text
//! questions take the line as typed, and an empty line skips. When the
//! quiz is timed the countdown runs in the background and submits on
//! expiry.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use quizforge_core::config::load_config_from;
use quizforge_core::error::DriverError;
use quizforge_core::model::{Answer, QuestionType};
use quizforge_core::parser;
use quizforge_core::recorder::JsonDirRecorder;
use quizforge_core::session::{QuestionView, SessionState, SessionView};
use quizforge_core::timer::{self, SessionExit, SessionHandle};
use quizforge_core::traits::AttemptRecorder;

pub async fn execute(
    quiz_path: PathBuf,
    attempt: u32,
    seed: Option<u64>,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(attempt >= 1, "attempt must be at least 1");

    let config = load_config_from(config_path.as_deref())?;
    let quiz = Arc::new(parser::parse_quiz(&quiz_path)?);
    anyhow::ensure!(
        !quiz.questions.is_empty(),
        "quiz '{}' has no questions",
        quiz.title
    );

    let session = super::start_session(Arc::clone(&quiz), attempt, seed.or(config.shuffle_seed));
    let questions = session.questions().to_vec();
    let output_dir = output.unwrap_or_else(|| config.output_dir.clone());
    let recorder: Arc<dyn AttemptRecorder> = Arc::new(JsonDirRecorder::new(&output_dir));
    let handle = timer::spawn_session(session, config.tick_interval(), recorder);

    println!("Quiz: {} ({} questions)", quiz.title, questions.len());
    if let Some(limit) = quiz.time_limit_secs() {
        println!("Time limit: {}", quizforge_core::session::format_time(limit));
    }

    let mut views = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    for index in 0..questions.len() {
        if handle.navigate(index).await.is_err() {
            break;
        }
        let view = handle.view();
        let Some(question) = view.current_question.as_ref() else {
            break;
        };
        print_question(&view, question);

        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read answer from stdin")?,
            _ = views.wait_for(|v| v.state != SessionState::InProgress) => {
                println!("\nTime is up!");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        if apply_input(&handle, question, line.trim()).await.is_err() {
            break;
        }
    }

    match handle.submit(true).await {
        Ok(_) | Err(DriverError::Stopped) => {}
        Err(e) => return Err(e.into()),
    }

    match handle.finished().await {
        SessionExit::Submitted {
            outcome,
            record_error,
        } => {
            println!();
            super::grade::print_outcome(&outcome, &questions);
            if let Some(e) = record_error {
                anyhow::bail!("failed to record attempt: {e}");
            }
            eprintln!(
                "Attempt saved to: {}",
                output_dir.join(outcome.file_name()).display()
            );
            Ok(())
        }
        SessionExit::Abandoned | SessionExit::Disconnected => {
            anyhow::bail!("session ended without being graded")
        }
    }
}

fn print_question(view: &SessionView, question: &QuestionView) {
    let marks = if question.marks == 1 { "mark" } else { "marks" };
    let clock = view
        .remaining_display
        .as_ref()
        .map(|t| format!("  [{t} left]"))
        .unwrap_or_default();

    println!(
        "\n[{}/{}] ({} {marks}) {}{clock}",
        view.current_index + 1,
        view.total_questions,
        question.marks,
        question.question
    );
    for (i, option) in question.options.iter().enumerate() {
        println!("  {}) {}", i + 1, option.text);
    }

    let hint = match question.question_type {
        QuestionType::MultiChoice => "select all that apply, e.g. 1,3",
        QuestionType::SingleChoice | QuestionType::TrueFalse => "enter an option number",
        QuestionType::OneWord => "answer in one word",
        _ => "type your answer",
    };
    println!("  ({hint}; empty line to skip)");
}

async fn apply_input(
    handle: &SessionHandle,
    question: &QuestionView,
    input: &str,
) -> Result<(), DriverError> {
    if input.is_empty() {
        return Ok(());
    }

    if !question.question_type.uses_options() {
        return handle
            .set_answer(question.id.clone(), Answer::Text(input.to_string()))
            .await;
    }

    let mut picked = Vec::new();
    for token in input.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        match token
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| question.options.get(i))
        {
            Some(option) if !picked.contains(&option.id) => picked.push(option.id.clone()),
            Some(_) => {}
            None => println!("  ignoring '{token}': not an option number"),
        }
    }

    for option_id in picked {
        handle.select_option(question.id.clone(), option_id).await?;
    }
    Ok(())
}
