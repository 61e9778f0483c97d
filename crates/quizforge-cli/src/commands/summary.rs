//! The `quizforge summary` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use quizforge_core::model::QuizSummary;
use quizforge_core::parser;

use crate::OutputFormat;

pub fn execute(quiz_path: PathBuf, format: OutputFormat) -> Result<()> {
    let quiz = parser::parse_quiz(&quiz_path)?;
    let summary = quiz.summary();

    match format {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&summary).context("failed to serialize summary")?;
            println!("{json}");
        }
        OutputFormat::Text => print_summary(&summary),
    }

    Ok(())
}

fn print_summary(summary: &QuizSummary) {
    println!("Quiz: {}", summary.title);

    let mut table = Table::new();
    table.set_header(vec!["Setting", "Value"]);
    table.add_row(vec![
        Cell::new("Questions"),
        Cell::new(summary.question_count),
    ]);
    table.add_row(vec![Cell::new("Total marks"), Cell::new(summary.total_marks)]);
    table.add_row(vec![
        Cell::new("Passing"),
        Cell::new(format!(
            "{}% ({} of {} marks)",
            summary.passing_marks, summary.passing_score, summary.total_marks
        )),
    ]);
    table.add_row(vec![
        Cell::new("Time limit"),
        Cell::new(if summary.time_limit == 0 {
            "none".to_string()
        } else {
            format!("{} min", summary.time_limit)
        }),
    ]);
    table.add_row(vec![
        Cell::new("Attempts allowed"),
        Cell::new(summary.attempts_allowed),
    ]);
    println!("{table}");

    if !summary.type_counts.is_empty() {
        let mut types = Table::new();
        types.set_header(vec!["Type", "Count"]);
        for (question_type, count) in &summary.type_counts {
            types.add_row(vec![Cell::new(question_type), Cell::new(count)]);
        }
        println!("{types}");
    }
}
