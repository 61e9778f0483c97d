//! The `quizforge init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create quizforge.toml
    if std::path::Path::new("quizforge.toml").exists() {
        println!("quizforge.toml already exists, skipping.");
    } else {
        std::fs::write("quizforge.toml", SAMPLE_CONFIG)?;
        println!("Created quizforge.toml");
    }

    // Create example quiz and answer sheet
    std::fs::create_dir_all("quizzes")?;
    for (path, content) in [
        ("quizzes/example.toml", EXAMPLE_QUIZ),
        ("quizzes/example-answers.toml", EXAMPLE_ANSWERS),
    ] {
        if std::path::Path::new(path).exists() {
            println!("{path} already exists, skipping.");
        } else {
            std::fs::write(path, content)?;
            println!("Created {path}");
        }
    }

    println!("\nNext steps:");
    println!("  1. Run: quizforge validate --quiz quizzes/example.toml");
    println!("  2. Run: quizforge grade --quiz quizzes/example.toml --answers quizzes/example-answers.toml");
    println!("  3. Run: quizforge take --quiz quizzes/example.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizforge configuration

# Where attempt JSON files are written.
output_dir = "./quizforge-attempts"

# Fixed shuffle seed; remove for a fresh order on every attempt.
# shuffle_seed = 42

# Wall-clock milliseconds per countdown second.
tick_interval_ms = 1000
"#;

const EXAMPLE_QUIZ: &str = r#"[quiz]
title = "Example Quiz"
description = "A short quiz to get started"
passing_marks = 60
time_limit = 5
attempts_allowed = 3
shuffle_options = true

[[questions]]
id = "q1"
type = "single_choice"
question = "Which command creates a new Rust project?"

[[questions.options]]
id = "a"
text = "cargo new"
is_correct = true

[[questions.options]]
id = "b"
text = "rustc init"

[[questions.options]]
id = "c"
text = "rustup create"

[[questions]]
id = "q2"
type = "true_false"
question = "Variables in Rust are immutable by default."
correct_answer = "true"

[[questions]]
id = "q3"
type = "one_word"
question = "Which keyword makes a binding mutable?"
correct_answer = "mut"
explanation = "`let mut x = 1;` declares a mutable binding."
"#;

const EXAMPLE_ANSWERS: &str = r#"[answers]
q1 = "a"
q2 = "true"
q3 = "mut"
"#;
