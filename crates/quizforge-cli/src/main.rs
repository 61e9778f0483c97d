//! quizforge CLI — validate, summarize, take and grade quizzes.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(name = "quizforge", version, about = "Quiz authoring, delivery and grading toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate quiz TOML files
    Validate {
        /// Path to quiz file or directory
        #[arg(long)]
        quiz: PathBuf,
    },

    /// Show a quiz overview: marks, pass threshold, question mix
    Summary {
        /// Quiz TOML file
        #[arg(long)]
        quiz: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Grade an answer sheet against a quiz
    Grade {
        /// Quiz TOML file
        #[arg(long)]
        quiz: PathBuf,

        /// Answer sheet TOML file
        #[arg(long)]
        answers: PathBuf,

        /// Attempt number (1-based)
        #[arg(long, default_value = "1")]
        attempt: u32,

        /// Shuffle seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Directory for the attempt JSON (overrides config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Do not write an attempt file
        #[arg(long)]
        no_save: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Take a quiz interactively on stdin
    Take {
        /// Quiz TOML file
        #[arg(long)]
        quiz: PathBuf,

        /// Attempt number (1-based)
        #[arg(long, default_value = "1")]
        attempt: u32,

        /// Shuffle seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,

        /// Directory for the attempt JSON (overrides config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and example quiz
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quizforge=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { quiz } => commands::validate::execute(quiz),
        Commands::Summary { quiz, format } => commands::summary::execute(quiz, format),
        Commands::Grade {
            quiz,
            answers,
            attempt,
            seed,
            format,
            output,
            no_save,
            config,
        } => {
            commands::grade::execute(commands::grade::GradeArgs {
                quiz,
                answers,
                attempt,
                seed,
                format,
                output,
                no_save,
                config,
            })
            .await
        }
        Commands::Take {
            quiz,
            attempt,
            seed,
            output,
            config,
        } => commands::take::execute(quiz, attempt, seed, output, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
