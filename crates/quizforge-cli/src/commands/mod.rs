pub mod grade;
pub mod init;
pub mod summary;
pub mod take;
pub mod validate;

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use quizforge_core::model::QuizDefinition;
use quizforge_core::session::QuizSession;

/// Start a session, seeded when a seed is given.
pub(crate) fn start_session(
    quiz: Arc<QuizDefinition>,
    attempt: u32,
    seed: Option<u64>,
) -> QuizSession {
    match seed {
        Some(seed) => QuizSession::with_rng(quiz, attempt, &mut StdRng::seed_from_u64(seed)),
        None => QuizSession::new(quiz, attempt),
    }
}
