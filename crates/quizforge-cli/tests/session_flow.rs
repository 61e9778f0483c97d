//! End-to-end delivery tests over the sample quizzes.
//!
//! These load a quiz from disk, run it through the timer driver the way the
//! `take` command does, and check what reaches the attempt recorder.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use quizforge_core::model::Answer;
use quizforge_core::parser::{parse_answer_sheet, parse_quiz};
use quizforge_core::recorder::MemoryRecorder;
use quizforge_core::session::{QuizSession, SessionState, SubmitOutcome};
use quizforge_core::timer::{spawn_session, SessionExit};

const OWNERSHIP: &str = "../../quizzes/rust-ownership.toml";
const PERFECT: &str = "../../answer-sheets/rust-ownership-perfect.toml";

fn session(seed: u64) -> QuizSession {
    let quiz = parse_quiz(Path::new(OWNERSHIP)).unwrap();
    QuizSession::with_rng(Arc::new(quiz), 1, &mut StdRng::seed_from_u64(seed))
}

#[tokio::test(start_paused = true)]
async fn perfect_sheet_through_driver() {
    let quiz = parse_quiz(Path::new(OWNERSHIP)).unwrap();
    let answers = parse_answer_sheet(Path::new(PERFECT), &quiz).unwrap();

    let recorder = Arc::new(MemoryRecorder::new());
    let handle = spawn_session(session(11), Duration::from_secs(1), recorder.clone());
    for (question_id, answer) in answers {
        handle.set_answer(question_id, answer).await.unwrap();
    }
    assert_eq!(handle.view().answered_count, 6);

    let outcome = handle.submit(false).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Graded(_)));

    let exit = handle.finished().await;
    let result = exit.result().unwrap();
    assert_eq!(result.total_score, 11);
    assert!(result.passed);
    assert!(result.unlock_next);

    assert_eq!(recorder.call_count(), 1);
    let recorded = recorder.last().unwrap();
    assert_eq!(recorded.quiz_title, "Rust Ownership");
    assert_eq!(recorded.result, *result);
}

#[tokio::test(start_paused = true)]
async fn ten_minute_limit_expires_once() {
    let recorder = Arc::new(MemoryRecorder::new());
    let handle = spawn_session(session(3), Duration::from_secs(1), recorder.clone());
    assert_eq!(handle.view().remaining_display.as_deref(), Some("10:00"));

    handle.set_answer("move-closure", Answer::Text("move".into())).await.unwrap();

    let mut views = handle.subscribe();
    views
        .wait_for(|v| v.state == SessionState::Submitted)
        .await
        .map(|_| ())
        .unwrap();

    // The blank short answer matches every keyword and earns its 3 marks.
    match handle.finished().await {
        SessionExit::Submitted { outcome, .. } => {
            assert_eq!(outcome.result.total_score, 4);
            assert!(!outcome.result.passed);
            assert!(outcome.can_retry);
            assert_eq!(outcome.attempts_remaining, 1);
        }
        other => panic!("expected submission on expiry, got {other:?}"),
    }
    assert_eq!(recorder.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn abandoned_attempt_is_never_recorded() {
    let recorder = Arc::new(MemoryRecorder::new());
    let handle = spawn_session(session(5), Duration::from_secs(1), recorder.clone());
    handle.select_option("copy-types", "i32").await.unwrap();

    let mut views = handle.subscribe();
    let exit = handle.abandon().await;
    assert_eq!(exit, SessionExit::Abandoned);
    assert_eq!(views.borrow_and_update().state, SessionState::Abandoned);

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(recorder.call_count(), 0);
}

#[test]
fn seeded_sessions_present_the_same_order() {
    let a = session(99);
    let b = session(99);
    let ids = |s: &QuizSession| s.questions().iter().map(|q| q.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&a), ids(&b));
    assert_eq!(a.questions(), b.questions());

    let mut sorted = ids(&a);
    sorted.sort();
    let mut expected = vec![
        "copy-types",
        "move-closure",
        "mut-ref",
        "scope-end",
        "smart-pointers",
        "two-owners",
    ];
    expected.sort();
    assert_eq!(sorted, expected);
}
