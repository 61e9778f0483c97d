//! Async driver for a delivery session.
//!
//! [`spawn_session`] moves a [`QuizSession`] into a tokio task. Learner
//! input arrives over a command channel, the countdown runs off an
//! interval, and both are multiplexed in one loop so a manual submit and
//! time expiry can never both grade. Every change is published as a
//! [`SessionView`] on a watch channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::{DriverError, SessionError};
use crate::grading::GradingResult;
use crate::model::Answer;
use crate::report::AttemptOutcome;
use crate::session::{QuizSession, SessionView, SubmitCheck, SubmitOutcome, TickOutcome};
use crate::traits::{AttemptRecorder, Grader};

/// Commands accepted by the driver. Each carries a reply channel.
#[derive(Debug)]
pub enum SessionCommand {
    SetAnswer {
        question_id: String,
        answer: Answer,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    SelectOption {
        question_id: String,
        option_id: String,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    ToggleFlag {
        question_id: String,
        reply: oneshot::Sender<Result<bool, SessionError>>,
    },
    Navigate {
        index: usize,
        reply: oneshot::Sender<Result<usize, SessionError>>,
    },
    RequestSubmit {
        reply: oneshot::Sender<SubmitCheck>,
    },
    Submit {
        force: bool,
        reply: oneshot::Sender<SubmitOutcome>,
    },
    Abandon,
}

/// How the driver task ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionExit {
    /// Graded, by the learner or by the clock.
    Submitted {
        outcome: AttemptOutcome,
        /// Set when the recorder failed; the outcome is still valid.
        record_error: Option<String>,
    },
    /// Abandoned by command. Nothing was graded or recorded.
    Abandoned,
    /// Every handle was dropped before submission. Treated as abandonment.
    Disconnected,
}

impl SessionExit {
    pub fn result(&self) -> Option<&GradingResult> {
        match self {
            SessionExit::Submitted { outcome, .. } => Some(&outcome.result),
            _ => None,
        }
    }
}

/// Caller side of a running session.
#[derive(Debug)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    views: watch::Receiver<SessionView>,
    task: JoinHandle<SessionExit>,
}

/// Start driving `session`. One countdown second elapses per `tick`.
pub fn spawn_session<G>(
    session: QuizSession<G>,
    tick: Duration,
    recorder: Arc<dyn AttemptRecorder>,
) -> SessionHandle
where
    G: Grader + 'static,
{
    let (commands, rx) = mpsc::channel(32);
    let (view_tx, views) = watch::channel(session.view());
    let task = tokio::spawn(drive(session, tick, rx, view_tx, recorder));
    SessionHandle {
        commands,
        views,
        task,
    }
}

impl SessionHandle {
    /// The latest published view.
    pub fn view(&self) -> SessionView {
        self.views.borrow().clone()
    }

    /// A receiver that is notified on every published view.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.views.clone()
    }

    pub async fn set_answer(
        &self,
        question_id: impl Into<String>,
        answer: Answer,
    ) -> Result<(), DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::SetAnswer {
            question_id: question_id.into(),
            answer,
            reply,
        })
        .await?;
        Ok(rx.await.map_err(|_| DriverError::Stopped)??)
    }

    pub async fn select_option(
        &self,
        question_id: impl Into<String>,
        option_id: impl Into<String>,
    ) -> Result<(), DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::SelectOption {
            question_id: question_id.into(),
            option_id: option_id.into(),
            reply,
        })
        .await?;
        Ok(rx.await.map_err(|_| DriverError::Stopped)??)
    }

    pub async fn toggle_flag(&self, question_id: impl Into<String>) -> Result<bool, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::ToggleFlag {
            question_id: question_id.into(),
            reply,
        })
        .await?;
        Ok(rx.await.map_err(|_| DriverError::Stopped)??)
    }

    pub async fn navigate(&self, index: usize) -> Result<usize, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Navigate { index, reply }).await?;
        Ok(rx.await.map_err(|_| DriverError::Stopped)??)
    }

    pub async fn request_submit(&self) -> Result<SubmitCheck, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::RequestSubmit { reply }).await?;
        rx.await.map_err(|_| DriverError::Stopped)
    }

    pub async fn submit(&self, force: bool) -> Result<SubmitOutcome, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Submit { force, reply }).await?;
        rx.await.map_err(|_| DriverError::Stopped)
    }

    /// Abandon the session and wait for the driver to stop.
    pub async fn abandon(self) -> SessionExit {
        // A send failure means the driver already exited; its exit value says how.
        let _ = self.commands.send(SessionCommand::Abandon).await;
        self.finished().await
    }

    /// Stop sending input and wait for the driver to exit.
    ///
    /// Call after a submit, or once the published view has left
    /// `InProgress`. A session still open at this point is abandoned and
    /// ends as [`SessionExit::Disconnected`].
    pub async fn finished(self) -> SessionExit {
        let SessionHandle { commands, task, .. } = self;
        drop(commands);
        match task.await {
            Ok(exit) => exit,
            Err(e) => {
                tracing::error!("session driver panicked: {e}");
                SessionExit::Disconnected
            }
        }
    }

    async fn send(&self, command: SessionCommand) -> Result<(), DriverError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| DriverError::Stopped)
    }
}

async fn drive<G: Grader>(
    mut session: QuizSession<G>,
    tick: Duration,
    mut commands: mpsc::Receiver<SessionCommand>,
    views: watch::Sender<SessionView>,
    recorder: Arc<dyn AttemptRecorder>,
) -> SessionExit {
    let timed = session.remaining_seconds().is_some();
    let mut ticker = time::interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick(), if timed => {
                let outcome = session.tick();
                views.send_replace(session.view());
                if let TickOutcome::Expired(result) = outcome {
                    return finish(&session, result, recorder.as_ref()).await;
                }
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    session.abandon();
                    views.send_replace(session.view());
                    tracing::debug!("all session handles dropped, abandoning");
                    return SessionExit::Disconnected;
                };
                if let Some(exit) = handle(&mut session, command, &views, recorder.as_ref()).await {
                    return exit;
                }
            }
        }
    }
}

/// Apply one command. Returns `Some` when the session has ended.
async fn handle<G: Grader>(
    session: &mut QuizSession<G>,
    command: SessionCommand,
    views: &watch::Sender<SessionView>,
    recorder: &dyn AttemptRecorder,
) -> Option<SessionExit> {
    match command {
        SessionCommand::SetAnswer {
            question_id,
            answer,
            reply,
        } => {
            let r = session.set_answer(&question_id, answer);
            views.send_replace(session.view());
            let _ = reply.send(r);
        }
        SessionCommand::SelectOption {
            question_id,
            option_id,
            reply,
        } => {
            let r = session.select_option(&question_id, &option_id);
            views.send_replace(session.view());
            let _ = reply.send(r);
        }
        SessionCommand::ToggleFlag { question_id, reply } => {
            let r = session.toggle_flag(&question_id);
            views.send_replace(session.view());
            let _ = reply.send(r);
        }
        SessionCommand::Navigate { index, reply } => {
            let r = session.navigate(index);
            views.send_replace(session.view());
            let _ = reply.send(r);
        }
        SessionCommand::RequestSubmit { reply } => {
            let _ = reply.send(session.request_submit());
        }
        SessionCommand::Submit { force, reply } => {
            let outcome = session.submit(force);
            views.send_replace(session.view());
            let graded = match &outcome {
                SubmitOutcome::Graded(result) => Some(result.clone()),
                _ => None,
            };
            let _ = reply.send(outcome);
            if let Some(result) = graded {
                return Some(finish(session, result, recorder).await);
            }
        }
        SessionCommand::Abandon => {
            session.abandon();
            views.send_replace(session.view());
            return Some(SessionExit::Abandoned);
        }
    }
    None
}

async fn finish<G: Grader>(
    session: &QuizSession<G>,
    result: GradingResult,
    recorder: &dyn AttemptRecorder,
) -> SessionExit {
    let outcome = AttemptOutcome::new(session.quiz(), result);
    let record_error = match recorder.record(&outcome).await {
        Ok(()) => None,
        Err(e) => {
            tracing::error!(
                recorder = recorder.name(),
                attempt_id = %outcome.attempt_id,
                "failed to record attempt: {e:#}"
            );
            Some(format!("{e:#}"))
        }
    };
    SessionExit::Submitted {
        outcome,
        record_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerOption, Question, QuestionType, QuizDefinition};
    use crate::recorder::MemoryRecorder;
    use crate::session::SessionState;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn quiz(time_limit: u32) -> Arc<QuizDefinition> {
        let mut q = Question::empty(QuestionType::SingleChoice);
        q.id = "q1".into();
        q.options = vec![
            AnswerOption {
                id: "a".into(),
                text: "Borrow checker".into(),
                is_correct: true,
            },
            AnswerOption {
                id: "b".into(),
                text: "Garbage collector".into(),
                is_correct: false,
            },
        ];
        let mut q2 = Question::empty(QuestionType::OneWord);
        q2.id = "q2".into();
        q2.correct_answer = "cargo".into();
        Arc::new(QuizDefinition {
            title: "Driver".into(),
            total_marks: 2,
            time_limit,
            attempts_allowed: 2,
            questions: vec![q, q2],
            ..QuizDefinition::empty()
        })
    }

    fn spawn(time_limit: u32, recorder: Arc<dyn AttemptRecorder>) -> SessionHandle {
        let session = QuizSession::with_rng(quiz(time_limit), 1, &mut StdRng::seed_from_u64(0));
        spawn_session(session, Duration::from_secs(1), recorder)
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_submits_and_records_once() {
        let recorder = Arc::new(MemoryRecorder::new());
        let handle = spawn(1, recorder.clone());

        let mut views = handle.subscribe();
        views
            .wait_for(|v| v.state != SessionState::InProgress)
            .await
            .map(|_| ())
            .unwrap();
        assert_eq!(views.borrow().remaining_seconds, Some(0));

        let exit = handle.finished().await;
        let result = exit.result().expect("expired session is graded");
        assert_eq!(result.total_score, 0);
        assert!(!result.passed);
        assert_eq!(recorder.call_count(), 1);
        match exit {
            SessionExit::Submitted {
                outcome,
                record_error,
            } => {
                assert!(record_error.is_none());
                assert_eq!(outcome.attempts_remaining, 1);
                assert!(outcome.can_retry);
            }
            other => panic!("unexpected exit {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_is_published() {
        let recorder = Arc::new(MemoryRecorder::new());
        let handle = spawn(1, recorder.clone());
        assert_eq!(handle.view().remaining_seconds, Some(60));

        let mut views = handle.subscribe();
        views.changed().await.unwrap();
        assert_eq!(views.borrow().remaining_seconds, Some(59));
        assert_eq!(views.borrow().remaining_display.as_deref(), Some("00:59"));

        handle.abandon().await;
        assert_eq!(recorder.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_wins_over_clock() {
        let recorder = Arc::new(MemoryRecorder::new());
        let handle = spawn(1, recorder.clone());

        handle.select_option("q1", "a").await.unwrap();
        handle.set_answer("q2", Answer::Text("Cargo".into())).await.unwrap();
        assert_eq!(handle.view().answered_count, 2);
        assert!(!handle.request_submit().await.unwrap().needs_confirmation);

        let outcome = handle.submit(false).await.unwrap();
        assert_eq!(outcome.result().unwrap().total_score, 2);
        assert!(matches!(handle.submit(true).await, Err(DriverError::Stopped)));

        let exit = handle.finished().await;
        assert_eq!(exit.result().unwrap().total_score, 2);
        assert_eq!(recorder.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unconfirmed_submit_keeps_running() {
        let recorder = Arc::new(MemoryRecorder::new());
        let handle = spawn(0, recorder.clone());

        let outcome = handle.submit(false).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::NeedsConfirmation { unanswered: 2 });
        assert_eq!(handle.navigate(5).await.unwrap(), 1);
        assert!(handle.toggle_flag("q2").await.unwrap());
        assert_eq!(handle.view().flagged, vec!["q2".to_string()]);
        assert_eq!(handle.view().state, SessionState::InProgress);

        assert!(matches!(handle.abandon().await, SessionExit::Abandoned));
        assert_eq!(recorder.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handles_abandons_without_recording() {
        let recorder = Arc::new(MemoryRecorder::new());
        let handle = spawn(1, recorder.clone());
        let SessionHandle { commands, task, .. } = handle;
        drop(commands);

        assert_eq!(task.await.unwrap(), SessionExit::Disconnected);
        assert_eq!(recorder.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_on_open_untimed_session_disconnects() {
        let recorder = Arc::new(MemoryRecorder::new());
        let handle = spawn(0, recorder.clone());
        handle.select_option("q1", "a").await.unwrap();
        let mut views = handle.subscribe();

        let exit = time::timeout(Duration::from_secs(3600), handle.finished())
            .await
            .expect("driver exits once the handle is released");
        assert_eq!(exit, SessionExit::Disconnected);
        assert_eq!(views.borrow_and_update().state, SessionState::Abandoned);
        assert_eq!(recorder.call_count(), 0);
    }

    struct FailingRecorder;

    #[async_trait]
    impl AttemptRecorder for FailingRecorder {
        fn name(&self) -> &str {
            "failing"
        }

        async fn record(&self, _outcome: &AttemptOutcome) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recorder_failure_is_reported_in_exit() {
        let handle = spawn(0, Arc::new(FailingRecorder));
        handle.submit(true).await.unwrap();
        match handle.finished().await {
            SessionExit::Submitted { record_error, .. } => {
                assert_eq!(record_error.as_deref(), Some("disk full"));
            }
            other => panic!("unexpected exit {other:?}"),
        }
    }
}
