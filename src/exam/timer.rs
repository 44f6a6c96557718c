// src/exam/timer.rs

//! The two per-session countdowns.
//!
//! Each runs as its own tokio task and only touches the session through
//! `LiveSession::with`, so every tick is serialized with request handlers.

use std::sync::Arc;

use tokio::{
    task::JoinHandle,
    time::{self, Instant},
};

use crate::{
    config::{EXPIRED_SESSION_TTL, TICK_INTERVAL},
    exam::{
        registry::{LiveSession, SessionRegistry},
        session::SessionPhase,
    },
};

/// Owns the timer tasks of one session; dropping it stops them.
pub struct SessionTasks {
    handles: Vec<JoinHandle<()>>,
}

impl Drop for SessionTasks {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

pub fn spawn_timers(live: Arc<LiveSession>, registry: SessionRegistry) -> SessionTasks {
    let exam = tokio::spawn(run_exam_timer(Arc::clone(&live), registry));
    let question = tokio::spawn(run_question_timer(live));

    SessionTasks {
        handles: vec![exam, question],
    }
}

/// Exam-wide countdown. Ends once the clock runs out or the session is terminated.
///
/// An expired session stays registered for `EXPIRED_SESSION_TTL` so the
/// candidate can still submit, then it is discarded.
async fn run_exam_timer(live: Arc<LiveSession>, registry: SessionRegistry) {
    let mut interval = time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);

    loop {
        interval.tick().await;
        let finished = live.with(|s| s.on_exam_tick(Instant::now())).await;
        if finished {
            tracing::debug!(session_id = %live.id, "exam timer stopped");
            break;
        }
    }

    if live.with(|s| s.phase()).await != SessionPhase::TimeExpired {
        return;
    }

    time::sleep(EXPIRED_SESSION_TTL).await;
    if registry.discard(live.id).await {
        tracing::info!(session_id = %live.id, "expired session was never submitted");
    }
}

/// Per-question countdown, restarted on every navigation.
async fn run_question_timer(live: Arc<LiveSession>) {
    let mut interval = time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let finished = live
                    .with(|s| {
                        s.on_question_tick();
                        s.phase() != SessionPhase::Active
                    })
                    .await;
                if finished {
                    tracing::debug!(session_id = %live.id, "question timer stopped");
                    break;
                }
            }
            _ = live.navigated() => interval.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{
        config::{EXPIRED_SESSION_TTL, SECONDS_PER_QUESTION},
        exam::{
            registry::SessionRegistry,
            session::{ExamSession, SessionPhase, tests::sample_questions},
        },
    };

    fn session(count: usize) -> ExamSession {
        ExamSession::initialize(
            "math",
            sample_questions(count),
            count as u32 * SECONDS_PER_QUESTION,
            1,
        )
        .unwrap()
    }

    async fn sleep_secs(secs: f64) {
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn question_timeout_advances_to_next_question() {
        let registry = SessionRegistry::new();
        let live = registry.start(None, session(3)).await;

        sleep_secs(29.5).await;
        assert_eq!(live.with(|s| s.current_index()).await, 0);

        sleep_secs(1.0).await;
        let (index, question_left, exam_left) = live
            .with(|s| (s.current_index(), s.question_remaining(), s.remaining_seconds()))
            .await;
        assert_eq!(index, 1);
        assert_eq!(question_left, SECONDS_PER_QUESTION);
        assert_eq!(exam_left, 60);
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_restarts_the_question_countdown() {
        let registry = SessionRegistry::new();
        let live = registry.start(None, session(4)).await;

        sleep_secs(20.5).await;
        assert_eq!(live.with(|s| s.question_remaining()).await, 10);
        live.with(|s| s.go_to_question(1)).await.unwrap();

        // A full countdown from the moment of navigation, not from the old phase.
        sleep_secs(29.8).await;
        assert_eq!(
            live.with(|s| (s.current_index(), s.question_remaining())).await,
            (1, 1)
        );

        sleep_secs(0.5).await;
        assert_eq!(live.with(|s| s.current_index()).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exam_clock_expires_the_session() {
        let registry = SessionRegistry::new();
        let live = registry.start(None, session(2)).await;

        sleep_secs(60.5).await;
        let (phase, left, show_modal, index) = live
            .with(|s| {
                (
                    s.phase(),
                    s.remaining_seconds(),
                    s.submit_flow().show_modal,
                    s.current_index(),
                )
            })
            .await;
        assert_eq!(phase, SessionPhase::TimeExpired);
        assert_eq!(left, 0);
        assert!(show_modal);
        assert_eq!(index, 1);

        sleep_secs(10.0).await;
        assert_eq!(live.with(|s| s.remaining_seconds()).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn discarding_stops_both_timers() {
        let registry = SessionRegistry::new();
        let live = registry.start(None, session(3)).await;

        sleep_secs(2.5).await;
        assert!(registry.discard(live.id).await);
        assert!(registry.get(live.id).await.is_none());

        sleep_secs(40.0).await;
        let (index, exam_left) = live
            .with(|s| (s.current_index(), s.remaining_seconds()))
            .await;
        assert_eq!(index, 0);
        assert_eq!(exam_left, 88);
    }

    #[tokio::test(start_paused = true)]
    async fn terminated_session_is_removed_after_delay() {
        let registry = SessionRegistry::new();
        let live = registry.start(None, session(2)).await;

        registry.discard_after(live.id, crate::config::TERMINATION_DELAY);
        sleep_secs(0.5).await;
        assert_eq!(registry.len().await, 1);

        sleep_secs(0.5).await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_sessions_are_discarded_after_expiry() {
        let registry = SessionRegistry::new();
        for _ in 0..3 {
            registry.start(None, session(2)).await;
        }

        // Still there right after the clock runs out, so a late submit works.
        sleep_secs(61.0).await;
        assert_eq!(registry.len().await, 3);

        tokio::time::sleep(EXPIRED_SESSION_TTL).await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_session_survives_until_ttl() {
        let registry = SessionRegistry::new();
        let live = registry.start(None, session(1)).await;

        sleep_secs(30.5).await;
        assert_eq!(live.with(|s| s.phase()).await, SessionPhase::TimeExpired);

        tokio::time::sleep(EXPIRED_SESSION_TTL - Duration::from_secs(1)).await;
        assert!(registry.get(live.id).await.is_some());
        assert!(live.with(|s| s.begin_submit()).await.is_ok());

        sleep_secs(2.0).await;
        assert!(registry.get(live.id).await.is_none());
    }
}
