// src/handlers/exam.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    config::{DIMENSION_POLL_INTERVAL, MARKS_PER_ANSWER, SECONDS_PER_QUESTION, TERMINATION_DELAY},
    error::AppError,
    exam::{
        integrity::{Verdict, WindowDimensions},
        registry::{LiveSession, SessionRegistry},
        repository::load_question_set,
        scoring,
        session::{ExamMeta, ExamSession, SessionError, SessionSnapshot, SubmissionDraft},
    },
    models::{identity::Identity, question::PublicQuestion, subject::Subject},
    state::AppState,
};

/// Client-side pacing hints.
#[derive(Debug, Serialize)]
pub struct Timing {
    pub seconds_per_question: u32,
    pub dimension_poll_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct StartExamResponse {
    pub session_id: Uuid,
    pub subject: Subject,
    pub meta: ExamMeta,
    pub questions: Vec<PublicQuestion>,
    pub timing: Timing,
    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct SelectOptionRequest {
    pub option_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct GoToRequest {
    pub index: usize,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub attempt_id: i64,
    pub summary: scoring::ScoreSummary,
    pub answers_saved: bool,
    pub redirect: String,
}

/// Looks up a live session the caller is allowed to drive.
async fn find_live(
    sessions: &SessionRegistry,
    id: Uuid,
    identity: Option<&Identity>,
) -> Result<Arc<LiveSession>, AppError> {
    let live = sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound("Exam session not found".to_string()))?;

    if let Some(owner) = &live.owner {
        if identity.map(|i| &i.user_id) != Some(owner) {
            return Err(AppError::Forbidden(
                "Exam session belongs to another user".to_string(),
            ));
        }
    }

    Ok(live)
}

/// Applies one session action and answers with the resulting snapshot.
async fn act<F>(
    sessions: &SessionRegistry,
    id: Uuid,
    identity: Option<Extension<Identity>>,
    action: F,
) -> Result<Json<SessionSnapshot>, AppError>
where
    F: FnOnce(&mut ExamSession) -> Result<(), SessionError>,
{
    let identity = identity.map(|Extension(identity)| identity);
    let live = find_live(sessions, id, identity.as_ref()).await?;

    let snapshot = live
        .with(|s| action(&mut *s).map(|_| s.snapshot(Instant::now())))
        .await?;

    Ok(Json(snapshot))
}

/// Loads the subject's questions and opens a new exam session.
pub async fn start_exam(
    State(state): State<AppState>,
    identity: Option<Extension<Identity>>,
    Path(subject_slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (subject, questions) = load_question_set(state.backend.as_ref(), &subject_slug).await?;

    let total_time = questions.len() as u32 * SECONDS_PER_QUESTION;
    let public_questions: Vec<PublicQuestion> = questions.iter().map(PublicQuestion::from).collect();

    let session = ExamSession::initialize(subject.slug.clone(), questions, total_time, MARKS_PER_ANSWER)?;
    let meta = session.meta().clone();

    let owner = identity.map(|Extension(identity)| identity.user_id);
    let live = state.sessions.start(owner, session).await;
    let snapshot = live.with(|s| s.snapshot(Instant::now())).await;

    Ok((
        StatusCode::CREATED,
        Json(StartExamResponse {
            session_id: live.id,
            subject,
            meta,
            questions: public_questions,
            timing: Timing {
                seconds_per_question: SECONDS_PER_QUESTION,
                dimension_poll_ms: DIMENSION_POLL_INTERVAL.as_millis() as u64,
            },
            snapshot,
        }),
    ))
}

pub async fn get_session(
    State(sessions): State<SessionRegistry>,
    identity: Option<Extension<Identity>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    act(&sessions, id, identity, |_| Ok(())).await
}

pub async fn select_option(
    State(sessions): State<SessionRegistry>,
    identity: Option<Extension<Identity>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectOptionRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    act(&sessions, id, identity, |s| s.select_option(req.option_id)).await
}

pub async fn mark_for_review(
    State(sessions): State<SessionRegistry>,
    identity: Option<Extension<Identity>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    act(&sessions, id, identity, |s| s.mark_for_review()).await
}

pub async fn go_to_question(
    State(sessions): State<SessionRegistry>,
    identity: Option<Extension<Identity>>,
    Path(id): Path<Uuid>,
    Json(req): Json<GoToRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    act(&sessions, id, identity, |s| s.go_to_question(req.index)).await
}

pub async fn next_question(
    State(sessions): State<SessionRegistry>,
    identity: Option<Extension<Identity>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    act(&sessions, id, identity, |s| s.next()).await
}

pub async fn previous_question(
    State(sessions): State<SessionRegistry>,
    identity: Option<Extension<Identity>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    act(&sessions, id, identity, |s| s.previous()).await
}

pub async fn cancel_submit(
    State(sessions): State<SessionRegistry>,
    identity: Option<Extension<Identity>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    act(&sessions, id, identity, |s| s.cancel_submit()).await
}

pub async fn dismiss_warning(
    State(sessions): State<SessionRegistry>,
    identity: Option<Extension<Identity>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    act(&sessions, id, identity, |s| {
        s.dismiss_warning();
        Ok(())
    })
    .await
}

/// Records a report from an integrity detector; a terminating verdict
/// schedules the session's removal.
async fn report_integrity<F>(
    sessions: &SessionRegistry,
    id: Uuid,
    identity: Option<Extension<Identity>>,
    report: F,
) -> Result<Json<SessionSnapshot>, AppError>
where
    F: FnOnce(&mut ExamSession) -> Verdict,
{
    let identity = identity.map(|Extension(identity)| identity);
    let live = find_live(sessions, id, identity.as_ref()).await?;

    let (verdict, snapshot) = live
        .with(|s| {
            let verdict = report(&mut *s);
            (verdict, s.snapshot(Instant::now()))
        })
        .await;

    if verdict == Verdict::Terminated {
        tracing::warn!(session_id = %id, "cheating attempt, session terminated");
        sessions.discard_after(id, TERMINATION_DELAY);
    }

    Ok(Json(snapshot))
}

pub async fn report_visibility(
    State(sessions): State<SessionRegistry>,
    identity: Option<Extension<Identity>>,
    Path(id): Path<Uuid>,
    Json(req): Json<VisibilityRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    report_integrity(&sessions, id, identity, |s| {
        s.report_visibility(req.visible, Instant::now())
    })
    .await
}

pub async fn report_dimensions(
    State(sessions): State<SessionRegistry>,
    identity: Option<Extension<Identity>>,
    Path(id): Path<Uuid>,
    Json(dims): Json<WindowDimensions>,
) -> Result<Json<SessionSnapshot>, AppError> {
    report_integrity(&sessions, id, identity, |s| s.report_dimensions(dims)).await
}

/// Scores and persists the exam, then ends the session.
///
/// On failure the error is recorded on the session so the submit prompt
/// can be retried.
pub async fn submit_exam(
    State(state): State<AppState>,
    identity: Option<Extension<Identity>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let identity = identity.map(|Extension(identity)| identity);
    let live = find_live(&state.sessions, id, identity.as_ref()).await?;

    let draft = live.with(|s| s.begin_submit()).await?;

    // Detached so a dropped request cannot strand the session mid-submit.
    let task = tokio::spawn(complete_submission(state, live, identity, draft));
    let response = task.await.map_err(|e| {
        tracing::error!(session_id = %id, "Submission task failed: {}", e);
        AppError::InternalServerError(e.to_string())
    })??;

    Ok(Json(response))
}

/// Persists a submission and settles the session either way.
async fn complete_submission(
    state: AppState,
    live: Arc<LiveSession>,
    identity: Option<Identity>,
    draft: SubmissionDraft,
) -> Result<SubmitResponse, scoring::SubmitError> {
    match scoring::submit(state.backend.as_ref(), identity.as_ref(), &draft).await {
        Ok(submitted) => {
            let attempt_id = submitted.attempt.id;
            state.results.put(attempt_id, submitted.review).await;
            state.sessions.discard(live.id).await;

            Ok(SubmitResponse {
                attempt_id,
                summary: submitted.summary,
                answers_saved: submitted.answers_saved,
                redirect: format!("/result?attempt_id={}", attempt_id),
            })
        }
        Err(err) => {
            let message = err.to_string();
            live.with(|s| s.fail_submit(message)).await;
            Err(err)
        }
    }
}

/// Leaving the exam page: timers and detectors are torn down, nothing is saved.
pub async fn leave_exam(
    State(sessions): State<SessionRegistry>,
    identity: Option<Extension<Identity>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let identity = identity.map(|Extension(identity)| identity);
    find_live(&sessions, id, identity.as_ref()).await?;
    sessions.discard(id).await;

    Ok(StatusCode::NO_CONTENT)
}
