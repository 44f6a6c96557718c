// src/exam/scoring.rs

use std::{collections::{BTreeMap, HashMap}, fmt};

use serde::Serialize;

use crate::{
    backend::ExamBackend,
    error::AppError,
    exam::{
        results::{Outcome, ReviewedQuestion, review_questions},
        session::SubmissionDraft,
    },
    models::{
        attempt::{AnswerRecord, Attempt, NewAttempt},
        identity::Identity,
        question::Question,
    },
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreSummary {
    pub correct: usize,
    pub wrong: usize,
    pub not_attended: usize,
    pub total_questions: usize,
}

impl ScoreSummary {
    fn count(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Correct => self.correct += 1,
            Outcome::Wrong => self.wrong += 1,
            Outcome::NotAttended => self.not_attended += 1,
        }
    }
}

/// Scores a session's answers (keyed by question index).
pub fn score(questions: &[Question], answers: &BTreeMap<usize, i64>) -> ScoreSummary {
    let mut summary = ScoreSummary {
        total_questions: questions.len(),
        ..Default::default()
    };

    for (index, question) in questions.iter().enumerate() {
        summary.count(Outcome::classify(
            answers.get(&index).copied(),
            question.correct_option_id,
        ));
    }

    summary
}

/// One record per answered question, wrong answers included.
pub fn answer_records(
    attempt_id: i64,
    questions: &[Question],
    answers: &BTreeMap<usize, i64>,
) -> Vec<AnswerRecord> {
    answers
        .iter()
        .filter_map(|(index, option_id)| {
            questions.get(*index).map(|q| AnswerRecord {
                attempt_id,
                question_id: q.id,
                selected_option_id: *option_id,
            })
        })
        .collect()
}

#[derive(Debug)]
pub enum SubmitError {
    NotAuthenticated,
    /// The attempt row could not be written; nothing was persisted.
    AttemptWrite(AppError),
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::NotAuthenticated => f.write_str("User not authenticated"),
            SubmitError::AttemptWrite(_) => f.write_str("Something went wrong during submission."),
        }
    }
}

impl std::error::Error for SubmitError {}

impl From<SubmitError> for AppError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::NotAuthenticated => AppError::AuthError(err.to_string()),
            SubmitError::AttemptWrite(_) => AppError::InternalServerError(err.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct SubmittedExam {
    pub attempt: Attempt,
    pub summary: ScoreSummary,
    pub review: Vec<ReviewedQuestion>,
    /// False when the answer records could not be written.
    pub answers_saved: bool,
}

/// Scores a draft and persists it.
///
/// The attempt must be written before any answer record; a failed answer
/// write is logged and does not undo the attempt.
pub async fn submit(
    backend: &dyn ExamBackend,
    identity: Option<&Identity>,
    draft: &SubmissionDraft,
) -> Result<SubmittedExam, SubmitError> {
    let identity = identity.ok_or(SubmitError::NotAuthenticated)?;

    let summary = score(&draft.questions, &draft.answers);

    let attempt = backend
        .insert_attempt(&NewAttempt {
            user_id: identity.user_id.clone(),
            subject: draft.subject.clone(),
            correct: summary.correct as i64,
            wrong: summary.wrong as i64,
            not_attended: summary.not_attended as i64,
            total_questions: summary.total_questions as i64,
        })
        .await
        .map_err(|e| {
            tracing::error!("Failed to save attempt: {}", e);
            SubmitError::AttemptWrite(e)
        })?;

    let records = answer_records(attempt.id, &draft.questions, &draft.answers);
    let answers_saved = match backend.insert_answers(&records).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(attempt_id = attempt.id, "Failed to save answers: {}", e);
            false
        }
    };

    let selected: HashMap<i64, i64> = records
        .iter()
        .map(|r| (r.question_id, r.selected_option_id))
        .collect();

    tracing::info!(
        attempt_id = attempt.id,
        subject = %draft.subject,
        correct = summary.correct,
        wrong = summary.wrong,
        "exam submitted"
    );

    Ok(SubmittedExam {
        review: review_questions(&draft.questions, &selected),
        attempt,
        summary,
        answers_saved,
    })
}
