// src/exam/results.rs

use std::{
    collections::HashMap,
    sync::Arc,
    time::Duration,
};

use serde::Serialize;
use tokio::{sync::Mutex, time::Instant};

use crate::{
    backend::ExamBackend,
    config::RESULT_CACHE_TTL,
    error::AppError,
    models::{
        attempt::Attempt,
        identity::Identity,
        question::{AnswerOption, Question},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Correct,
    Wrong,
    NotAttended,
}

impl Outcome {
    pub fn classify(selected: Option<i64>, correct: Option<i64>) -> Self {
        match selected {
            None => Outcome::NotAttended,
            Some(id) if Some(id) == correct => Outcome::Correct,
            Some(_) => Outcome::Wrong,
        }
    }
}

/// One question of a finished exam, as shown on the results page.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewedQuestion {
    pub id: i64,
    pub number: usize,
    pub question: String,
    pub comprehension: Option<String>,
    pub image_url: Option<String>,
    pub options: Vec<AnswerOption>,
    pub correct_option_id: Option<i64>,
    pub selected_option_id: Option<i64>,
    pub correct_option: Option<AnswerOption>,
    pub selected_option: Option<AnswerOption>,
    pub status: Outcome,
}

/// Pairs each question with the option picked for it (keyed by question id).
pub fn review_questions(
    questions: &[Question],
    selected: &HashMap<i64, i64>,
) -> Vec<ReviewedQuestion> {
    questions
        .iter()
        .map(|q| {
            let selected_id = selected.get(&q.id).copied();
            ReviewedQuestion {
                id: q.id,
                number: q.number,
                question: q.question.clone(),
                comprehension: q.comprehension.clone(),
                image_url: q.image_url.clone(),
                options: q.options.clone(),
                correct_option_id: q.correct_option_id,
                selected_option_id: selected_id,
                correct_option: q.correct_option_id.and_then(|id| q.option(id)).cloned(),
                selected_option: selected_id.and_then(|id| q.option(id)).cloned(),
                status: Outcome::classify(selected_id, q.correct_option_id),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    TransferCache,
    Backend,
}

#[derive(Debug, Serialize)]
pub struct ResultView {
    pub attempt: Attempt,
    pub questions: Vec<ReviewedQuestion>,
    pub source: ResultSource,
}

/// Short-lived hand-off of scored detail from submission to the results view.
///
/// Entries are consumed by the first read and expire after a TTL.
#[derive(Clone)]
pub struct ResultCache {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<i64, (Instant, Vec<ReviewedQuestion>)>>>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(RESULT_CACHE_TTL)
    }
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn put(&self, attempt_id: i64, review: Vec<ReviewedQuestion>) {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, (expires, _)| *expires > now);
        entries.insert(attempt_id, (now + self.ttl, review));
    }

    pub async fn take(&self, attempt_id: i64) -> Option<Vec<ReviewedQuestion>> {
        let (expires, review) = self.entries.lock().await.remove(&attempt_id)?;
        (expires > Instant::now()).then_some(review)
    }
}

/// Rebuilds the per-question review of an attempt.
///
/// Only the candidate who took it, or an admin, may read it. Prefers the
/// transfer cache; falls back to reloading the subject's questions and the
/// attempt's answer records.
pub async fn load_results(
    backend: &dyn ExamBackend,
    cache: &ResultCache,
    viewer: &Identity,
    attempt_id: i64,
) -> Result<ResultView, AppError> {
    let attempt = backend
        .find_attempt(attempt_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;

    if attempt.user_id != viewer.user_id && !viewer.is_admin {
        return Err(AppError::Forbidden(
            "Attempt belongs to another user".to_string(),
        ));
    }

    if let Some(questions) = cache.take(attempt_id).await {
        return Ok(ResultView {
            attempt,
            questions,
            source: ResultSource::TransferCache,
        });
    }

    let subject = backend
        .find_subject_by_slug(&attempt.subject)
        .await?
        .ok_or_else(|| AppError::NotFound("Subject not found".to_string()))?;

    let mut questions = backend.load_questions(subject.id).await?;
    for (index, question) in questions.iter_mut().enumerate() {
        question.number = index + 1;
    }

    let selected: HashMap<i64, i64> = backend
        .answers_for_attempt(attempt_id)
        .await?
        .into_iter()
        .map(|record| (record.question_id, record.selected_option_id))
        .collect();

    Ok(ResultView {
        questions: review_questions(&questions, &selected),
        attempt,
        source: ResultSource::Backend,
    })
}
