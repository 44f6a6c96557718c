// src/backend/memory.rs

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    error::AppError,
    models::{
        attempt::{AnswerRecord, Attempt, NewAttempt},
        question::{AnswerOption, NewQuestion, Question},
        subject::{Subject, SubjectSummary},
    },
};

use super::ExamBackend;

#[derive(Default)]
struct Tables {
    next_id: i64,
    subjects: Vec<Subject>,
    /// (subject_id, question) in insertion order.
    questions: Vec<(i64, Question)>,
    attempts: Vec<Attempt>,
    answers: Vec<AnswerRecord>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local storage with the same semantics as `PgBackend`.
///
/// Used by the test suites and for running the service without a database.
/// Writes of attempts and answers can be made to fail on demand.
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
    fail_attempt_writes: AtomicBool,
    fail_answer_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_attempt_writes(&self, fail: bool) {
        self.fail_attempt_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_answer_writes(&self, fail: bool) {
        self.fail_answer_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn attempt_count(&self) -> usize {
        self.tables.lock().await.attempts.len()
    }
}

fn build_question(tables: &mut Tables, new: &NewQuestion) -> Question {
    let id = tables.next_id();
    let options: Vec<AnswerOption> = new
        .options
        .iter()
        .map(|text| AnswerOption {
            id: tables.next_id(),
            option: text.clone(),
        })
        .collect();

    Question {
        id,
        number: 0,
        question: new.question.clone(),
        comprehension: None,
        image_url: None,
        correct_option_id: options.get(new.correct_index).map(|o| o.id),
        options,
    }
}

#[async_trait]
impl ExamBackend for MemoryBackend {
    async fn list_subjects(&self) -> Result<Vec<SubjectSummary>, AppError> {
        let tables = self.tables.lock().await;
        let mut subjects: Vec<SubjectSummary> = tables
            .subjects
            .iter()
            .map(|s| SubjectSummary {
                id: s.id,
                name: s.name.clone(),
                slug: s.slug.clone(),
                question_count: tables.questions.iter().filter(|(sid, _)| *sid == s.id).count()
                    as i64,
            })
            .collect();
        subjects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(subjects)
    }

    async fn find_subject(&self, id: i64) -> Result<Option<Subject>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.subjects.iter().find(|s| s.id == id).cloned())
    }

    async fn find_subject_by_slug(&self, slug: &str) -> Result<Option<Subject>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.subjects.iter().find(|s| s.slug == slug).cloned())
    }

    async fn create_subject(&self, name: &str, slug: &str) -> Result<Subject, AppError> {
        let mut tables = self.tables.lock().await;
        if tables.subjects.iter().any(|s| s.slug == slug) {
            return Err(AppError::Conflict(format!("Subject '{}' already exists", slug)));
        }
        let subject = Subject {
            id: tables.next_id(),
            name: name.to_string(),
            slug: slug.to_string(),
        };
        tables.subjects.push(subject.clone());
        Ok(subject)
    }

    async fn load_questions(&self, subject_id: i64) -> Result<Vec<Question>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .questions
            .iter()
            .filter(|(sid, _)| *sid == subject_id)
            .map(|(_, q)| q.clone())
            .collect())
    }

    async fn insert_question(&self, subject_id: i64, question: &NewQuestion) -> Result<i64, AppError> {
        if question.correct_index >= question.options.len() {
            return Err(AppError::BadRequest(format!(
                "correctIndex {} is out of bounds",
                question.correct_index
            )));
        }
        let mut tables = self.tables.lock().await;
        let question = build_question(&mut tables, question);
        let id = question.id;
        tables.questions.push((subject_id, question));
        Ok(id)
    }

    async fn insert_attempt(&self, attempt: &NewAttempt) -> Result<Attempt, AppError> {
        if self.fail_attempt_writes.load(Ordering::SeqCst) {
            return Err(AppError::InternalServerError(
                "attempt write rejected".to_string(),
            ));
        }
        let mut tables = self.tables.lock().await;
        let attempt = Attempt {
            id: tables.next_id(),
            user_id: attempt.user_id.clone(),
            subject: attempt.subject.clone(),
            correct: attempt.correct,
            wrong: attempt.wrong,
            not_attended: attempt.not_attended,
            total_questions: attempt.total_questions,
            created_at: Some(chrono::Utc::now()),
        };
        tables.attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn insert_answers(&self, records: &[AnswerRecord]) -> Result<(), AppError> {
        if self.fail_answer_writes.load(Ordering::SeqCst) {
            return Err(AppError::InternalServerError(
                "answer write rejected".to_string(),
            ));
        }
        let mut tables = self.tables.lock().await;
        tables.answers.extend_from_slice(records);
        Ok(())
    }

    async fn find_attempt(&self, id: i64) -> Result<Option<Attempt>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.attempts.iter().find(|a| a.id == id).cloned())
    }

    async fn answers_for_attempt(&self, attempt_id: i64) -> Result<Vec<AnswerRecord>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .answers
            .iter()
            .filter(|a| a.attempt_id == attempt_id)
            .cloned()
            .collect())
    }
}
