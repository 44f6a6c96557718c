// src/backend/mod.rs

//! Persistence seam.
//!
//! Handlers and the exam core talk to storage only through `ExamBackend`,
//! so the relational store can be swapped for the in-memory one in tests.

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        attempt::{AnswerRecord, Attempt, NewAttempt},
        question::{NewQuestion, Question},
        subject::{Subject, SubjectSummary},
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryBackend;
pub use postgres::PgBackend;

#[async_trait]
pub trait ExamBackend: Send + Sync {
    /// All subjects ordered by name, with their question counts.
    async fn list_subjects(&self) -> Result<Vec<SubjectSummary>, AppError>;

    async fn find_subject(&self, id: i64) -> Result<Option<Subject>, AppError>;

    async fn find_subject_by_slug(&self, slug: &str) -> Result<Option<Subject>, AppError>;

    /// Fails with `Conflict` when the slug is taken.
    async fn create_subject(&self, name: &str, slug: &str) -> Result<Subject, AppError>;

    /// Questions of a subject in creation order, options attached.
    /// `number` is left for the caller to assign.
    async fn load_questions(&self, subject_id: i64) -> Result<Vec<Question>, AppError>;

    /// Inserts a question, its options and the correct-option link as one unit.
    async fn insert_question(&self, subject_id: i64, question: &NewQuestion) -> Result<i64, AppError>;

    async fn insert_attempt(&self, attempt: &NewAttempt) -> Result<Attempt, AppError>;

    async fn insert_answers(&self, records: &[AnswerRecord]) -> Result<(), AppError>;

    async fn find_attempt(&self, id: i64) -> Result<Option<Attempt>, AppError>;

    async fn answers_for_attempt(&self, attempt_id: i64) -> Result<Vec<AnswerRecord>, AppError>;
}
