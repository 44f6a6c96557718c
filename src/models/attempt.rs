// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'attempts' table in the database.
/// One row per submitted exam; never updated afterwards.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    /// Identity-provider user id of the candidate.
    pub user_id: String,
    /// Subject slug the exam was taken for.
    pub subject: String,
    pub correct: i64,
    pub wrong: i64,
    pub not_attended: i64,
    pub total_questions: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Values for inserting a new attempt.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub user_id: String,
    pub subject: String,
    pub correct: i64,
    pub wrong: i64,
    pub not_attended: i64,
    pub total_questions: i64,
}

/// Represents the 'user_answers' table in the database.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_option_id: i64,
}
