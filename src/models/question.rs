// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Represents the 'options' table in the database.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: i64,
    /// The text shown to the candidate.
    pub option: String,
}

/// Raw row of the 'questions' table, before its options are attached.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub question: String,
    pub comprehension: Option<String>,
    pub image_url: Option<String>,
    pub correct_option_id: Option<i64>,
}

/// A question as held by an exam session. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// 1-based position within the loaded set.
    pub number: usize,

    pub question: String,

    /// Optional reading passage the question refers to.
    pub comprehension: Option<String>,

    pub image_url: Option<String>,

    pub options: Vec<AnswerOption>,

    /// `None` while an import has not yet linked the correct option.
    pub correct_option_id: Option<i64>,
}

impl Question {
    pub fn has_option(&self, option_id: i64) -> bool {
        self.options.iter().any(|o| o.id == option_id)
    }

    pub fn option(&self, option_id: i64) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

/// DTO for sending a question to the candidate (excludes the correct answer).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub number: usize,
    pub question: String,
    pub comprehension: Option<String>,
    pub image_url: Option<String>,
    pub options: Vec<AnswerOption>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            number: q.number,
            question: q.question.clone(),
            comprehension: q.comprehension.clone(),
            image_url: q.image_url.clone(),
            options: q.options.clone(),
        }
    }
}

/// A validated, sanitized question ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Position of the correct entry in `options`.
    pub correct_index: usize,
}
