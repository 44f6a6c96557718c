// src/models/subject.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'subjects' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    /// URL key used by the exam page, derived from the name.
    pub slug: String,
}

/// Subject row joined with the number of questions it owns.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubjectSummary {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub question_count: i64,
}

/// DTO for creating a new subject.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubjectRequest {
    #[validate(length(min = 1, max = 100, message = "Subject name must be between 1 and 100 characters."))]
    pub name: String,
}

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static NON_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9-]").expect("valid regex"));

/// Derives the URL slug of a subject name.
///
/// Lower-cases and trims, collapses whitespace runs into `-`,
/// then drops everything outside `[a-z0-9-]`.
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let dashed = WHITESPACE.replace_all(&lowered, "-");
    NON_SLUG.replace_all(&dashed, "").into_owned()
}
