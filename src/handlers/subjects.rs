// src/handlers/subjects.rs

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::{backend::ExamBackend, error::AppError};

/// Lists subjects with their question counts, ordered by name.
pub async fn list_subjects(
    State(backend): State<Arc<dyn ExamBackend>>,
) -> Result<impl IntoResponse, AppError> {
    let subjects = backend.list_subjects().await?;
    Ok(Json(subjects))
}
