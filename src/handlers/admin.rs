// src/handlers/admin.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;
use validator::Validate;

use crate::{
    backend::ExamBackend,
    error::AppError,
    models::{
        import::{ImportReport, parse_record},
        subject::{CreateSubjectRequest, slugify},
    },
};

/// Creates a new subject; the slug is derived from the name.
/// Admin only.
pub async fn create_subject(
    State(backend): State<Arc<dyn ExamBackend>>,
    Json(payload): Json<CreateSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = payload.name.trim().to_string();
    let payload = CreateSubjectRequest { name };
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let slug = slugify(&payload.name);
    if slug.is_empty() {
        return Err(AppError::BadRequest(
            "Subject name must contain letters or digits".to_string(),
        ));
    }

    let subject = backend.create_subject(&payload.name, &slug).await?;
    tracing::info!(subject_id = subject.id, slug = %subject.slug, "subject created");

    Ok((StatusCode::CREATED, Json(subject)))
}

/// Bulk-imports questions into a subject.
/// Admin only.
///
/// Expects `{ "questions": [...] }`. Invalid records are skipped, the rest
/// of the batch still goes in.
pub async fn import_questions(
    State(backend): State<Arc<dyn ExamBackend>>,
    Path(subject_id): Path<i64>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let records = match payload.get("questions") {
        Some(Value::Array(records)) => records.clone(),
        _ => {
            return Err(AppError::BadRequest(
                "Invalid JSON format. Expected { questions: [...] }".to_string(),
            ));
        }
    };

    backend
        .find_subject(subject_id)
        .await?
        .ok_or(AppError::NotFound("Subject not found".to_string()))?;

    let report = import_batch(backend.as_ref(), subject_id, records).await;

    Ok(Json(report))
}

/// Validates and inserts each record independently.
pub async fn import_batch(
    backend: &dyn ExamBackend,
    subject_id: i64,
    records: Vec<Value>,
) -> ImportReport {
    let mut report = ImportReport::default();

    for (position, raw) in records.into_iter().enumerate() {
        let question = match parse_record(raw) {
            Ok(question) => question,
            Err(reason) => {
                tracing::warn!(position, "Skipping invalid question: {}", reason);
                report.skipped += 1;
                continue;
            }
        };

        match backend.insert_question(subject_id, &question).await {
            Ok(_) => report.imported += 1,
            Err(e) => {
                tracing::error!(position, "Question insert failed: {}", e);
                report.skipped += 1;
            }
        }
    }

    tracing::info!(
        subject_id,
        imported = report.imported,
        skipped = report.skipped,
        "question import finished"
    );

    report
}
