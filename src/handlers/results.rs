// src/handlers/results.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    error::AppError,
    exam::results::{ResultView, load_results},
    models::identity::Identity,
    state::AppState,
};

/// Per-question review of a finished attempt.
pub async fn get_result(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(attempt_id): Path<i64>,
) -> Result<Json<ResultView>, AppError> {
    let view = load_results(state.backend.as_ref(), &state.results, &identity, attempt_id).await?;
    Ok(Json(view))
}
