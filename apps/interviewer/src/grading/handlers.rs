//! Axum route handler for the Grading API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::grading::Evaluation;
use crate::interview::assembler::GradingContext;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    pub transcript_context: GradingContext,
}

#[derive(Debug, Serialize)]
pub struct GradeResponse {
    pub status: String,
    pub evaluation: Evaluation,
}

/// POST /api/v1/grading/transcript
///
/// Grades the context returned by the finishing chat turn.
pub async fn handle_grade_transcript(
    State(state): State<AppState>,
    Json(request): Json<GradeRequest>,
) -> Result<Json<GradeResponse>, AppError> {
    if request.transcript_context.transcript.is_empty() {
        return Err(AppError::Validation("transcript cannot be empty".to_string()));
    }

    let evaluation = state.grader.evaluate(&request.transcript_context).await?;

    Ok(Json(GradeResponse {
        status: "Grading Complete".to_string(),
        evaluation,
    }))
}
