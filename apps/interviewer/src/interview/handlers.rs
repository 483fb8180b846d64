//! Axum route handlers for the Interview API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::assembler::GradingContext;
use crate::interview::pacing::PacingCounters;
use crate::interview::session::{DialoguePhase, InterviewContext};
use crate::interview::InterviewError;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StartInterviewRequest {
    /// Parsed job description document.
    pub job_description: Value,
    /// Parsed resume document.
    pub resume: Value,
}

#[derive(Debug, Deserialize)]
pub struct ChatTurnRequest {
    pub candidate_reply: String,
}

#[derive(Debug, Serialize)]
pub struct InterviewResponse {
    pub session_id: Uuid,
    pub message: String,
    pub is_finished: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_context: Option<GradingContext>,
}

#[derive(Debug, Serialize)]
pub struct InterviewStatusResponse {
    pub session_id: Uuid,
    pub candidate_name: String,
    pub phase: DialoguePhase,
    pub counters: PacingCounters,
    pub warning_count: u32,
    pub turns: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/interviews
///
/// Starts an interview and returns the opening greeting.
pub async fn handle_start_interview(
    State(state): State<AppState>,
    Json(request): Json<StartInterviewRequest>,
) -> Result<Json<InterviewResponse>, AppError> {
    if !request.job_description.is_object() || !request.resume.is_object() {
        return Err(AppError::Validation(
            "job_description and resume must be JSON objects".to_string(),
        ));
    }

    let context = InterviewContext::from_documents(&request.job_description, &request.resume);
    let (session_id, message) = state.sessions.create_session(context).await;

    Ok(Json(InterviewResponse {
        session_id,
        message,
        is_finished: false,
        final_context: None,
    }))
}

/// POST /api/v1/interviews/:id/chat
///
/// Submits one candidate reply. When the interview finishes, the response carries the
/// grading context and the session is gone.
pub async fn handle_chat_turn(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ChatTurnRequest>,
) -> Result<Json<InterviewResponse>, AppError> {
    let outcome = state
        .sessions
        .chat(session_id, &request.candidate_reply)
        .await?;

    Ok(Json(InterviewResponse {
        session_id,
        message: outcome.reply,
        is_finished: outcome.is_finished,
        final_context: outcome.grading_context,
    }))
}

/// GET /api/v1/interviews/:id
pub async fn handle_get_interview(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<InterviewStatusResponse>, AppError> {
    let handle = state.sessions.get_session(session_id).await?;
    let session = handle
        .try_lock()
        .map_err(|_| InterviewError::SessionBusy(session_id))?;

    Ok(Json(InterviewStatusResponse {
        session_id,
        candidate_name: session.context().candidate_name.clone(),
        phase: session.phase(),
        counters: session.counters(),
        warning_count: session.warning_count(),
        turns: session.transcript().len(),
    }))
}

/// DELETE /api/v1/interviews/:id
pub async fn handle_end_interview(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> StatusCode {
    state.sessions.destroy_session(session_id).await;
    StatusCode::NO_CONTENT
}
