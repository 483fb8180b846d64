//! Transcript Assembler: freezes a finished session into the grading hand-off.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interview::session::InterviewSession;
use crate::interview::transcript::TurnRecord;
use crate::interview::InterviewError;

/// The sole input of the grading collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingContext {
    pub timestamp: DateTime<Utc>,
    pub job_level: String,
    pub candidate_name: String,
    pub job_description: String,
    pub resume_content: String,
    pub transcript: Vec<TurnRecord>,
}

/// Rejects unfinished sessions: their transcript is still growing.
pub fn assemble_grading_context(
    session: &InterviewSession,
) -> Result<GradingContext, InterviewError> {
    if !session.is_finished() {
        return Err(InterviewError::ContractViolation(format!(
            "grading context requested for unfinished session {}",
            session.id()
        )));
    }

    let context = session.context();
    Ok(GradingContext {
        timestamp: Utc::now(),
        job_level: context.job_level.clone(),
        candidate_name: context.candidate_name.clone(),
        job_description: context.job_description.clone(),
        resume_content: context.resume_content.clone(),
        transcript: session.transcript().records().to_vec(),
    })
}
