//! Grading: pluggable, trait-based evaluation of a finished interview.
//!
//! Default: `ConsensusGrader` (two LLM passes, an initial scorer and a skeptical challenger,
//! reconciled by `reach_consensus`).
//!
//! `AppState` holds an `Arc<dyn Grader>`, swapped in tests for a stub.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::grading::prompts::{challenger_system, scorer_system};
use crate::interview::assembler::GradingContext;
use crate::interview::transcript::TurnRole;
use crate::llm_client::{LlmClient, GRADING_TEMPERATURE};

pub mod handlers;
pub mod prompts;

/// Consensus at or above this score is a hire.
pub const PASSING_THRESHOLD: u32 = 70;
/// Consensus at or above this score (and below passing) proceeds with caution.
pub const CAUTION_THRESHOLD: u32 = 55;

/// Structured verdict returned by each grading pass and by the consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub overall_score: u32, // 0 – 100
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub hiring_recommendation: String,
}

/// The grading collaborator. Invoked once per finished interview.
#[async_trait]
pub trait Grader: Send + Sync {
    async fn evaluate(&self, context: &GradingContext) -> Result<Evaluation, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// ConsensusGrader: default implementation
// ────────────────────────────────────────────────────────────────────────────

pub struct ConsensusGrader(pub LlmClient);

#[async_trait]
impl Grader for ConsensusGrader {
    async fn evaluate(&self, context: &GradingContext) -> Result<Evaluation, AppError> {
        let transcript = render_grading_input(context);

        let initial: Evaluation = self
            .0
            .call_json(
                &scorer_system(&context.job_level),
                &transcript,
                GRADING_TEMPERATURE,
            )
            .await
            .map_err(|e| AppError::Llm(format!("Initial scoring failed: {e}")))?;

        let initial_json = serde_json::to_string(&initial)
            .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;

        let challenger: Evaluation = self
            .0
            .call_json(
                &challenger_system(&context.job_level, &initial_json),
                &transcript,
                GRADING_TEMPERATURE,
            )
            .await
            .map_err(|e| AppError::Llm(format!("Challenger scoring failed: {e}")))?;

        let consensus = reach_consensus(&initial, challenger);
        info!(
            "Grading complete for {}: initial={}, consensus={} ({})",
            context.candidate_name,
            initial.overall_score.min(100),
            consensus.overall_score,
            consensus.hiring_recommendation
        );
        Ok(consensus)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Consensus arithmetic
// ────────────────────────────────────────────────────────────────────────────

/// Averages both scores and replaces the recommendation by the threshold verdict.
/// Strengths and weaknesses come from the challenger's review.
pub fn reach_consensus(initial: &Evaluation, challenger: Evaluation) -> Evaluation {
    let a = initial.overall_score.min(100);
    let b = challenger.overall_score.min(100);
    let overall_score = average_half_even(a, b);

    Evaluation {
        overall_score,
        hiring_recommendation: recommendation_for(overall_score).to_string(),
        ..challenger
    }
}

/// Mean of two scores, ties rounded to the even neighbour.
fn average_half_even(a: u32, b: u32) -> u32 {
    let sum = a + b;
    let half = sum / 2;
    if sum % 2 == 1 && half % 2 == 1 {
        half + 1
    } else {
        half
    }
}

pub fn recommendation_for(score: u32) -> &'static str {
    if score >= PASSING_THRESHOLD {
        "Strong Hire (Exceeded Threshold)"
    } else if score >= CAUTION_THRESHOLD {
        "Proceed with Caution (Meets Potential)"
    } else {
        "No Hire (Fails Minimum Criteria)"
    }
}

/// Job/candidate context followed by the human/ai turns. Protocol markers are dropped.
fn render_grading_input(context: &GradingContext) -> String {
    let mut out = format!(
        "--- JOB AND CANDIDATE CONTEXT ---\n\
         Job Level: {}\n\
         Job Description: {}\n\
         Candidate Resume: {}\n\
         --- CONVERSATION TRANSCRIPT ---\n",
        context.job_level, context.job_description, context.resume_content
    );

    for turn in &context.transcript {
        let speaker = match turn.role {
            TurnRole::Human => "Candidate",
            TurnRole::Ai => "Interviewer",
            TurnRole::Protocol => continue,
        };
        out.push_str(speaker);
        out.push_str(": ");
        out.push_str(&turn.content);
        out.push('\n');
    }

    out.push_str("--- END TRANSCRIPT ---");
    out
}
