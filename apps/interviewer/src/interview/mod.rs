// Live technical interview orchestrator.
// Implements: protocol tag interpretation, pacing, the per-session dialogue state machine,
// session lifecycle and the grading hand-off.
// All model calls go through the `TextGenerator` collaborator, never the HTTP client directly.

use thiserror::Error;
use uuid::Uuid;

pub mod assembler;
pub mod dialogue;
pub mod handlers;
pub mod manager;
pub mod pacing;
pub mod prompts;
pub mod protocol;
pub mod session;
pub mod transcript;

#[cfg(test)]
pub mod testing;

#[derive(Debug, Error)]
pub enum InterviewError {
    #[error("Interview session {0} not found or has expired")]
    SessionNotFound(Uuid),

    #[error("Interview session {0} is already processing a turn")]
    SessionBusy(Uuid),

    #[error("Interview session {0} has already finished")]
    SessionFinished(Uuid),

    #[error("Text generation failed: {0}")]
    GenerationFailure(String),

    #[error("Contract violation: {0}")]
    ContractViolation(String),
}
