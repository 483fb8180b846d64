use std::sync::Arc;

use crate::config::Config;
use crate::grading::Grader;
use crate::interview::manager::SessionManager;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Live interview sessions. Owns the text generator every session talks to.
    pub sessions: Arc<SessionManager>,
    /// Pluggable grader. Default: ConsensusGrader.
    pub grader: Arc<dyn Grader>,
    pub config: Config,
}
