//! Session Manager: owns every live interview.
//!
//! The map is the only state shared across sessions. Each session sits behind its own
//! async mutex; a turn holds it for the whole turn, and a second concurrent turn for the
//! same id is rejected with `SessionBusy` rather than queued.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::InterviewSettings;
use crate::interview::assembler::{assemble_grading_context, GradingContext};
use crate::interview::session::{InterviewContext, InterviewSession};
use crate::interview::InterviewError;
use crate::llm_client::TextGenerator;

pub type SessionHandle = Arc<Mutex<InterviewSession>>;

/// Result of one *chat* call at the transport boundary.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub reply: String,
    pub is_finished: bool,
    /// Present exactly when the turn finished the interview.
    pub grading_context: Option<GradingContext>,
}

pub struct SessionManager {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
    generator: Arc<dyn TextGenerator>,
    settings: InterviewSettings,
}

impl SessionManager {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: InterviewSettings) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            generator,
            settings,
        }
    }

    /// Starts an interview. Returns the new id and the opening greeting.
    pub async fn create_session(&self, context: InterviewContext) -> (Uuid, String) {
        let id = Uuid::new_v4();
        let session = InterviewSession::new(id, context, self.settings.clone());
        let opening = session.opening_message().to_string();

        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));

        info!(session_id = %id, "Interview session created");
        (id, opening)
    }

    pub async fn get_session(&self, id: Uuid) -> Result<SessionHandle, InterviewError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(InterviewError::SessionNotFound(id))
    }

    /// Idempotent.
    pub async fn destroy_session(&self, id: Uuid) {
        if self.sessions.write().await.remove(&id).is_some() {
            info!(session_id = %id, "Interview session destroyed");
        }
    }

    pub async fn live_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Processes one candidate turn. A finishing turn assembles the grading
    /// context and tears the session down.
    pub async fn chat(&self, id: Uuid, candidate_reply: &str) -> Result<ChatOutcome, InterviewError> {
        let handle = self.get_session(id).await?;
        let mut session = handle
            .try_lock()
            .map_err(|_| InterviewError::SessionBusy(id))?;

        let outcome = session
            .process_turn(self.generator.as_ref(), candidate_reply)
            .await?;

        let grading_context = if outcome.is_finished {
            Some(assemble_grading_context(&session)?)
        } else {
            None
        };
        drop(session);

        if outcome.is_finished {
            self.destroy_session(id).await;
        }

        Ok(ChatOutcome {
            reply: outcome.reply,
            is_finished: outcome.is_finished,
            grading_context,
        })
    }

    /// Drops sessions idle for longer than the configured timeout.
    /// Sessions in the middle of a turn are always kept.
    pub async fn evict_idle(&self) -> usize {
        let ttl = self.settings.session_idle_timeout;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, handle| match handle.try_lock() {
            Ok(session) if session.idle_for() >= ttl => {
                info!(session_id = %id, "Evicting idle interview session");
                false
            }
            _ => true,
        });

        before - sessions.len()
    }

    /// Runs `evict_idle` every `period` until the returned task is aborted.
    pub fn spawn_eviction_sweeper(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let evicted = self.evict_idle().await;
                if evicted > 0 {
                    debug!(evicted, "Idle session sweep complete");
                }
            }
        })
    }
}
