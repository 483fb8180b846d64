//! Test doubles for the text generation collaborator.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::config::InterviewSettings;
use crate::interview::session::{InterviewContext, InterviewSession};
use crate::llm_client::{ChatMessage, LlmError, TextGenerator};

/// Replays queued replies in order and records every call it receives.
/// An exhausted queue answers with `LlmError::EmptyContent`.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    guides: Mutex<Vec<String>>,
    histories: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedGenerator {
    pub fn new<'a>(replies: impl IntoIterator<Item = &'a str>) -> Self {
        Self::with_results(replies.into_iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn with_results(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    pub fn guides(&self) -> Vec<String> {
        self.guides.lock().unwrap().clone()
    }

    pub fn histories(&self) -> Vec<Vec<ChatMessage>> {
        self.histories.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.guides.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        _system: &str,
        history: &[ChatMessage],
        action_guide: &str,
    ) -> Result<String, LlmError> {
        self.guides.lock().unwrap().push(action_guide.to_string());
        self.histories.lock().unwrap().push(history.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }
}

/// Never answers. Used to exercise the generation timeout.
pub struct HangingGenerator;

#[async_trait]
impl TextGenerator for HangingGenerator {
    async fn generate(
        &self,
        _system: &str,
        _history: &[ChatMessage],
        _action_guide: &str,
    ) -> Result<String, LlmError> {
        std::future::pending().await
    }
}

pub fn test_context() -> InterviewContext {
    InterviewContext::from_documents(
        &json!({"title": "Rust Engineer", "experience_required": {"level": "Mid"}}),
        &json!({"Name": "Ada", "skills": ["Rust", "Tokio"]}),
    )
}

pub fn new_session(settings: InterviewSettings) -> InterviewSession {
    InterviewSession::new(Uuid::new_v4(), test_context(), settings)
}
