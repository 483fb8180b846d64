//! Append-only interview transcript and the bounded window the model sees.

use serde::{Deserialize, Serialize};

use crate::llm_client::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    Human,
    Ai,
    /// Audit marker written by the orchestrator. Never sent to the model.
    Protocol,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    #[serde(rename = "type")]
    pub role: TurnRole,
    pub content: String,
    pub ordinal: u32,
}

/// Records can only be appended; ordinals equal append order.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    records: Vec<TurnRecord>,
}

impl Transcript {
    pub fn push(&mut self, role: TurnRole, content: impl Into<String>) -> u32 {
        let ordinal = self.records.len() as u32;
        self.records.push(TurnRecord {
            role,
            content: content.into(),
            ordinal,
        });
        ordinal
    }

    pub fn records(&self) -> &[TurnRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// The most recent `pairs` human/ai exchanges, oldest first, in provider format.
    pub fn window(&self, pairs: usize) -> Vec<ChatMessage> {
        let messages: Vec<ChatMessage> = self
            .records
            .iter()
            .filter_map(|r| match r.role {
                TurnRole::Human => Some(ChatMessage::user(r.content.clone())),
                TurnRole::Ai => Some(ChatMessage::assistant(r.content.clone())),
                TurnRole::Protocol => None,
            })
            .collect();

        let start = messages.len().saturating_sub(pairs * 2);
        messages[start..].to_vec()
    }
}
