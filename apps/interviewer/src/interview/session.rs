//! InterviewSession: per-candidate state owned by the session manager.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::InterviewSettings;
use crate::interview::pacing::PacingCounters;
use crate::interview::prompts;
use crate::interview::transcript::{Transcript, TurnRole};

const DEFAULT_JOB_LEVEL: &str = "General";
const DEFAULT_CANDIDATE_NAME: &str = "Candidate";

/// Immutable job/candidate context captured when the interview starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewContext {
    pub job_description: String,
    pub resume_content: String,
    pub job_level: String,
    pub candidate_name: String,
}

impl InterviewContext {
    /// Builds the context from parsed job and resume documents.
    /// Level comes from `experience_required.level`, the name from `Name` (or `name`).
    pub fn from_documents(job: &Value, resume: &Value) -> Self {
        let job_level = job
            .get("experience_required")
            .and_then(|e| e.get("level"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_JOB_LEVEL);

        let candidate_name = resume
            .get("Name")
            .or_else(|| resume.get("name"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_CANDIDATE_NAME);

        Self {
            job_description: pretty_json(job),
            resume_content: pretty_json(resume),
            job_level: job_level.to_string(),
            candidate_name: candidate_name.to_string(),
        }
    }
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Where the dialogue currently stands. Derived from the counters, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DialoguePhase {
    Greeting,
    Primary { topic: u32 },
    Elaboration { topic: u32, follow_up: u32 },
    SoftClose,
    Finished,
}

#[derive(Debug)]
pub struct InterviewSession {
    pub(crate) id: Uuid,
    pub(crate) context: InterviewContext,
    pub(crate) settings: InterviewSettings,
    pub(crate) counters: PacingCounters,
    pub(crate) warning_count: u32,
    pub(crate) soft_close_exchanges: u32,
    pub(crate) is_in_soft_close: bool,
    pub(crate) is_finished: bool,
    pub(crate) transcript: Transcript,
    pub(crate) last_activity: Instant,
}

impl InterviewSession {
    /// Creates a session whose transcript is seeded with the opening greeting.
    pub fn new(id: Uuid, context: InterviewContext, settings: InterviewSettings) -> Self {
        let mut transcript = Transcript::default();
        transcript.push(
            TurnRole::Ai,
            prompts::opening_greeting(&context.candidate_name),
        );

        Self {
            id,
            context,
            settings,
            counters: PacingCounters::default(),
            warning_count: 0,
            soft_close_exchanges: 0,
            is_in_soft_close: false,
            is_finished: false,
            transcript,
            last_activity: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn context(&self) -> &InterviewContext {
        &self.context
    }

    pub fn counters(&self) -> PacingCounters {
        self.counters
    }

    pub fn warning_count(&self) -> u32 {
        self.warning_count
    }

    pub fn is_in_soft_close(&self) -> bool {
        self.is_in_soft_close
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn opening_message(&self) -> &str {
        self.transcript
            .records()
            .first()
            .map(|r| r.content.as_str())
            .unwrap_or_default()
    }

    pub fn idle_for(&self) -> std::time::Duration {
        self.last_activity.elapsed()
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn phase(&self) -> DialoguePhase {
        if self.is_finished {
            DialoguePhase::Finished
        } else if self.is_in_soft_close {
            DialoguePhase::SoftClose
        } else if self.counters.primary_question_count == 0 {
            DialoguePhase::Greeting
        } else if self.counters.elaboration_count == 0 {
            DialoguePhase::Primary {
                topic: self.counters.primary_question_count,
            }
        } else {
            DialoguePhase::Elaboration {
                topic: self.counters.primary_question_count,
                follow_up: self.counters.elaboration_count,
            }
        }
    }
}
