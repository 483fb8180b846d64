//! Pacing Policy: pure decision of what the next ordinary turn should do.
//!
//! Soft close is decided by the dialogue before consulting this policy, so
//! `select_guide` is only ever called while `primary_question_count < max_primary_questions`.

use serde::{Deserialize, Serialize};

use crate::interview::prompts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingLimits {
    pub max_primary_questions: u32,
    /// Hard cap on follow-ups per primary topic.
    pub max_elaborations: u32,
}

impl Default for PacingLimits {
    fn default() -> Self {
        Self {
            max_primary_questions: 5,
            max_elaborations: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PacingCounters {
    pub primary_question_count: u32,
    /// Follow-ups asked on the current topic. Reset on every pivot.
    pub elaboration_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionGuide {
    /// Acknowledge the greeting and ask primary topic 1.
    FirstTopic,
    /// Ask follow-up number `follow_up` (1-based) on the current topic.
    AskFollowUp { follow_up: u32 },
    /// Close the current topic and ask primary topic `next_topic`.
    PivotNewTopic { next_topic: u32 },
}

impl ActionGuide {
    /// The instruction handed to the text generator for this turn.
    pub fn instruction(&self, limits: &PacingLimits) -> String {
        match *self {
            ActionGuide::FirstTopic => prompts::FIRST_TOPIC_GUIDE.to_string(),
            ActionGuide::AskFollowUp { follow_up } => prompts::follow_up_guide(follow_up),
            ActionGuide::PivotNewTopic { next_topic } => {
                prompts::pivot_guide(limits.max_elaborations, next_topic)
            }
        }
    }
}

pub fn select_guide(counters: &PacingCounters, limits: &PacingLimits) -> ActionGuide {
    if counters.primary_question_count == 0 {
        ActionGuide::FirstTopic
    } else if counters.elaboration_count < limits.max_elaborations {
        ActionGuide::AskFollowUp {
            follow_up: counters.elaboration_count + 1,
        }
    } else {
        ActionGuide::PivotNewTopic {
            next_topic: counters.primary_question_count + 1,
        }
    }
}

impl PacingCounters {
    pub fn topics_exhausted(&self, limits: &PacingLimits) -> bool {
        self.primary_question_count >= limits.max_primary_questions
    }

    /// Applies the guide that produced a non-clarification reply.
    pub fn advance(&mut self, guide: ActionGuide, limits: &PacingLimits) {
        match guide {
            ActionGuide::FirstTopic => {
                self.primary_question_count = 1;
                self.elaboration_count = 0;
            }
            ActionGuide::PivotNewTopic { .. } => {
                self.primary_question_count =
                    (self.primary_question_count + 1).min(limits.max_primary_questions);
                self.elaboration_count = 0;
            }
            ActionGuide::AskFollowUp { .. } => {
                self.elaboration_count =
                    (self.elaboration_count + 1).min(limits.max_elaborations);
            }
        }
    }
}
