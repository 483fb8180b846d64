//! Protocol Tag Interpreter: the only place that inspects raw model text for control signals.
//!
//! Priority order: exact misconduct tag, then the sentinel phrase anywhere in the text,
//! then a clarification preamble at the start. Everything else is plain content.

/// Embedded by the model when the interview is fully concluded. Never shown to the candidate.
pub const SENTINEL_END_PHRASE: &str = "<<END_INTERVIEW>>";
/// The model's entire reply equals this when the candidate's last message was abusive.
pub const WARNING_TAG: &str = "PROTOCOL_WARNING_UNPROFESSIONAL";
pub const TERMINATION_TAG: &str = "PROTOCOL_TERMINATE_UNPROFESSIONAL";
pub const PIVOT_TAG: &str = "PROTOCOL_PIVOT_TO_NEW_TOPIC";
pub const SOFT_CLOSE_TAG: &str = "PROTOCOL_INITIATE_SOFT_CLOSE";
pub const GENERATION_FAILURE_TAG: &str = "PROTOCOL_GENERATION_FAILURE";
pub const FORCED_CLOSE_TAG: &str = "PROTOCOL_FORCED_CLOSE";

/// Starter phrases the model must use when repeating or rephrasing the previous question.
pub const CLARIFICATION_PREAMBLES: [&str; 3] = [
    "To ensure clarity, I will repeat the question:",
    "Let me clarify that point for you:",
    "I'm happy to rephrase the question:",
];

/// Classification of one generated reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplySignal {
    /// Ordinary candidate-facing content.
    Plain(String),
    /// The candidate misbehaved; escalate instead of showing the reply.
    Misconduct,
    /// The interview is over. Holds the visible text with the sentinel removed.
    SentinelEnd(String),
    /// A restated question. Shown as-is but consumes no pacing budget.
    Clarification(String),
}

pub fn interpret(reply: &str) -> ReplySignal {
    let reply = reply.trim();

    if reply == WARNING_TAG {
        return ReplySignal::Misconduct;
    }

    if reply.contains(SENTINEL_END_PHRASE) {
        let visible = reply.replace(SENTINEL_END_PHRASE, "");
        return ReplySignal::SentinelEnd(visible.trim().to_string());
    }

    if is_clarification(reply) {
        return ReplySignal::Clarification(reply.to_string());
    }

    ReplySignal::Plain(reply.to_string())
}

pub fn is_clarification(reply: &str) -> bool {
    CLARIFICATION_PREAMBLES
        .iter()
        .any(|preamble| reply.starts_with(preamble))
}
