// All prompt text and fixed candidate-facing messages for the interview dialogue.
// Protocol tokens come from `protocol` so the interpreter and the prompts cannot drift.

use crate::config::InterviewSettings;
use crate::interview::protocol::{
    CLARIFICATION_PREAMBLES, SENTINEL_END_PHRASE, WARNING_TAG,
};
use crate::interview::session::InterviewContext;

pub const INTERVIEWER_NAME: &str = "InterviewerBot";

pub const WARNING_MESSAGE: &str = "I noticed your last response was unprofessional. \
    Please maintain a professional demeanor. I'll re-ask the question.";

pub const TERMINATION_MESSAGE: &str = "I appreciate your time, but given the lack of \
    professional engagement, I must conclude this interview now.";

pub const GENERATION_FAILURE_MESSAGE: &str = "I'm sorry, a technical problem on my side \
    means I have to end the interview here. Thank you for your time.";

pub const FORCED_CLOSE_MESSAGE: &str = "That concludes our interview. Thank you for your time, \
    and best of luck!";

pub fn opening_greeting(candidate_name: &str) -> String {
    format!(
        "Hello {candidate_name}, thank you for joining me today. We have a short time, \
         so let's jump right into the technical discussion. How are you doing?"
    )
}

/// Fixed system instruction: context, pacing rules and the protocol the model must follow.
pub fn system_instruction(context: &InterviewContext, settings: &InterviewSettings) -> String {
    let max_primary = settings.pacing.max_primary_questions;
    let max_elaborations = settings.pacing.max_elaborations;
    let preambles = CLARIFICATION_PREAMBLES
        .iter()
        .map(|p| format!("\"{p}\""))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are {INTERVIEWER_NAME}, a professional, objective and efficient technical interviewer \
         speaking with {name}.\n\n\
         --- CONTEXT ---\n\
         Job Description: {job}\n\
         Candidate Resume: {resume}\n\
         Target role level: {level}\n\n\
         --- PACING ---\n\
         1. Ask at most {max_primary} primary technical topics.\n\
         2. Ask at most {max_elaborations} follow-up question(s) per topic.\n\
         3. If the candidate asks for repetition or gives a clear non-answer, start your reply with \
         one of {preambles} and restate the exact last question.\n\
         4. Base every question on the resume or the job description. Speak in the first person.\n\n\
         --- PROTOCOL ---\n\
         1. If the candidate's last message is abusive, profane or insulting, your ENTIRE reply \
         MUST be exactly: {WARNING_TAG}\n\
         2. When told to say goodbye, include the exact standalone phrase: {SENTINEL_END_PHRASE}",
        name = context.candidate_name,
        job = context.job_description,
        resume = context.resume_content,
        level = context.job_level,
    )
}

pub const FIRST_TOPIC_GUIDE: &str = "Analyze the candidate's LATEST message. If it is abusive, \
    output the protocol tag. Otherwise acknowledge the greeting, then move straight to the first \
    primary technical question (Question 1).";

pub fn follow_up_guide(follow_up: u32) -> String {
    format!(
        "The candidate has responded. If they asked for repetition or clarification, use one of \
         the starter phrases and repeat the last question. Otherwise ask the single required \
         follow-up question on the current topic (Elaboration Count: {follow_up}). Output the \
         warning tag if the message is abusive."
    )
}

pub fn pivot_guide(max_elaborations: u32, next_topic: u32) -> String {
    format!(
        "The current topic is complete (Max Elaborations: {max_elaborations} reached). Briefly \
         acknowledge the last answer, then pivot to a NEW primary technical question \
         (Question {next_topic}) based on the resume or job description. Output the warning tag \
         if the message is abusive."
    )
}

pub const REASK_GUIDE: &str = "The candidate has been warned. Output the exact last question \
    (or follow-up) asked before the candidate's last message. DO NOT PIVOT. DO NOT REPEAT THE \
    WARNING MESSAGE.";

pub const SOFT_CLOSE_GUIDE: &str = "The technical section is complete. Output ONLY a short, \
    non-technical wrap-up question, such as whether the candidate has any final questions.";

pub fn final_signal_guide() -> String {
    format!(
        "The candidate has replied to your wrap-up question. Reply conversationally to their \
         final statement, then output the exact standalone phrase {SENTINEL_END_PHRASE}. \
         DO NOT ASK NEW QUESTIONS."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_addresses_candidate() {
        let greeting = opening_greeting("Ada");
        assert!(greeting.starts_with("Hello Ada,"));
    }

    #[test]
    fn test_system_instruction_carries_limits_and_tokens() {
        let context = InterviewContext {
            job_description: "{\"title\":\"Rust Engineer\"}".to_string(),
            resume_content: "{\"Name\":\"Ada\"}".to_string(),
            job_level: "Senior".to_string(),
            candidate_name: "Ada".to_string(),
        };
        let mut settings = InterviewSettings::default();
        settings.pacing.max_primary_questions = 3;

        let text = system_instruction(&context, &settings);
        assert!(text.contains("at most 3 primary"));
        assert!(text.contains(WARNING_TAG));
        assert!(text.contains(SENTINEL_END_PHRASE));
        assert!(text.contains("Senior"));
        assert!(text.contains(CLARIFICATION_PREAMBLES[2]));
    }

    #[test]
    fn test_final_signal_guide_requests_sentinel() {
        assert!(final_signal_guide().contains(SENTINEL_END_PHRASE));
    }
}
