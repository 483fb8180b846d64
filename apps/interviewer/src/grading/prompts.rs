// Prompt builders for the two grading passes.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::{FLAT_LIST_INSTRUCTION, JSON_ONLY_INSTRUCTION};

const VAGUENESS_PENALTY: &str = "Deduct points when an answer is vague, relies on buzzwords \
    without concrete examples, or avoids technical detail when asked for it.";

const EVALUATION_SCHEMA: &str = r#"Return a JSON object with this EXACT schema:
{
  "overall_score": 75,
  "strengths": ["one strength per string"],
  "weaknesses": ["one weakness per string"],
  "hiring_recommendation": "Strong Hire | Proceed with Caution | No Hire"
}
overall_score is an integer from 0 to 100."#;

/// System prompt for the initial scorer.
pub fn scorer_system(job_level: &str) -> String {
    format!(
        "AGENT ROLE: Initial Scorer.\n\
         You assess a technical interview transcript for a {job_level} role. Your first priority \
         is the candidate's mentality and approach to problem solving; weigh potential and \
         curiosity, and deduct only for clear errors or missing knowledge the role requires.\n\
         {VAGUENESS_PENALTY}\n\
         Consider technical depth against the {job_level} target, problem-solving approach and \
         communication.\n\n\
         {EVALUATION_SCHEMA}\n\
         {FLAT_LIST_INSTRUCTION}\n\
         {JSON_ONLY_INSTRUCTION}"
    )
}

/// System prompt for the challenger, which reviews the initial verdict.
pub fn challenger_system(job_level: &str, initial_json: &str) -> String {
    format!(
        "AGENT ROLE: Challenger.\n\
         You critically review another grader's verdict on a technical interview for a \
         {job_level} role.\n\
         Initial verdict: {initial_json}\n\
         Challenge it where you find bias, missing context or flawed logic, in particular if it \
         was not strict enough on vagueness. Then give your own independent verdict.\n\
         {VAGUENESS_PENALTY}\n\n\
         {EVALUATION_SCHEMA}\n\
         {FLAT_LIST_INSTRUCTION}\n\
         {JSON_ONLY_INSTRUCTION}"
    )
}
