// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting fragments only.

/// Appended to every system prompt that expects structured output.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Formatting rule for list fields in structured output.
pub const FLAT_LIST_INSTRUCTION: &str = "List fields MUST contain only simple strings, one per point. \
    Do NOT use nested lists, markdown bullet points, or numbering inside the strings.";
