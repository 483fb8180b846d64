/// LLM Client: the single point of entry for all chat-completion calls in the interviewer.
///
/// ARCHITECTURAL RULE: No other module may call the provider API directly.
/// The interview orchestrator reaches the model only through the `TextGenerator` trait,
/// which `LlmClient` implements; grading uses the JSON helpers below.
///
/// Provider: Groq's OpenAI-compatible chat-completions endpoint.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
/// Default model when `GROQ_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "moonshotai/kimi-k2-instruct-0905";
/// Sampling temperature for the live interview dialogue.
pub const DIALOGUE_TEMPERATURE: f32 = 0.7;
/// Sampling temperature for grading passes. Deterministic structured output.
pub const GRADING_TEMPERATURE: f32 = 0.0;
const MAX_TOKENS: u32 = 2048;
const MAX_RETRIES: u32 = 3;
const HTTP_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("No API key configured")]
    MissingApiKey,
}

/// Speaker of a chat message in provider wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatCompletionResponse {
    /// Extracts the text of the first choice, if the model produced any.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// The collaborator the interview orchestrator talks to.
///
/// One call is one round trip: implementations must not retry internally,
/// the orchestrator treats any error as fatal for the session.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        system: &str,
        history: &[ChatMessage],
        action_guide: &str,
    ) -> Result<String, LlmError>;
}

/// The single LLM client used by all services.
/// Holds one or more API keys and rotates to the next key when the provider
/// reports the current one as rate limited or rejected.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_keys: Arc<Vec<String>>,
    key_index: Arc<AtomicUsize>,
    model: String,
}

impl LlmClient {
    pub fn new(api_keys: Vec<String>, model: String) -> Result<Self, LlmError> {
        if api_keys.is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_keys: Arc::new(api_keys),
            key_index: Arc::new(AtomicUsize::new(0)),
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn current_key(&self) -> &str {
        let idx = self.key_index.load(Ordering::Relaxed) % self.api_keys.len();
        &self.api_keys[idx]
    }

    /// Advances to the next configured key. No-op with a single key.
    fn rotate_key(&self) {
        if self.api_keys.len() > 1 {
            let next = self.key_index.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                "Rotating to API key #{} of {}",
                next % self.api_keys.len() + 1,
                self.api_keys.len()
            );
        }
    }

    /// A single HTTP round trip. Classifies non-success statuses into `LlmError::Api`.
    async fn send(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let request_body = ChatCompletionRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature,
            messages,
        };

        let response = self
            .client
            .post(GROQ_API_URL)
            .bearer_auth(self.current_key())
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ProviderError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            if status.as_u16() == 429 || status.as_u16() == 401 {
                self.rotate_key();
            }
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;

        if let Some(usage) = &completion.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(completion)
    }

    /// Calls the model with a system prompt and message list.
    /// Retries transport errors, 429 and 5xx with exponential backoff.
    pub async fn call(
        &self,
        system: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let mut full = Vec::with_capacity(messages.len() + 1);
        full.push(ChatMessage::system(system));
        full.extend_from_slice(messages);

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self.send(&full, temperature).await {
                Ok(completion) => return Ok(completion),
                Err(e) if is_retryable(&e) => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    /// Calls the model and deserializes the text response as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        system: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<T, LlmError> {
        let response = self
            .call(system, &[ChatMessage::user(prompt)], temperature)
            .await?;

        let text = response.text().ok_or(LlmError::EmptyContent)?;

        serde_json::from_str(strip_json_fences(text)).map_err(LlmError::Parse)
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(
        &self,
        system: &str,
        history: &[ChatMessage],
        action_guide: &str,
    ) -> Result<String, LlmError> {
        let messages = assemble_dialogue_messages(system, history, action_guide);
        let response = self.send(&messages, DIALOGUE_TEMPERATURE).await?;
        response
            .text()
            .map(|t| t.trim().to_string())
            .ok_or(LlmError::EmptyContent)
    }
}

/// System instruction first, then the conversation window, then the action guide
/// as the newest user message.
fn assemble_dialogue_messages(
    system: &str,
    history: &[ChatMessage],
    action_guide: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system));
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(action_guide));
    messages
}

fn is_retryable(error: &LlmError) -> bool {
    match error {
        LlmError::Http(_) => true,
        LlmError::Api { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(str::trim)
                .unwrap_or(stripped)
        }
        None => text,
    }
}
