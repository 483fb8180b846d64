use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::interview::pacing::PacingLimits;
use crate::llm_client::DEFAULT_MODEL;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub groq_api_keys: Vec<String>,
    pub groq_model: String,
    pub port: u16,
    pub rust_log: String,
    pub interview: InterviewSettings,
}

/// Per-interview knobs, handed to the session manager at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct InterviewSettings {
    pub pacing: PacingLimits,
    /// Warnings tolerated before the next misconduct terminates the session.
    pub max_warnings: u32,
    /// Message pairs of history sent with each generation call.
    pub memory_window: usize,
    /// Soft-close replies tolerated without the sentinel before forcing the close. At least 1.
    pub max_soft_close_exchanges: u32,
    pub generation_timeout: Duration,
    pub session_idle_timeout: Duration,
}

impl Default for InterviewSettings {
    fn default() -> Self {
        Self {
            pacing: PacingLimits::default(),
            max_warnings: 1,
            memory_window: 8,
            max_soft_close_exchanges: 2,
            generation_timeout: Duration::from_secs(60),
            session_idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl InterviewSettings {
    /// Rejects settings the dialogue cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.max_soft_close_exchanges == 0 {
            bail!("INTERVIEW_MAX_SOFT_CLOSE_EXCHANGES must be at least 1");
        }
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let groq_api_keys = match std::env::var("GROQ_API_KEYS") {
            Ok(raw) => parse_api_keys(&raw),
            Err(_) => std::env::var("GROQ_API_KEY")
                .map(|k| parse_api_keys(&k))
                .unwrap_or_default(),
        };
        if groq_api_keys.is_empty() {
            bail!("Required environment variable 'GROQ_API_KEYS' or 'GROQ_API_KEY' is not set");
        }

        let defaults = InterviewSettings::default();
        let interview = InterviewSettings {
            pacing: PacingLimits {
                max_primary_questions: env_or(
                    "INTERVIEW_MAX_PRIMARY_QUESTIONS",
                    defaults.pacing.max_primary_questions,
                )?,
                max_elaborations: env_or(
                    "INTERVIEW_MAX_ELABORATIONS",
                    defaults.pacing.max_elaborations,
                )?,
            },
            max_warnings: env_or("INTERVIEW_MAX_WARNINGS", defaults.max_warnings)?,
            memory_window: env_or("INTERVIEW_MEMORY_WINDOW", defaults.memory_window)?,
            max_soft_close_exchanges: env_or(
                "INTERVIEW_MAX_SOFT_CLOSE_EXCHANGES",
                defaults.max_soft_close_exchanges,
            )?,
            generation_timeout: Duration::from_secs(env_or(
                "INTERVIEW_GENERATION_TIMEOUT_SECS",
                defaults.generation_timeout.as_secs(),
            )?),
            session_idle_timeout: Duration::from_secs(env_or(
                "INTERVIEW_SESSION_IDLE_SECS",
                defaults.session_idle_timeout.as_secs(),
            )?),
        };
        interview.validate()?;

        Ok(Config {
            groq_api_keys,
            groq_model: std::env::var("GROQ_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            interview,
        })
    }
}

/// Accepts either a JSON array of keys or a single raw key.
fn parse_api_keys(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    let keys = match serde_json::from_str::<Vec<String>>(raw) {
        Ok(keys) => keys,
        Err(_) => vec![raw.to_string()],
    };
    keys.into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
