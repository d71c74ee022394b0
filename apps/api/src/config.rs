use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Which model backend answers evaluation prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Anthropic,
    OpenAi,
}

impl LlmProvider {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(LlmProvider::Anthropic),
            "openai" => Ok(LlmProvider::OpenAi),
            other => bail!("LLM_PROVIDER must be 'anthropic' or 'openai', got '{other}'"),
        }
    }

    fn key_var(self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
            LlmProvider::OpenAi => "OPENAI_API_KEY",
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if the API key for the selected provider is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_provider: LlmProvider,
    /// Only checked for presence. A wrong key surfaces as `ModelUnavailable`
    /// on the first evaluation.
    pub llm_api_key: String,
    pub evaluation_timeout: Duration,
    /// Sessions untouched this long are dropped from memory.
    pub session_idle_ttl: Duration,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let llm_provider =
            LlmProvider::parse(&std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "anthropic".into()))?;

        Ok(Config {
            llm_provider,
            llm_api_key: require_env(llm_provider.key_var())?,
            evaluation_timeout: Duration::from_secs(
                std::env::var("EVALUATION_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse::<u64>()
                    .context("EVALUATION_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            session_idle_ttl: Duration::from_secs(
                std::env::var("SESSION_IDLE_TTL_SECS")
                    .unwrap_or_else(|_| "1800".to_string())
                    .parse::<u64>()
                    .context("SESSION_IDLE_TTL_SECS must be a whole number of seconds")?,
            ),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| (10 * 1024 * 1024).to_string())
                .parse::<usize>()
                .context("MAX_UPLOAD_BYTES must be a byte count")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    let value =
        std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))?;
    if value.trim().is_empty() {
        bail!("Required environment variable '{key}' is empty");
    }
    Ok(value)
}
