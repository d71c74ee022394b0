/// LLM Client — the single point of entry for model backend calls.
///
/// ARCHITECTURAL RULE: the screening pipeline only ever talks to a backend through
/// the `EvaluationClient` trait. Concrete HTTP clients live in this module.
///
/// Model identity is hardcoded per backend (do not make configurable to prevent drift).
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod openai;
pub mod prompts;

pub use openai::OpenAiClient;

use prompts::RECRUITER_SYSTEM;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for Anthropic evaluations.
pub const ANTHROPIC_MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 2048;
/// Transport-level ceiling. The orchestrator enforces its own, usually shorter, deadline.
const HTTP_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum EvaluationClientError {
    /// Transport failure, auth failure, non-success status or an unreadable body.
    #[error("Model backend unavailable: {0}")]
    ModelUnavailable(String),

    /// The backend answered but no assistant-authored text came back.
    #[error("Model backend returned no assistant message")]
    NoResponse,
}

impl From<reqwest::Error> for EvaluationClientError {
    fn from(e: reqwest::Error) -> Self {
        EvaluationClientError::ModelUnavailable(e.to_string())
    }
}

/// Capability seam for model backends: one prompt in, one assistant turn out.
///
/// Implementations must not retry on their own and must not stream.
#[async_trait]
pub trait EvaluationClient: Send + Sync {
    async fn evaluate(&self, prompt: &str) -> Result<String, EvaluationClientError>;

    /// Model identifier, for logs.
    fn model(&self) -> &str;
}

pub(crate) fn build_http_client() -> Result<Client, EvaluationClientError> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .map_err(EvaluationClientError::from)
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    #[serde(default = "assistant_role")]
    pub role: String,
    pub content: Vec<ContentBlock>,
    pub usage: Option<Usage>,
}

fn assistant_role() -> String {
    "assistant".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl AnthropicResponse {
    /// Concatenated text of the assistant turn, or `None` if it carried no text.
    pub fn assistant_text(&self) -> Option<String> {
        if self.role != "assistant" {
            return None;
        }
        let text: String = self
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Anthropic Messages API backend.
#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(api_key: String) -> Result<Self, EvaluationClientError> {
        Ok(Self {
            client: build_http_client()?,
            api_key,
        })
    }
}

#[async_trait]
impl EvaluationClient for AnthropicClient {
    async fn evaluate(&self, prompt: &str) -> Result<String, EvaluationClientError> {
        let request_body = AnthropicRequest {
            model: ANTHROPIC_MODEL,
            max_tokens: MAX_TOKENS,
            system: RECRUITER_SYSTEM,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!(status = status.as_u16(), "Anthropic API returned an error: {message}");
            return Err(EvaluationClientError::ModelUnavailable(format!(
                "status {}: {message}",
                status.as_u16()
            )));
        }

        let body: AnthropicResponse = response.json().await?;
        if let Some(usage) = &body.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Anthropic evaluation call succeeded"
            );
        }

        body.assistant_text().ok_or(EvaluationClientError::NoResponse)
    }

    fn model(&self) -> &str {
        ANTHROPIC_MODEL
    }
}
