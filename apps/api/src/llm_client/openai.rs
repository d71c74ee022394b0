//! OpenAI Chat Completions backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::prompts::RECRUITER_SYSTEM;
use super::{build_http_client, EvaluationClient, EvaluationClientError};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
/// The model used for OpenAI evaluations.
pub const OPENAI_MODEL: &str = "gpt-4-1106-preview";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Content of the first assistant-authored message that carries text.
    pub fn assistant_text(&self) -> Option<&str> {
        self.choices
            .iter()
            .map(|c| &c.message)
            .filter(|m| m.role == "assistant")
            .find_map(|m| m.content.as_deref().filter(|s| !s.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Result<Self, EvaluationClientError> {
        Ok(Self {
            client: build_http_client()?,
            api_key,
        })
    }
}

#[async_trait]
impl EvaluationClient for OpenAiClient {
    async fn evaluate(&self, prompt: &str) -> Result<String, EvaluationClientError> {
        let request = ChatRequest {
            model: OPENAI_MODEL,
            messages: [
                ChatMessage {
                    role: "system",
                    content: RECRUITER_SYSTEM,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!(status = status.as_u16(), "OpenAI API returned an error: {message}");
            return Err(EvaluationClientError::ModelUnavailable(format!(
                "status {}: {message}",
                status.as_u16()
            )));
        }

        let body: ChatCompletionResponse = response.json().await?;
        debug!(choices = body.choices.len(), "OpenAI evaluation call succeeded");

        body.assistant_text()
            .map(str::to_owned)
            .ok_or(EvaluationClientError::NoResponse)
    }

    fn model(&self) -> &str {
        OPENAI_MODEL
    }
}
