use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{Config, Provider};

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("no API key configured (set OPENAI_API_KEY or `api_key` in the config file)")]
    MissingApiKey,

    #[error(transparent)]
    Http(#[from] ureq::Error),

    #[error("no choices in response")]
    NoChoices,

    #[error("no content in response")]
    EmptyContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user",
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

impl ChatCompletionResponse {
    fn into_content(self) -> Result<String, CompletionError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or(CompletionError::NoChoices)?;
        choice.message.content.ok_or(CompletionError::EmptyContent)
    }
}

/// Anything that can turn a chat request into the model's reply text.
pub trait CompletionBackend {
    fn complete(&self, request: &ChatRequest) -> Result<String, CompletionError>;
}

/// Blocking chat-completions client for OpenAI or an Azure OpenAI deployment.
pub struct HttpClient {
    agent: ureq::Agent,
    config: Config,
}

impl HttpClient {
    pub fn new(config: Config) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();
        HttpClient { agent, config }
    }

    fn endpoint(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        match self.config.provider {
            Provider::OpenAI => format!("{base}/chat/completions"),
            Provider::Azure => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                base,
                self.config.deployment.as_deref().unwrap_or_default(),
                self.config.api_version
            ),
        }
    }

    fn payload(&self, request: &ChatRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        // Azure picks the model from the deployment in the URL.
        if self.config.provider == Provider::OpenAI {
            body["model"] = serde_json::Value::from(self.config.model.as_str());
        }
        body
    }
}

impl CompletionBackend for HttpClient {
    fn complete(&self, request: &ChatRequest) -> Result<String, CompletionError> {
        let api_key = match self.config.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => key,
            _ => return Err(CompletionError::MissingApiKey),
        };

        let url = self.endpoint();
        tracing::debug!(%url, max_tokens = request.max_tokens, "sending chat completion");

        let post = self.agent.post(&url).header("Content-Type", "application/json");
        let post = match self.config.provider {
            Provider::OpenAI => post.header("Authorization", &format!("Bearer {api_key}")),
            Provider::Azure => post.header("api-key", api_key),
        };

        let response: ChatCompletionResponse = post
            .send_json(self.payload(request))?
            .body_mut()
            .read_json()?;

        response.into_content()
    }
}
