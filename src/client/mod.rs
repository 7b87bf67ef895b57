mod retry;
pub mod structured;

pub use retry::retry_with_backoff;
pub use structured::{call_json, StructuredResponse};

use crate::config::{Config, RetryConfig};
use crate::error::{ClientError, ConfigError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Token usage counts reported by the provider. Fields are optional because
/// some providers omit them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

impl Usage {
    /// Field-wise sum; an absent count on either side contributes zero, and
    /// the merged field is always present.
    pub fn merge(&self, other: &Usage) -> Usage {
        fn add(a: Option<u64>, b: Option<u64>) -> Option<u64> {
            Some(a.unwrap_or(0).saturating_add(b.unwrap_or(0)))
        }
        Usage {
            prompt_tokens: add(self.prompt_tokens, other.prompt_tokens),
            completion_tokens: add(self.completion_tokens, other.completion_tokens),
            total_tokens: add(self.total_tokens, other.total_tokens),
        }
    }

    pub fn accumulate(&mut self, other: &Usage) {
        *self = self.merge(other);
    }
}

/// One chat completion call.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub json_response: bool,
}

#[derive(Debug, Clone)]
pub struct ChatOutput {
    pub content: String,
    pub usage: Usage,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatOutput, ClientError>;
}

/// OpenRouter chat completion client. Retries every failure identically
/// under the configured backoff; the final error propagates to the caller.
pub struct OpenRouterClient {
    http: Client,
    api_key: String,
    base_url: String,
    retry: RetryConfig,
}

impl OpenRouterClient {
    pub fn from_env(config: &Config) -> Result<Self, ConfigError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Self {
            http: Client::new(),
            api_key,
            base_url: config.base_url.clone(),
            retry: config.retry.clone(),
        })
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<ChatOutput, ClientError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if request.json_response {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", "http://localhost")
            .header("X-Title", "reviewlab")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: CompletionResponse = response.json().await?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or(ClientError::EmptyResponse)?;

        Ok(ChatOutput {
            content: choice.message.content.unwrap_or_default(),
            usage: completion.usage.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl ChatClient for OpenRouterClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatOutput, ClientError> {
        retry_with_backoff(&self.retry, || self.send_once(request)).await
    }
}

// OpenAI-compatible response types

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_merge_sums_fieldwise() {
        let a = Usage {
            prompt_tokens: Some(100),
            completion_tokens: Some(50),
            total_tokens: Some(150),
        };
        let b = Usage {
            prompt_tokens: Some(20),
            completion_tokens: None,
            total_tokens: Some(20),
        };

        let merged = a.merge(&b);
        assert_eq!(merged.prompt_tokens, Some(120));
        assert_eq!(merged.completion_tokens, Some(50));
        assert_eq!(merged.total_tokens, Some(170));
    }

    #[test]
    fn test_usage_merge_fills_missing() {
        let merged = Usage::default().merge(&Usage::default());
        assert_eq!(merged.prompt_tokens, Some(0));
    }

    #[test]
    fn test_message_roles_serialize_lowercase() {
        let msg = ChatMessage::system("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
    }

    #[test]
    fn test_completion_response_parses() {
        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": "{\"a\": 1}"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("{\"a\": 1}"));
        assert_eq!(parsed.usage.unwrap().total_tokens, Some(15));
    }

    #[test]
    fn test_completion_response_null_content() {
        let raw = r#"{"choices": [{"message": {"content": null}}], "usage": null}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
