//! Model clients for the boss and intern roles.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AiConfig;

/// Connection timeout for HTTP requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall request timeout for HTTP requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Maximum number of retries for transient failures.
const MAX_RETRIES: u32 = 3;

/// Build an HTTP client with proper timeout configuration.
fn build_http_client() -> Client {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            Client::new()
        })
}

/// Determine if a request should be retried based on status code and attempt count.
fn should_retry(status_code: u16, attempt: u32) -> bool {
    if attempt >= MAX_RETRIES {
        return false;
    }
    // Retry on 5xx server errors
    (500..600).contains(&status_code)
}

/// Calculate exponential backoff duration for retry attempts.
fn calculate_backoff(attempt: u32) -> Duration {
    // Exponential backoff: 1s, 2s, 4s
    Duration::from_secs(1 << attempt)
}

/// Errors from model client operations.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("API key not configured (env: {0})")]
    MissingApiKey(String),
    #[error("API request failed: {0}")]
    RequestFailed(String),
    #[error("Failed to parse response: {0}")]
    ParseError(String),
    #[error("Model request timed out")]
    Timeout,
}

/// Speaker of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation history passed to a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Capability to turn a role prompt plus history into generated text.
///
/// This is the only non-deterministic, externally latent operation the
/// delegation loop performs.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Generate a response for the given role prompt and history.
    async fn generate(&self, role_prompt: &str, history: &[Message]) -> Result<String, AiError>;
}

fn map_send_error(e: &reqwest::Error) -> AiError {
    if e.is_timeout() {
        AiError::Timeout
    } else {
        AiError::RequestFailed(e.to_string())
    }
}

/// Sampling parameters for one role.
#[derive(Debug, Clone, Copy)]
pub struct Sampling {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Send a JSON request, retrying 5xx responses, and return the decoded body.
async fn post_json(request: reqwest::RequestBuilder) -> Result<serde_json::Value, AiError> {
    let mut attempt = 0;
    loop {
        let builder = request
            .try_clone()
            .ok_or_else(|| AiError::RequestFailed("request body is not cloneable".to_string()))?;
        let response = builder.send().await.map_err(|e| map_send_error(&e))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| AiError::ParseError(e.to_string()));
        }

        let status_code = status.as_u16();
        if should_retry(status_code, attempt) {
            let backoff = calculate_backoff(attempt);
            tracing::debug!(status = status_code, attempt, ?backoff, "Retrying model request");
            tokio::time::sleep(backoff).await;
            attempt += 1;
            continue;
        }

        let text = response.text().await.unwrap_or_default();
        return Err(AiError::RequestFailed(format!("HTTP {status}: {text}")));
    }
}

/// OpenAI-compatible chat completions provider.
///
/// Any server speaking the same API works through `base_url`.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiProvider {
    /// Create a new OpenAI-compatible provider.
    #[must_use]
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: build_http_client(),
            base_url,
            api_key,
        }
    }

    fn request_body(
        model: &str,
        sampling: Sampling,
        role_prompt: &str,
        history: &[Message],
    ) -> serde_json::Value {
        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": role_prompt,
        })];
        messages.extend(history.iter().map(|m| {
            serde_json::json!({
                "role": m.role,
                "content": m.content,
            })
        }));

        serde_json::json!({
            "model": model,
            "messages": messages,
            "max_tokens": sampling.max_tokens,
            "temperature": sampling.temperature,
        })
    }

    async fn generate(
        &self,
        model: &str,
        sampling: Sampling,
        role_prompt: &str,
        history: &[Message],
    ) -> Result<String, AiError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = Self::request_body(model, sampling, role_prompt, history);

        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&body);

        let json = post_json(request).await?;
        json["choices"][0]["message"]["content"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AiError::ParseError("No text in OpenAI response".to_string()))
    }
}

/// A provider bound to one model and sampling setup.
#[derive(Debug, Clone)]
pub struct AiClient {
    provider: OpenAiProvider,
    model: String,
    sampling: Sampling,
}

impl AiClient {
    /// Create a new client with the given provider and model.
    #[must_use]
    pub fn new(provider: OpenAiProvider, model: impl Into<String>, sampling: Sampling) -> Self {
        Self {
            provider,
            model: model.into(),
            sampling,
        }
    }

    /// Create a client for `model` from the provider configuration.
    ///
    /// # Errors
    ///
    /// Returns `AiError::MissingApiKey` if the configured API key environment
    /// variable is not set or empty.
    pub fn from_config(config: &AiConfig, model: &str, temperature: f32) -> Result<Self, AiError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AiError::MissingApiKey(config.api_key_env.clone()))?;

        Ok(Self::new(
            OpenAiProvider::new(config.base_url.clone(), api_key),
            model,
            Sampling {
                max_tokens: config.max_tokens,
                temperature,
            },
        ))
    }

    /// Get the configured model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ModelClient for AiClient {
    async fn generate(&self, role_prompt: &str, history: &[Message]) -> Result<String, AiError> {
        tracing::trace!(model = %self.model, turns = history.len(), "Model request");
        let text = self
            .provider
            .generate(&self.model, self.sampling, role_prompt, history)
            .await?;
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLING: Sampling = Sampling {
        max_tokens: 300,
        temperature: 0.7,
    };

    #[test]
    fn test_http_client_has_timeouts() {
        let client = build_http_client();
        assert!(format!("{client:?}").contains("Client"));
    }

    #[test]
    fn test_should_retry_logic() {
        // 5xx errors should be retried
        assert!(should_retry(500, 0));
        assert!(should_retry(502, 1));
        assert!(should_retry(503, 2));

        // 4xx errors should NOT be retried
        assert!(!should_retry(400, 0));
        assert!(!should_retry(401, 0));
        assert!(!should_retry(429, 0));

        // Max retries should stop retry
        assert!(!should_retry(500, MAX_RETRIES));
        assert!(!should_retry(503, MAX_RETRIES + 1));
    }

    #[test]
    fn test_calculate_backoff() {
        assert_eq!(calculate_backoff(0).as_secs(), 1);
        assert_eq!(calculate_backoff(1).as_secs(), 2);
        assert_eq!(calculate_backoff(2).as_secs(), 4);
    }

    #[test]
    fn test_openai_body_puts_role_prompt_first() {
        let history = [Message::user("Who?"), Message::assistant("Ask the intern")];
        let body = OpenAiProvider::request_body("gpt-4", SAMPLING, "You are the boss", &history);

        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are the boss");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][2]["role"], "assistant");
        assert_eq!(body["max_tokens"], 300);
    }

    #[test]
    fn test_message_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn test_from_config_missing_key() {
        let config = AiConfig {
            api_key_env: "BOSS_INTERN_TEST_UNSET_KEY".to_string(),
            ..AiConfig::default()
        };
        std::env::remove_var("BOSS_INTERN_TEST_UNSET_KEY");

        let result = AiClient::from_config(&config, "gpt-4", 0.7);
        assert!(matches!(result, Err(AiError::MissingApiKey(env)) if env == "BOSS_INTERN_TEST_UNSET_KEY"));
    }

    #[test]
    fn test_from_config_uses_configured_endpoint() {
        std::env::set_var("BOSS_INTERN_TEST_LOCAL_KEY", "test-key");
        let config = AiConfig {
            base_url: "http://localhost:11434/v1/".to_string(),
            api_key_env: "BOSS_INTERN_TEST_LOCAL_KEY".to_string(),
            ..AiConfig::default()
        };
        let client = AiClient::from_config(&config, "llama3", 0.3).unwrap();
        assert_eq!(client.provider.base_url, "http://localhost:11434/v1/");
        assert_eq!(client.provider.api_key, "test-key");
        assert_eq!(client.model(), "llama3");
        assert!((client.sampling.temperature - 0.3).abs() < f32::EPSILON);
        std::env::remove_var("BOSS_INTERN_TEST_LOCAL_KEY");
    }

    #[test]
    fn test_from_config_defaults_to_openai() {
        std::env::set_var("BOSS_INTERN_TEST_DEFAULT_KEY", "k");
        let config = AiConfig {
            api_key_env: "BOSS_INTERN_TEST_DEFAULT_KEY".to_string(),
            ..AiConfig::default()
        };
        let client = AiClient::from_config(&config, "gpt-4", 0.7).unwrap();
        assert_eq!(client.provider.base_url, "https://api.openai.com/v1");
        std::env::remove_var("BOSS_INTERN_TEST_DEFAULT_KEY");
    }
}
