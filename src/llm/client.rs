use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::prompts::SYSTEM_PROMPT;

/// Errors from the text-completion capability
///
/// Call sites never surface these to pipeline callers; they pick their
/// deterministic fallback instead.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("completion request timed out")]
    Timeout,

    #[error("completion API error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse completion response: {0}")]
    Parse(String),

    #[error("completion returned no text content")]
    EmptyResponse,

    #[error("completion provider is disabled")]
    Disabled,
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CompletionError::Timeout
        } else {
            CompletionError::Request(e.to_string())
        }
    }
}

/// Per-call sampling options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 400,
        }
    }
}

/// Injected text-completion capability
///
/// Responses are expected to be strict JSON text; callers decode and validate.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        input: &serde_json::Value,
        opts: &CompletionOptions,
    ) -> Result<String, CompletionError>;
}

/// Run a completion bounded by `timeout`, whatever the provider does internally
pub async fn complete_within(
    provider: &dyn CompletionProvider,
    prompt: &str,
    input: &serde_json::Value,
    opts: &CompletionOptions,
    timeout: Duration,
) -> Result<String, CompletionError> {
    match tokio::time::timeout(timeout, provider.complete(prompt, input, opts)).await {
        Ok(result) => result,
        Err(_) => Err(CompletionError::Timeout),
    }
}

/// User message layout shared by the HTTP backends
pub fn render_user_message(prompt: &str, input: &serde_json::Value) -> String {
    format!("{prompt}\n\nINPUT (JSON):\n{input}")
}

/// Provider that refuses every call, forcing the rule-based fallbacks
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledProvider;

#[async_trait]
impl CompletionProvider for DisabledProvider {
    async fn complete(
        &self,
        _prompt: &str,
        _input: &serde_json::Value,
        _opts: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        Err(CompletionError::Disabled)
    }
}

/// Which HTTP backend serves completions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            other => anyhow::bail!("unknown LLM_PROVIDER '{}'", other),
        }
    }
}

/// Configuration for the completion backends
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub provider: ProviderKind,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl CompletionConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let provider: ProviderKind = std::env::var("LLM_PROVIDER")
            .unwrap_or_default()
            .parse()?;

        let timeout_secs = std::env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(30);

        let (key_var, model_var, default_model, default_url) = match provider {
            ProviderKind::OpenAi => (
                "OPENAI_API_KEY",
                "OPENAI_MODEL",
                "gpt-4o-mini",
                "https://api.openai.com",
            ),
            ProviderKind::Anthropic => (
                "ANTHROPIC_API_KEY",
                "ANTHROPIC_MODEL",
                "claude-sonnet-4-20250514",
                "https://api.anthropic.com",
            ),
        };

        let api_key = std::env::var(key_var)
            .with_context(|| format!("{} environment variable not set", key_var))?;
        let model = std::env::var(model_var).unwrap_or_else(|_| default_model.to_string());
        let base_url = std::env::var("LLM_BASE_URL").unwrap_or_else(|_| default_url.to_string());

        Ok(Self {
            provider,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }

    fn http_client(&self) -> Client {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new())
    }
}

/// Build the configured backend behind the provider trait
pub fn build_provider(config: CompletionConfig) -> Arc<dyn CompletionProvider> {
    match config.provider {
        ProviderKind::OpenAi => Arc::new(OpenAiClient::new(config)),
        ProviderKind::Anthropic => Arc::new(AnthropicClient::new(config)),
    }
}

/// OpenAI-compatible chat-completions backend with JSON mode
pub struct OpenAiClient {
    client: Client,
    config: CompletionConfig,
}

impl OpenAiClient {
    pub fn new(config: CompletionConfig) -> Self {
        Self {
            client: config.http_client(),
            config,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(
        &self,
        prompt: &str,
        input: &serde_json::Value,
        opts: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            temperature: opts.temperature,
            max_tokens: opts.max_tokens,
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: render_user_message(prompt, input),
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status { status, body });
        }

        let response: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }
}

/// Anthropic messages backend
pub struct AnthropicClient {
    client: Client,
    config: CompletionConfig,
}

impl AnthropicClient {
    pub fn new(config: CompletionConfig) -> Self {
        Self {
            client: config.http_client(),
            config,
        }
    }
}

#[async_trait]
impl CompletionProvider for AnthropicClient {
    async fn complete(
        &self,
        prompt: &str,
        input: &serde_json::Value,
        opts: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        let request = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: opts.max_tokens,
            temperature: Some(opts.temperature),
            system: Some(SYSTEM_PROMPT.to_string()),
            messages: vec![Message {
                role: "user".to_string(),
                content: render_user_message(prompt, input),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status { status, body });
        }

        let response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;

        // Extract text from the first text block
        response
            .content
            .into_iter()
            .find(|c| c.content_type == "text")
            .map(|c| c.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    temperature: f64,
    max_tokens: u32,
    messages: Vec<Message>,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::SlowProvider;

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(" Anthropic ".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert!("mistral".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_render_user_message() {
        let msg = render_user_message("Do it.", &serde_json::json!({"a": 1}));
        assert_eq!(msg, "Do it.\n\nINPUT (JSON):\n{\"a\":1}");
    }

    #[test]
    fn test_chat_response_parse() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":" {\"labels\":[]} "}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some(" {\"labels\":[]} ")
        );
    }

    #[test]
    fn test_build_provider_without_network() {
        let config = CompletionConfig {
            provider: ProviderKind::Anthropic,
            api_key: "test".to_string(),
            model: "m".to_string(),
            base_url: "http://localhost:9".to_string(),
            timeout_secs: 1,
        };
        let _provider = build_provider(config);
    }

    #[tokio::test]
    async fn test_disabled_provider_fails() {
        let result = DisabledProvider
            .complete("p", &serde_json::Value::Null, &CompletionOptions::default())
            .await;
        assert!(matches!(result, Err(CompletionError::Disabled)));
    }

    #[tokio::test]
    async fn test_complete_within_times_out() {
        let provider = SlowProvider(Duration::from_secs(5));
        let result = complete_within(
            &provider,
            "p",
            &serde_json::Value::Null,
            &CompletionOptions::default(),
            Duration::from_millis(20),
        )
        .await;
        assert!(matches!(result, Err(CompletionError::Timeout)));
    }
}
