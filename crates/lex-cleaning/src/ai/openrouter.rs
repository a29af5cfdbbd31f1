//! OpenRouter completion provider.
//!
//! This module provides the [`OpenRouterProvider`] which implements the
//! [`CompletionProvider`] trait for the OpenRouter API
//! (<https://openrouter.ai/>).
//!
//! OpenRouter provides access to multiple LLM models through a unified
//! chat-completions API.

use super::CompletionProvider;
use anyhow::{Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat-completions endpoint.
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Code-tuned model, good at emitting bare JSON.
const DEFAULT_MODEL: &str = "deepseek/deepseek-chat";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Low so repeated attempts converge on the same config.
const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Room for a config covering every section.
const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Debug, Serialize)]
struct OpenRouterRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<Message>,
}

impl OpenRouterResponse {
    /// Content of the first choice's message.
    fn into_content(self) -> Option<String> {
        self.choices?.into_iter().next()?.message.map(|m| m.content)
    }
}

/// Request settings for [`OpenRouterProvider`].
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// OpenRouter model slug, e.g. `deepseek/deepseek-chat`.
    pub model: String,
    pub temperature: f32,
    /// Upper bound on the reply length.
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Full endpoint URL; override for proxies.
    pub base_url: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl OpenRouterConfig {
    pub fn builder() -> OpenRouterConfigBuilder {
        OpenRouterConfigBuilder::default()
    }
}

/// Builder for [`OpenRouterConfig`].
#[derive(Default)]
pub struct OpenRouterConfigBuilder {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    base_url: Option<String>,
}

/// Unset fields fall back to the module defaults.
impl OpenRouterConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sampling temperature, 0.0 to 2.0.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn build(self) -> OpenRouterConfig {
        OpenRouterConfig {
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

/// Sends the prompt as a single user message and returns the first
/// choice's content.
///
/// # Example
///
/// ```rust,ignore
/// use lex_cleaning::ai::{OpenRouterProvider, OpenRouterConfig};
///
/// let api_key = std::env::var("OPENROUTER_API_KEY")?;
/// let config = OpenRouterConfig::builder().model("openai/gpt-4o").build();
/// let provider = OpenRouterProvider::with_config(api_key, config)?;
/// let reply = provider.complete("Return {} and nothing else")?;
/// ```
pub struct OpenRouterProvider {
    api_key: String,
    config: OpenRouterConfig,
    client: Client,
}

impl OpenRouterProvider {
    /// Provider with the default model and endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, OpenRouterConfig::default())
    }

    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn with_config(api_key: impl Into<String>, config: OpenRouterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            api_key: api_key.into(),
            config,
            client,
        })
    }

    fn build_request(&self, prompt: &str) -> OpenRouterRequest {
        OpenRouterRequest {
            model: self.config.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}

impl CompletionProvider for OpenRouterProvider {
    fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.config.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "lex-cleaning")
            .json(&self.build_request(prompt))
            .send()?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "OpenRouter API Error {}: {}",
                response.status(),
                response.text()?
            ));
        }

        let result: OpenRouterResponse = response.json()?;
        result
            .into_content()
            .ok_or_else(|| anyhow!("No response content from OpenRouter API"))
    }

    fn name(&self) -> &str {
        "OpenRouter"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // OpenRouterResponse parsing tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_valid_response_structure() {
        let json = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "{\"duplicates\": {\"remove\": true}}"
                }
            }]
        }"#;

        let response: OpenRouterResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.into_content().as_deref(),
            Some(r#"{"duplicates": {"remove": true}}"#)
        );
    }

    #[test]
    fn test_parse_response_with_empty_or_null_choices() {
        let response: OpenRouterResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(response.into_content().is_none());

        let response: OpenRouterResponse = serde_json::from_str(r#"{"choices": null}"#).unwrap();
        assert!(response.into_content().is_none());
    }

    #[test]
    fn test_parse_response_missing_message() {
        let json = r#"{"choices": [{"message": null}]}"#;
        let response: OpenRouterResponse = serde_json::from_str(json).unwrap();
        assert!(response.into_content().is_none());
    }

    #[test]
    fn test_parse_malformed_json() {
        let json = r#"{"choices": [{"message": "not an object"}]}"#;
        let result: std::result::Result<OpenRouterResponse, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    // -------------------------------------------------------------------------
    // Request and config tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_build_request_uses_config() {
        let config = OpenRouterConfig::builder().model("openai/gpt-4").max_tokens(512).build();
        let provider = OpenRouterProvider::with_config("test-key", config).unwrap();

        let request = provider.build_request("hello");
        assert_eq!(request.model, "openai/gpt-4");
        assert_eq!(request.max_tokens, 512);
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
        assert_eq!(request.messages[0].content, "hello");
    }

    #[test]
    fn test_config_builder_defaults() {
        let config = OpenRouterConfig::builder().build();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_provider_metadata() {
        let provider = OpenRouterProvider::new("test-key").unwrap();
        assert_eq!(provider.name(), "OpenRouter");
        assert_eq!(provider.model(), Some(DEFAULT_MODEL));
    }
}
