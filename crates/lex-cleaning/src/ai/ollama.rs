//! Ollama completion provider.
//!
//! Talks to the `/api/generate` endpoint of an Ollama server
//! (<https://ollama.com/>) with streaming disabled, so each call is a single
//! request and a single JSON reply.

use super::CompletionProvider;
use anyhow::{Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default generate endpoint of a local Ollama server.
const DEFAULT_API_URL: &str = "http://localhost:11434/api/generate";

/// Default model to ask for configs.
const DEFAULT_MODEL: &str = "deepseek-coder:33b";

/// Default timeout for API requests in seconds. Large local models are slow.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    error: Option<String>,
}

/// Configuration for the Ollama provider.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Full URL of the generate endpoint.
    pub api_url: String,
    /// Model name as known to the server (e.g., "deepseek-coder:33b").
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl OllamaConfig {
    /// Create a new configuration builder.
    pub fn builder() -> OllamaConfigBuilder {
        OllamaConfigBuilder::default()
    }
}

/// Builder for [`OllamaConfig`].
#[derive(Default)]
pub struct OllamaConfigBuilder {
    api_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

impl OllamaConfigBuilder {
    pub fn api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> OllamaConfig {
        OllamaConfig {
            api_url: self.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Ollama provider.
///
/// # Example
///
/// ```rust,ignore
/// use lex_cleaning::ai::{OllamaConfig, OllamaProvider};
///
/// let config = OllamaConfig::builder()
///     .api_url("http://gpu-box:11434/api/generate")
///     .model("llama3:70b")
///     .build();
/// let provider = OllamaProvider::with_config(config)?;
/// ```
pub struct OllamaProvider {
    config: OllamaConfig,
    client: Client,
}

impl OllamaProvider {
    /// Create a provider for the default local server and model.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self> {
        Self::with_config(OllamaConfig::default())
    }

    pub fn with_config(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }
}

/// Pull the completion text out of a generate reply.
fn extract_response(reply: GenerateResponse) -> Result<String> {
    if let Some(error) = reply.error {
        return Err(anyhow!("Ollama error: {}", error));
    }
    reply
        .response
        .ok_or_else(|| anyhow!("No response field in Ollama reply"))
}

impl CompletionProvider for OllamaProvider {
    fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
        };
        debug!("POST {} (model {})", self.config.api_url, self.config.model);

        let response = self.client.post(&self.config.api_url).json(&request).send()?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Ollama API Error {}: {}",
                response.status(),
                response.text()?
            ));
        }

        extract_response(response.json()?)
    }

    fn name(&self) -> &str {
        "Ollama"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }
}
