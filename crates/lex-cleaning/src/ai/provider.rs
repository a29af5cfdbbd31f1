//! Completion provider trait for abstracting LLM interactions.
//!
//! This module defines the [`CompletionProvider`] trait so the config
//! generator can work with any model backend (Ollama, OpenRouter, or a
//! scripted provider in tests) without changing its retry logic.
//!
//! # Implementing a New Provider
//!
//! 1. Create a new file in `src/ai/` (e.g., `openai.rs`)
//! 2. Implement the [`CompletionProvider`] trait for your provider struct
//! 3. Export the provider in `src/ai/mod.rs`

use anyhow::Result;

/// Trait for services that turn a prompt into text.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow usage across threads.
///
/// # Error Handling
///
/// Implementations report transport and protocol failures via
/// `anyhow::Result`. The config generator treats every error as retryable.
pub trait CompletionProvider: Send + Sync {
    /// Send `prompt` and return the raw completion text.
    fn complete(&self, prompt: &str) -> Result<String>;

    /// Get the provider name for logging and debugging.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// assert_eq!(provider.name(), "Ollama");
    /// ```
    fn name(&self) -> &str;

    /// Get the model being used by this provider.
    ///
    /// Returns `None` if the provider doesn't expose model information.
    fn model(&self) -> Option<&str> {
        None
    }
}
