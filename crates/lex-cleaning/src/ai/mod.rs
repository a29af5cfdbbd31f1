//! Text-completion providers used by the config auto-generator.
//!
//! # Feature Flag
//!
//! The concrete HTTP providers require the `ai` feature flag (enabled by
//! default). The [`CompletionProvider`] trait is always available for
//! custom or in-process implementations.
//!
//! ```toml
//! # Enable the HTTP providers (default)
//! lex_cleaning = { version = "0.1", features = ["ai"] }
//!
//! # Disable them for a smaller binary
//! lex_cleaning = { version = "0.1", default-features = false }
//! ```
//!
//! # Providers
//!
//! - [`OllamaProvider`] - a local or self-hosted Ollama server (requires `ai` feature)
//! - [`OpenRouterProvider`] - OpenRouter chat completions (requires `ai` feature)
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_cleaning::ai::{CompletionProvider, OllamaProvider};
//!
//! let provider = OllamaProvider::new()?;
//! let text = provider.complete("Reply with the word ok")?;
//! ```

// Provider trait is always available (for custom implementations)
mod provider;
pub use provider::CompletionProvider;

// Concrete providers require the "ai" feature
#[cfg(feature = "ai")]
mod ollama;
#[cfg(feature = "ai")]
mod openrouter;

#[cfg(feature = "ai")]
pub use ollama::{OllamaConfig, OllamaConfigBuilder, OllamaProvider};

#[cfg(feature = "ai")]
pub use openrouter::{OpenRouterConfig, OpenRouterConfigBuilder, OpenRouterProvider};
