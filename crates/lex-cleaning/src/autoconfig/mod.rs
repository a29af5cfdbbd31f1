//! Config auto-generation.
//!
//! Summarizes a dataset's schema, asks a [`CompletionProvider`] for a
//! matching [`CleaningConfig`](crate::CleaningConfig), and retries until the
//! reply parses and validates.
//!
//! [`CompletionProvider`]: crate::ai::CompletionProvider

mod generator;
mod prompt;
mod summary;

pub use generator::{ConfigGenerator, RetryPolicy, parse_response};
pub use prompt::{AUTO_PREFIX, GenerationRequest, build_prompt};
pub use summary::DatasetSummary;
