use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use super::prompt::{GenerationRequest, build_prompt};
use super::summary::DatasetSummary;
use crate::ai::CompletionProvider;
use crate::config::CleaningConfig;
use crate::error::{CleaningError, Result};
use crate::io::read_dataset;

/// Default number of generation attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default pause between attempts.
const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

/// How often and how patiently to ask the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least 1.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

/// Parse a model reply as a config.
///
/// A surrounding Markdown code fence (```` ```json ... ``` ````) is removed;
/// anything else must be a single JSON object that validates.
pub fn parse_response(text: &str) -> Result<CleaningConfig> {
    CleaningConfig::from_json_str(strip_code_fence(text))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Generates configs through a [`CompletionProvider`].
///
/// # Example
///
/// ```rust,ignore
/// use lex_cleaning::ai::OllamaProvider;
/// use lex_cleaning::autoconfig::ConfigGenerator;
/// use std::sync::Arc;
///
/// let generator = ConfigGenerator::new(Arc::new(OllamaProvider::new()?));
/// let path = generator.generate_to_file("hotel_bookings.csv", ".")?;
/// // -> ./auto_hotel_bookings.json
/// ```
pub struct ConfigGenerator {
    provider: Arc<dyn CompletionProvider>,
    retry: RetryPolicy,
}

static_assertions::assert_impl_all!(ConfigGenerator: Send, Sync);

impl ConfigGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Load `dataset`, summarize it and ask for a config.
    ///
    /// # Errors
    ///
    /// Startup errors (unsupported extension, unreadable file) are returned
    /// immediately. Provider, parse and validation failures are retried;
    /// when every attempt fails the result is `ConfigGenerationFailed`.
    pub fn generate(&self, dataset: impl AsRef<Path>) -> Result<CleaningConfig> {
        let (summary, request) = self.prepare(dataset.as_ref())?;
        self.generate_for(&summary, &request)
    }

    /// Like [`generate`](Self::generate), then save the config as pretty
    /// JSON to `<config_dir>/auto_<stem>.json`.
    ///
    /// Nothing is written when generation fails.
    pub fn generate_to_file(
        &self,
        dataset: impl AsRef<Path>,
        config_dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let (summary, request) = self.prepare(dataset.as_ref())?;
        let config = self.generate_for(&summary, &request)?;

        let config_dir = config_dir.as_ref();
        fs::create_dir_all(config_dir)?;
        let path = config_dir.join(request.config_file_name());
        fs::write(&path, config.to_json_pretty()?)?;

        info!("Config saved: {}", path.display());
        Ok(path)
    }

    fn prepare(&self, dataset: &Path) -> Result<(DatasetSummary, GenerationRequest)> {
        let request = GenerationRequest::for_dataset(dataset)?;
        let df = read_dataset(dataset)?;
        Ok((DatasetSummary::from_dataframe(&df), request))
    }

    /// Ask for a config matching an existing summary.
    pub fn generate_for(
        &self,
        summary: &DatasetSummary,
        request: &GenerationRequest,
    ) -> Result<CleaningConfig> {
        let attempts = self.retry.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            info!(
                "Requesting config from {} (attempt {}/{})",
                self.provider.name(),
                attempt,
                attempts
            );

            match self.attempt(summary, request) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    warn!("Config generation attempt {} failed: {}", attempt, e);
                    last_error = e.to_string();
                }
            }

            if attempt < attempts && !self.retry.backoff.is_zero() {
                thread::sleep(self.retry.backoff);
            }
        }

        Err(CleaningError::ConfigGenerationFailed {
            attempts,
            last_error,
        })
    }

    fn attempt(&self, summary: &DatasetSummary, request: &GenerationRequest) -> Result<CleaningConfig> {
        let prompt = build_prompt(summary, request);
        let text = self
            .provider
            .complete(&prompt)
            .map_err(|e| CleaningError::ProviderError(e.to_string()))?;

        let mut config = parse_response(&text)?;
        if config.input_path.is_none() {
            config.input_path = Some(request.input_path.clone());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutlierMethod;
    use crate::io::DataFormat;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies, recording every prompt it receives.
    struct ScriptedProvider {
        replies: Mutex<VecDeque<anyhow::Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<anyhow::Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    impl CompletionProvider for ScriptedProvider {
        fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("script exhausted")))
        }

        fn name(&self) -> &str {
            "Scripted"
        }
    }

    fn no_wait(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    fn summary() -> DatasetSummary {
        DatasetSummary {
            columns: vec!["adr".to_string()],
            dtypes: vec![("adr".to_string(), "float64".to_string())],
            rows: 3,
            columns_count: 1,
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest::for_dataset("hotel.csv").unwrap()
    }

    const VALID: &str = r#"{"output_path": "auto_hotel", "outliers": {"method": "iqr", "columns": ["adr"]}}"#;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{}\n```\n"), "{}");
        assert_eq!(strip_code_fence("  {}  "), "{}");
    }

    #[test]
    fn test_parse_response_accepts_fenced_json() {
        let config = parse_response(&format!("```json\n{}\n```", VALID)).unwrap();
        assert_eq!(config.outliers.map(|o| o.method), Some(OutlierMethod::Iqr));
    }

    #[test]
    fn test_parse_response_rejects_prose() {
        let err = parse_response("Here is your config: {}").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_first_valid_reply_wins() {
        let provider = ScriptedProvider::new(vec![Ok(VALID.to_string())]);
        let generator = ConfigGenerator::new(provider.clone()).with_retry_policy(no_wait(5));

        let config = generator.generate_for(&summary(), &request()).unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(config.input_path.as_deref(), Some(Path::new("hotel.csv")));
    }

    #[test]
    fn test_retries_after_bad_replies() {
        let provider = ScriptedProvider::new(vec![
            Err(anyhow::anyhow!("connection refused")),
            Ok("not json".to_string()),
            Ok(r#"{"missing_value": {"adr": {"method": "fill"}}}"#.to_string()),
            Ok(VALID.to_string()),
        ]);
        let generator = ConfigGenerator::new(provider.clone()).with_retry_policy(no_wait(5));

        assert!(generator.generate_for(&summary(), &request()).is_ok());
        assert_eq!(provider.calls(), 4);

        // The request is rebuilt on every attempt
        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts.iter().all(|p| p == &prompts[0]));
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let provider = ScriptedProvider::new(vec![
            Ok("nope".to_string()),
            Ok("nope".to_string()),
            Ok("still nope".to_string()),
            Ok(VALID.to_string()),
        ]);
        let generator = ConfigGenerator::new(provider.clone()).with_retry_policy(no_wait(3));

        let err = generator.generate_for(&summary(), &request()).unwrap_err();

        assert_eq!(provider.calls(), 3);
        match err {
            CleaningError::ConfigGenerationFailed { attempts, last_error } => {
                assert_eq!(attempts, 3);
                assert!(!last_error.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_generate_to_file_writes_only_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("hotel.csv");
        fs::write(&dataset, "adr,hotel\n10.5,City\n12.0,Resort\n").unwrap();

        let failing = ScriptedProvider::new(vec![Ok("nope".to_string())]);
        let err = ConfigGenerator::new(failing)
            .with_retry_policy(no_wait(1))
            .generate_to_file(&dataset, dir.path())
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_GENERATION_FAILED");
        assert!(!dir.path().join("auto_hotel.json").exists());

        let provider = ScriptedProvider::new(vec![Ok(VALID.to_string())]);
        let path = ConfigGenerator::new(provider.clone())
            .with_retry_policy(no_wait(1))
            .generate_to_file(&dataset, dir.path())
            .unwrap();

        assert_eq!(path, dir.path().join("auto_hotel.json"));
        let saved = CleaningConfig::from_path(&path).unwrap();
        assert_eq!(saved.input_path.as_deref(), Some(dataset.as_path()));
        assert_eq!(saved.output_data_format().unwrap(), DataFormat::Csv);
        assert!(provider.prompts.lock().unwrap()[0].contains("Rows: 2"));
    }

    #[test]
    fn test_unsupported_dataset_fails_before_calling_provider() {
        let provider = ScriptedProvider::new(vec![Ok(VALID.to_string())]);
        let err = ConfigGenerator::new(provider.clone())
            .generate("data.xlsx")
            .unwrap_err();

        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
        assert_eq!(provider.calls(), 0);
    }
}
