//! Stage logging, progress reporting and cancellation support.
//!
//! Stages never write to a process-wide logger directly for the facts callers
//! care about. Each stage receives a [`StageLog`] and records its steps and
//! warnings there; the log mirrors every entry to `tracing` as well, so a CLI
//! run still prints them.
//!
//! The orchestrator additionally emits a [`ProgressUpdate`] per stage to an
//! optional [`ProgressReporter`] and checks a [`CancellationToken`] between
//! stages.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_cleaning::{Pipeline, CancellationToken};
//!
//! let token = CancellationToken::new();
//! let token_clone = token.clone();
//!
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(5));
//!     token_clone.cancel();
//! });
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .cancellation_token(token)
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .run();
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ============================================================================
// StageLog
// ============================================================================

/// Observer injected into every stage.
///
/// Steps are human-readable descriptions of what a stage did ("Removed 3
/// duplicate rows"). Warnings are recoverable conditions the stage skipped
/// over, such as a configured column that does not exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageLog {
    steps: Vec<String>,
    warnings: Vec<String>,
}

impl StageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed step.
    pub fn step(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.steps.push(message);
    }

    /// Record a skipped or degraded step.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty() && self.warnings.is_empty()
    }

    /// Consume the log, returning `(steps, warnings)`.
    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.steps, self.warnings)
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Stages of the cleaning pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStage {
    /// Reading the input dataset and snapshotting it
    Loading,
    Deduplication,
    OutlierFiltering,
    TextCleaning,
    Imputation,
    TypeConversion,
    FeatureScaling,
    Aggregation,
    /// Writing `cleaned.<ext>`
    Persisting,
    /// Computing quality metrics and writing reports
    Reporting,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline was cancelled by the caller
    Cancelled,
    /// Pipeline failed with an error
    Failed,
}

impl CleaningStage {
    /// The stages that process data, in order.
    pub const PROCESSING: [CleaningStage; 10] = [
        Self::Loading,
        Self::Deduplication,
        Self::OutlierFiltering,
        Self::TextCleaning,
        Self::Imputation,
        Self::TypeConversion,
        Self::FeatureScaling,
        Self::Aggregation,
        Self::Persisting,
        Self::Reporting,
    ];

    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Data",
            Self::Deduplication => "Removing Duplicates",
            Self::OutlierFiltering => "Filtering Outliers",
            Self::TextCleaning => "Cleaning Text",
            Self::Imputation => "Imputing Values",
            Self::TypeConversion => "Converting Types",
            Self::FeatureScaling => "Scaling Features",
            Self::Aggregation => "Aggregating",
            Self::Persisting => "Saving Output",
            Self::Reporting => "Generating Reports",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run attributed to this stage.
    ///
    /// Processing stage weights sum to 1.0.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Loading => 0.05,
            Self::Deduplication => 0.05,
            Self::OutlierFiltering => 0.10,
            Self::TextCleaning => 0.05,
            Self::Imputation => 0.15,
            Self::TypeConversion => 0.10,
            Self::FeatureScaling => 0.10,
            Self::Aggregation => 0.10,
            Self::Persisting => 0.15,
            Self::Reporting => 0.15,
            Self::Complete | Self::Cancelled | Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Complete => 1.0,
            Self::Cancelled | Self::Failed => 0.0,
            stage => Self::PROCESSING
                .iter()
                .take_while(|s| *s != stage)
                .map(|s| s.weight())
                .sum(),
        }
    }
}

/// Progress update emitted by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current pipeline stage
    pub stage: CleaningStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    /// Human-readable message describing current activity
    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: CleaningStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: CleaningStage::Complete,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            stage: CleaningStage::Cancelled,
            progress: 0.0,
            stage_progress: 0.0,
            message: "Pipeline cancelled by user".to_string(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: CleaningStage::Failed,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
        }
    }
}

/// Trait for receiving progress updates during a run.
///
/// Implementations must be `Send + Sync` so a pipeline running on a worker
/// thread can report to a UI thread.
pub trait ProgressReporter: Send + Sync {
    /// Called at the start of each stage and once at the end of the run.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Token for cancelling a running pipeline.
///
/// Clones share one atomic flag. The pipeline checks it between stages and
/// returns [`CleaningError::Cancelled`](crate::error::CleaningError::Cancelled)
/// without writing any output.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
static_assertions::assert_impl_all!(StageLog: Send, Sync);

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Safe to call from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can be reused for another run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_stage_log_records_steps_and_warnings() {
        let mut log = StageLog::new();
        assert!(log.is_empty());

        log.step("Removed 2 duplicate rows");
        log.warn("Column 'zip' not found, skipping text cleaning");

        assert_eq!(log.steps(), ["Removed 2 duplicate rows"]);
        assert_eq!(log.warnings().len(), 1);
        let (steps, warnings) = log.into_parts();
        assert_eq!(steps.len(), 1);
        assert!(warnings[0].contains("zip"));
    }

    #[test]
    fn test_cancellation_token_clone_shares_state() {
        let token1 = CancellationToken::new();
        let token2 = token1.clone();
        assert!(!token2.is_cancelled());

        token1.cancel();
        assert!(token2.is_cancelled());

        token2.reset();
        assert!(!token1.is_cancelled());
    }

    #[test]
    fn test_stage_weights_sum() {
        let total: f32 = CleaningStage::PROCESSING.iter().map(|s| s.weight()).sum();
        assert!((total - 1.0).abs() < 0.01, "Weights should sum to ~1.0");
    }

    #[test]
    fn test_base_progress_is_cumulative() {
        assert_eq!(CleaningStage::Loading.base_progress(), 0.0);
        assert!((CleaningStage::OutlierFiltering.base_progress() - 0.10).abs() < 1e-6);
        assert!((CleaningStage::Reporting.base_progress() - 0.85).abs() < 1e-6);
        assert_eq!(CleaningStage::Complete.base_progress(), 1.0);
    }

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(CleaningStage::Imputation, 0.5, "Imputing...");
        assert_eq!(update.stage, CleaningStage::Imputation);
        assert_eq!(update.stage_progress, 0.5);
        assert!(update.progress > CleaningStage::Imputation.base_progress());
    }

    #[test]
    fn test_closure_progress_reporter() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let reporter = ClosureProgressReporter::new(move |_update| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        reporter.report(ProgressUpdate::new(CleaningStage::Loading, 0.0, "Test"));
        reporter.report(ProgressUpdate::complete("Done"));

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stage_json_values() {
        let json = serde_json::to_string(&CleaningStage::OutlierFiltering).unwrap();
        assert_eq!(json, "\"outlier_filtering\"");
        let json = serde_json::to_string(&CleaningStage::TypeConversion).unwrap();
        assert_eq!(json, "\"type_conversion\"");
    }

    #[test]
    fn test_cancellation_across_threads() {
        let token = CancellationToken::new();
        let token_clone = token.clone();

        token.cancel();
        let handle = std::thread::spawn(move || token_clone.is_cancelled());

        assert!(handle.join().expect("Thread should not panic"));
    }
}
