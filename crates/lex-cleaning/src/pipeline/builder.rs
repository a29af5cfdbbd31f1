//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating the configured cleaning stages.

use crate::cleaner::{DuplicateRemover, TextCleaner, TypeConverter};
use crate::config::CleaningConfig;
use crate::error::{CleaningError, Result};
use crate::imputers::MissingValueImputer;
use crate::io::{DataFormat, output_file_path, read_dataset, write_dataset};
use crate::pipeline::outliers::OutlierFilter;
use crate::pipeline::progress::{
    CancellationToken, CleaningStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
    StageLog,
};
use crate::quality::{QualityComparison, QualityMetrics};
use crate::reporting::{QualityReport, QualityReporter, ReportGenerator};
use crate::transform::{Aggregator, FeatureScaler};
use crate::types::{CleanedData, PipelineResult};
use polars::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Signature shared by every stage that returns only the dataset.
type StageFn = fn(DataFrame, &CleaningConfig, &mut StageLog) -> Result<DataFrame>;

/// The main cleaning pipeline.
///
/// Stages always run in this order, each one a no-op when its config
/// section is absent:
///
/// deduplicate → filter outliers → clean text → impute → convert types →
/// scale features → aggregate → persist → report
///
/// Use [`Pipeline::builder()`] to create a pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use lex_cleaning::{CancellationToken, CleaningConfig, Pipeline};
///
/// let token = CancellationToken::new();
///
/// let result = Pipeline::builder()
///     .config(CleaningConfig::from_path("hotel.json")?)
///     .cancellation_token(token.clone())
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run()?;
/// ```
pub struct Pipeline {
    config: CleaningConfig,
    keep_original: bool,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    reporter: Arc<dyn QualityReporter>,
    cancellation_token: CancellationToken,
}

// Pipeline may be moved to a worker thread
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Load `input_path` and process it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when the config has no `input_path`, plus
    /// every error [`process`](Self::process) can return.
    pub fn run(&self) -> Result<PipelineResult> {
        let outcome = self.check_output_format().and_then(|_| {
            let input = self.config.input_path.as_deref().ok_or_else(|| {
                CleaningError::InvalidConfig("input_path is required to run from a file".to_string())
            })?;
            self.check_cancelled()?;
            self.load(input)
        });

        match outcome {
            Ok(df) => self.process_from(df, self.config.input_path.as_deref()),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Process an in-memory DataFrame, then write the output and reports.
    ///
    /// # Errors
    ///
    /// Returns `Err(CleaningError::Cancelled)` if the pipeline was cancelled
    /// via the cancellation token. Stage errors abort the run before
    /// anything is written.
    pub fn process(&self, df: DataFrame) -> Result<PipelineResult> {
        self.process_from(df, None)
    }

    /// Run the in-memory stages only. Nothing is written.
    pub fn clean(&self, df: DataFrame) -> Result<CleanedData> {
        self.run_stages(df).map_err(|e| self.fail(e))
    }

    fn process_from(&self, df: DataFrame, input: Option<&Path>) -> Result<PipelineResult> {
        match self.process_internal(df, input) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(result)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn fail(&self, e: CleaningError) -> CleaningError {
        if e.is_cancelled() {
            self.report_progress(ProgressUpdate::cancelled());
        } else {
            self.report_progress(ProgressUpdate::failed(e.to_string()));
        }
        error!("Pipeline error: {}", e);
        e
    }

    /// Check if cancellation has been requested.
    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(CleaningError::Cancelled);
        }
        Ok(())
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn enter_stage(&self, stage: CleaningStage) -> Result<()> {
        self.check_cancelled()?;
        self.report_progress(ProgressUpdate::new(stage, 0.0, format!("{}...", stage.display_name())));
        Ok(())
    }

    fn check_output_format(&self) -> Result<DataFormat> {
        self.config.output_data_format()
    }

    fn load(&self, input: &Path) -> Result<DataFrame> {
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Loading,
            0.0,
            format!("Loading {}", input.display()),
        ));
        info!("Loading dataset from {}", input.display());

        let df = read_dataset(input)?;
        debug!("Loaded shape: ({}, {})", df.height(), df.width());
        Ok(df)
    }

    fn process_internal(&self, df: DataFrame, input: Option<&Path>) -> Result<PipelineResult> {
        let start_time = Instant::now();
        let format = self.check_output_format()?;

        info!("Starting cleaning pipeline...");
        let rows_before = df.height();
        let columns_before = df.width();

        // Snapshot of the input for the "before" metrics
        let original = self.keep_original.then(|| df.clone());

        let CleanedData {
            mut data,
            scalers,
            steps,
            warnings,
        } = self.run_stages(df)?;

        self.enter_stage(CleaningStage::Persisting)?;
        let output_file = output_file_path(&self.config.output_path, format);
        write_dataset(&mut data, &output_file, format)?;
        info!("Cleaned dataset saved: {}", output_file.display());

        let before = original.as_ref().map(QualityMetrics::compute).transpose()?;
        let quality = QualityComparison::new(before, QualityMetrics::compute(&data)?);

        let report_files = if self.config.generate_reports {
            self.enter_stage(CleaningStage::Reporting)?;
            let report = QualityReport::new(input, &output_file, quality, &steps, &warnings);
            self.reporter.report(&report, &self.config.output_path)?
        } else {
            Vec::new()
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Pipeline finished in {}ms: {} -> {} rows, {} warnings",
            duration_ms,
            rows_before,
            data.height(),
            warnings.len()
        );

        Ok(PipelineResult {
            input_file: input.map(Path::to_path_buf),
            output_file,
            report_files,
            rows_before,
            rows_after: data.height(),
            columns_before,
            columns_after: data.width(),
            duration_ms,
            quality,
            scalers,
            steps,
            warnings,
        })
    }

    fn run_stages(&self, df: DataFrame) -> Result<CleanedData> {
        let mut log = StageLog::new();
        let config = &self.config;

        let before_scaling: [(CleaningStage, StageFn); 5] = [
            (CleaningStage::Deduplication, DuplicateRemover::apply),
            (CleaningStage::OutlierFiltering, OutlierFilter::apply),
            (CleaningStage::TextCleaning, TextCleaner::apply),
            (CleaningStage::Imputation, MissingValueImputer::apply),
            (CleaningStage::TypeConversion, TypeConverter::apply),
        ];

        let mut df = df;
        for (stage, apply) in before_scaling {
            self.enter_stage(stage)?;
            df = apply(df, config, &mut log)?;
        }

        self.enter_stage(CleaningStage::FeatureScaling)?;
        let (df, scalers) = FeatureScaler::apply(df, config, &mut log)?;

        self.enter_stage(CleaningStage::Aggregation)?;
        let df = Aggregator::apply(df, config, &mut log)?;

        let (steps, warnings) = log.into_parts();
        Ok(CleanedData {
            data: df,
            scalers,
            steps,
            warnings,
        })
    }
}

/// Builder for creating a configured [`Pipeline`].
pub struct PipelineBuilder {
    config: Option<CleaningConfig>,
    keep_original: bool,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    reporter: Option<Arc<dyn QualityReporter>>,
    cancellation_token: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            config: None,
            keep_original: true,
            progress_reporter: None,
            reporter: None,
            cancellation_token: None,
        }
    }
}

impl PipelineBuilder {
    /// Set the cleaning configuration.
    pub fn config(mut self, config: CleaningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Keep a copy of the input to report "before" metrics. Defaults to true.
    ///
    /// When disabled the quality comparison has no `before` snapshot.
    pub fn keep_original(mut self, keep: bool) -> Self {
        self.keep_original = keep;
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use lex_cleaning::{ProgressReporter, ProgressUpdate};
    /// use std::sync::Arc;
    ///
    /// struct MyReporter;
    ///
    /// impl ProgressReporter for MyReporter {
    ///     fn report(&self, update: ProgressUpdate) {
    ///         println!("{}: {}", update.stage.display_name(), update.message);
    ///     }
    /// }
    ///
    /// let pipeline = Pipeline::builder()
    ///     .progress_reporter(Arc::new(MyReporter))
    ///     .build()?;
    /// ```
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Replace the default [`ReportGenerator`].
    pub fn reporter(mut self, reporter: Arc<dyn QualityReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Set a cancellation token for stopping the pipeline.
    ///
    /// Clone the token and call [`CancellationToken::cancel()`] from any
    /// thread. The pipeline checks the token between stages and returns
    /// [`CleaningError::Cancelled`] without writing output.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, crate::config::ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            keep_original: self.keep_original,
            progress_reporter: self.progress_reporter,
            reporter: self.reporter.unwrap_or_else(|| Arc::new(ReportGenerator)),
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MissingValueStrategy, OutlierMethod, ScalingMethod};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn bookings() -> DataFrame {
        df! {
            "hotel" => &["City", "Resort", "City", "City"],
            "adr" => &[Some(100.0), None, Some(100.0), Some(80.0)],
        }
        .unwrap()
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert!(pipeline.keep_original);
        assert_eq!(pipeline.config, CleaningConfig::default());
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let config = CleaningConfig {
            output_format: "xlsx".to_string(),
            ..Default::default()
        };
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_pipeline_builder_with_cancellation_token() {
        let token = CancellationToken::new();
        let token_clone = token.clone();

        let pipeline = Pipeline::builder().cancellation_token(token).build().unwrap();
        assert!(!pipeline.cancellation_token.is_cancelled());

        token_clone.cancel();
        assert!(pipeline.cancellation_token.is_cancelled());
    }

    #[test]
    fn test_empty_config_is_identity() {
        let pipeline = Pipeline::builder().build().unwrap();
        let cleaned = pipeline.clean(bookings()).unwrap();

        assert!(cleaned.data.equals_missing(&bookings()));
        assert!(cleaned.scalers.is_empty());
        assert!(cleaned.steps.is_empty());
    }

    #[test]
    fn test_stages_run_in_order() {
        let config = CleaningConfig::builder()
            .remove_duplicates(true)
            .impute("adr", MissingValueStrategy::mean())
            .scale("adr", ScalingMethod::Minmax)
            .build()
            .unwrap();
        let pipeline = Pipeline::builder().config(config).build().unwrap();

        let cleaned = pipeline.clean(bookings()).unwrap();

        // Duplicate row removed before the mean is taken: mean(100, 80) = 90
        assert_eq!(cleaned.data.height(), 3);
        let adr: Vec<Option<f64>> = cleaned
            .data
            .column("adr")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(adr, vec![Some(1.0), Some(0.5), Some(0.0)]);
        assert_eq!(cleaned.steps.len(), 3);
        assert!(cleaned.scalers.get("adr").is_some());
    }

    #[test]
    fn test_progress_callback_sees_each_stage() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let stages_clone = stages.clone();

        let pipeline = Pipeline::builder()
            .on_progress(move |update| {
                stages_clone.lock().unwrap().push(update.stage);
            })
            .build()
            .unwrap();
        pipeline.clean(bookings()).unwrap();

        let seen = stages.lock().unwrap();
        assert_eq!(seen.first(), Some(&CleaningStage::Deduplication));
        assert_eq!(seen.last(), Some(&CleaningStage::Aggregation));
        assert_eq!(seen.len(), 7);
    }

    #[test]
    fn test_cancelled_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out");
        let config = CleaningConfig::builder()
            .output_path(&output)
            .build()
            .unwrap();

        let failures = Arc::new(AtomicUsize::new(0));
        let failures_clone = failures.clone();
        let token = CancellationToken::new();
        token.cancel();

        let pipeline = Pipeline::builder()
            .config(config)
            .cancellation_token(token)
            .on_progress(move |update| {
                if update.stage == CleaningStage::Cancelled {
                    failures_clone.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build()
            .unwrap();

        let err = pipeline.process(bookings()).unwrap_err();
        assert!(err.is_cancelled());
        assert!(!output.exists());
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stage_error_aborts_before_persist() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out");
        let config = CleaningConfig::builder()
            .output_path(&output)
            .outliers(OutlierMethod::Iqr, ["adr"])
            .impute("hotel", MissingValueStrategy::median())
            .build()
            .unwrap();

        let err = Pipeline::builder()
            .config(config)
            .build()
            .unwrap()
            .process(bookings())
            .unwrap_err();

        assert_eq!(err.error_code(), "IMPUTATION_FAILED");
        assert!(!output.exists());
    }

    #[test]
    fn test_process_writes_output_and_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let config = CleaningConfig::builder()
            .output_path(dir.path())
            .remove_duplicates(true)
            .build()
            .unwrap();

        let result = Pipeline::builder()
            .config(config)
            .build()
            .unwrap()
            .process(bookings())
            .unwrap();

        assert_eq!(result.output_file, dir.path().join("cleaned.csv"));
        assert!(result.output_file.exists());
        assert_eq!(result.rows_before, 4);
        assert_eq!(result.rows_after, 3);
        assert_eq!(result.rows_removed(), 1);
        assert_eq!(result.quality.before.map(|m| m.duplicate_rows), Some(1));
        assert_eq!(result.quality.after.duplicate_rows, 0);
        assert!(result.report_files.is_empty());
    }

    #[test]
    fn test_keep_original_false_has_no_before_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = CleaningConfig::builder().output_path(dir.path()).build().unwrap();

        let result = Pipeline::builder()
            .config(config)
            .keep_original(false)
            .build()
            .unwrap()
            .process(bookings())
            .unwrap();

        assert!(result.quality.before.is_none());
    }

    #[test]
    fn test_run_requires_input_path() {
        let err = Pipeline::builder().build().unwrap().run().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }
}
