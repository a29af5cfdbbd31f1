//! Result types returned by the pipeline.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::quality::QualityComparison;
use crate::transform::ScalerSet;

/// Outcome of the in-memory stages, before anything is written.
#[derive(Debug, Clone)]
pub struct CleanedData {
    pub data: DataFrame,
    /// Scalers fitted by the feature scaling stage
    pub scalers: ScalerSet,
    pub steps: Vec<String>,
    pub warnings: Vec<String>,
}

/// Summary of a completed pipeline run.
///
/// Serialized as-is by the CLI `--json` flag.
///
/// # Example
///
/// ```rust,ignore
/// let result = Pipeline::builder().config(config).build()?.run()?;
/// println!(
///     "{} -> {} rows in {}ms, written to {}",
///     result.rows_before,
///     result.rows_after,
///     result.duration_ms,
///     result.output_file.display()
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Dataset the run was loaded from, `None` for in-memory input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_file: Option<PathBuf>,
    pub output_file: PathBuf,
    /// Report artifacts, empty unless `generate_reports` was set.
    pub report_files: Vec<PathBuf>,

    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,

    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    pub quality: QualityComparison,
    pub scalers: ScalerSet,

    pub steps: Vec<String>,
    pub warnings: Vec<String>,
}

impl PipelineResult {
    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }
}
