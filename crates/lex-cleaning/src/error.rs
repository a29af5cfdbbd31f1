//! Custom error types for the cleaning pipeline.
//!
//! This module provides the error hierarchy using `thiserror`. Stage-local
//! problems (a column missing for an optional step, an empty column) are not
//! errors: they are recorded as warnings in the stage log. Everything here
//! aborts the run.
//!
//! Errors are serializable so they can be emitted as JSON by the CLI
//! (`--json`) or forwarded to a frontend.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigValidationError;

/// The main error type for the cleaning pipeline.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// Pipeline was cancelled by the caller.
    #[error("Pipeline cancelled")]
    Cancelled,

    /// Configuration file does not exist.
    #[error("Configuration file '{}' not found", .0.display())]
    ConfigNotFound(PathBuf),

    /// Configuration could not be parsed or failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input or output format is not one of csv, parquet, json, jsonl.
    #[error("Unsupported data format: {0}")]
    UnsupportedFormat(String),

    /// Type conversion failed.
    #[error("Failed to convert column '{column}' to {target_type}: {reason}")]
    TypeConversionFailed {
        column: String,
        target_type: String,
        reason: String,
    },

    /// Imputation failed.
    #[error("Failed to impute missing values in column '{column}': {reason}")]
    ImputationFailed { column: String, reason: String },

    /// Feature scaling failed.
    #[error("Failed to scale column '{column}': {reason}")]
    ScalingFailed { column: String, reason: String },

    /// Group-by aggregation failed.
    #[error("Aggregation failed: {0}")]
    AggregationFailed(String),

    /// The completion provider never returned a usable configuration.
    #[error("Config generation failed after {attempts} attempts: {last_error}")]
    ConfigGenerationFailed { attempts: u32, last_error: String },

    /// Completion provider error (transport or protocol).
    #[error("Completion provider error: {0}")]
    ProviderError(String),

    /// Report generation failed.
    #[error("Failed to generate report: {0}")]
    ReportGenerationFailed(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleaningError>,
    },
}

impl From<ConfigValidationError> for CleaningError {
    fn from(err: ConfigValidationError) -> Self {
        match err {
            ConfigValidationError::UnsupportedOutputFormat(format) => {
                CleaningError::UnsupportedFormat(format)
            }
            other => CleaningError::InvalidConfig(other.to_string()),
        }
    }
}

impl CleaningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for machine-readable output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::TypeConversionFailed { .. } => "TYPE_CONVERSION_FAILED",
            Self::ImputationFailed { .. } => "IMPUTATION_FAILED",
            Self::ScalingFailed { .. } => "SCALING_FAILED",
            Self::AggregationFailed(_) => "AGGREGATION_FAILED",
            Self::ConfigGenerationFailed { .. } => "CONFIG_GENERATION_FAILED",
            Self::ProviderError(_) => "PROVIDER_ERROR",
            Self::ReportGenerationFailed(_) => "REPORT_GENERATION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Startup errors happen before any stage touches the data.
    pub fn is_startup_error(&self) -> bool {
        match self {
            Self::ConfigNotFound(_) | Self::InvalidConfig(_) | Self::UnsupportedFormat(_) => true,
            Self::WithContext { source, .. } => source.is_startup_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(CleaningError::Cancelled.error_code(), "CANCELLED");
        assert_eq!(
            CleaningError::AggregationFailed("column 'x' not found".to_string()).error_code(),
            "AGGREGATION_FAILED"
        );
        assert_eq!(
            CleaningError::ConfigGenerationFailed {
                attempts: 5,
                last_error: "bad json".to_string()
            }
            .error_code(),
            "CONFIG_GENERATION_FAILED"
        );
    }

    #[test]
    fn test_is_cancelled() {
        assert!(CleaningError::Cancelled.is_cancelled());
        assert!(CleaningError::Cancelled.with_context("stage 3").is_cancelled());
        assert!(!CleaningError::AggregationFailed("x".to_string()).is_cancelled());
    }

    #[test]
    fn test_is_startup_error() {
        assert!(CleaningError::ConfigNotFound(PathBuf::from("missing.json")).is_startup_error());
        assert!(CleaningError::UnsupportedFormat("xlsx".to_string()).is_startup_error());
        assert!(
            !CleaningError::TypeConversionFailed {
                column: "age".to_string(),
                target_type: "int".to_string(),
                reason: "bad".to_string(),
            }
            .is_startup_error()
        );
    }

    #[test]
    fn test_error_serialization() {
        let error = CleaningError::ImputationFailed {
            column: "Age".to_string(),
            reason: "no numeric values".to_string(),
        };
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("IMPUTATION_FAILED"));
        assert!(json.contains("Age"));
    }

    #[test]
    fn test_with_context() {
        let error =
            CleaningError::AggregationFailed("test".to_string()).with_context("During aggregation");
        assert!(error.to_string().contains("During aggregation"));
        assert_eq!(error.error_code(), "AGGREGATION_FAILED");
    }

    #[test]
    fn test_validation_error_converts_to_invalid_config() {
        let err: CleaningError = ConfigValidationError::EmptyColumns("aggregation.group_by".to_string()).into();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }
}
