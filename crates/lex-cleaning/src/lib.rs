//! Configuration-Driven Data Cleaning Library
//!
//! A data-cleaning pipeline built with Rust and Polars. A JSON config names
//! the cleaning stages to run; the pipeline loads a dataset, runs them in a
//! fixed order, writes the result and, optionally, a data-quality report.
//!
//! # Overview
//!
//! - **Duplicate Removal**: exact duplicate rows, first occurrence kept
//! - **Outlier Filtering**: z-score or IQR filters on listed columns
//! - **Text Cleaning**: punctuation stripped, text lower-cased
//! - **Missing Values**: literal fill, forward fill, mean or median
//! - **Type Conversion**: casts, epoch timestamps and category codes
//! - **Feature Scaling**: standard or min-max, with fitted scalers returned
//! - **Aggregation**: group-by with per-column functions
//! - **Quality Reports**: before/after metrics as text, JSON and HTML
//! - **Config Generation**: an LLM drafts the config from the dataset schema
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_cleaning::{CleaningConfig, Pipeline};
//!
//! let config = CleaningConfig::from_path("hotel_bookings.json")?;
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//!
//! println!("{} -> {} rows", result.rows_before, result.rows_after);
//! println!("Written to {}", result.output_file.display());
//! ```
//!
//! # Configuration
//!
//! Configs are usually read from JSON, but can be built in code:
//!
//! ```rust,ignore
//! use lex_cleaning::config::*;
//!
//! let config = CleaningConfig::builder()
//!     .input_path("data/hotel_bookings.csv")
//!     .output_path("cleaned_hotels")
//!     .remove_duplicates(true)
//!     .outliers(OutlierMethod::Iqr, ["adr"])
//!     .impute("company", MissingValueStrategy::fill("No Company"))
//!     .convert("reservation_status_date", ConversionTarget::Timestamp)
//!     .scale("lead_time", ScalingMethod::Standard)
//!     .generate_reports(true)
//!     .build()?;
//! ```
//!
//! # Generating Configs
//!
//! ```rust,ignore
//! use lex_cleaning::ai::OllamaProvider;
//! use lex_cleaning::autoconfig::ConfigGenerator;
//! use std::sync::Arc;
//!
//! let generator = ConfigGenerator::new(Arc::new(OllamaProvider::new()?));
//! let config_path = generator.generate_to_file("hotel_bookings.csv", ".")?;
//! ```
//!
//! # Progress Reporting
//!
//! The pipeline reports progress per stage and checks a cancellation token
//! between stages:
//!
//! ```rust,ignore
//! use lex_cleaning::{CancellationToken, CleaningError, Pipeline};
//!
//! let token = CancellationToken::new();
//! let token_for_cancel = token.clone();
//!
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(10));
//!     token_for_cancel.cancel();
//! });
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .cancellation_token(token)
//!     .build()?
//!     .process(df);
//!
//! match result {
//!     Ok(result) => println!("Success!"),
//!     Err(CleaningError::Cancelled) => println!("Cancelled by user"),
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```

pub mod ai;
pub mod autoconfig;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod imputers;
pub mod io;
pub mod pipeline;
pub mod quality;
pub mod reporting;
pub mod transform;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use autoconfig::{ConfigGenerator, DatasetSummary, RetryPolicy};
pub use cleaner::{DuplicateRemover, TextCleaner, TypeConverter};
pub use config::{
    AggFunction, CleaningConfig, CleaningConfigBuilder, ConfigValidationError, ConversionTarget,
    MissingValueStrategy, OutlierMethod, ScalingMethod,
};
pub use error::{CleaningError, Result as CleaningResult, ResultExt};
pub use imputers::MissingValueImputer;
pub use io::{DataFormat, read_dataset, write_dataset};
pub use pipeline::{
    CancellationToken, CleaningStage, ClosureProgressReporter, OutlierFilter, Pipeline,
    PipelineBuilder, ProgressReporter, ProgressUpdate, StageLog,
};
pub use quality::{QualityComparison, QualityMetrics};
pub use reporting::{QualityReport, QualityReporter, ReportGenerator};
pub use transform::{Aggregator, FeatureScaler, FittedScaler, ScalerSet};
pub use types::{CleanedData, PipelineResult};
