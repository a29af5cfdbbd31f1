//! Data quality metrics.
//!
//! A [`QualityMetrics`] snapshot is taken of the dataset before and after
//! cleaning. The pair is handed to the reporter as a [`QualityComparison`].

mod metrics;

pub use metrics::{QualityComparison, QualityMetrics};
