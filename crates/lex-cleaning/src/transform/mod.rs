//! Numeric transforms that run at the end of the pipeline.

mod aggregation;
mod scaling;

pub use aggregation::Aggregator;
pub use scaling::{FeatureScaler, FittedScaler, ScalerSet};
