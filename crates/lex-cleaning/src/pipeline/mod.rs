//! Pipeline module.
//!
//! [`Pipeline`] runs the cleaning stages in a fixed order. The outlier
//! filter lives here, other stages live in their own modules.

mod builder;
pub mod outliers;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder};
pub use outliers::OutlierFilter;
pub use progress::{
    CancellationToken, CleaningStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
    StageLog,
};
