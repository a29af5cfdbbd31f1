//! Quality report generation.
//!
//! The pipeline hands a [`QualityReport`] to a [`QualityReporter`] after the
//! cleaned dataset has been written. [`ReportGenerator`] is the default
//! reporter; it writes three files under `<output_path>/report/`:
//!
//! - `data_quality_comparison_report.txt`: before/after metrics as text
//! - `quality_report.json`: the full [`QualityReport`]
//! - `report.html`: the metrics as a table
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_cleaning::reporting::{QualityReporter, ReportGenerator};
//!
//! let written = ReportGenerator.report(&report, Path::new("output"))?;
//! ```

mod generator;

pub use generator::{
    HTML_REPORT_FILE, JSON_REPORT_FILE, QualityReport, QualityReporter, REPORT_DIR,
    ReportGenerator, TEXT_REPORT_FILE,
};
