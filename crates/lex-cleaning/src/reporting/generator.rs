use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{CleaningError, Result};
use crate::quality::{QualityComparison, QualityMetrics};

/// Subdirectory of the output path that holds report artifacts.
pub const REPORT_DIR: &str = "report";
pub const TEXT_REPORT_FILE: &str = "data_quality_comparison_report.txt";
pub const JSON_REPORT_FILE: &str = "quality_report.json";
pub const HTML_REPORT_FILE: &str = "report.html";

const REPORT_TITLE: &str = "Data Quality Comparison Report";

// ============================================================================
// Report Types
// ============================================================================

/// Everything a reporter needs to describe one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Local time the report was generated
    pub generated_at: String,
    /// Dataset the run started from, when it came from a file
    pub input_file: Option<String>,
    /// Where the cleaned dataset was written
    pub output_file: String,
    pub quality: QualityComparison,
    /// Stage steps, in execution order
    pub steps: Vec<String>,
    /// Recoverable conditions skipped during the run
    pub warnings: Vec<String>,
}

impl QualityReport {
    pub fn new(
        input_file: Option<&Path>,
        output_file: &Path,
        quality: QualityComparison,
        steps: &[String],
        warnings: &[String],
    ) -> Self {
        Self {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.map(|p| p.display().to_string()),
            output_file: output_file.display().to_string(),
            quality,
            steps: steps.to_vec(),
            warnings: warnings.to_vec(),
        }
    }
}

/// Renders a [`QualityReport`] somewhere.
///
/// Implementations must be `Send + Sync` so a pipeline holding one can move
/// to a worker thread.
pub trait QualityReporter: Send + Sync {
    /// Write the report for a run whose output lives in `output_dir`.
    ///
    /// Returns the paths of the files written.
    fn report(&self, report: &QualityReport, output_dir: &Path) -> Result<Vec<PathBuf>>;
}

// ============================================================================
// ReportGenerator
// ============================================================================

/// Writes the text, JSON and HTML reports to `<output_dir>/report/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportGenerator;

impl ReportGenerator {
    /// Plain-text comparison: a title, then "before" metrics (if any), then
    /// "after" metrics, one `name: value` line each.
    pub fn render_text(quality: &QualityComparison) -> String {
        let mut out = String::new();
        out.push_str(REPORT_TITLE);
        out.push('\n');
        out.push_str(&"=".repeat(30));
        out.push('\n');

        if let Some(before) = &quality.before {
            out.push_str("Pre-cleaning metrics:\n");
            push_metric_lines(&mut out, before);
            out.push('\n');
        }

        out.push_str("Post-cleaning metrics:\n");
        push_metric_lines(&mut out, &quality.after);
        out
    }

    /// HTML page with a Metric / Before / After table, or a plain list of
    /// post-cleaning metrics when there is no "before" snapshot.
    pub fn render_html(quality: &QualityComparison) -> String {
        let mut body = String::new();
        match &quality.before {
            Some(before) => {
                body.push_str("<table>\n<thead><tr><th>Metric</th><th>Before</th><th>After</th></tr></thead>\n<tbody>\n");
                for ((name, pre), (_, post)) in before.entries().iter().zip(quality.after.entries()) {
                    let _ = writeln!(body, "<tr><td>{}</td><td>{}</td><td>{}</td></tr>", name, pre, post);
                }
                body.push_str("</tbody>\n</table>\n");
            }
            None => {
                body.push_str("<h3>Post-cleaning metrics</h3>\n<ul>\n");
                for (name, value) in quality.after.entries() {
                    let _ = writeln!(body, "<li>{}: {}</li>", name, value);
                }
                body.push_str("</ul>\n");
            }
        }

        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n<title>{title}</title>\n\
             <style>\nbody {{ font-family: Arial, sans-serif; margin: 20px; }}\n\
             table {{ border-collapse: collapse; width: 100%; }}\n\
             th, td {{ padding: 8px; text-align: left; border-bottom: 1px solid #ddd; }}\n\
             th {{ background-color: #f2f2f2; }}\n</style>\n</head>\n<body>\n<h2>{title}</h2>\n{body}</body>\n</html>\n",
            title = REPORT_TITLE,
            body = body
        )
    }

    fn write(path: &Path, contents: &str) -> Result<()> {
        fs::write(path, contents).map_err(|e| {
            CleaningError::ReportGenerationFailed(format!("{}: {}", path.display(), e))
        })
    }
}

fn push_metric_lines(out: &mut String, metrics: &QualityMetrics) {
    for (name, value) in metrics.entries() {
        let _ = writeln!(out, "{}: {}", name, value);
    }
}

impl QualityReporter for ReportGenerator {
    fn report(&self, report: &QualityReport, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let report_dir = output_dir.join(REPORT_DIR);
        fs::create_dir_all(&report_dir).map_err(|e| {
            CleaningError::ReportGenerationFailed(format!("{}: {}", report_dir.display(), e))
        })?;

        let text_path = report_dir.join(TEXT_REPORT_FILE);
        Self::write(&text_path, &Self::render_text(&report.quality))?;

        let json_path = report_dir.join(JSON_REPORT_FILE);
        Self::write(&json_path, &serde_json::to_string_pretty(report)?)?;

        let html_path = report_dir.join(HTML_REPORT_FILE);
        Self::write(&html_path, &Self::render_html(&report.quality))?;

        info!("Reports saved to {}", report_dir.display());
        Ok(vec![text_path, json_path, html_path])
    }
}
