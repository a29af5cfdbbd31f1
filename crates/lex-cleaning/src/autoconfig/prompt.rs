//! Prompt construction for config generation.

use std::path::{Path, PathBuf};

use super::summary::DatasetSummary;
use crate::error::{CleaningError, Result};
use crate::io::DataFormat;

/// Prefix shared by generated config files and their output directories.
pub const AUTO_PREFIX: &str = "auto_";

/// What the generated config must point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub input_path: PathBuf,
    /// `auto_<stem>`
    pub output_path: String,
    /// Same format as the input
    pub output_format: DataFormat,
}

impl GenerationRequest {
    /// Derive the request for a dataset file.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` when the extension is not a dataset format.
    pub fn for_dataset(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let output_format = DataFormat::from_path(path)?;
        Ok(Self {
            input_path: path.to_path_buf(),
            output_path: format!("{}{}", AUTO_PREFIX, dataset_stem(path)?),
            output_format,
        })
    }

    /// File name the generated config is saved under: `auto_<stem>.json`.
    pub fn config_file_name(&self) -> String {
        format!("{}.json", self.output_path)
    }
}

fn dataset_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| CleaningError::InvalidConfig(format!("'{}' has no file name", path.display())))
}

/// Build the instruction sent to the model.
///
/// Lists every config field the pipeline understands with an example value
/// (aggregation marked optional, since it replaces rows with groups),
/// pins `input_path`, `output_path` and `output_format`, and asks for bare
/// JSON.
pub fn build_prompt(summary: &DatasetSummary, request: &GenerationRequest) -> String {
    let columns = serde_json::to_string(&summary.columns).unwrap_or_default();

    format!(
        "I have a dataset with the following structure:\n\
         Columns: {columns}\n\
         Data types: {dtypes}\n\
         Rows: {rows}\n\
         Column count: {count}\n\
         \n\
         Generate a JSON data-cleaning configuration with these fields:\n\
         - \"input_path\": set to \"{input}\"\n\
         - \"output_path\": set to \"{output}\"\n\
         - \"output_format\": set to \"{format}\"\n\
         - \"generate_reports\": true or false\n\
         - \"duplicates\": {{\"remove\": true}} or {{\"remove\": false}}\n\
         - \"outliers\": {{\"method\": \"zscore\" or \"iqr\", \"columns\": [numeric columns]}}\n\
         - \"text_cleaning\": columns to normalize, example: {{\"columns\": [\"meal\"]}}\n\
         - \"missing_value\": one object per column, \"method\" is \"fill\", \"ffill\" or \"statistic\"; \
         \"fill\" needs a \"value\"; \"statistic\" may set \"type\" to \"mean\" or \"median\" (numeric columns only). \
         Example: {{\"company\": {{\"method\": \"fill\", \"value\": \"No Company\"}}}}\n\
         - \"dtype_conversion\": column to \"timestamp\", \"category\", \"int\", \"float\", \"str\" or \"bool\", \
         example: {{\"reservation_status_date\": \"timestamp\"}}\n\
         - \"feature_scaling\": numeric column to \"standard\" or \"minmax\"\n\
         - \"aggregation\": optional, only when a grouped summary is wanted instead of row-level data: \
         {{\"group_by\": [columns], \"agg_dict\": {{column: \"sum\", \"mean\", \"median\", \"min\", \"max\", \
         \"count\", \"size\", \"first\", \"last\", \"std\", \"var\" or \"nunique\"}}}}; \
         a group_by column cannot also appear in agg_dict\n\
         \n\
         Only use column names from the list above.\n\
         Return only the JSON configuration, with no explanation.",
        columns = columns,
        dtypes = summary.dtypes_json(),
        rows = summary.rows,
        count = summary.columns_count,
        input = request.input_path.display(),
        output = request.output_path,
        format = request.output_format,
    )
}
