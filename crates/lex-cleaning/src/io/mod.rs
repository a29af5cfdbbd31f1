//! Dataset readers and writers.
//!
//! The pipeline supports four on-disk formats, chosen by file extension when
//! reading and by `output_format` when writing:
//!
//! | Format | Extension | Layout |
//! |---|---|---|
//! | CSV | `.csv` | header row, lossy UTF-8 decoding |
//! | Parquet | `.parquet` | |
//! | JSON | `.json` | array of records |
//! | JSON Lines | `.jsonl` | one record per line |

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{CleaningError, Result, ResultExt};

/// File name (without extension) of the persisted dataset.
pub const OUTPUT_FILE_STEM: &str = "cleaned";

/// Rows sampled by the CSV reader for schema inference.
const CSV_INFER_SCHEMA_ROWS: usize = 1000;

/// A supported tabular file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Csv,
    Parquet,
    Json,
    #[serde(rename = "jsonl")]
    JsonLines,
}

impl DataFormat {
    /// Parse a format name (`csv`, `parquet`, `json`, `jsonl`), case-insensitively.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "parquet" => Ok(Self::Parquet),
            "json" => Ok(Self::Json),
            "jsonl" => Ok(Self::JsonLines),
            other => Err(CleaningError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Detect the format from a path's extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| CleaningError::UnsupportedFormat(path.display().to_string()))?;
        Self::from_name(ext)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
            Self::Json => "json",
            Self::JsonLines => "jsonl",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.name()
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Path of the persisted dataset inside `output_dir`.
pub fn output_file_path(output_dir: &Path, format: DataFormat) -> PathBuf {
    output_dir.join(format!("{}.{}", OUTPUT_FILE_STEM, format.extension()))
}

/// Read a dataset, picking the reader from the file extension.
pub fn read_dataset(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let format = DataFormat::from_path(path)?;

    if !path.exists() {
        return Err(CleaningError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input file '{}' does not exist", path.display()),
        )));
    }

    let context = format!("Failed to read {} file '{}'", format, path.display());
    let df = match format {
        DataFormat::Csv => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(CSV_INFER_SCHEMA_ROWS))
            .with_parse_options(CsvParseOptions::default().with_encoding(CsvEncoding::LossyUtf8))
            .try_into_reader_with_file_path(Some(path.into()))
            .context(context.clone())?
            .finish()
            .context(context)?,
        DataFormat::Parquet => ParquetReader::new(File::open(path)?)
            .finish()
            .context(context)?,
        DataFormat::Json => JsonReader::new(File::open(path)?)
            .with_json_format(JsonFormat::Json)
            .finish()
            .context(context)?,
        DataFormat::JsonLines => JsonReader::new(File::open(path)?)
            .with_json_format(JsonFormat::JsonLines)
            .finish()
            .context(context)?,
    };

    tracing::info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "Loaded dataset"
    );
    Ok(df)
}

/// Write a dataset in the given format, creating parent directories.
///
/// The data goes to a temporary file in the target directory that is renamed
/// over `path` once the writer succeeds, so a failed write leaves no file.
pub fn write_dataset(df: &mut DataFrame, path: impl AsRef<Path>, format: DataFormat) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let context = format!("Failed to write {} file '{}'", format, path.display());
    let mut tmp = NamedTempFile::new_in(dir)?;
    let file = tmp.as_file_mut();
    match format {
        DataFormat::Csv => {
            CsvWriter::new(file)
                .include_header(true)
                .finish(df)
                .context(context)?;
        }
        DataFormat::Parquet => {
            ParquetWriter::new(file).finish(df).context(context)?;
        }
        DataFormat::Json => {
            JsonWriter::new(file)
                .with_json_format(JsonFormat::Json)
                .finish(df)
                .context(context)?;
        }
        DataFormat::JsonLines => {
            JsonWriter::new(file)
                .with_json_format(JsonFormat::JsonLines)
                .finish(df)
                .context(context)?;
        }
    }
    tmp.persist(path).map_err(|e| e.error)?;

    tracing::info!(path = %path.display(), rows = df.height(), "Saved dataset");
    Ok(())
}
