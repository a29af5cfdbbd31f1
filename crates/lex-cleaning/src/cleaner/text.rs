//! Text normalization.

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

use crate::config::CleaningConfig;
use crate::error::{Result, ResultExt};
use crate::pipeline::progress::StageLog;

/// Anything that is not a word character or whitespace.
static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("Invalid regex: non-word characters"));

/// Strip punctuation and symbols, then lower-case.
///
/// Word characters are Unicode letters, digits and `_`.
pub fn clean_text_value(value: &str) -> String {
    NON_WORD.replace_all(value, "").to_lowercase()
}

/// Normalizes the columns listed under `text_cleaning.columns`.
pub struct TextCleaner;

impl TextCleaner {
    pub fn apply(df: DataFrame, config: &CleaningConfig, log: &mut StageLog) -> Result<DataFrame> {
        let Some(text) = &config.text_cleaning else {
            return Ok(df);
        };

        let mut df = df;
        for column in &text.columns {
            let Ok(col) = df.column(column) else {
                log.warn(format!("Column '{}' not found, skipping text cleaning", column));
                continue;
            };

            let as_text = col
                .as_materialized_series()
                .cast(&DataType::String)
                .context(format!("Failed to read column '{}' as text", column))?;
            let cleaned: Vec<Option<String>> = as_text
                .str()?
                .into_iter()
                .map(|v| v.map(clean_text_value))
                .collect();

            df.replace(column, Series::new(column.as_str().into(), cleaned))?;
            log.step(format!("Cleaned text in column '{}'", column));
        }

        Ok(df)
    }
}
