//! Duplicate row removal.

use polars::prelude::*;

use crate::config::CleaningConfig;
use crate::error::Result;
use crate::pipeline::progress::StageLog;

/// Removes rows that repeat an earlier row across all columns.
pub struct DuplicateRemover;

impl DuplicateRemover {
    /// Run the stage when `duplicates.remove` is true; identity otherwise.
    pub fn apply(df: DataFrame, config: &CleaningConfig, log: &mut StageLog) -> Result<DataFrame> {
        if !config.duplicates.is_some_and(|d| d.remove) {
            return Ok(df);
        }

        let before = df.height();
        let df = unique_rows(&df)?;
        let removed = before - df.height();

        if removed > 0 {
            let pct = (removed as f64 / before as f64) * 100.0;
            log.step(format!("Removed {} duplicate rows ({:.1}%)", removed, pct));
        } else {
            log.step("No duplicate rows found");
        }
        Ok(df)
    }
}

/// First occurrence of every distinct row, in original order.
///
/// Nulls compare equal to each other.
pub fn unique_rows(df: &DataFrame) -> PolarsResult<DataFrame> {
    if df.width() == 0 || df.height() < 2 {
        return Ok(df.clone());
    }
    df.clone()
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()
}

/// Number of rows that repeat an earlier row.
pub fn count_duplicate_rows(df: &DataFrame) -> PolarsResult<usize> {
    Ok(df.height() - unique_rows(df)?.height())
}
