//! Missing value imputation stage.
//!
//! Strategies from the `missing_value` section are applied one column at a
//! time, in the order they appear in the config:
//! - `fill`: a literal value
//! - `ffill`: the nearest preceding non-missing value
//! - `statistic`: the column mean or median, or a literal fallback

mod statistical;

pub use statistical::{FillValue, StatisticalImputer};

use polars::prelude::*;

use crate::config::{CleaningConfig, ImputeMethod, MissingValueStrategy, StatisticKind};
use crate::error::{CleaningError, Result};
use crate::pipeline::progress::StageLog;
use crate::utils::is_numeric_dtype;

/// Applies the `missing_value` section.
pub struct MissingValueImputer;

impl MissingValueImputer {
    pub fn apply(df: DataFrame, config: &CleaningConfig, log: &mut StageLog) -> Result<DataFrame> {
        let Some(strategies) = &config.missing_value else {
            return Ok(df);
        };

        let mut df = df;
        for (column, strategy) in strategies.iter() {
            let Ok(col) = df.column(column) else {
                log.warn(format!(
                    "Column '{}' not found, skipping missing value handling",
                    column
                ));
                continue;
            };
            let series = col.as_materialized_series().clone();
            let missing = series.null_count();

            let Some((filled, description)) = Self::impute_column(&series, strategy, log)? else {
                continue;
            };

            df.replace(column, filled)?;
            log.step(format!(
                "Filled {} missing values in '{}' with {}",
                missing, column, description
            ));
        }

        Ok(df)
    }

    /// Impute one column. `None` means the column was left untouched.
    fn impute_column(
        series: &Series,
        strategy: &MissingValueStrategy,
        log: &mut StageLog,
    ) -> Result<Option<(Series, String)>> {
        let column = series.name().to_string();
        let failed = |reason: String| CleaningError::ImputationFailed {
            column: column.clone(),
            reason,
        };

        match strategy.method {
            ImputeMethod::Fill => {
                let value = strategy
                    .value
                    .as_ref()
                    .ok_or_else(|| failed("'fill' requires a value".to_string()))?;
                Self::fill_with(series, value).map(Some)
            }
            ImputeMethod::Ffill => {
                let filled = StatisticalImputer::forward_fill(series)
                    .map_err(|e| failed(e.to_string()))?;
                Ok(Some((filled, "forward fill".to_string())))
            }
            ImputeMethod::Statistic => match strategy.statistic {
                Some(kind @ (StatisticKind::Mean | StatisticKind::Median)) => {
                    if !is_numeric_dtype(series.dtype()) {
                        return Err(failed(format!(
                            "cannot compute {:?} of non-numeric column ({})",
                            kind,
                            series.dtype()
                        )));
                    }
                    let stat = StatisticalImputer::statistic(series, kind)
                        .map_err(|e| failed(e.to_string()))?;
                    let Some(stat) = stat else {
                        log.warn(format!(
                            "Column '{}' has no values to compute a statistic from, left as is",
                            column
                        ));
                        return Ok(None);
                    };
                    let filled = StatisticalImputer::fill_float(series, stat)
                        .map_err(|e| failed(e.to_string()))?;
                    Ok(Some((filled, format!("{:?} {}", kind, stat).to_lowercase())))
                }
                _ => {
                    let fallback = strategy
                        .value
                        .clone()
                        .filter(|v| !v.is_null())
                        .unwrap_or_else(|| serde_json::json!(0));
                    Self::fill_with(series, &fallback).map(Some)
                }
            },
        }
    }

    fn fill_with(series: &Series, value: &serde_json::Value) -> Result<(Series, String)> {
        let fill = FillValue::resolve(series.dtype(), value);
        let filled = StatisticalImputer::fill_literal(series, &fill).map_err(|e| {
            CleaningError::ImputationFailed {
                column: series.name().to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok((filled, fill.describe()))
    }
}
