//! Outlier filtering stage.
//!
//! Removes rows whose value in a configured numeric column is an outlier.
//! Columns are filtered one after another: the statistics for each column are
//! computed on the rows that survived the previous columns.

use polars::prelude::*;

use crate::config::{CleaningConfig, OutlierMethod};
use crate::error::{Result, ResultExt};
use crate::pipeline::progress::StageLog;
use crate::utils::{is_numeric_dtype, numeric_values, population_mean_std};

/// Rows with `|z| >= ZSCORE_THRESHOLD` are outliers.
pub const ZSCORE_THRESHOLD: f64 = 3.0;

/// Fence multiplier for the IQR rule.
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Filters outlier rows according to the `outliers` section.
pub struct OutlierFilter;

impl OutlierFilter {
    /// Run the stage. Without an `outliers` section the frame is returned as is.
    pub fn apply(df: DataFrame, config: &CleaningConfig, log: &mut StageLog) -> Result<DataFrame> {
        let Some(outliers) = &config.outliers else {
            return Ok(df);
        };

        let mut df = df;
        for column in &outliers.columns {
            let Ok(col) = df.column(column) else {
                log.warn(format!(
                    "Column '{}' not found, skipping outlier filtering",
                    column
                ));
                continue;
            };
            let series = col.as_materialized_series();
            if !is_numeric_dtype(series.dtype()) {
                log.warn(format!(
                    "Column '{}' is not numeric ({}), skipping outlier filtering",
                    column,
                    series.dtype()
                ));
                continue;
            }

            let values = numeric_values(series)
                .context(format!("Failed to read column '{}' as numbers", column))?;
            let keep = match outliers.method {
                OutlierMethod::Zscore => zscore_mask(&values),
                OutlierMethod::Iqr => iqr_mask(&values)?,
            };

            let Some(keep) = keep else {
                log.step(format!(
                    "Column '{}' has no spread, no rows removed ({})",
                    column,
                    outliers.method.name()
                ));
                continue;
            };

            let before = df.height();
            let mask = BooleanChunked::from_slice("mask".into(), &keep);
            df = df.filter(&mask)?;
            log.step(format!(
                "Removed {} outlier rows from '{}' using {}",
                before - df.height(),
                column,
                outliers.method.name()
            ));
        }

        Ok(df)
    }
}

/// Non-missing observations: nulls and NaN are excluded from the statistics.
fn observed(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().filter(|v| !v.is_nan()).collect()
}

/// Keep-mask for the z-score rule, or `None` when the column is constant.
///
/// Missing values are always kept.
pub fn zscore_mask(values: &[Option<f64>]) -> Option<Vec<bool>> {
    let (mean, std) = population_mean_std(&observed(values))?;
    if std == 0.0 || !std.is_finite() {
        return None;
    }

    Some(
        values
            .iter()
            .map(|v| match v {
                Some(x) if !x.is_nan() => ((x - mean) / std).abs() < ZSCORE_THRESHOLD,
                _ => true,
            })
            .collect(),
    )
}

/// Inclusive `(lower, upper)` IQR fences with linearly interpolated quartiles.
pub fn iqr_bounds(values: &[f64]) -> PolarsResult<Option<(f64, f64)>> {
    let ca = Float64Chunked::from_vec("values".into(), values.to_vec());
    let q1 = ca.quantile(0.25, QuantileMethod::Linear)?;
    let q3 = ca.quantile(0.75, QuantileMethod::Linear)?;

    Ok(match (q1, q3) {
        (Some(q1), Some(q3)) => {
            let iqr = q3 - q1;
            Some((q1 - IQR_MULTIPLIER * iqr, q3 + IQR_MULTIPLIER * iqr))
        }
        _ => None,
    })
}

/// Keep-mask for the IQR rule, or `None` when the column has no values.
fn iqr_mask(values: &[Option<f64>]) -> Result<Option<Vec<bool>>> {
    let Some((lower, upper)) = iqr_bounds(&observed(values))? else {
        return Ok(None);
    };

    Ok(Some(
        values
            .iter()
            .map(|v| match v {
                Some(x) if !x.is_nan() => *x >= lower && *x <= upper,
                _ => true,
            })
            .collect(),
    ))
}
