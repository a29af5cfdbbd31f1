//! Feature scaling stage.
//!
//! Each configured column gets its own fitted scaler, which is returned to
//! the caller so scaled values can be mapped back later.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{CleaningConfig, OrderedMap, ScalingMethod};
use crate::error::{CleaningError, Result};
use crate::pipeline::progress::StageLog;
use crate::utils::{is_numeric_dtype, min_max, non_null_f64, numeric_values, population_mean_std};

/// Parameters learned from one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum FittedScaler {
    /// `(x - mean) / std`
    Standard { mean: f64, std: f64 },
    /// `(x - min) / (max - min)`
    #[serde(rename = "minmax")]
    MinMax { min: f64, max: f64 },
}

impl FittedScaler {
    /// Fit on the observed values. `None` when there are none.
    ///
    /// A zero standard deviation or range is stored as 1 so constant
    /// columns map to 0 instead of NaN.
    pub fn fit(method: ScalingMethod, values: &[f64]) -> Option<Self> {
        match method {
            ScalingMethod::Standard => population_mean_std(values).map(|(mean, std)| Self::Standard {
                mean,
                std: if std == 0.0 { 1.0 } else { std },
            }),
            ScalingMethod::Minmax => min_max(values).map(|(min, max)| Self::MinMax {
                min,
                max: if max == min { min + 1.0 } else { max },
            }),
        }
    }

    pub fn method(&self) -> ScalingMethod {
        match self {
            Self::Standard { .. } => ScalingMethod::Standard,
            Self::MinMax { .. } => ScalingMethod::Minmax,
        }
    }

    fn center_and_scale(&self) -> (f64, f64) {
        match *self {
            Self::Standard { mean, std } => (mean, std),
            Self::MinMax { min, max } => (min, max - min),
        }
    }

    pub fn transform(&self, value: f64) -> f64 {
        let (center, scale) = self.center_and_scale();
        (value - center) / scale
    }

    pub fn inverse_transform(&self, value: f64) -> f64 {
        let (center, scale) = self.center_and_scale();
        value * scale + center
    }

    /// Scale a numeric column to Float64, keeping nulls.
    pub fn transform_series(&self, series: &Series) -> PolarsResult<Series> {
        self.map_series(series, |v| self.transform(v))
    }

    pub fn inverse_transform_series(&self, series: &Series) -> PolarsResult<Series> {
        self.map_series(series, |v| self.inverse_transform(v))
    }

    fn map_series(&self, series: &Series, f: impl Fn(f64) -> f64) -> PolarsResult<Series> {
        let mapped: Vec<Option<f64>> = numeric_values(series)?
            .into_iter()
            .map(|v| v.map(&f))
            .collect();
        Ok(Series::new(series.name().clone(), mapped))
    }
}

/// Fitted scalers keyed by column name, in fitting order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScalerSet(OrderedMap<FittedScaler>);

impl ScalerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, scaler: FittedScaler) {
        self.0.insert(column, scaler);
    }

    pub fn get(&self, column: &str) -> Option<&FittedScaler> {
        self.0.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FittedScaler)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Map scaled columns back to their original units.
    ///
    /// Columns without a scaler, or scalers without a column, are ignored.
    pub fn inverse_transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut result = df.clone();
        for (column, scaler) in self.iter() {
            if let Ok(col) = df.column(column) {
                let restored = scaler.inverse_transform_series(col.as_materialized_series())?;
                result.replace(column, restored)?;
            }
        }
        Ok(result)
    }
}

/// Applies the `feature_scaling` section.
pub struct FeatureScaler;

impl FeatureScaler {
    pub fn apply(
        df: DataFrame,
        config: &CleaningConfig,
        log: &mut StageLog,
    ) -> Result<(DataFrame, ScalerSet)> {
        let mut scalers = ScalerSet::new();
        let Some(methods) = &config.feature_scaling else {
            return Ok((df, scalers));
        };

        let mut df = df;
        for (column, method) in methods.iter() {
            let Ok(col) = df.column(column) else {
                log.warn(format!("Column '{}' not found, skipping scaling", column));
                continue;
            };
            if df.height() == 0 {
                log.warn(format!("Column '{}' has no rows, skipping scaling", column));
                continue;
            }

            let series = col.as_materialized_series();
            let failed = |reason: String| CleaningError::ScalingFailed {
                column: column.to_string(),
                reason,
            };
            if !is_numeric_dtype(series.dtype()) {
                return Err(failed(format!("column is not numeric ({})", series.dtype())));
            }

            let observed = non_null_f64(series).map_err(|e| failed(e.to_string()))?;
            let Some(scaler) = FittedScaler::fit(*method, &observed) else {
                log.warn(format!("Column '{}' has no values to fit, skipping scaling", column));
                continue;
            };

            let scaled = scaler
                .transform_series(series)
                .map_err(|e| failed(e.to_string()))?;
            df.replace(column, scaled)?;
            scalers.insert(column, scaler);
            log.step(format!("Scaled column '{}' using {}", column, method.name()));
        }

        Ok((df, scalers))
    }
}
