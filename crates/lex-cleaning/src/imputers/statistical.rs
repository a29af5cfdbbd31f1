//! Column-level fill primitives.
//!
//! Each function takes a column and returns a new column of the same name
//! and length with its nulls replaced.

use polars::prelude::*;

use crate::config::StatisticKind;
use crate::utils::{is_numeric_dtype, json_scalar_to_text, non_null_f64};

/// A fill literal resolved against the column it is written into.
#[derive(Debug, Clone, PartialEq)]
pub enum FillValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl FillValue {
    /// Decide how `value` is stored in a column of `dtype`.
    ///
    /// Numbers stay numeric in numeric (or all-null) columns, booleans stay
    /// boolean in boolean columns. Anything else widens the column to text.
    pub fn resolve(dtype: &DataType, value: &serde_json::Value) -> Self {
        let numeric_slot = is_numeric_dtype(dtype) || dtype == &DataType::Null;
        match value {
            serde_json::Value::Number(n) if numeric_slot => {
                let integer_column = dtype.is_integer() || dtype == &DataType::Null;
                match n.as_i64() {
                    Some(i) if integer_column => Self::Int(i),
                    _ => n
                        .as_f64()
                        .map(Self::Float)
                        .unwrap_or_else(|| Self::Text(n.to_string())),
                }
            }
            serde_json::Value::Bool(b) if matches!(dtype, DataType::Boolean | DataType::Null) => {
                Self::Bool(*b)
            }
            other => Self::Text(json_scalar_to_text(other)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Bool(v) => v.to_string(),
            Self::Text(v) => format!("'{}'", v),
        }
    }
}

/// Statistical imputation and literal fills.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Replace nulls with a literal, widening the column when needed.
    pub fn fill_literal(series: &Series, value: &FillValue) -> PolarsResult<Series> {
        let name = series.name().clone();
        Ok(match value {
            // Strict casts: a value that does not fit must fail, not turn null
            FillValue::Int(v) => match series.strict_cast(&DataType::Int64) {
                Ok(cast) => {
                    let filled: Vec<i64> =
                        cast.i64()?.into_iter().map(|x| x.unwrap_or(*v)).collect();
                    Series::new(name, filled)
                }
                Err(_) if *v >= 0 && series.dtype().is_unsigned_integer() => {
                    let fill = *v as u64;
                    let cast = series.strict_cast(&DataType::UInt64)?;
                    let filled: Vec<u64> =
                        cast.u64()?.into_iter().map(|x| x.unwrap_or(fill)).collect();
                    Series::new(name, filled)
                }
                Err(e) => return Err(e),
            },
            FillValue::Float(v) => Self::fill_float(series, *v)?,
            FillValue::Bool(v) => {
                let cast = series.cast(&DataType::Boolean)?;
                let filled: Vec<bool> = cast.bool()?.into_iter().map(|x| x.unwrap_or(*v)).collect();
                Series::new(name, filled)
            }
            FillValue::Text(v) => {
                let cast = series.cast(&DataType::String)?;
                let filled: Vec<String> = cast
                    .str()?
                    .into_iter()
                    .map(|x| x.unwrap_or(v.as_str()).to_string())
                    .collect();
                Series::new(name, filled)
            }
        })
    }

    /// Replace nulls with `value`, storing the column as Float64.
    pub fn fill_float(series: &Series, value: f64) -> PolarsResult<Series> {
        let cast = series.cast(&DataType::Float64)?;
        let filled: Vec<f64> = cast.f64()?.into_iter().map(|x| x.unwrap_or(value)).collect();
        Ok(Series::new(series.name().clone(), filled))
    }

    /// Propagate the last non-null value forward. Leading nulls remain.
    pub fn forward_fill(series: &Series) -> PolarsResult<Series> {
        series.fill_null(FillNullStrategy::Forward(None))
    }

    /// Mean or median of the non-null, non-NaN values, `None` when there are
    /// none.
    ///
    /// Callers must check the column is numeric.
    pub fn statistic(series: &Series, kind: StatisticKind) -> PolarsResult<Option<f64>> {
        let observed: Vec<f64> = non_null_f64(series)?
            .into_iter()
            .filter(|v| !v.is_nan())
            .collect();
        if observed.is_empty() {
            return Ok(None);
        }
        let values = Series::new(series.name().clone(), observed);
        Ok(match kind {
            StatisticKind::Mean => values.mean(),
            StatisticKind::Median => values.median(),
            StatisticKind::Other => None,
        })
    }
}
