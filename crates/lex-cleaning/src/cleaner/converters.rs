//! Type conversion stage.
//!
//! Conversion failures are fatal: a column that cannot be converted to the
//! requested type would silently corrupt every later stage.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::HashMap;

use crate::config::{CleaningConfig, ConversionTarget};
use crate::error::{CleaningError, Result};
use crate::pipeline::progress::StageLog;
use crate::utils::is_numeric_dtype;

/// Datetime layouts accepted for `timestamp` conversion of text columns.
const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// Date layouts accepted for `timestamp` conversion of text columns.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

const SECONDS_PER_DAY: i64 = 86_400;

const TRUE_VALUES: [&str; 4] = ["true", "t", "yes", "1"];
const FALSE_VALUES: [&str; 4] = ["false", "f", "no", "0"];

/// Applies the `dtype_conversion` section in file order.
pub struct TypeConverter;

impl TypeConverter {
    pub fn apply(df: DataFrame, config: &CleaningConfig, log: &mut StageLog) -> Result<DataFrame> {
        let Some(conversions) = &config.dtype_conversion else {
            return Ok(df);
        };

        let mut df = df;
        for (column, target) in conversions.iter() {
            let Ok(col) = df.column(column) else {
                log.warn(format!("Column '{}' not found, skipping type conversion", column));
                continue;
            };

            let converted = Self::convert(col.as_materialized_series(), *target).map_err(|reason| {
                CleaningError::TypeConversionFailed {
                    column: column.to_string(),
                    target_type: target.name().to_string(),
                    reason,
                }
            })?;

            df.replace(column, converted)?;
            log.step(format!("Converted column '{}' to {}", column, target.name()));
        }

        Ok(df)
    }

    fn convert(series: &Series, target: ConversionTarget) -> std::result::Result<Series, String> {
        match target {
            ConversionTarget::Timestamp => to_epoch_seconds(series),
            ConversionTarget::Category => category_codes(series).map_err(|e| e.to_string()),
            ConversionTarget::Boolean if series.dtype() == &DataType::String => string_to_boolean(series),
            ConversionTarget::Int64 => strict_cast(series, &DataType::Int64),
            ConversionTarget::Int32 => strict_cast(series, &DataType::Int32),
            ConversionTarget::Float64 => strict_cast(series, &DataType::Float64),
            ConversionTarget::Float32 => strict_cast(series, &DataType::Float32),
            ConversionTarget::String => strict_cast(series, &DataType::String),
            ConversionTarget::Boolean => strict_cast(series, &DataType::Boolean),
        }
    }
}

/// Cast that fails instead of producing new nulls.
fn strict_cast(series: &Series, dtype: &DataType) -> std::result::Result<Series, String> {
    series.strict_cast(dtype).map_err(|e| e.to_string())
}

/// Parse textual booleans, rejecting anything unrecognized.
fn string_to_boolean(series: &Series) -> std::result::Result<Series, String> {
    let values = series.str().map_err(|e| e.to_string())?;
    let mut result: Vec<Option<bool>> = Vec::with_capacity(values.len());

    for value in values.into_iter() {
        match value {
            Some(v) => {
                let lower = v.trim().to_ascii_lowercase();
                if TRUE_VALUES.contains(&lower.as_str()) {
                    result.push(Some(true));
                } else if FALSE_VALUES.contains(&lower.as_str()) {
                    result.push(Some(false));
                } else {
                    return Err(format!("'{}' is not a boolean", v));
                }
            }
            None => result.push(None),
        }
    }

    Ok(Series::new(series.name().clone(), result))
}

/// Convert a column to whole seconds since the Unix epoch (Int64).
///
/// Datetime and date columns are reduced directly. Text is parsed with the
/// common ISO-like layouts (RFC 3339 first). Numeric columns are taken to
/// already hold epoch seconds. Nulls stay null.
pub fn to_epoch_seconds(series: &Series) -> std::result::Result<Series, String> {
    let name = series.name().clone();
    match series.dtype() {
        DataType::Datetime(unit, _) => {
            let per_second = match unit {
                TimeUnit::Nanoseconds => 1_000_000_000,
                TimeUnit::Microseconds => 1_000_000,
                TimeUnit::Milliseconds => 1_000,
            };
            let raw = series.cast(&DataType::Int64).map_err(|e| e.to_string())?;
            let seconds: Vec<Option<i64>> = raw
                .i64()
                .map_err(|e| e.to_string())?
                .into_iter()
                .map(|v| v.map(|t| t.div_euclid(per_second)))
                .collect();
            Ok(Series::new(name, seconds))
        }
        DataType::Date => {
            let days = series.cast(&DataType::Int32).map_err(|e| e.to_string())?;
            let seconds: Vec<Option<i64>> = days
                .i32()
                .map_err(|e| e.to_string())?
                .into_iter()
                .map(|v| v.map(|d| i64::from(d) * SECONDS_PER_DAY))
                .collect();
            Ok(Series::new(name, seconds))
        }
        DataType::String => {
            let values = series.str().map_err(|e| e.to_string())?;
            let mut seconds: Vec<Option<i64>> = Vec::with_capacity(values.len());
            for value in values.into_iter() {
                match value {
                    Some(v) => match parse_epoch_seconds(v) {
                        Some(s) => seconds.push(Some(s)),
                        None => return Err(format!("cannot parse '{}' as a date or datetime", v)),
                    },
                    None => seconds.push(None),
                }
            }
            Ok(Series::new(name, seconds))
        }
        dtype if is_numeric_dtype(dtype) => strict_cast(series, &DataType::Int64),
        dtype => Err(format!("cannot interpret {} values as timestamps", dtype)),
    }
}

/// Epoch seconds of one textual date or datetime, read as UTC.
fn parse_epoch_seconds(value: &str) -> Option<i64> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc().timestamp());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
        }
    }
    None
}

/// Replace values with Int32 codes assigned in first-seen order.
///
/// Values are compared by their textual form; nulls get code -1.
pub fn category_codes(series: &Series) -> PolarsResult<Series> {
    let as_text = series.cast(&DataType::String)?;
    let mut codes: HashMap<String, i32> = HashMap::new();
    let mut result: Vec<i32> = Vec::with_capacity(series.len());

    for value in as_text.str()?.into_iter() {
        match value {
            Some(v) => {
                let next = codes.len() as i32;
                result.push(*codes.entry(v.to_string()).or_insert(next));
            }
            None => result.push(-1),
        }
    }

    Ok(Series::new(series.name().clone(), result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert_one(df: DataFrame, column: &str, target: ConversionTarget) -> Result<DataFrame> {
        let config = CleaningConfig::builder().convert(column, target).build().unwrap();
        TypeConverter::apply(df, &config, &mut StageLog::new())
    }

    fn i64_values(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_timestamp_from_strings() {
        let df = df! {
            "date" => &[Some("2015-07-01"), Some("2015-07-01 12:30:00"), None, Some("1970-01-02T00:00:00Z")],
        }
        .unwrap();

        let result = convert_one(df, "date", ConversionTarget::Timestamp).unwrap();

        assert_eq!(
            i64_values(&result, "date"),
            vec![Some(1_435_708_800), Some(1_435_753_800), None, Some(86_400)]
        );
    }

    #[test]
    fn test_timestamp_from_datetime_column() {
        let millis = Series::new("ts".into(), &[0i64, 90_500, -1]);
        let datetime = millis
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let df = DataFrame::new(vec![datetime.into()]).unwrap();

        let result = convert_one(df, "ts", ConversionTarget::Timestamp).unwrap();
        assert_eq!(i64_values(&result, "ts"), vec![Some(0), Some(90), Some(-1)]);
    }

    #[test]
    fn test_timestamp_parse_failure_is_fatal() {
        let df = df! { "date" => &["2015-07-01", "not a date"] }.unwrap();
        let err = convert_one(df, "date", ConversionTarget::Timestamp).unwrap_err();

        assert_eq!(err.error_code(), "TYPE_CONVERSION_FAILED");
        assert!(err.to_string().contains("date"));
        assert!(err.to_string().contains("not a date"));
    }

    #[test]
    fn test_category_codes_first_seen_order() {
        let df = df! { "hotel" => &[Some("Resort"), Some("City"), None, Some("Resort")] }.unwrap();
        let result = convert_one(df, "hotel", ConversionTarget::Category).unwrap();

        let codes: Vec<Option<i32>> = result
            .column("hotel")
            .unwrap()
            .as_materialized_series()
            .i32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(codes, vec![Some(0), Some(1), Some(-1), Some(0)]);
    }

    #[test]
    fn test_strict_cast_to_int() {
        let df = df! { "adults" => &["1", "2", "3"] }.unwrap();
        let result = convert_one(df, "adults", ConversionTarget::Int64).unwrap();
        assert_eq!(i64_values(&result, "adults"), vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_strict_cast_failure_is_fatal() {
        let df = df! { "adults" => &["1", "two"] }.unwrap();
        let err = convert_one(df, "adults", ConversionTarget::Int64).unwrap_err();
        assert!(matches!(
            err,
            CleaningError::TypeConversionFailed { ref column, .. } if column == "adults"
        ));
    }

    #[test]
    fn test_string_to_boolean() {
        let df = df! { "flag" => &[Some("Yes"), Some("false"), None] }.unwrap();
        let result = convert_one(df, "flag", ConversionTarget::Boolean).unwrap();

        let flags: Vec<Option<bool>> = result
            .column("flag")
            .unwrap()
            .as_materialized_series()
            .bool()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(flags, vec![Some(true), Some(false), None]);
    }

    #[test]
    fn test_missing_column_warns_and_continues() {
        let df = df! { "a" => &[1, 2] }.unwrap();
        let config = CleaningConfig::builder()
            .convert("ghost", ConversionTarget::Float64)
            .convert("a", ConversionTarget::Float64)
            .build()
            .unwrap();
        let mut log = StageLog::new();

        let result = TypeConverter::apply(df, &config, &mut log).unwrap();
        assert_eq!(result.column("a").unwrap().dtype(), &DataType::Float64);
        assert_eq!(log.warnings().len(), 1);
        assert_eq!(log.steps().len(), 1);
    }
}
