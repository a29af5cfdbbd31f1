//! Configuration types for the cleaning pipeline.
//!
//! A [`CleaningConfig`] is read once from a JSON object and validated eagerly.
//! Each stage owns one optional, explicitly typed section; a missing section
//! means the stage is an identity transform. Map-valued sections keep the
//! order in which keys appear in the file, because imputation, conversion and
//! aggregation are applied (and emitted) in that order.
//!
//! Programmatic construction goes through [`CleaningConfig::builder()`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CleaningError, Result};
use crate::io::DataFormat;

// ============================================================================
// Ordered map
// ============================================================================

/// A string-keyed map that remembers insertion order.
///
/// Repeated keys keep their first position and take the last value, which
/// mirrors how a JSON object with duplicate keys is usually read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedMap<T>(IndexMap<String, T>);

impl<T> Default for OrderedMap<T> {
    fn default() -> Self {
        Self(IndexMap::new())
    }
}

impl<T> OrderedMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: T) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, T> FromIterator<(K, T)> for OrderedMap<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ============================================================================
// Stage sections
// ============================================================================

/// `duplicates` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DuplicatesConfig {
    #[serde(default)]
    pub remove: bool,
}

/// Outlier detection rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    /// `|x - mean| / std < 3` with population std.
    Zscore,
    /// `Q1 - 1.5*IQR <= x <= Q3 + 1.5*IQR`.
    Iqr,
}

impl OutlierMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Zscore => "zscore",
            Self::Iqr => "iqr",
        }
    }
}

/// `outliers` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierConfig {
    pub method: OutlierMethod,
    #[serde(default)]
    pub columns: Vec<String>,
}

/// `text_cleaning` section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextCleaningConfig {
    #[serde(default)]
    pub columns: Vec<String>,
}

/// How missing entries of one column are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImputeMethod {
    Fill,
    Ffill,
    Statistic,
}

/// Statistic used by [`ImputeMethod::Statistic`].
///
/// Any unrecognized name deserializes to `Other`, which falls back to the
/// strategy's literal `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticKind {
    Mean,
    Median,
    #[serde(other)]
    Other,
}

/// One entry of the `missing_value` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingValueStrategy {
    pub method: ImputeMethod,

    /// Literal used by `fill`, and by `statistic` when no statistic applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub statistic: Option<StatisticKind>,
}

impl MissingValueStrategy {
    pub fn fill(value: impl Into<serde_json::Value>) -> Self {
        Self {
            method: ImputeMethod::Fill,
            value: Some(value.into()),
            statistic: None,
        }
    }

    pub fn ffill() -> Self {
        Self {
            method: ImputeMethod::Ffill,
            value: None,
            statistic: None,
        }
    }

    pub fn statistic(kind: StatisticKind) -> Self {
        Self {
            method: ImputeMethod::Statistic,
            value: None,
            statistic: Some(kind),
        }
    }

    pub fn mean() -> Self {
        Self::statistic(StatisticKind::Mean)
    }

    pub fn median() -> Self {
        Self::statistic(StatisticKind::Median)
    }
}

/// Target of one `dtype_conversion` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionTarget {
    /// Whole seconds since the Unix epoch, stored as Int64.
    #[serde(rename = "timestamp")]
    Timestamp,
    /// Int32 codes in first-seen order, -1 for nulls.
    #[serde(rename = "category")]
    Category,
    #[serde(rename = "int", alias = "int64")]
    Int64,
    #[serde(rename = "int32")]
    Int32,
    #[serde(rename = "float", alias = "float64")]
    Float64,
    #[serde(rename = "float32")]
    Float32,
    #[serde(rename = "str", alias = "string", alias = "object")]
    String,
    #[serde(rename = "bool", alias = "boolean")]
    Boolean,
}

impl ConversionTarget {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::Category => "category",
            Self::Int64 => "int",
            Self::Int32 => "int32",
            Self::Float64 => "float",
            Self::Float32 => "float32",
            Self::String => "str",
            Self::Boolean => "bool",
        }
    }
}

/// Feature scaling method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalingMethod {
    /// Subtract the mean, divide by the population standard deviation.
    Standard,
    /// Rescale to `[0, 1]`.
    Minmax,
}

impl ScalingMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Minmax => "minmax",
        }
    }
}

/// Aggregation function applied to one column of each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunction {
    Sum,
    Mean,
    Median,
    Min,
    Max,
    /// Non-null values in the group.
    Count,
    /// Rows in the group, nulls included.
    Size,
    First,
    Last,
    Std,
    Var,
    Nunique,
}

impl AggFunction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
            Self::Size => "size",
            Self::First => "first",
            Self::Last => "last",
            Self::Std => "std",
            Self::Var => "var",
            Self::Nunique => "nunique",
        }
    }
}

/// `aggregation` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationConfig {
    pub group_by: Vec<String>,
    pub agg_dict: OrderedMap<AggFunction>,
}

// ============================================================================
// CleaningConfig
// ============================================================================

fn default_output_path() -> PathBuf {
    PathBuf::from("output")
}

fn default_output_format() -> String {
    "csv".to_string()
}

/// Configuration for one cleaning run.
///
/// Unknown top-level keys are ignored, so configs produced by a language
/// model with extra commentary fields still load.
///
/// # Example
///
/// ```rust,ignore
/// use lex_cleaning::config::{CleaningConfig, OutlierMethod, MissingValueStrategy};
///
/// let config = CleaningConfig::builder()
///     .input_path("data/hotel.csv")
///     .remove_duplicates(true)
///     .outliers(OutlierMethod::Iqr, ["adr"])
///     .impute("company", MissingValueStrategy::fill("No Company"))
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Dataset to load. Required by [`Pipeline::run`](crate::Pipeline::run).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<PathBuf>,

    /// Directory receiving `cleaned.<ext>` and the `report/` folder.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// One of csv, parquet, json, jsonl.
    #[serde(default = "default_output_format")]
    pub output_format: String,

    #[serde(default)]
    pub generate_reports: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicates: Option<DuplicatesConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outliers: Option<OutlierConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_cleaning: Option<TextCleaningConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_value: Option<OrderedMap<MissingValueStrategy>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype_conversion: Option<OrderedMap<ConversionTarget>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_scaling: Option<OrderedMap<ScalingMethod>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggregationConfig>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            input_path: None,
            output_path: default_output_path(),
            output_format: default_output_format(),
            generate_reports: false,
            duplicates: None,
            outliers: None,
            text_cleaning: None,
            missing_value: None,
            dtype_conversion: None,
            feature_scaling: None,
            aggregation: None,
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Read and validate a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CleaningError::ConfigNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: CleaningConfig = serde_json::from_str(text)
            .map_err(|e| CleaningError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize as indented JSON, preserving section key order.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The parsed output format.
    pub fn output_data_format(&self) -> Result<DataFormat> {
        DataFormat::from_name(&self.output_format)
    }

    /// Validate cross-field rules that serde cannot express.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if DataFormat::from_name(&self.output_format).is_err() {
            return Err(ConfigValidationError::UnsupportedOutputFormat(
                self.output_format.clone(),
            ));
        }

        if let Some(strategies) = &self.missing_value {
            for (column, strategy) in strategies.iter() {
                if strategy.method != ImputeMethod::Fill {
                    continue;
                }
                match &strategy.value {
                    None | Some(serde_json::Value::Null) => {
                        return Err(ConfigValidationError::MissingFillValue(column.to_string()));
                    }
                    Some(serde_json::Value::Array(_)) | Some(serde_json::Value::Object(_)) => {
                        return Err(ConfigValidationError::NonScalarFillValue(column.to_string()));
                    }
                    Some(_) => {}
                }
            }
        }

        if let Some(agg) = &self.aggregation {
            if agg.group_by.is_empty() {
                return Err(ConfigValidationError::EmptyColumns(
                    "aggregation.group_by".to_string(),
                ));
            }
            if agg.agg_dict.is_empty() {
                return Err(ConfigValidationError::EmptyColumns(
                    "aggregation.agg_dict".to_string(),
                ));
            }
            if let Some(key) = agg.group_by.iter().find(|k| agg.agg_dict.contains_key(k)) {
                return Err(ConfigValidationError::GroupKeyAggregated(key.clone()));
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Unsupported output format '{0}' (expected csv, parquet, json or jsonl)")]
    UnsupportedOutputFormat(String),

    #[error("missing_value.{0}: method 'fill' requires a 'value'")]
    MissingFillValue(String),

    #[error("missing_value.{0}: fill value must be a string, number or boolean")]
    NonScalarFillValue(String),

    #[error("'{0}' must list at least one column")]
    EmptyColumns(String),

    #[error("Column '{0}' is both a group key and an aggregated column")]
    GroupKeyAggregated(String),
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    config: CleaningConfig,
}

impl CleaningConfigBuilder {
    pub fn input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.input_path = Some(path.into());
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = path.into();
        self
    }

    pub fn output_format(mut self, format: DataFormat) -> Self {
        self.config.output_format = format.name().to_string();
        self
    }

    pub fn generate_reports(mut self, generate: bool) -> Self {
        self.config.generate_reports = generate;
        self
    }

    pub fn remove_duplicates(mut self, remove: bool) -> Self {
        self.config.duplicates = Some(DuplicatesConfig { remove });
        self
    }

    pub fn outliers<I, S>(mut self, method: OutlierMethod, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.outliers = Some(OutlierConfig {
            method,
            columns: columns.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn text_cleaning<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.text_cleaning = Some(TextCleaningConfig {
            columns: columns.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Add a missing-value strategy; call order is application order.
    pub fn impute(mut self, column: impl Into<String>, strategy: MissingValueStrategy) -> Self {
        self.config
            .missing_value
            .get_or_insert_with(OrderedMap::new)
            .insert(column, strategy);
        self
    }

    pub fn convert(mut self, column: impl Into<String>, target: ConversionTarget) -> Self {
        self.config
            .dtype_conversion
            .get_or_insert_with(OrderedMap::new)
            .insert(column, target);
        self
    }

    pub fn scale(mut self, column: impl Into<String>, method: ScalingMethod) -> Self {
        self.config
            .feature_scaling
            .get_or_insert_with(OrderedMap::new)
            .insert(column, method);
        self
    }

    pub fn aggregate<G, S, A, K>(mut self, group_by: G, agg_dict: A) -> Self
    where
        G: IntoIterator<Item = S>,
        S: Into<String>,
        A: IntoIterator<Item = (K, AggFunction)>,
        K: Into<String>,
    {
        self.config.aggregation = Some(AggregationConfig {
            group_by: group_by.into_iter().map(Into::into).collect(),
            agg_dict: agg_dict.into_iter().collect(),
        });
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<CleaningConfig, ConfigValidationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FULL_CONFIG: &str = r#"{
        "input_path": "data/hotel_bookings.csv",
        "output_path": "auto_hotel_bookings",
        "output_format": "parquet",
        "generate_reports": true,
        "duplicates": {"remove": true},
        "outliers": {"method": "zscore", "columns": ["adr", "lead_time"]},
        "text_cleaning": {"columns": ["meal"]},
        "missing_value": {
            "children": {"method": "statistic", "type": "median"},
            "company": {"method": "fill", "value": "No Company"},
            "agent": {"method": "ffill"}
        },
        "dtype_conversion": {
            "reservation_status_date": "timestamp",
            "hotel": "category",
            "adults": "int64"
        },
        "feature_scaling": {"adr": "standard", "lead_time": "minmax"},
        "aggregation": {"group_by": ["hotel"], "agg_dict": {"adr": "mean", "adults": "sum"}},
        "notes": "generated"
    }"#;

    #[test]
    fn test_default_config() {
        let config = CleaningConfig::default();
        assert_eq!(config.output_path, PathBuf::from("output"));
        assert_eq!(config.output_format, "csv");
        assert!(!config.generate_reports);
        assert!(config.duplicates.is_none());
        assert!(config.aggregation.is_none());
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = CleaningConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CleaningConfig::default());
    }

    #[test]
    fn test_full_config_parses() {
        let config = CleaningConfig::from_json_str(FULL_CONFIG).unwrap();

        assert_eq!(config.output_data_format().unwrap(), DataFormat::Parquet);
        assert_eq!(config.duplicates, Some(DuplicatesConfig { remove: true }));
        let outliers = config.outliers.as_ref().unwrap();
        assert_eq!(outliers.method, OutlierMethod::Zscore);
        assert_eq!(outliers.columns, vec!["adr", "lead_time"]);

        let conversions = config.dtype_conversion.as_ref().unwrap();
        assert_eq!(conversions.get("adults"), Some(&ConversionTarget::Int64));
        assert_eq!(conversions.get("hotel"), Some(&ConversionTarget::Category));
    }

    #[test]
    fn test_map_sections_preserve_file_order() {
        let config = CleaningConfig::from_json_str(FULL_CONFIG).unwrap();

        let imputed: Vec<&str> = config.missing_value.as_ref().unwrap().keys().collect();
        assert_eq!(imputed, vec!["children", "company", "agent"]);

        let aggregated: Vec<&str> = config.aggregation.as_ref().unwrap().agg_dict.keys().collect();
        assert_eq!(aggregated, vec!["adr", "adults"]);
    }

    #[test]
    fn test_serialization_preserves_order() {
        let config = CleaningConfig::from_json_str(FULL_CONFIG).unwrap();
        let json = config.to_json_pretty().unwrap();
        let reparsed = CleaningConfig::from_json_str(&json).unwrap();
        assert_eq!(config, reparsed);
        assert!(json.find("\"children\"").unwrap() < json.find("\"agent\"").unwrap());
    }

    #[test]
    fn test_unknown_statistic_type_falls_back() {
        let config = CleaningConfig::from_json_str(
            r#"{"missing_value": {"x": {"method": "statistic", "type": "mode", "value": 7}}}"#,
        )
        .unwrap();
        let strategy = config.missing_value.unwrap().get("x").cloned().unwrap();
        assert_eq!(strategy.statistic, Some(StatisticKind::Other));
        assert_eq!(strategy.value, Some(serde_json::json!(7)));
    }

    #[test]
    fn test_fill_without_value_is_rejected() {
        let err = CleaningConfig::from_json_str(r#"{"missing_value": {"city": {"method": "fill"}}}"#)
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
        assert!(err.to_string().contains("city"));
    }

    #[test]
    fn test_unknown_aggregation_function_is_rejected() {
        let err = CleaningConfig::from_json_str(
            r#"{"aggregation": {"group_by": ["g"], "agg_dict": {"v": "mode"}}}"#,
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_unknown_conversion_target_is_rejected() {
        let err = CleaningConfig::from_json_str(r#"{"dtype_conversion": {"a": "complex128"}}"#)
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_empty_group_by_is_rejected() {
        let result = CleaningConfig::builder()
            .aggregate(Vec::<String>::new(), [("v", AggFunction::Sum)])
            .build();
        assert!(matches!(result, Err(ConfigValidationError::EmptyColumns(_))));
    }

    #[test]
    fn test_group_key_cannot_be_aggregated() {
        let result = CleaningConfig::builder()
            .aggregate(["g"], [("g", AggFunction::Count)])
            .build();
        assert!(matches!(result, Err(ConfigValidationError::GroupKeyAggregated(_))));
    }

    #[test]
    fn test_unsupported_output_format() {
        let err = CleaningConfig::from_json_str(r#"{"output_format": "xlsx"}"#).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
    }

    #[test]
    fn test_config_not_found() {
        let err = CleaningConfig::from_path("does/not/exist.json").unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_NOT_FOUND");
    }

    #[test]
    fn test_builder_custom_values() {
        let config = CleaningConfig::builder()
            .input_path("in.csv")
            .output_path("out")
            .output_format(DataFormat::JsonLines)
            .remove_duplicates(true)
            .impute("b", MissingValueStrategy::mean())
            .impute("a", MissingValueStrategy::fill("Unknown"))
            .scale("x", ScalingMethod::Minmax)
            .build()
            .unwrap();

        assert_eq!(config.output_format, "jsonl");
        let keys: Vec<&str> = config.missing_value.as_ref().unwrap().keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(
            config.feature_scaling.unwrap().get("x"),
            Some(&ScalingMethod::Minmax)
        );
    }

    #[test]
    fn test_ordered_map_duplicate_key_keeps_position() {
        let mut map = OrderedMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("a", 3);
        let entries: Vec<(&str, &i32)> = map.iter().collect();
        assert_eq!(entries, vec![("a", &3), ("b", &2)]);
    }

    #[test]
    fn test_duplicate_json_key_keeps_first_position_and_last_value() {
        let config = CleaningConfig::from_json_str(
            r#"{"feature_scaling": {"a": "standard", "b": "minmax", "a": "minmax"}}"#,
        )
        .unwrap();

        let scaling = config.feature_scaling.unwrap();
        let entries: Vec<(&str, &ScalingMethod)> = scaling.iter().collect();
        assert_eq!(
            entries,
            vec![("a", &ScalingMethod::Minmax), ("b", &ScalingMethod::Minmax)]
        );
    }
}
