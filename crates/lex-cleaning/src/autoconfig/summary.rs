//! Schema summary sent to the model.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::dtype_label;

/// Column names and types of a dataset, without any values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub columns: Vec<String>,
    /// `(column, dtype label)` in column order
    pub dtypes: Vec<(String, String)>,
    pub rows: usize,
    pub columns_count: usize,
}

impl DatasetSummary {
    pub fn from_dataframe(df: &DataFrame) -> Self {
        let dtypes: Vec<(String, String)> = df
            .get_columns()
            .iter()
            .map(|c| (c.name().to_string(), dtype_label(c.dtype())))
            .collect();

        Self {
            columns: dtypes.iter().map(|(name, _)| name.clone()).collect(),
            dtypes,
            rows: df.height(),
            columns_count: df.width(),
        }
    }

    /// `{"col": "dtype", ...}` as it appears in the prompt.
    pub fn dtypes_json(&self) -> String {
        let map: serde_json::Map<String, serde_json::Value> = self
            .dtypes
            .iter()
            .map(|(name, dtype)| (name.clone(), serde_json::Value::String(dtype.clone())))
            .collect();
        serde_json::Value::Object(map).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_dataframe() {
        let df = df! {
            "hotel" => &["City", "Resort"],
            "adults" => &[2i64, 1],
            "adr" => &[Some(75.5), None],
        }
        .unwrap();

        let summary = DatasetSummary::from_dataframe(&df);

        assert_eq!(summary.columns, vec!["hotel", "adults", "adr"]);
        assert_eq!(
            summary.dtypes,
            vec![
                ("hotel".to_string(), "str".to_string()),
                ("adults".to_string(), "int64".to_string()),
                ("adr".to_string(), "float64".to_string()),
            ]
        );
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.columns_count, 3);
        assert!(summary.dtypes_json().contains(r#""adults":"int64""#));
    }
}
