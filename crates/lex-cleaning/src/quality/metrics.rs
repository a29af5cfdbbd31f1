use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cleaner::count_duplicate_rows;
use crate::utils::total_null_count;

/// Size and completeness of one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub rows: usize,
    pub columns: usize,
    /// Null cells across all columns.
    pub missing_values: usize,
    /// Rows that repeat an earlier row.
    pub duplicate_rows: usize,
}

impl QualityMetrics {
    /// Compute a snapshot. The result does not depend on row order.
    pub fn compute(df: &DataFrame) -> PolarsResult<Self> {
        Ok(Self {
            rows: df.height(),
            columns: df.width(),
            missing_values: total_null_count(df),
            duplicate_rows: count_duplicate_rows(df)?,
        })
    }

    /// `(name, value)` pairs in report order.
    pub fn entries(&self) -> [(&'static str, usize); 4] {
        [
            ("rows", self.rows),
            ("columns", self.columns),
            ("missing_values", self.missing_values),
            ("duplicate_rows", self.duplicate_rows),
        ]
    }
}

/// Metrics before and after a run.
///
/// `before` is `None` when the pipeline did not keep a copy of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityComparison {
    pub before: Option<QualityMetrics>,
    pub after: QualityMetrics,
}

impl QualityComparison {
    pub fn new(before: Option<QualityMetrics>, after: QualityMetrics) -> Self {
        Self { before, after }
    }

    /// Rows dropped by the run, when the input was kept.
    pub fn rows_removed(&self) -> Option<usize> {
        self.before.map(|b| b.rows.saturating_sub(self.after.rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bookings() -> DataFrame {
        df! {
            "hotel" => &[Some("City"), Some("Resort"), Some("City"), None],
            "adr" => &[Some(90.0), None, Some(90.0), None],
        }
        .unwrap()
    }

    #[test]
    fn test_compute() {
        let metrics = QualityMetrics::compute(&bookings()).unwrap();
        assert_eq!(
            metrics,
            QualityMetrics {
                rows: 4,
                columns: 2,
                missing_values: 3,
                duplicate_rows: 1,
            }
        );
    }

    #[test]
    fn test_row_permutation_invariance() {
        let df = bookings();
        let reversed = df.reverse();
        let idx = IdxCa::from_vec("idx".into(), vec![2, 0, 3, 1]);
        let shuffled = df.take(&idx).unwrap();

        let expected = QualityMetrics::compute(&df).unwrap();
        assert_eq!(QualityMetrics::compute(&reversed).unwrap(), expected);
        assert_eq!(QualityMetrics::compute(&shuffled).unwrap(), expected);
    }

    #[test]
    fn test_empty_frame() {
        assert_eq!(
            QualityMetrics::compute(&DataFrame::empty()).unwrap(),
            QualityMetrics::default()
        );
    }

    #[test]
    fn test_comparison_rows_removed() {
        let after = QualityMetrics { rows: 3, ..Default::default() };
        let before = QualityMetrics { rows: 5, ..Default::default() };

        assert_eq!(QualityComparison::new(Some(before), after).rows_removed(), Some(2));
        assert_eq!(QualityComparison::new(None, after).rows_removed(), None);
    }
}
