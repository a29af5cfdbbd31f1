//! Group-by aggregation stage.

use polars::prelude::*;

use crate::config::{AggFunction, CleaningConfig};
use crate::error::{CleaningError, Result};
use crate::pipeline::progress::StageLog;

/// Applies the `aggregation` section.
///
/// Rows with a null in any key column are dropped. Output has one row per
/// distinct key, sorted ascending by the keys. Key columns come first, then
/// one column per `agg_dict` entry under the source name.
pub struct Aggregator;

impl Aggregator {
    pub fn apply(df: DataFrame, config: &CleaningConfig, log: &mut StageLog) -> Result<DataFrame> {
        let Some(aggregation) = &config.aggregation else {
            return Ok(df);
        };

        let referenced = aggregation
            .group_by
            .iter()
            .map(String::as_str)
            .chain(aggregation.agg_dict.keys());
        for column in referenced {
            if df.column(column).is_err() {
                return Err(CleaningError::AggregationFailed(format!(
                    "column '{}' not found",
                    column
                )));
            }
        }

        let keys: Vec<Expr> = aggregation.group_by.iter().map(|c| col(c.as_str())).collect();
        let aggs: Vec<Expr> = aggregation
            .agg_dict
            .iter()
            .map(|(column, function)| agg_expr(column, *function))
            .collect();

        let present = aggregation
            .group_by
            .iter()
            .fold(lit(true), |acc, c| acc.and(col(c.as_str()).is_not_null()));

        let groups_before = df.height();
        let result = df
            .lazy()
            .filter(present)
            .group_by(keys.clone())
            .agg(aggs)
            .sort_by_exprs(keys, SortMultipleOptions::default())
            .collect()
            .map_err(|e| CleaningError::AggregationFailed(e.to_string()))?;

        log.step(format!(
            "Aggregated {} rows into {} groups by {}",
            groups_before,
            result.height(),
            aggregation.group_by.join(", ")
        ));
        Ok(result)
    }
}

/// Expression computing `function` over `column` within each group.
fn agg_expr(column: &str, function: AggFunction) -> Expr {
    let c = col(column);
    let expr = match function {
        AggFunction::Sum => c.sum(),
        AggFunction::Mean => c.mean(),
        AggFunction::Median => c.median(),
        AggFunction::Min => c.min(),
        AggFunction::Max => c.max(),
        AggFunction::Count => c.count(),
        AggFunction::Size => c.len(),
        AggFunction::First => c.first(),
        AggFunction::Last => c.last(),
        AggFunction::Std => c.std(1),
        AggFunction::Var => c.var(1),
        AggFunction::Nunique => c.drop_nulls().n_unique(),
    };
    expr.alias(column)
}
