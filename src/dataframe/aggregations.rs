//! GroupBy, aggregation and pivot operations.

use super::DataFrame;
use crate::column::Column;
use log::debug;
use polars::prelude::{
    col, len, lit, DataFrame as PlDataFrame, DataType, Expr, IntoLazy, JoinBuilder,
    JoinCoalesce, JoinType as PlJoinType, LazyFrame, LazyGroupBy, PolarsError,
    UniqueKeepStrategy,
};
use std::collections::BTreeSet;
use std::sync::Arc;

const PIVOT_KEY: &str = "__pivot_key";

/// GroupedData - represents a DataFrame grouped by certain columns.
/// Similar to PySpark's GroupedData. Groups come out in order of first appearance.
pub struct GroupedData {
    pub(super) df: Arc<PlDataFrame>,
    pub(super) lazy_grouped: LazyGroupBy,
    pub(super) grouping_cols: Vec<String>,
    pub(super) case_sensitive: bool,
}

impl GroupedData {
    /// Count rows in each group
    pub fn count(&self) -> Result<DataFrame, PolarsError> {
        self.agg_exprs(vec![len().cast(DataType::Int64).alias("count")])
    }

    /// Sum a column in each group
    pub fn sum(&self, column: &str) -> Result<DataFrame, PolarsError> {
        self.agg(vec![crate::functions::sum(&crate::functions::col(column))])
    }

    /// Average (mean) of a column in each group
    pub fn avg(&self, column: &str) -> Result<DataFrame, PolarsError> {
        self.agg(vec![crate::functions::avg(&crate::functions::col(column))])
    }

    /// Minimum value of a column in each group
    pub fn min(&self, column: &str) -> Result<DataFrame, PolarsError> {
        self.agg(vec![crate::functions::min(&crate::functions::col(column))])
    }

    /// Maximum value of a column in each group
    pub fn max(&self, column: &str) -> Result<DataFrame, PolarsError> {
        self.agg(vec![crate::functions::max(&crate::functions::col(column))])
    }

    /// Apply aggregate columns (`sum(&col("x"))`, `collect_list(...).alias(..)`, ...).
    /// Output: grouping columns first, then one column per aggregate, named after it.
    pub fn agg(&self, aggregations: Vec<Column>) -> Result<DataFrame, PolarsError> {
        let exprs = aggregate_exprs(&aggregations)?;
        self.agg_exprs(exprs)
    }

    /// Apply raw Polars aggregation expressions.
    pub fn agg_exprs(&self, aggregations: Vec<Expr>) -> Result<DataFrame, PolarsError> {
        let lf = self.lazy_grouped.clone().agg(aggregations);
        let mut pl_df = lf.collect()?;
        pl_df = reorder_groupby_columns(&mut pl_df, &self.grouping_cols)?;
        Ok(super::DataFrame::from_polars_with_options(
            pl_df,
            self.case_sensitive,
        ))
    }

    /// Pivot on the distinct values of `pivot_col` (PySpark groupBy(...).pivot(col)).
    pub fn pivot(&self, pivot_col: &str) -> Result<PivotedGroupedData, PolarsError> {
        self.pivot_with_values(pivot_col, None)
    }

    /// Pivot on an explicit list of values; other values are ignored.
    pub fn pivot_values(
        &self,
        pivot_col: &str,
        values: Vec<&str>,
    ) -> Result<PivotedGroupedData, PolarsError> {
        let values = values.into_iter().map(|v| Some(v.to_string())).collect();
        self.pivot_with_values(pivot_col, Some(values))
    }

    fn pivot_with_values(
        &self,
        pivot_col: &str,
        values: Option<Vec<Option<String>>>,
    ) -> Result<PivotedGroupedData, PolarsError> {
        let source = DataFrame::from_polars_with_options(
            self.df.as_ref().clone(),
            self.case_sensitive,
        );
        let pivot_col = source.resolve_column_name(pivot_col)?;
        Ok(PivotedGroupedData {
            df: self.df.clone(),
            grouping_cols: self.grouping_cols.clone(),
            pivot_col,
            values,
            case_sensitive: self.case_sensitive,
        })
    }

    /// Get grouping columns
    pub fn grouping_columns(&self) -> &[String] {
        &self.grouping_cols
    }
}

fn aggregate_exprs(aggregations: &[Column]) -> Result<Vec<Expr>, PolarsError> {
    aggregations
        .iter()
        .map(|c| {
            if !c.windows().is_empty() || c.requires_window() {
                return Err(PolarsError::InvalidOperation(
                    format!("{} cannot be used as a group aggregate", c.name()).into(),
                ));
            }
            Ok(c.expr().clone().alias(c.name()))
        })
        .collect()
}

/// Result of `group_by(...).pivot(col)`; call [`agg`](PivotedGroupedData::agg) to compute it.
pub struct PivotedGroupedData {
    df: Arc<PlDataFrame>,
    grouping_cols: Vec<String>,
    pivot_col: String,
    values: Option<Vec<Option<String>>>,
    case_sensitive: bool,
}

impl PivotedGroupedData {
    /// Distinct pivot values, ascending with null first (Spark order).
    fn pivot_values(&self) -> Result<Vec<Option<String>>, PolarsError> {
        if let Some(values) = &self.values {
            return Ok(values.clone());
        }
        let as_str = self
            .df
            .column(self.pivot_col.as_str())?
            .cast(&DataType::String)?;
        let distinct: BTreeSet<Option<String>> = as_str
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();
        Ok(distinct.into_iter().collect())
    }

    /// One output column per pivot value. A single aggregate is named by the value itself;
    /// several are named `<value>_<aggregate name>`. Missing combinations are null.
    pub fn agg(&self, aggregations: Vec<Column>) -> Result<DataFrame, PolarsError> {
        if aggregations.is_empty() {
            return Err(PolarsError::InvalidOperation(
                "pivot agg needs at least one aggregate".into(),
            ));
        }
        let values = self.pivot_values()?;
        debug!(
            "pivot on {} over {} distinct values",
            self.pivot_col,
            values.len()
        );
        let aggs = aggregate_exprs(&aggregations)?;

        let source = if self.grouping_cols.is_empty() {
            self.df
                .as_ref()
                .clone()
                .lazy()
                .with_column(lit(0i32).alias(PIVOT_KEY))
        } else {
            self.df.as_ref().clone().lazy()
        };
        let keys: Vec<String> = if self.grouping_cols.is_empty() {
            vec![PIVOT_KEY.to_string()]
        } else {
            self.grouping_cols.clone()
        };
        let key_exprs: Vec<Expr> = keys.iter().map(|k| col(k.as_str())).collect();

        let mut result: LazyFrame = source
            .clone()
            .select(key_exprs.clone())
            .unique_stable(None, UniqueKeepStrategy::First);
        for value in &values {
            let label = value.clone().unwrap_or_else(|| "null".to_string());
            let matches = match value {
                Some(v) => col(self.pivot_col.as_str())
                    .cast(DataType::String)
                    .eq(lit(v.clone())),
                None => col(self.pivot_col.as_str()).is_null(),
            };
            let named: Vec<Expr> = aggs
                .iter()
                .zip(&aggregations)
                .map(|(e, c)| {
                    let name = if aggregations.len() == 1 {
                        label.clone()
                    } else {
                        format!("{}_{}", label, c.name())
                    };
                    e.clone().alias(name)
                })
                .collect();
            let per_value = source
                .clone()
                .filter(matches)
                .group_by_stable(key_exprs.clone())
                .agg(named);
            result = JoinBuilder::new(result)
                .with(per_value)
                .left_on(key_exprs.clone())
                .right_on(key_exprs.clone())
                .how(PlJoinType::Left)
                .join_nulls(true)
                .coalesce(JoinCoalesce::CoalesceColumns)
                .finish();
        }
        let mut pl_df = result.collect()?;
        if self.grouping_cols.is_empty() {
            pl_df = pl_df.drop(PIVOT_KEY)?;
        }
        Ok(super::DataFrame::from_polars_with_options(
            pl_df,
            self.case_sensitive,
        ))
    }
}

/// Reorder columns after groupBy to match PySpark order: grouping columns first, then aggregations
pub(super) fn reorder_groupby_columns(
    pl_df: &mut PlDataFrame,
    grouping_cols: &[String],
) -> Result<PlDataFrame, PolarsError> {
    let all_cols: Vec<String> = pl_df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut reordered_cols: Vec<&str> = Vec::new();
    for gc in grouping_cols {
        if all_cols.iter().any(|c| c == gc) {
            reordered_cols.push(gc);
        }
    }
    for col_name in &all_cols {
        if !grouping_cols.iter().any(|gc| gc == col_name) {
            reordered_cols.push(col_name);
        }
    }
    if !reordered_cols.is_empty() && reordered_cols.len() == all_cols.len() {
        pl_df.select(reordered_cols)
    } else {
        Ok(pl_df.clone())
    }
}
