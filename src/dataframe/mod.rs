//! DataFrame module: main tabular type and submodules for transformations, aggregations,
//! joins and writers.

mod aggregations;
mod joins;
mod transformations;
mod writer;

pub use aggregations::{GroupedData, PivotedGroupedData};
pub use joins::{join, join_on, JoinType};
pub use transformations::{DataFrameNa, FillValue};
pub use writer::{DataFrameWriter, SaveMode, WriteFormat};
pub(crate) use writer::{part_files, TableMetadata, TABLE_METADATA_FILE};

use crate::column::Column;
use crate::schema::StructType;
use polars::prelude::{AnyValue, DataFrame as PlDataFrame, Expr, PolarsError};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Default for `spark.sql.caseSensitive` (PySpark default is false = case-insensitive).
const DEFAULT_CASE_SENSITIVE: bool = false;

/// DataFrame - main tabular data structure.
/// Thin wrapper around an eager Polars `DataFrame`.
pub struct DataFrame {
    pub(crate) df: Arc<PlDataFrame>,
    /// When false (default), column names are matched case-insensitively (PySpark behavior).
    pub(crate) case_sensitive: bool,
}

impl DataFrame {
    /// Create a new DataFrame from a Polars DataFrame (case-insensitive column matching by default).
    pub fn from_polars(df: PlDataFrame) -> Self {
        DataFrame {
            df: Arc::new(df),
            case_sensitive: DEFAULT_CASE_SENSITIVE,
        }
    }

    /// Create a new DataFrame from a Polars DataFrame with explicit case sensitivity.
    /// When `case_sensitive` is false, column resolution is case-insensitive (PySpark default).
    pub fn from_polars_with_options(df: PlDataFrame, case_sensitive: bool) -> Self {
        DataFrame {
            df: Arc::new(df),
            case_sensitive,
        }
    }

    /// Resolve a logical column name to the actual column name in the schema.
    /// When case_sensitive is false, matches case-insensitively.
    pub fn resolve_column_name(&self, name: &str) -> Result<String, PolarsError> {
        let names = self.df.get_column_names();
        if self.case_sensitive {
            if names.iter().any(|n| *n == name) {
                return Ok(name.to_string());
            }
        } else {
            let name_lower = name.to_lowercase();
            for n in names {
                if n.to_lowercase() == name_lower {
                    return Ok(n.to_string());
                }
            }
        }
        let available: Vec<String> = self
            .df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        Err(PolarsError::ColumnNotFound(
            format!(
                "Column '{}' not found. Available columns: [{}]. Check spelling and case sensitivity (spark.sql.caseSensitive).",
                name,
                available.join(", ")
            )
            .into(),
        ))
    }

    /// Get the schema of the DataFrame
    pub fn schema(&self) -> Result<StructType, PolarsError> {
        Ok(StructType::from_polars_schema(self.df.schema()))
    }

    /// printSchema-style tree of the schema.
    pub fn print_schema(&self) -> Result<String, PolarsError> {
        Ok(self.schema()?.tree_string())
    }

    /// Get column names
    pub fn columns(&self) -> Result<Vec<String>, PolarsError> {
        Ok(self
            .df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect())
    }

    /// Count the number of rows (action - triggers execution)
    pub fn count(&self) -> Result<usize, PolarsError> {
        Ok(self.df.height())
    }

    /// Show the first n rows
    pub fn show(&self, n: Option<usize>) -> Result<(), PolarsError> {
        println!("{}", self.show_string(n));
        Ok(())
    }

    /// The table `show` prints (first n rows, default 20).
    pub fn show_string(&self, n: Option<usize>) -> String {
        let n = n.unwrap_or(20);
        format!("{}", self.df.head(Some(n)))
    }

    /// Collect as rows of column-name -> JSON value.
    pub fn collect_as_json_rows(&self) -> Result<Vec<HashMap<String, JsonValue>>, PolarsError> {
        let df = self.df.as_ref();
        let names = df.get_column_names();
        let nrows = df.height();
        let mut rows = Vec::with_capacity(nrows);
        for i in 0..nrows {
            let mut row = HashMap::with_capacity(names.len());
            for (col_idx, name) in names.iter().enumerate() {
                let s = df
                    .get_columns()
                    .get(col_idx)
                    .ok_or_else(|| PolarsError::ComputeError("column index out of range".into()))?;
                let av = s.get(i)?;
                let jv = any_value_to_json(av)?;
                row.insert(name.to_string(), jv);
            }
            rows.push(row);
        }
        Ok(rows)
    }

    /// Select columns (returns a new DataFrame).
    /// Column names are resolved according to case sensitivity.
    pub fn select(&self, cols: Vec<&str>) -> Result<DataFrame, PolarsError> {
        let resolved: Vec<String> = cols
            .iter()
            .map(|c| self.resolve_column_name(c))
            .collect::<Result<Vec<_>, _>>()?;
        let refs: Vec<&str> = resolved.iter().map(|s| s.as_str()).collect();
        transformations::select(self, refs, self.case_sensitive)
    }

    /// Select column expressions (`select(initcap(col("Item_Type")).alias(...))`).
    pub fn select_cols(&self, columns: Vec<Column>) -> Result<DataFrame, PolarsError> {
        transformations::select_cols(self, columns, self.case_sensitive)
    }

    /// Filter rows using a Polars expression.
    pub fn filter(&self, condition: Expr) -> Result<DataFrame, PolarsError> {
        transformations::filter(self, condition, self.case_sensitive)
    }

    /// Add or replace a column. Window columns (`row_number().over(&w)`) are evaluated
    /// here and keep the input row order.
    pub fn with_column(&self, column_name: &str, col: &Column) -> Result<DataFrame, PolarsError> {
        transformations::with_column(self, column_name, col, self.case_sensitive)
    }

    /// Group by columns (returns GroupedData for aggregation).
    /// Column names are resolved according to case sensitivity.
    pub fn group_by(&self, column_names: Vec<&str>) -> Result<GroupedData, PolarsError> {
        use polars::prelude::*;
        let resolved: Vec<String> = column_names
            .iter()
            .map(|c| self.resolve_column_name(c))
            .collect::<Result<Vec<_>, _>>()?;
        let exprs: Vec<Expr> = resolved.iter().map(|name| col(name.as_str())).collect();
        let lazy_grouped = self.df.as_ref().clone().lazy().group_by_stable(exprs);
        Ok(GroupedData {
            df: self.df.clone(),
            lazy_grouped,
            grouping_cols: resolved,
            case_sensitive: self.case_sensitive,
        })
    }

    /// Join with another DataFrame on the given columns.
    /// Join column names are resolved on the left (and right must have matching names).
    pub fn join(
        &self,
        other: &DataFrame,
        on: Vec<&str>,
        how: JoinType,
    ) -> Result<DataFrame, PolarsError> {
        let resolved: Vec<String> = on
            .iter()
            .map(|c| self.resolve_column_name(c))
            .collect::<Result<Vec<_>, _>>()?;
        let on_refs: Vec<&str> = resolved.iter().map(|s| s.as_str()).collect();
        join(self, other, on_refs, how, self.case_sensitive)
    }

    /// Join on `left_keys[i] == right_keys[i]`, keeping both sides' key columns
    /// (PySpark `df1.join(df2, df1.k == df2.k, how)`).
    pub fn join_on(
        &self,
        other: &DataFrame,
        left_keys: Vec<&str>,
        right_keys: Vec<&str>,
        how: JoinType,
    ) -> Result<DataFrame, PolarsError> {
        join_on(self, other, left_keys, right_keys, how, self.case_sensitive)
    }

    /// Drop rows with nulls: `how` is `"any"` or `"all"`; `subset` limits the columns considered.
    pub fn dropna(&self, how: &str, subset: Option<Vec<&str>>) -> Result<DataFrame, PolarsError> {
        transformations::dropna(self, how, subset, self.case_sensitive)
    }

    /// Keep rows with at least `thresh` non-null values (PySpark dropna(thresh=...)).
    pub fn dropna_thresh(
        &self,
        thresh: usize,
        subset: Option<Vec<&str>>,
    ) -> Result<DataFrame, PolarsError> {
        transformations::dropna_thresh(self, thresh, subset, self.case_sensitive)
    }

    /// Fill nulls with `value` in the columns whose type matches it (all, or `subset`).
    pub fn fillna(
        &self,
        value: impl Into<FillValue>,
        subset: Option<Vec<&str>>,
    ) -> Result<DataFrame, PolarsError> {
        transformations::fillna(self, value.into(), subset, self.case_sensitive)
    }

    /// NA sub-API. PySpark df.na().
    pub fn na(&self) -> DataFrameNa<'_> {
        DataFrameNa { df: self }
    }

    /// One row per element of the array column (PySpark `withColumn(c, explode(c))`).
    /// Rows with a null or empty array are dropped.
    pub fn explode(&self, column: &str) -> Result<DataFrame, PolarsError> {
        transformations::explode(self, column, false, self.case_sensitive)
    }

    /// Like [`explode`](Self::explode) but keeps null/empty arrays as a null element.
    pub fn explode_outer(&self, column: &str) -> Result<DataFrame, PolarsError> {
        transformations::explode(self, column, true, self.case_sensitive)
    }

    /// Limit: return first n rows.
    pub fn limit(&self, n: usize) -> Result<DataFrame, PolarsError> {
        transformations::limit(self, n, self.case_sensitive)
    }

    /// Return a writer (PySpark `df.write`). Defaults: parquet, save mode error.
    pub fn write(&self) -> DataFrameWriter<'_> {
        DataFrameWriter::new(self)
    }

}

impl Clone for DataFrame {
    fn clone(&self) -> Self {
        DataFrame {
            df: self.df.clone(),
            case_sensitive: self.case_sensitive,
        }
    }
}

impl std::fmt::Debug for DataFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.df)
    }
}

/// Convert Polars AnyValue to serde_json::Value.
fn any_value_to_json(av: AnyValue<'_>) -> Result<JsonValue, PolarsError> {
    Ok(match av {
        AnyValue::Null => JsonValue::Null,
        AnyValue::Boolean(b) => JsonValue::Bool(b),
        AnyValue::Int8(i) => JsonValue::Number(serde_json::Number::from(i)),
        AnyValue::Int16(i) => JsonValue::Number(serde_json::Number::from(i)),
        AnyValue::Int32(i) => JsonValue::Number(serde_json::Number::from(i)),
        AnyValue::Int64(i) => JsonValue::Number(serde_json::Number::from(i)),
        AnyValue::UInt8(u) => JsonValue::Number(serde_json::Number::from(u)),
        AnyValue::UInt16(u) => JsonValue::Number(serde_json::Number::from(u)),
        AnyValue::UInt32(u) => JsonValue::Number(serde_json::Number::from(u)),
        AnyValue::UInt64(u) => JsonValue::Number(serde_json::Number::from(u)),
        AnyValue::Float32(f) => serde_json::Number::from_f64(f64::from(f))
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        AnyValue::Float64(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        AnyValue::String(s) => JsonValue::String(s.to_string()),
        AnyValue::StringOwned(s) => JsonValue::String(s.to_string()),
        AnyValue::Date(days) => match crate::date_utils::days_to_naive_date(days) {
            Some(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
            None => JsonValue::Null,
        },
        AnyValue::List(series) => {
            let mut items = Vec::with_capacity(series.len());
            for i in 0..series.len() {
                items.push(any_value_to_json(series.get(i)?.into_static())?);
            }
            JsonValue::Array(items)
        }
        other => JsonValue::String(other.to_string()),
    })
}
