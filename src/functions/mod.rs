//! PySpark `pyspark.sql.functions` equivalents: column constructors, literals, string/date/array
//! helpers, aggregates, ranking functions, conditional expressions and UDFs.

mod sort;
mod types;

pub use sort::{asc, desc, SortOrder};
pub use types::parse_type_name;

use crate::column::Column;
use crate::type_coercion::OperandKind;
use crate::udf_registry::{get_thread_udf_context, UserDefinedFunction};
use crate::window::{AggKind, RankingKind, WindowFunction};
use polars::prelude::{lit, DataType, Expr, IntoSeries, PolarsError, Series, NULL};

/// Get a column by name
pub fn col(name: &str) -> Column {
    Column::new(name.to_string())
}

/// Create a literal column from a value
pub fn lit_i32(value: i32) -> Column {
    Column::literal(lit(value), value.to_string(), OperandKind::Numeric)
}

pub fn lit_i64(value: i64) -> Column {
    Column::literal(lit(value), value.to_string(), OperandKind::Numeric)
}

pub fn lit_f64(value: f64) -> Column {
    Column::literal(lit(value), value.to_string(), OperandKind::Numeric)
}

pub fn lit_bool(value: bool) -> Column {
    Column::literal(lit(value), value.to_string(), OperandKind::Boolean)
}

pub fn lit_str(value: &str) -> Column {
    Column::literal(lit(value), value.to_string(), OperandKind::String)
}

// --- String functions ---

/// Convert string column to uppercase (PySpark upper)
pub fn upper(column: &Column) -> Column {
    column.upper()
}

/// Convert string column to lowercase (PySpark lower)
pub fn lower(column: &Column) -> Column {
    column.lower()
}

/// Title case each space-separated word (PySpark initcap)
pub fn initcap(column: &Column) -> Column {
    column.initcap()
}

/// Split by a literal delimiter into an array of strings (PySpark split)
pub fn split(column: &Column, delimiter: &str) -> Column {
    column.split(delimiter)
}

// --- Date functions ---

/// Today's date in the local time zone, evaluated when the expression is built (PySpark current_date).
pub fn current_date() -> Column {
    let days = crate::date_utils::naive_date_to_days(crate::date_utils::today());
    Column::literal(
        lit(days).cast(DataType::Date),
        "current_date()".to_string(),
        OperandKind::Unknown,
    )
}

pub fn date_add(column: &Column, days: i32) -> Column {
    column.date_add(days)
}

pub fn date_sub(column: &Column, days: i32) -> Column {
    column.date_sub(days)
}

/// Days from `start` to `end` (PySpark datediff(end, start)).
pub fn datediff(end: &Column, start: &Column) -> Column {
    end.datediff(start)
}

pub fn date_format(column: &Column, pattern: &str) -> Column {
    column.date_format(pattern)
}

// --- Array functions ---

pub fn array_contains(column: &Column, value: &Column) -> Column {
    column.array_contains(value)
}

pub fn size(column: &Column) -> Column {
    column.size()
}

// --- Aggregates ---
// Each aggregate also knows how to evaluate over a window, so `sum(&c).over(&w)` works.

fn aggregate(column: &Column, kind: AggKind, expr: Expr, name: &str) -> Column {
    Column::from_expr(
        expr.alias(format!("{}({})", name, column.name())),
        Some(format!("{}({})", name, column.name())),
    )
    .with_window_fn(WindowFunction::Aggregate {
        kind,
        input: column.expr().clone(),
    })
    .absorb(column)
}

/// Sum aggregation. Numbers (and numeric strings) are summed as double.
pub fn sum(column: &Column) -> Column {
    let expr = crate::type_coercion::to_double(column.expr().clone(), column.kind()).sum();
    aggregate(column, AggKind::Sum, expr, "sum")
}

/// Average aggregation
pub fn avg(column: &Column) -> Column {
    let expr = crate::type_coercion::to_double(column.expr().clone(), column.kind()).mean();
    aggregate(column, AggKind::Avg, expr, "avg")
}

/// Count of non-null values
pub fn count(column: &Column) -> Column {
    let expr = column.expr().clone().count().cast(DataType::Int64);
    aggregate(column, AggKind::Count, expr, "count")
}

/// Minimum aggregation
pub fn min(column: &Column) -> Column {
    let expr = column.expr().clone().min();
    aggregate(column, AggKind::Min, expr, "min")
}

/// Maximum aggregation
pub fn max(column: &Column) -> Column {
    let expr = column.expr().clone().max();
    aggregate(column, AggKind::Max, expr, "max")
}

/// Collect non-null values of each group into an array, in input order (PySpark collect_list).
/// Inside a group aggregation every expression already yields one list per group.
pub fn collect_list(column: &Column) -> Column {
    let name = format!("collect_list({})", column.name());
    Column::from_expr(
        column.expr().clone().drop_nulls().alias(name.as_str()),
        Some(name),
    )
    .absorb(column)
}

/// Distinct non-null values of each group, first occurrence order (PySpark collect_set).
pub fn collect_set(column: &Column) -> Column {
    let name = format!("collect_set({})", column.name());
    Column::from_expr(
        column
            .expr()
            .clone()
            .drop_nulls()
            .unique_stable()
            .alias(name.as_str()),
        Some(name),
    )
    .absorb(column)
}

// --- Conditional ---

/// PySpark-style conditional expression builder.
///
/// # Example
/// ```
/// use spark_transformations::{col, lit_str, when};
///
/// let flag = when(&col("Item_Type").eq(&lit_str("Meat")), &lit_str("Non-Veg"))
///     .otherwise(&lit_str("Veg"));
/// assert_eq!(flag.name(), "CASE WHEN (Item_Type = Meat) THEN Non-Veg ELSE Veg END");
/// ```
pub fn when(condition: &Column, value: &Column) -> WhenBuilder {
    WhenBuilder {
        branches: vec![(condition.clone(), value.clone())],
    }
}

/// Chain of `when(cond, value)` branches, finalized with [`otherwise`](WhenBuilder::otherwise)
/// or [`end`](WhenBuilder::end). The first matching branch wins; a null condition does not match.
#[derive(Debug, Clone)]
pub struct WhenBuilder {
    branches: Vec<(Column, Column)>,
}

impl WhenBuilder {
    /// Chain an additional when-then clause
    pub fn when(mut self, condition: &Column, value: &Column) -> WhenBuilder {
        self.branches.push((condition.clone(), value.clone()));
        self
    }

    /// Finalize the expression with the fallback value
    pub fn otherwise(self, value: &Column) -> Column {
        let name = format!("{} ELSE {} END", self.case_prefix(), value.name());
        self.build(value.expr().clone(), name).absorb(value)
    }

    /// Finalize without a fallback: unmatched rows are null.
    pub fn end(self) -> Column {
        let name = format!("{} END", self.case_prefix());
        self.build(lit(NULL), name)
    }

    fn case_prefix(&self) -> String {
        let clauses: Vec<String> = self
            .branches
            .iter()
            .map(|(c, v)| format!("WHEN {} THEN {}", c.name(), v.name()))
            .collect();
        format!("CASE {}", clauses.join(" "))
    }

    fn build(self, fallback: Expr, name: String) -> Column {
        let mut parts = Column::from_expr(lit(NULL), None);
        for (cond, value) in &self.branches {
            parts = parts.absorb(cond).absorb(value);
        }
        let expr = self
            .branches
            .into_iter()
            .rev()
            .fold(fallback, |otherwise, (cond, value)| {
                polars::prelude::when(cond.into_expr().fill_null(lit(false)))
                    .then(value.into_expr())
                    .otherwise(otherwise)
            });
        Column::from_expr(expr, Some(name)).absorb(&parts)
    }
}

impl From<WhenBuilder> for Column {
    fn from(builder: WhenBuilder) -> Self {
        builder.end()
    }
}

// --- Ranking (window) functions ---

fn ranking(kind: RankingKind, name: &str) -> Column {
    Column::from_expr(lit(NULL).cast(DataType::Int32), Some(name.to_string()))
        .with_window_fn(WindowFunction::Ranking(kind))
}

/// Sequential row number within the window partition, starting at 1 (PySpark row_number).
/// Must be used with `.over(...)`.
pub fn row_number() -> Column {
    ranking(RankingKind::RowNumber, "row_number()")
}

/// Rank with gaps: ties share a rank and the next rank skips (PySpark rank).
pub fn rank() -> Column {
    ranking(RankingKind::Rank, "rank()")
}

/// Rank without gaps (PySpark dense_rank).
pub fn dense_rank() -> Column {
    ranking(RankingKind::DenseRank, "dense_rank()")
}

// --- UDFs ---

/// Wrap a closure as a UDF returning strings, PySpark `udf(f)`'s default return type.
pub fn udf<F>(name: &str, f: F) -> UserDefinedFunction
where
    F: Fn(&[Series]) -> Result<Series, PolarsError> + Send + Sync + 'static,
{
    UserDefinedFunction::new(name, DataType::String, f)
}

/// Wrap a closure as a UDF with a Spark return type name (`int`, `double`, `string`, ...).
pub fn udf_with_return_type<F>(
    name: &str,
    return_type: &str,
    f: F,
) -> Result<UserDefinedFunction, PolarsError>
where
    F: Fn(&[Series]) -> Result<Series, PolarsError> + Send + Sync + 'static,
{
    Ok(UserDefinedFunction::new(
        name,
        parse_type_name(return_type)?,
        f,
    ))
}

/// Row-wise numeric UDF: `f` sees each non-null value as f64; nulls stay null.
pub fn udf_f64<F>(name: &str, return_type: &str, f: F) -> Result<UserDefinedFunction, PolarsError>
where
    F: Fn(f64) -> f64 + Send + Sync + 'static,
{
    udf_with_return_type(name, return_type, move |cols: &[Series]| {
        let input = cols[0].cast(&DataType::Float64)?;
        let values = input.f64()?;
        let out: polars::prelude::Float64Chunked =
            values.into_iter().map(|v| v.map(&f)).collect();
        Ok(out.with_name(input.name().clone()).into_series())
    })
}

/// Call a UDF registered on the active session (PySpark `call_udf` / SQL-registered UDF).
pub fn call_udf(name: &str, args: &[Column]) -> Result<Column, PolarsError> {
    let Some((registry, case_sensitive)) = get_thread_udf_context() else {
        return Err(PolarsError::InvalidOperation(
            "call_udf: no active SparkSession on this thread".into(),
        ));
    };
    let udf = registry.get(name, case_sensitive).ok_or_else(|| {
        PolarsError::InvalidOperation(format!("call_udf: UDF '{name}' is not registered").into())
    })?;
    let refs: Vec<&Column> = args.iter().collect();
    udf.call(&refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{df, IntoLazy};

    fn items() -> polars::prelude::DataFrame {
        df!(
            "Item_Type" => &["Meat", "Dairy", "Meat", "Snack Foods"],
            "Item_MRP" => &[Some(249.8), Some(48.27), None, Some(95.0)]
        )
        .unwrap()
    }

    #[test]
    fn literal_names_and_kinds() {
        assert_eq!(lit_i64(100).name(), "100");
        assert_eq!(lit_str("Meat").name(), "Meat");
    }

    #[test]
    fn aggregate_names_follow_spark() {
        let c = col("Item_MRP");
        assert_eq!(sum(&c).name(), "sum(Item_MRP)");
        assert_eq!(avg(&c).name(), "avg(Item_MRP)");
        assert_eq!(collect_list(&c).name(), "collect_list(Item_MRP)");
    }

    #[test]
    fn when_chain_first_match_wins() {
        let veg = col("Item_Type").neq(&lit_str("Meat"));
        let flag = when(
            &veg.and(&col("Item_MRP").lt(&lit_i64(100))),
            &lit_str("Veg_Inexpensive"),
        )
        .when(
            &veg.and(&col("Item_MRP").gt(&lit_i64(100))),
            &lit_str("Veg_Expensive"),
        )
        .otherwise(&lit_str("Non-Veg"));
        let out = items()
            .lazy()
            .select([flag.alias("flag").into_expr()])
            .collect()
            .unwrap();
        let values: Vec<Option<&str>> = out.column("flag").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(
            values,
            vec![
                Some("Non-Veg"),
                Some("Veg_Inexpensive"),
                Some("Non-Veg"),
                Some("Veg_Inexpensive")
            ]
        );
    }

    #[test]
    fn when_without_otherwise_is_null() {
        let flag: Column = when(&col("Item_Type").eq(&lit_str("Meat")), &lit_i32(1)).into();
        let out = items()
            .lazy()
            .select([flag.alias("f").into_expr()])
            .collect()
            .unwrap();
        assert_eq!(out.column("f").unwrap().null_count(), 2);
    }

    #[test]
    fn udf_f64_squares_and_keeps_nulls() {
        let square = udf_f64("square", "double", |x| x * x).unwrap();
        let out = items()
            .lazy()
            .select([square
                .call(&[&col("Item_MRP")])
                .unwrap()
                .alias("sq")
                .into_expr()])
            .collect()
            .unwrap();
        let values: Vec<Option<f64>> = out.column("sq").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(values[3], Some(9025.0));
        assert_eq!(values[2], None);
    }

    #[test]
    fn ranking_functions_need_over() {
        assert!(row_number().requires_window());
        let w = crate::window::Window::order_by(["Item_Type"]);
        assert!(!rank().over(&w).requires_window());
    }
}
