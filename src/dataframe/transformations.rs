//! DataFrame transformation operations: filter, select, with_column, dropna, fillna,
//! explode, limit.

use super::DataFrame;
use crate::column::Column;
use crate::type_coercion::OperandKind;
use log::debug;
use polars::prelude::{col, lit, DataFrame as PlDataFrame, DataType, Expr, IntoLazy, PolarsError};

/// Select columns (returns a new DataFrame). Preserves case_sensitive on result.
pub fn select(
    df: &DataFrame,
    cols: Vec<&str>,
    case_sensitive: bool,
) -> Result<DataFrame, PolarsError> {
    let selected = df.df.select(cols)?;
    Ok(super::DataFrame::from_polars_with_options(
        selected,
        case_sensitive,
    ))
}

/// Select column expressions. Each output column is named after its Column (`upper(x)`,
/// an alias, ...). Windows are evaluated first into temporary columns.
pub fn select_cols(
    df: &DataFrame,
    columns: Vec<Column>,
    case_sensitive: bool,
) -> Result<DataFrame, PolarsError> {
    let mut working = df.df.as_ref().clone();
    let mut exprs: Vec<Expr> = Vec::with_capacity(columns.len());
    for c in &columns {
        if c.requires_window() {
            return Err(window_required(c));
        }
        working = evaluate_windows(df, working, c)?;
        if c.name() == "<expr>" {
            exprs.push(c.expr().clone());
        } else {
            exprs.push(c.expr().clone().alias(c.name()));
        }
    }
    let pl_df = working.lazy().select(exprs).collect()?;
    Ok(super::DataFrame::from_polars_with_options(
        pl_df,
        case_sensitive,
    ))
}

/// Filter rows using a Polars expression. Preserves case_sensitive on result.
pub fn filter(
    df: &DataFrame,
    condition: Expr,
    case_sensitive: bool,
) -> Result<DataFrame, PolarsError> {
    let lf = df.df.as_ref().clone().lazy().filter(condition);
    let out_df = lf.collect()?;
    Ok(super::DataFrame::from_polars_with_options(
        out_df,
        case_sensitive,
    ))
}

/// Add or replace a column. An existing column keeps its position.
pub fn with_column(
    df: &DataFrame,
    column_name: &str,
    column: &Column,
    case_sensitive: bool,
) -> Result<DataFrame, PolarsError> {
    if column.requires_window() {
        return Err(window_required(column));
    }
    let target = df
        .resolve_column_name(column_name)
        .unwrap_or_else(|_| column_name.to_string());
    let original = df.columns()?;
    let mut keep: Vec<Expr> = original.iter().map(|n| col(n.as_str())).collect();
    if !original.iter().any(|n| *n == target) {
        keep.push(col(target.as_str()));
    }
    let working = evaluate_windows(df, df.df.as_ref().clone(), column)?;
    let pl_df = working
        .lazy()
        .with_column(column.expr().clone().alias(target.as_str()))
        .select(keep)
        .collect()?;
    Ok(super::DataFrame::from_polars_with_options(
        pl_df,
        case_sensitive,
    ))
}

/// Materialize the windows `column` refers to as extra columns of `working`.
/// Row order is preserved.
fn evaluate_windows(
    df: &DataFrame,
    mut working: PlDataFrame,
    column: &Column,
) -> Result<PlDataFrame, PolarsError> {
    for windowed in column.windows() {
        let partition = resolve_partition(df, windowed.spec().partition_columns())?;
        debug!(
            "{}: window {} over {partition:?}",
            column.name(),
            windowed.column_name()
        );
        working = crate::window::evaluate(&working, windowed.column_name(), windowed, &partition)?;
    }
    Ok(working)
}

fn window_required(column: &Column) -> PolarsError {
    PolarsError::InvalidOperation(
        format!(
            "{} uses a ranking window function without a window; call .over(&Window::order_by(...)) on it",
            column.name()
        )
        .into(),
    )
}

fn resolve_partition(df: &DataFrame, names: &[String]) -> Result<Vec<String>, PolarsError> {
    names.iter().map(|n| df.resolve_column_name(n)).collect()
}

fn considered_columns(
    df: &DataFrame,
    subset: Option<Vec<&str>>,
) -> Result<Vec<String>, PolarsError> {
    match subset {
        Some(cols) => cols.iter().map(|c| df.resolve_column_name(c)).collect(),
        None => df.columns(),
    }
}

/// Drop rows with nulls. `how = "any"` drops a row if any considered column is null,
/// `"all"` only if every considered column is null.
pub fn dropna(
    df: &DataFrame,
    how: &str,
    subset: Option<Vec<&str>>,
    case_sensitive: bool,
) -> Result<DataFrame, PolarsError> {
    let all = match how.trim().to_lowercase().as_str() {
        "any" => false,
        "all" => true,
        other => {
            return Err(PolarsError::InvalidOperation(
                format!("dropna: how must be 'any' or 'all', got '{other}'").into(),
            ))
        }
    };
    let names = considered_columns(df, subset)?;
    let keep = names
        .iter()
        .map(|n| col(n.as_str()).is_not_null())
        .reduce(|acc, e| if all { acc.or(e) } else { acc.and(e) });
    match keep {
        Some(predicate) => filter(df, predicate, case_sensitive),
        None => Ok(df.clone()),
    }
}

/// Keep rows with at least `thresh` non-null values among the considered columns (Spark `thresh`).
pub fn dropna_thresh(
    df: &DataFrame,
    thresh: usize,
    subset: Option<Vec<&str>>,
    case_sensitive: bool,
) -> Result<DataFrame, PolarsError> {
    let names = considered_columns(df, subset)?;
    let non_null = names
        .iter()
        .map(|n| col(n.as_str()).is_not_null().cast(DataType::UInt32))
        .reduce(|acc, e| acc + e);
    match non_null {
        Some(count) => filter(df, count.gt_eq(lit(thresh as u32)), case_sensitive),
        None if thresh == 0 => Ok(df.clone()),
        None => filter(df, lit(false), case_sensitive),
    }
}

/// Replacement value for [`fillna`]. Spark fills only the columns whose type matches
/// the value: strings fill string columns, numbers numeric columns, booleans boolean ones.
#[derive(Debug, Clone, PartialEq)]
pub enum FillValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl FillValue {
    fn kind(&self) -> OperandKind {
        match self {
            FillValue::Str(_) => OperandKind::String,
            FillValue::Int(_) | FillValue::Float(_) => OperandKind::Numeric,
            FillValue::Bool(_) => OperandKind::Boolean,
        }
    }

    fn literal(&self) -> Expr {
        match self {
            FillValue::Str(s) => lit(s.clone()),
            FillValue::Int(i) => lit(*i),
            FillValue::Float(f) => lit(*f),
            FillValue::Bool(b) => lit(*b),
        }
    }
}

impl From<&str> for FillValue {
    fn from(s: &str) -> Self {
        FillValue::Str(s.to_string())
    }
}

impl From<String> for FillValue {
    fn from(s: String) -> Self {
        FillValue::Str(s)
    }
}

impl From<i64> for FillValue {
    fn from(i: i64) -> Self {
        FillValue::Int(i)
    }
}

impl From<i32> for FillValue {
    fn from(i: i32) -> Self {
        FillValue::Int(i64::from(i))
    }
}

impl From<f64> for FillValue {
    fn from(f: f64) -> Self {
        FillValue::Float(f)
    }
}

impl From<bool> for FillValue {
    fn from(b: bool) -> Self {
        FillValue::Bool(b)
    }
}

/// Fill nulls in the considered columns whose type matches `value`.
pub fn fillna(
    df: &DataFrame,
    value: FillValue,
    subset: Option<Vec<&str>>,
    case_sensitive: bool,
) -> Result<DataFrame, PolarsError> {
    let names = considered_columns(df, subset)?;
    let schema = df.df.schema();
    let mut exprs: Vec<Expr> = Vec::new();
    for name in &names {
        let Some(dtype) = schema.get(name.as_str()) else {
            continue;
        };
        if OperandKind::from_dtype(dtype) != value.kind() {
            continue;
        }
        exprs.push(
            col(name.as_str())
                .fill_null(value.literal().cast(dtype.clone()))
                .alias(name.as_str()),
        );
    }
    if exprs.is_empty() {
        return Ok(df.clone());
    }
    let pl_df = df
        .df
        .as_ref()
        .clone()
        .lazy()
        .with_columns(exprs)
        .collect()?;
    Ok(super::DataFrame::from_polars_with_options(
        pl_df,
        case_sensitive,
    ))
}

/// One row per array element. With `outer = false` rows whose array is null or empty are
/// dropped (Spark `explode`); with `outer = true` they are kept with a null element.
pub fn explode(
    df: &DataFrame,
    column_name: &str,
    outer: bool,
    case_sensitive: bool,
) -> Result<DataFrame, PolarsError> {
    let name = df.resolve_column_name(column_name)?;
    let source = if outer {
        df.df.as_ref().clone()
    } else {
        df.df
            .as_ref()
            .clone()
            .lazy()
            .filter(col(name.as_str()).list().len().gt(lit(0)))
            .collect()?
    };
    let pl_df = source.explode([name.as_str()])?;
    Ok(super::DataFrame::from_polars_with_options(
        pl_df,
        case_sensitive,
    ))
}

/// Limit: return first n rows.
pub fn limit(df: &DataFrame, n: usize, case_sensitive: bool) -> Result<DataFrame, PolarsError> {
    let pl_df = df.df.as_ref().clone().head(Some(n));
    Ok(super::DataFrame::from_polars_with_options(
        pl_df,
        case_sensitive,
    ))
}

/// NA sub-API (PySpark `df.na`).
pub struct DataFrameNa<'a> {
    pub(super) df: &'a DataFrame,
}

impl<'a> DataFrameNa<'a> {
    /// PySpark `df.na.drop(how, subset)`.
    pub fn drop(&self, how: &str, subset: Option<Vec<&str>>) -> Result<DataFrame, PolarsError> {
        self.df.dropna(how, subset)
    }

    /// PySpark `df.na.fill(value, subset)`.
    pub fn fill(
        &self,
        value: impl Into<FillValue>,
        subset: Option<Vec<&str>>,
    ) -> Result<DataFrame, PolarsError> {
        self.df.fillna(value, subset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{col as column, upper};
    use polars::prelude::df;

    fn outlets() -> DataFrame {
        DataFrame::from_polars(
            df!(
                "Outlet_Size" => &[Some("Medium"), None, Some("High"), None],
                "Item_Weight" => &[Some(9.3), Some(5.92), None, None],
                "Outlet_Type" => &[Some("Supermarket Type1"), Some("Grocery Store"), None, Some("Supermarket Type3")]
            )
            .unwrap(),
        )
    }

    #[test]
    fn dropna_any_all_and_subset() {
        let df = outlets();
        assert_eq!(dropna(&df, "any", None, false).unwrap().count().unwrap(), 1);
        assert_eq!(dropna(&df, "all", None, false).unwrap().count().unwrap(), 4);
        let subset = dropna(&df, "any", Some(vec!["outlet_size"]), false).unwrap();
        assert_eq!(subset.count().unwrap(), 2);
        assert!(dropna(&df, "some", None, false).is_err());
    }

    #[test]
    fn dropna_thresh_counts_non_nulls() {
        let df = outlets();
        assert_eq!(dropna_thresh(&df, 2, None, false).unwrap().count().unwrap(), 2);
        assert_eq!(dropna_thresh(&df, 3, None, false).unwrap().count().unwrap(), 1);
    }

    #[test]
    fn fillna_only_touches_matching_types() {
        let df = outlets();
        let filled = fillna(&df, "NotAvailable".into(), None, false).unwrap();
        let rows = filled.collect_as_json_rows().unwrap();
        assert_eq!(rows[1]["Outlet_Size"], "NotAvailable");
        assert_eq!(rows[2]["Outlet_Type"], "NotAvailable");
        assert!(rows[2]["Item_Weight"].is_null());

        let numeric = fillna(&df, 0i64.into(), Some(vec!["Item_Weight"]), false).unwrap();
        let rows = numeric.collect_as_json_rows().unwrap();
        assert_eq!(rows[2]["Item_Weight"].as_f64(), Some(0.0));
        assert!(rows[1]["Outlet_Size"].is_null());

        assert!(fillna(&df, "x".into(), Some(vec!["missing"]), false).is_err());
    }

    #[test]
    fn explode_drops_null_and_empty_arrays() {
        let df = outlets();
        let split = with_column(&df, "Outlet_Type", &column("Outlet_Type").split(" "), false)
            .unwrap();
        let exploded = explode(&split, "Outlet_Type", false, false).unwrap();
        assert_eq!(exploded.count().unwrap(), 6);
        let outer = explode(&split, "Outlet_Type", true, false).unwrap();
        assert_eq!(outer.count().unwrap(), 7);
    }

    #[test]
    fn with_column_replaces_in_place() {
        let df = outlets();
        let out = with_column(&df, "outlet_size", &upper(&column("Outlet_Size")), false).unwrap();
        assert_eq!(out.columns().unwrap(), df.columns().unwrap());
        let rows = out.collect_as_json_rows().unwrap();
        assert_eq!(rows[0]["Outlet_Size"], "MEDIUM");
    }

    #[test]
    fn with_column_rejects_bare_ranking_function() {
        let df = outlets();
        assert!(with_column(&df, "rn", &crate::functions::row_number(), false).is_err());
    }
}
