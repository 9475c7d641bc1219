//! Join operations for DataFrame.

use super::DataFrame;
use log::debug;
use polars::prelude::JoinType as PlJoinType;
use polars::prelude::{
    col, Expr, IntoLazy, JoinBuilder, JoinCoalesce, PolarsError, SortMultipleOptions,
};
use std::str::FromStr;

const LEFT_IDX: &str = "__left_idx";
const RIGHT_IDX: &str = "__right_idx";
const RIGHT_SUFFIX: &str = "_right";

/// Join type for DataFrame joins (PySpark-compatible)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Outer,
    /// Rows from left that have a match in right; only left columns (PySpark left_semi).
    LeftSemi,
    /// Rows from left that have no match in right; only left columns (PySpark left_anti).
    LeftAnti,
}

impl JoinType {
    fn to_polars(self) -> PlJoinType {
        match self {
            JoinType::Inner => PlJoinType::Inner,
            JoinType::Left => PlJoinType::Left,
            JoinType::Right => PlJoinType::Right,
            JoinType::Outer => PlJoinType::Full, // PySpark Outer = Polars Full
            JoinType::LeftSemi => PlJoinType::Semi,
            JoinType::LeftAnti => PlJoinType::Anti,
        }
    }

    fn keeps_right_columns(self) -> bool {
        !matches!(self, JoinType::LeftSemi | JoinType::LeftAnti)
    }
}

impl FromStr for JoinType {
    type Err = PolarsError;

    /// Spark spellings: `inner`, `left`/`left_outer`/`leftouter`, `right`/`right_outer`,
    /// `outer`/`full`/`full_outer`, `semi`/`left_semi`, `anti`/`left_anti`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "");
        match normalized.as_str() {
            "inner" => Ok(JoinType::Inner),
            "left" | "leftouter" => Ok(JoinType::Left),
            "right" | "rightouter" => Ok(JoinType::Right),
            "outer" | "full" | "fullouter" => Ok(JoinType::Outer),
            "semi" | "leftsemi" => Ok(JoinType::LeftSemi),
            "anti" | "leftanti" => Ok(JoinType::LeftAnti),
            _ => Err(PolarsError::InvalidOperation(
                format!(
                    "unsupported join type '{s}'; expected inner, left, right, outer, left_semi or left_anti"
                )
                .into(),
            )),
        }
    }
}

/// Join with another DataFrame on the given columns. Preserves case_sensitive on result.
/// Output columns follow PySpark: key(s), then left non-key, then right non-key
/// (right names that clash with left ones get a `_right` suffix).
pub fn join(
    left: &DataFrame,
    right: &DataFrame,
    on: Vec<&str>,
    how: JoinType,
    case_sensitive: bool,
) -> Result<DataFrame, PolarsError> {
    let right_on: Vec<String> = on
        .iter()
        .map(|k| right.resolve_column_name(k))
        .collect::<Result<Vec<_>, _>>()?;
    let left_names = left.columns()?;
    let right_names = right.columns()?;

    let mut order: Vec<String> = on.iter().map(|k| (*k).to_string()).collect();
    for n in &left_names {
        if !on.iter().any(|k| k == n) {
            order.push(n.clone());
        }
    }
    if how.keeps_right_columns() {
        for n in &right_names {
            if right_on.iter().any(|k| k == n) {
                continue;
            }
            order.push(right_output_name(n, &left_names));
        }
    }
    let left_keys: Vec<Expr> = on.iter().map(|k| col(*k)).collect();
    let right_keys: Vec<Expr> = right_on.iter().map(|k| col(k.as_str())).collect();
    let pl_df = ordered_join(
        left,
        right,
        left_keys,
        right_keys,
        how,
        JoinCoalesce::CoalesceColumns,
        &order,
    )?;
    Ok(super::DataFrame::from_polars_with_options(
        pl_df,
        case_sensitive,
    ))
}

/// Expression-style equi-join (`df1.dept_id == df2.dept_id`): both key columns are kept.
/// Output columns: all left columns, then all right columns (semi/anti: left only).
pub fn join_on(
    left: &DataFrame,
    right: &DataFrame,
    left_on: Vec<&str>,
    right_on: Vec<&str>,
    how: JoinType,
    case_sensitive: bool,
) -> Result<DataFrame, PolarsError> {
    if left_on.len() != right_on.len() || left_on.is_empty() {
        return Err(PolarsError::InvalidOperation(
            format!(
                "join_on needs the same non-zero number of left and right keys, got {} and {}",
                left_on.len(),
                right_on.len()
            )
            .into(),
        ));
    }
    let left_keys: Vec<Expr> = left_on
        .iter()
        .map(|k| left.resolve_column_name(k).map(|n| col(n.as_str())))
        .collect::<Result<Vec<_>, _>>()?;
    let right_keys: Vec<Expr> = right_on
        .iter()
        .map(|k| right.resolve_column_name(k).map(|n| col(n.as_str())))
        .collect::<Result<Vec<_>, _>>()?;
    let left_names = left.columns()?;
    let mut order = left_names.clone();
    if how.keeps_right_columns() {
        for n in right.columns()? {
            order.push(right_output_name(&n, &left_names));
        }
    }
    let pl_df = ordered_join(
        left,
        right,
        left_keys,
        right_keys,
        how,
        JoinCoalesce::KeepColumns,
        &order,
    )?;
    Ok(super::DataFrame::from_polars_with_options(
        pl_df,
        case_sensitive,
    ))
}

fn right_output_name(name: &str, left_names: &[String]) -> String {
    if left_names.iter().any(|l| l == name) {
        format!("{name}{RIGHT_SUFFIX}")
    } else {
        name.to_string()
    }
}

/// Run the Polars join, then sort by the input row positions so the output order does not
/// depend on the join implementation: left order for inner/left/outer/semi/anti, right order
/// for right joins. Finally select `order`.
fn ordered_join(
    left: &DataFrame,
    right: &DataFrame,
    left_keys: Vec<Expr>,
    right_keys: Vec<Expr>,
    how: JoinType,
    coalesce: JoinCoalesce,
    order: &[String],
) -> Result<polars::prelude::DataFrame, PolarsError> {
    debug!("{how:?} join on {} key(s)", left_keys.len());
    let left_lf = left.df.as_ref().clone().lazy().with_row_index(LEFT_IDX, None);
    let right_lf = right
        .df
        .as_ref()
        .clone()
        .lazy()
        .with_row_index(RIGHT_IDX, None);
    let joined = JoinBuilder::new(left_lf)
        .with(right_lf)
        .left_on(left_keys)
        .right_on(right_keys)
        .how(how.to_polars())
        .coalesce(coalesce)
        .suffix(RIGHT_SUFFIX)
        .finish();
    let sort_keys: Vec<&str> = match how {
        JoinType::LeftSemi | JoinType::LeftAnti => vec![LEFT_IDX],
        JoinType::Right => vec![RIGHT_IDX, LEFT_IDX],
        _ => vec![LEFT_IDX, RIGHT_IDX],
    };
    let n_keys = sort_keys.len();
    let sorted = joined.sort(
        sort_keys,
        SortMultipleOptions::new()
            .with_nulls_last_multi(vec![true; n_keys])
            .with_maintain_order(true),
    );
    let select: Vec<Expr> = order.iter().map(|n| col(n.as_str())).collect();
    sorted.select(select).collect().map_err(|e| {
        PolarsError::ComputeError(format!("join column reorder: {e}").into())
    })
}
