//! Helpers for element-wise functions used by map() expressions (initcap, registered UDFs).
//! These run at plan execution time when Polars invokes the closure.

use crate::udf_registry::RustUdf;
use polars::prelude::*;
use std::borrow::Cow;
use std::sync::Arc;

/// Spark initcap: every letter following a space (or the start) is uppercased, all others lowercased.
fn initcap_one(s: &str) -> Cow<'_, str> {
    let mut out = String::with_capacity(s.len());
    let mut word_start = true;
    for c in s.chars() {
        if word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        word_start = c == ' ';
    }
    Cow::Owned(out)
}

/// Apply initcap to a string column; returns a new Column (Series).
pub fn apply_initcap(column: Column) -> PolarsResult<Option<Column>> {
    let name = column.field().into_owned().name;
    let series = column.take_materialized_series();
    let ca = series
        .str()
        .map_err(|e| PolarsError::ComputeError(format!("initcap: {}", e).into()))?;
    let out: StringChunked = ca.apply_values(initcap_one);
    Ok(Some(Column::new(name, out.into_series())))
}

/// Run a registered UDF over materialized input columns and cast the result to `return_type`.
/// The output keeps the name of the first input, like Polars `map`.
pub(crate) fn apply_rust_udf(
    udf: &Arc<dyn RustUdf>,
    udf_name: &str,
    columns: &[Column],
    return_type: &DataType,
) -> PolarsResult<Option<Column>> {
    let inputs: Vec<Series> = columns
        .iter()
        .map(|c| c.as_materialized_series().clone())
        .collect();
    let Some(first) = inputs.first() else {
        return Err(PolarsError::ComputeError(
            format!("udf {udf_name}: called without input columns").into(),
        ));
    };
    let name = first.name().clone();
    let height = first.len();
    let out = udf
        .apply(&inputs)
        .map_err(|e| PolarsError::ComputeError(format!("udf {udf_name}: {e}").into()))?;
    if out.len() != height {
        return Err(PolarsError::ShapeMismatch(
            format!(
                "udf {udf_name}: returned {} values for {} input rows",
                out.len(),
                height
            )
            .into(),
        ));
    }
    let out = out.cast(return_type)?.with_name(name);
    Ok(Some(Column::from(out)))
}
