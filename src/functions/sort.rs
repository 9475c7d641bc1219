//! Sort order specification for orderBy and window ordering.

use crate::column::Column;
use polars::prelude::Expr;

/// Sort order specification for use in orderBy/Window.orderBy. Holds expr + direction + null placement.
#[derive(Debug, Clone)]
pub struct SortOrder {
    pub(crate) expr: Expr,
    pub(crate) name: String,
    pub descending: bool,
    pub nulls_last: bool,
}

impl SortOrder {
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A bare column orders ascending, as in `Window.orderBy('Item_Type')`.
impl From<&str> for SortOrder {
    fn from(name: &str) -> Self {
        asc(&crate::functions::col(name))
    }
}

impl From<Column> for SortOrder {
    fn from(column: Column) -> Self {
        asc(&column)
    }
}

impl From<&Column> for SortOrder {
    fn from(column: &Column) -> Self {
        asc(column)
    }
}

/// Ascending sort, nulls first (Spark default for ASC).
pub fn asc(column: &Column) -> SortOrder {
    SortOrder {
        expr: column.expr().clone(),
        name: column.name().to_string(),
        descending: false,
        nulls_last: false,
    }
}

/// Descending sort, nulls last (Spark default for DESC).
pub fn desc(column: &Column) -> SortOrder {
    SortOrder {
        expr: column.expr().clone(),
        name: column.name().to_string(),
        descending: true,
        nulls_last: true,
    }
}
