use crate::functions::SortOrder;
use crate::type_coercion::{coerce_for_spark_comparison, OperandKind};
use crate::window::{WindowFunction, WindowSpec, WindowedColumn};
use polars::prelude::{col, lit, DataType, Expr, GetOutput, PolarsError, NULL};

/// Column - represents a column in a DataFrame, used for building expressions
/// Thin wrapper around Polars `Expr`.
///
/// Ranking and aggregate functions also remember how to evaluate themselves over a
/// [`WindowSpec`]; calling [`over`](Column::over) binds them to one. A bound window is
/// referenced from the expression by a temporary column, so windowed columns can be
/// cast, compared or nested like any other column.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    expr: Expr, // Polars expression for lazy evaluation
    kind: OperandKind,
    window_fn: Option<WindowFunction>,
    windows: Vec<WindowedColumn>,
    needs_over: bool,
}

impl Column {
    /// Create a new Column from a column name
    pub fn new(name: String) -> Self {
        Column {
            expr: col(name.as_str()),
            name,
            kind: OperandKind::Unknown,
            window_fn: None,
            windows: Vec::new(),
            needs_over: false,
        }
    }

    /// Create a Column from a Polars Expr
    pub fn from_expr(expr: Expr, name: Option<String>) -> Self {
        let display_name = name.unwrap_or_else(|| "<expr>".to_string());
        Column {
            name: display_name,
            expr,
            kind: OperandKind::Unknown,
            window_fn: None,
            windows: Vec::new(),
            needs_over: false,
        }
    }

    pub(crate) fn literal(expr: Expr, name: String, kind: OperandKind) -> Self {
        Column {
            name,
            expr,
            kind,
            window_fn: None,
            windows: Vec::new(),
            needs_over: false,
        }
    }

    pub(crate) fn with_window_fn(mut self, f: WindowFunction) -> Self {
        if matches!(f, WindowFunction::Ranking(_)) {
            self.needs_over = true;
        }
        self.window_fn = Some(f);
        self
    }

    /// Take over the pending windows of `other`, whose expression this column embeds.
    pub(crate) fn absorb(mut self, other: &Column) -> Self {
        for w in &other.windows {
            if !self
                .windows
                .iter()
                .any(|mine| mine.column_name() == w.column_name())
            {
                self.windows.push(w.clone());
            }
        }
        self.needs_over |= other.needs_over;
        self
    }

    fn derived(&self, expr: Expr, name: String) -> Column {
        Column::from_expr(expr, Some(name)).absorb(self)
    }

    fn derived_with(&self, other: &Column, expr: Expr, name: String) -> Column {
        self.derived(expr, name).absorb(other)
    }

    /// Get the underlying Polars Expr
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Convert to Polars Expr (consumes self)
    pub fn into_expr(self) -> Expr {
        self.expr
    }

    /// Get the column name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn kind(&self) -> OperandKind {
        self.kind
    }

    /// Windows to evaluate, in order, before this column's expression can run.
    pub(crate) fn windows(&self) -> &[WindowedColumn] {
        &self.windows
    }

    /// A ranking function somewhere in this column has not been bound with `over`.
    pub(crate) fn requires_window(&self) -> bool {
        self.needs_over
    }

    /// Alias the column
    pub fn alias(&self, name: &str) -> Column {
        Column {
            name: name.to_string(),
            expr: self.expr.clone().alias(name),
            kind: self.kind,
            window_fn: self.window_fn.clone(),
            windows: self.windows.clone(),
            needs_over: self.needs_over,
        }
    }

    /// Cast to a Spark type name (`string`, `int`, `float`, `double`, `date`, ...).
    /// Values that cannot be converted become null, like Spark's non-ANSI cast.
    pub fn cast(&self, type_name: &str) -> Result<Column, PolarsError> {
        let dtype = crate::functions::parse_type_name(type_name)?;
        let kind = OperandKind::from_dtype(&dtype);
        let expr = if crate::type_coercion::is_numeric(&dtype) {
            crate::type_coercion::to_double(self.expr.clone(), self.kind).cast(dtype)
        } else {
            self.expr.clone().cast(dtype)
        };
        let mut out = self.derived(
            expr,
            format!("CAST({} AS {})", self.name, type_name.trim().to_uppercase()),
        );
        out.kind = kind;
        Ok(out)
    }

    /// Check if column is null
    pub fn is_null(&self) -> Column {
        self.derived(
            self.expr.clone().is_null(),
            format!("({} IS NULL)", self.name),
        )
    }

    /// Check if column is not null
    pub fn is_not_null(&self) -> Column {
        self.derived(
            self.expr.clone().is_not_null(),
            format!("({} IS NOT NULL)", self.name),
        )
    }

    // --- Comparisons ---
    // Spark semantics: a null on either side yields null, and a string compared with a
    // numeric operand is parsed as double.

    fn compare(&self, other: &Column, op: &str, f: fn(Expr, Expr) -> Expr) -> Column {
        let (l, r) = coerce_for_spark_comparison(
            self.expr.clone(),
            self.kind,
            other.expr.clone(),
            other.kind,
        );
        self.derived_with(
            other,
            f(l, r),
            format!("({} {} {})", self.name, op, other.name),
        )
    }

    /// Equality comparison
    pub fn eq(&self, other: &Column) -> Column {
        self.compare(other, "=", Expr::eq)
    }

    /// Inequality comparison
    pub fn neq(&self, other: &Column) -> Column {
        self.compare(other, "!=", Expr::neq)
    }

    /// Greater than comparison
    pub fn gt(&self, other: &Column) -> Column {
        self.compare(other, ">", Expr::gt)
    }

    /// Greater than or equal comparison
    pub fn gt_eq(&self, other: &Column) -> Column {
        self.compare(other, ">=", Expr::gt_eq)
    }

    /// Less than comparison
    pub fn lt(&self, other: &Column) -> Column {
        self.compare(other, "<", Expr::lt)
    }

    /// Less than or equal comparison
    pub fn lt_eq(&self, other: &Column) -> Column {
        self.compare(other, "<=", Expr::lt_eq)
    }

    /// Boolean AND (`&` in PySpark). Three-valued: null AND false is false.
    pub fn and(&self, other: &Column) -> Column {
        self.derived_with(
            other,
            self.expr.clone().and(other.expr.clone()),
            format!("({} AND {})", self.name, other.name),
        )
    }

    /// Boolean OR (`|` in PySpark).
    pub fn or(&self, other: &Column) -> Column {
        self.derived_with(
            other,
            self.expr.clone().or(other.expr.clone()),
            format!("({} OR {})", self.name, other.name),
        )
    }

    /// Boolean NOT (`~` in PySpark).
    pub fn not(&self) -> Column {
        self.derived(self.expr.clone().not(), format!("(NOT {})", self.name))
    }

    // --- String functions ---

    /// Convert string column to uppercase (PySpark upper)
    pub fn upper(&self) -> Column {
        self.derived(
            self.expr.clone().str().to_uppercase(),
            format!("upper({})", self.name),
        )
    }

    /// Convert string column to lowercase (PySpark lower)
    pub fn lower(&self) -> Column {
        self.derived(
            self.expr.clone().str().to_lowercase(),
            format!("lower({})", self.name),
        )
    }

    /// Title case: first letter of each space-separated word uppercase, rest lowercase (PySpark initcap).
    pub fn initcap(&self) -> Column {
        let expr = self
            .expr
            .clone()
            .map(crate::udfs::apply_initcap, GetOutput::from_type(DataType::String));
        self.derived(expr, format!("initcap({})", self.name))
    }

    /// Split string by a literal delimiter (PySpark split). Returns list of strings.
    pub fn split(&self, delimiter: &str) -> Column {
        self.derived(
            self.expr
                .clone()
                .str()
                .split(lit(delimiter.to_string())),
            format!("split({}, {}, -1)", self.name, delimiter),
        )
    }

    // --- Datetime functions ---

    fn as_days(&self) -> Expr {
        self.expr.clone().cast(DataType::Date).cast(DataType::Int32)
    }

    /// Add days to a date column (PySpark date_add). Negative `days` subtracts.
    pub fn date_add(&self, days: i32) -> Column {
        self.derived(
            (self.as_days() + lit(days)).cast(DataType::Date),
            format!("date_add({}, {})", self.name, days),
        )
    }

    /// Subtract days from a date column (PySpark date_sub).
    pub fn date_sub(&self, days: i32) -> Column {
        self.derived(
            (self.as_days() - lit(days)).cast(DataType::Date),
            format!("date_sub({}, {})", self.name, days),
        )
    }

    /// Whole days from `start` to this column (PySpark datediff(end, start)).
    pub fn datediff(&self, start: &Column) -> Column {
        let mut out = self.derived_with(
            start,
            self.as_days() - start.as_days(),
            format!("datediff({}, {})", self.name, start.name),
        );
        out.kind = OperandKind::Numeric;
        out
    }

    /// Render a date/timestamp with a Spark pattern such as `dd-MM-yyyy` (PySpark date_format).
    pub fn date_format(&self, pattern: &str) -> Column {
        let chrono_fmt = crate::date_utils::spark_format_to_chrono(pattern);
        self.derived(
            self.expr.clone().dt().strftime(&chrono_fmt),
            format!("date_format({}, {})", self.name, pattern),
        )
    }

    // --- Array / List functions ---

    /// Element at 0-based `index` (PySpark `col[i]` / getItem). Out of range yields null.
    pub fn get_item(&self, index: i64) -> Column {
        self.derived(
            self.expr.clone().list().get(lit(index), true),
            format!("{}[{}]", self.name, index),
        )
    }

    /// Check if list contains value (PySpark array_contains). A null list yields null.
    pub fn array_contains(&self, value: &Column) -> Column {
        let contains = self.expr.clone().list().contains(value.expr.clone());
        let expr = polars::prelude::when(self.expr.clone().is_null())
            .then(lit(NULL).cast(DataType::Boolean))
            .otherwise(contains);
        self.derived_with(
            value,
            expr,
            format!("array_contains({}, {})", self.name, value.name),
        )
    }

    /// Number of elements in list (PySpark size). Returns Int32.
    pub fn size(&self) -> Column {
        let mut out = self.derived(
            self.expr.clone().list().len().cast(DataType::Int32),
            format!("size({})", self.name),
        );
        out.kind = OperandKind::Numeric;
        out
    }

    // --- Ordering ---

    /// Ascending sort order, nulls first (Spark default for ASC).
    pub fn asc(&self) -> SortOrder {
        crate::functions::asc(self)
    }

    /// Descending sort order, nulls last (Spark default for DESC).
    pub fn desc(&self) -> SortOrder {
        crate::functions::desc(self)
    }

    // --- Window functions ---

    /// Evaluate this column over a window (PySpark `over(Window...)`).
    ///
    /// Ranking functions and `sum`/`avg`/`count`/`min`/`max` use the window's ordering and frame;
    /// any other expression is evaluated per partition.
    pub fn over(&self, spec: &WindowSpec) -> Column {
        let is_ranking = matches!(self.window_fn, Some(WindowFunction::Ranking(_)));
        let function = self
            .window_fn
            .clone()
            .unwrap_or_else(|| WindowFunction::Expression(self.expr.clone()));
        let windowed = WindowedColumn::new(function, spec.clone());
        let expr = col(windowed.column_name());
        let mut windows = self.windows.clone();
        windows.push(windowed);
        Column {
            name: self.name.clone(),
            expr,
            kind: self.kind,
            window_fn: None,
            windows,
            // a ranking function buried in a larger expression is still unbound
            needs_over: self.needs_over && !is_ranking,
        }
    }
}

impl From<Expr> for Column {
    fn from(expr: Expr) -> Self {
        Column::from_expr(expr, None)
    }
}

#[cfg(test)]
mod tests {
    use super::Column;
    use crate::functions::{lit_i64, lit_str};
    use polars::prelude::{df, IntoLazy};

    fn strings_df() -> polars::prelude::DataFrame {
        df!(
            "item" => &[Some("soft DRINKS"), Some("meat"), None],
            "mrp" => &[Some("249.8"), Some("48.27"), Some("n/a")]
        )
        .unwrap()
    }

    #[test]
    fn test_column_new() {
        let column = Column::new("age".to_string());
        assert_eq!(column.name(), "age");
    }

    #[test]
    fn test_column_alias() {
        let column = Column::new("original".to_string());
        let aliased = column.alias("new_name");
        assert_eq!(aliased.name(), "new_name");
    }

    #[test]
    fn test_function_names_follow_spark() {
        let c = Column::new("Item_Type".to_string());
        assert_eq!(c.upper().name(), "upper(Item_Type)");
        assert_eq!(c.initcap().name(), "initcap(Item_Type)");
        assert_eq!(c.date_add(7).name(), "date_add(Item_Type, 7)");
    }

    #[test]
    fn test_initcap_title_cases_words() {
        let out = strings_df()
            .lazy()
            .select([Column::new("item".to_string()).initcap().into_expr()])
            .collect()
            .unwrap();
        let values: Vec<Option<&str>> = out.column("item").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("Soft Drinks"), Some("Meat"), None]);
    }

    #[test]
    fn test_string_vs_numeric_literal_comparison() {
        let mrp = Column::new("mrp".to_string());
        let out = strings_df()
            .lazy()
            .filter(mrp.lt(&lit_i64(100)).into_expr())
            .collect()
            .unwrap();
        // "n/a" is not a number -> null -> filtered out
        assert_eq!(out.height(), 1);
    }

    #[test]
    fn test_string_equality_and_boolean_ops() {
        let item = Column::new("item".to_string());
        let cond = item
            .eq(&lit_str("meat"))
            .or(&item.eq(&lit_str("soft DRINKS")));
        let out = strings_df().lazy().filter(cond.into_expr()).collect().unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_cast_to_float_nulls_unparseable() {
        let out = strings_df()
            .lazy()
            .select([Column::new("mrp".to_string())
                .cast("float")
                .unwrap()
                .alias("mrp")
                .into_expr()])
            .collect()
            .unwrap();
        let values: Vec<Option<f32>> = out.column("mrp").unwrap().f32().unwrap().into_iter().collect();
        assert_eq!(values[0], Some(249.8));
        assert_eq!(values[2], None);
        assert!(Column::new("x".to_string()).cast("uuid").is_err());
    }

    #[test]
    fn test_split_get_item_and_contains() {
        let df = df!("t" => &[Some("Supermarket Type1"), Some("Grocery Store"), None]).unwrap();
        let parts = Column::new("t".to_string()).split(" ");
        let out = df
            .lazy()
            .select([
                parts.get_item(1).alias("second").into_expr(),
                parts.get_item(5).alias("missing").into_expr(),
                parts.array_contains(&lit_str("Type1")).alias("has").into_expr(),
                parts.size().alias("n").into_expr(),
            ])
            .collect()
            .unwrap();
        let second: Vec<Option<&str>> = out.column("second").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(second, vec![Some("Type1"), Some("Store"), None]);
        assert_eq!(out.column("missing").unwrap().null_count(), 3);
        let has: Vec<Option<bool>> = out.column("has").unwrap().bool().unwrap().into_iter().collect();
        assert_eq!(has, vec![Some(true), Some(false), None]);
        let n: Vec<Option<i32>> = out.column("n").unwrap().i32().unwrap().into_iter().collect();
        assert_eq!(n[0], Some(2));
    }
}
