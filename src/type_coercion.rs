use polars::prelude::*;

/// What is statically known about one side of a comparison.
///
/// Literals carry their type; column references and derived expressions are `Unknown`
/// until the plan runs, so coercion is decided from the literal side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperandKind {
    Numeric,
    String,
    Boolean,
    #[default]
    Unknown,
}

impl OperandKind {
    pub(crate) fn from_dtype(dtype: &DataType) -> OperandKind {
        if is_numeric(dtype) {
            OperandKind::Numeric
        } else if dtype == &DataType::String {
            OperandKind::String
        } else if dtype == &DataType::Boolean {
            OperandKind::Boolean
        } else {
            OperandKind::Unknown
        }
    }
}

/// Check if a DataType is numeric
pub(crate) fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Coerce an expression to double the way Spark implicitly casts a string operand:
/// surrounding whitespace is ignored and non-numeric text becomes null.
pub fn to_double(expr: Expr, kind: OperandKind) -> Expr {
    match kind {
        OperandKind::String | OperandKind::Unknown => expr
            .cast(DataType::String)
            .str()
            .strip_chars(lit(NULL))
            .cast(DataType::Float64),
        _ => expr.cast(DataType::Float64),
    }
}

/// Coerce two operands for a Spark-style comparison.
///
/// - numeric vs numeric: compared as double
/// - numeric vs string/unknown: the non-numeric side is parsed as double (unparseable -> null)
/// - anything else: left unchanged
pub fn coerce_for_spark_comparison(
    left: Expr,
    left_kind: OperandKind,
    right: Expr,
    right_kind: OperandKind,
) -> (Expr, Expr) {
    let numeric_side =
        left_kind == OperandKind::Numeric || right_kind == OperandKind::Numeric;
    if !numeric_side {
        return (left, right);
    }
    let both_known_numeric =
        left_kind == OperandKind::Numeric && right_kind == OperandKind::Numeric;
    if both_known_numeric {
        return (
            left.cast(DataType::Float64),
            right.cast(DataType::Float64),
        );
    }
    (to_double(left, left_kind), to_double(right, right_kind))
}
