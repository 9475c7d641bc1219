//! UDF registry: session-scoped storage for Rust UDFs.
//! PySpark parity: udf(f, returnType) / spark.udf.register; call_udf resolves by name.

use crate::column::Column;
use polars::prelude::{map_multiple, DataType, Expr, GetOutput, PolarsError, Series};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Rust UDF: takes columns as Series, returns one Series. Used via Expr::map / map_multiple.
pub trait RustUdf: Send + Sync {
    fn apply(&self, columns: &[Series]) -> Result<Series, PolarsError>;
}

/// Type-erased wrapper for Rust UDF closures.
struct RustUdfWrapper<F>
where
    F: Fn(&[Series]) -> Result<Series, PolarsError> + Send + Sync,
{
    f: F,
}

impl<F> RustUdf for RustUdfWrapper<F>
where
    F: Fn(&[Series]) -> Result<Series, PolarsError> + Send + Sync,
{
    fn apply(&self, columns: &[Series]) -> Result<Series, PolarsError> {
        (self.f)(columns)
    }
}

/// A UDF bound to its declared return type. Calling it builds a lazy expression.
#[derive(Clone)]
pub struct UserDefinedFunction {
    name: String,
    udf: Arc<dyn RustUdf>,
    return_type: DataType,
}

impl std::fmt::Debug for UserDefinedFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDefinedFunction")
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .finish()
    }
}

impl UserDefinedFunction {
    pub fn new<F>(name: &str, return_type: DataType, f: F) -> Self
    where
        F: Fn(&[Series]) -> Result<Series, PolarsError> + Send + Sync + 'static,
    {
        UserDefinedFunction {
            name: name.to_string(),
            udf: Arc::new(RustUdfWrapper { f }),
            return_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> &DataType {
        &self.return_type
    }

    /// Apply the UDF to columns. Evaluation is lazy; the closure runs once per batch
    /// when the plan executes. Output values are cast to the declared return type
    /// (unconvertible values become null).
    pub fn call(&self, args: &[&Column]) -> Result<Column, PolarsError> {
        let Some(first) = args.first() else {
            return Err(PolarsError::InvalidOperation(
                format!("udf {} needs at least one argument", self.name).into(),
            ));
        };
        let output = GetOutput::from_type(self.return_type.clone());
        let udf = self.udf.clone();
        let udf_name = self.name.clone();
        let return_type = self.return_type.clone();
        let expr = if args.len() == 1 {
            first.expr().clone().map(
                move |c| {
                    crate::udfs::apply_rust_udf(&udf, &udf_name, &[c], &return_type)
                },
                output,
            )
        } else {
            let exprs: Vec<Expr> = args.iter().map(|c| c.expr().clone()).collect();
            map_multiple(
                move |columns| {
                    crate::udfs::apply_rust_udf(&udf, &udf_name, columns, &return_type)
                },
                exprs,
                output,
            )
        };
        let arg_names: Vec<&str> = args.iter().map(|c| c.name()).collect();
        let out = Column::from_expr(
            expr,
            Some(format!("{}({})", self.name, arg_names.join(", "))),
        );
        Ok(args.iter().fold(out, |out, arg| out.absorb(arg)))
    }
}

/// Session-scoped UDF registry. Rust UDFs run lazily via Polars Expr::map.
#[derive(Clone, Default)]
pub struct UdfRegistry {
    rust_udfs: Arc<RwLock<HashMap<String, UserDefinedFunction>>>,
}

impl UdfRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a UDF under its own name, replacing any previous registration.
    pub fn register(&self, udf: UserDefinedFunction) -> Result<(), PolarsError> {
        self.rust_udfs
            .write()
            .map_err(|_| PolarsError::ComputeError("udf registry lock poisoned".into()))?
            .insert(udf.name.clone(), udf);
        Ok(())
    }

    /// Look up a UDF by name. Case sensitivity follows session config.
    pub fn get(&self, name: &str, case_sensitive: bool) -> Option<UserDefinedFunction> {
        let guard = self.rust_udfs.read().ok()?;
        if case_sensitive {
            guard.get(name).cloned()
        } else {
            let name_lower = name.to_lowercase();
            guard
                .iter()
                .find(|(k, _)| k.to_lowercase() == name_lower)
                .map(|(_, v)| v.clone())
        }
    }

    pub fn has_udf(&self, name: &str, case_sensitive: bool) -> bool {
        self.get(name, case_sensitive).is_some()
    }

    pub fn clear(&self) -> Result<(), PolarsError> {
        self.rust_udfs
            .write()
            .map_err(|_| PolarsError::ComputeError("udf registry lock poisoned".into()))?
            .clear();
        Ok(())
    }
}

thread_local! {
    static THREAD_UDF_CONTEXT: RefCell<Option<(UdfRegistry, bool)>> = const { RefCell::new(None) };
}

/// Set the thread-local UDF context (registry + case_sensitive). Called by SparkSession.
pub(crate) fn set_thread_udf_context(registry: UdfRegistry, case_sensitive: bool) {
    THREAD_UDF_CONTEXT.with(|cell| *cell.borrow_mut() = Some((registry, case_sensitive)));
}

/// Get the thread-local UDF context for call_udf.
pub(crate) fn get_thread_udf_context() -> Option<(UdfRegistry, bool)> {
    THREAD_UDF_CONTEXT.with(|cell| cell.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{df, IntoLazy};

    fn doubled() -> UserDefinedFunction {
        UserDefinedFunction::new("doubled", DataType::Int64, |cols: &[Series]| {
            let s = &cols[0];
            Ok(s * 2)
        })
    }

    #[test]
    fn lookup_respects_case_sensitivity() {
        let registry = UdfRegistry::new();
        registry.register(doubled()).unwrap();
        assert!(registry.has_udf("DOUBLED", false));
        assert!(!registry.has_udf("DOUBLED", true));
        registry.clear().unwrap();
        assert!(!registry.has_udf("doubled", false));
    }

    #[test]
    fn call_runs_lazily_and_casts_output() {
        let df = df!("a" => &[1i32, 2, 3]).unwrap();
        let column = doubled()
            .call(&[&Column::new("a".to_string())])
            .unwrap();
        assert_eq!(column.name(), "doubled(a)");
        let out = df
            .lazy()
            .select([column.alias("d").into_expr()])
            .collect()
            .unwrap();
        let values: Vec<Option<i64>> = out.column("d").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(2), Some(4), Some(6)]);
    }

    #[test]
    fn multi_argument_udf() {
        let add = UserDefinedFunction::new("add", DataType::Float64, |cols: &[Series]| {
            &cols[0] + &cols[1]
        });
        let df = df!("a" => &[1.5f64, 2.0], "b" => &[1.0f64, 0.5]).unwrap();
        let column = add
            .call(&[&Column::new("a".to_string()), &Column::new("b".to_string())])
            .unwrap();
        let out = df
            .lazy()
            .select([column.alias("s").into_expr()])
            .collect()
            .unwrap();
        let values: Vec<Option<f64>> = out.column("s").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(2.5), Some(2.5)]);
        assert!(add.call(&[]).is_err());
    }
}
