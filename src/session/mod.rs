//! SparkSession: entry point for creating DataFrames, reading files, registering UDFs and
//! resolving managed tables.

mod builder;
mod reader;

pub use builder::SparkSessionBuilder;
pub use reader::DataFrameReader;

use crate::config::{
    parse_bool, SparklessConfig, CASE_SENSITIVE_KEY, DEFAULT_WAREHOUSE_DIR, WAREHOUSE_DIR_KEY,
};
use crate::dataframe::{DataFrame, TableMetadata, TABLE_METADATA_FILE};
use crate::functions::udf;
use crate::schema::{DataType, StructType};
use crate::udf_registry::{set_thread_udf_context, UdfRegistry, UserDefinedFunction};
use log::{debug, info};
use polars::prelude::{
    DataFrame as PlDataFrame, IntoColumn, IntoSeries, ListChunked, NamedFrom, PolarsError,
    Series, TimeUnit,
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Main entry point for creating DataFrames and executing queries.
/// Similar to PySpark's SparkSession but using Polars as the backend.
#[derive(Clone)]
pub struct SparkSession {
    app_name: Option<String>,
    master: Option<String>,
    pub(crate) config: HashMap<String, String>,
    pub(crate) udf_registry: UdfRegistry,
    /// Managed tables saved through `save_as_table`: lower-cased name -> directory.
    catalog: Arc<RwLock<HashMap<String, PathBuf>>>,
}

impl SparkSession {
    pub fn new(
        app_name: Option<String>,
        master: Option<String>,
        config: HashMap<String, String>,
    ) -> Self {
        SparkSession {
            app_name,
            master,
            config,
            udf_registry: UdfRegistry::new(),
            catalog: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn builder() -> SparkSessionBuilder {
        SparkSessionBuilder::new()
    }

    /// Create a session from a [`SparklessConfig`].
    /// Equivalent to `SparkSession::builder().with_config(config).get_or_create()`.
    pub fn from_config(config: &SparklessConfig) -> SparkSession {
        let mut builder = Self::builder().with_config(config);
        if let Some(name) = &config.app_name {
            builder = builder.app_name(name.clone());
        }
        builder.get_or_create()
    }

    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    pub fn master(&self) -> Option<&str> {
        self.master.as_deref()
    }

    /// Config value set on the builder (`spark.sql.warehouse.dir`, ...).
    pub fn get_config(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(|s| s.as_str())
    }

    /// Whether column names (and UDF / table names) are case-sensitive.
    /// Reads `spark.sql.caseSensitive`; default false, like PySpark.
    pub fn is_case_sensitive(&self) -> bool {
        self.config
            .get(CASE_SENSITIVE_KEY)
            .map(|v| parse_bool(v))
            .unwrap_or(false)
    }

    /// Directory holding managed tables (`spark.sql.warehouse.dir`, default `spark-warehouse`).
    pub fn warehouse_dir(&self) -> PathBuf {
        PathBuf::from(
            self.config
                .get(WAREHOUSE_DIR_KEY)
                .map(|s| s.as_str())
                .unwrap_or(DEFAULT_WAREHOUSE_DIR),
        )
    }

    /// Directory a managed table called `name` is written to.
    pub fn table_path(&self, name: &str) -> PathBuf {
        self.warehouse_dir().join(name)
    }

    fn catalog_key(&self, name: &str) -> String {
        if self.is_case_sensitive() {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    /// Record a managed table in the session catalog.
    pub fn register_table(&self, name: &str, dir: PathBuf) -> Result<(), PolarsError> {
        let key = self.catalog_key(name);
        self.catalog
            .write()
            .map_err(|_| PolarsError::ComputeError("table catalog lock poisoned".into()))?
            .insert(key, dir);
        Ok(())
    }

    /// Names of the tables registered in this session, sorted.
    pub fn list_tables(&self) -> Result<Vec<String>, PolarsError> {
        let guard = self
            .catalog
            .read()
            .map_err(|_| PolarsError::ComputeError("table catalog lock poisoned".into()))?;
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Read a managed table (PySpark `spark.table(name)`).
    /// Looks in the session catalog first, then under the warehouse directory, so tables
    /// saved by an earlier session are found too.
    pub fn table(&self, name: &str) -> Result<DataFrame, PolarsError> {
        let registered = self
            .catalog
            .read()
            .map_err(|_| PolarsError::ComputeError("table catalog lock poisoned".into()))?
            .get(&self.catalog_key(name))
            .cloned();
        let dir = registered.unwrap_or_else(|| self.table_path(name));
        let meta_path = dir.join(TABLE_METADATA_FILE);
        if !meta_path.is_file() {
            return Err(PolarsError::ComputeError(
                format!(
                    "table or view '{name}' not found (looked in {})",
                    dir.display()
                )
                .into(),
            ));
        }
        let raw = std::fs::read_to_string(&meta_path).map_err(|e| {
            PolarsError::ComputeError(format!("table {name}: read metadata: {e}").into())
        })?;
        let metadata: TableMetadata = serde_json::from_str(&raw).map_err(|e| {
            PolarsError::ComputeError(format!("table {name}: parse metadata: {e}").into())
        })?;
        debug!("reading table {} ({}) from {}", metadata.name, metadata.format, dir.display());
        self.read()
            .format("parquet")
            .schema(&metadata.schema)
            .load(&dir)
    }

    /// Create a DataFrame from a vector of (i64, i64, String) tuples.
    ///
    /// # Example
    /// ```
    /// use spark_transformations::SparkSession;
    ///
    /// let spark = SparkSession::builder().app_name("test").get_or_create();
    /// let df = spark
    ///     .create_dataframe(
    ///         vec![(1, 25, "Alice".to_string()), (2, 30, "Bob".to_string())],
    ///         vec!["id", "age", "name"],
    ///     )
    ///     .unwrap();
    /// assert_eq!(df.count().unwrap(), 2);
    /// ```
    pub fn create_dataframe(
        &self,
        data: Vec<(i64, i64, String)>,
        column_names: Vec<&str>,
    ) -> Result<DataFrame, PolarsError> {
        if column_names.len() != 3 {
            return Err(PolarsError::ComputeError(
                format!(
                    "create_dataframe: expected 3 column names for (i64, i64, String) tuples, got {}",
                    column_names.len()
                )
                .into(),
            ));
        }
        let mut first = Vec::with_capacity(data.len());
        let mut second = Vec::with_capacity(data.len());
        let mut third = Vec::with_capacity(data.len());
        for (a, b, c) in data {
            first.push(a);
            second.push(b);
            third.push(c);
        }
        let pl_df = PlDataFrame::new(vec![
            Series::new(column_names[0].into(), first).into_column(),
            Series::new(column_names[1].into(), second).into_column(),
            Series::new(column_names[2].into(), third).into_column(),
        ])?;
        Ok(self.create_dataframe_from_polars(pl_df))
    }

    /// Wrap a Polars DataFrame, carrying this session's case sensitivity.
    pub fn create_dataframe_from_polars(&self, df: PlDataFrame) -> DataFrame {
        DataFrame::from_polars_with_options(df, self.is_case_sensitive())
    }

    /// Create a DataFrame from rows of JSON values and a `(name, type)` schema
    /// (`[("emp_id", "string"), ("dept_id", "string")]`). Row values are positional.
    pub fn create_dataframe_from_rows(
        &self,
        rows: Vec<Vec<JsonValue>>,
        schema: Vec<(String, String)>,
    ) -> Result<DataFrame, PolarsError> {
        let mut fields = Vec::with_capacity(schema.len());
        for (name, type_name) in &schema {
            fields.push(crate::schema::StructField::new(
                name.clone(),
                DataType::parse(type_name)?,
                true,
            ));
        }
        self.create_dataframe_with_schema(rows, &StructType::new(fields))
    }

    /// Create a DataFrame from rows and a DDL schema string
    /// (`"emp_id STRING, emp_name STRING, dept_id STRING"`).
    pub fn create_dataframe_from_ddl(
        &self,
        rows: Vec<Vec<JsonValue>>,
        ddl: &str,
    ) -> Result<DataFrame, PolarsError> {
        self.create_dataframe_with_schema(rows, &StructType::from_ddl(ddl)?)
    }

    /// Create a DataFrame from rows and a [`StructType`].
    pub fn create_dataframe_with_schema(
        &self,
        rows: Vec<Vec<JsonValue>>,
        schema: &StructType,
    ) -> Result<DataFrame, PolarsError> {
        let width = schema.fields().len();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(PolarsError::ShapeMismatch(
                    format!(
                        "create_dataframe: row {i} has {} values but the schema has {width} fields",
                        row.len()
                    )
                    .into(),
                ));
            }
        }
        let mut columns = Vec::with_capacity(width);
        for (idx, field) in schema.fields().iter().enumerate() {
            let cells: Vec<&JsonValue> = rows.iter().map(|r| &r[idx]).collect();
            let series = json_cells_to_series(&field.name, &field.data_type, &cells)?;
            columns.push(series.into_column());
        }
        let pl_df = PlDataFrame::new(columns)?;
        Ok(self.create_dataframe_from_polars(pl_df))
    }

    /// Register a UDF by name with the Spark default return type (string).
    pub fn register_udf<F>(&self, name: &str, f: F) -> Result<(), PolarsError>
    where
        F: Fn(&[Series]) -> Result<Series, PolarsError> + Send + Sync + 'static,
    {
        self.register(udf(name, f))
    }

    /// Register a UDF with an explicit return type name (`int`, `double`, ...).
    pub fn register_udf_with_return_type<F>(
        &self,
        name: &str,
        return_type: &str,
        f: F,
    ) -> Result<(), PolarsError>
    where
        F: Fn(&[Series]) -> Result<Series, PolarsError> + Send + Sync + 'static,
    {
        self.register(crate::functions::udf_with_return_type(name, return_type, f)?)
    }

    /// Register an already-built UDF (PySpark `spark.udf.register(name, f)`).
    pub fn register(&self, udf: UserDefinedFunction) -> Result<(), PolarsError> {
        debug!("registering udf {}", udf.name());
        self.udf_registry.register(udf)
    }

    /// Get a DataFrameReader for reading files.
    pub fn read(&self) -> DataFrameReader {
        DataFrameReader::new(self.clone())
    }

    /// Make this session the one `call_udf` resolves against on the current thread.
    pub fn set_active(&self) {
        set_thread_udf_context(self.udf_registry.clone(), self.is_case_sensitive());
    }

    /// Stop the session: drops registered UDFs. Files already written stay on disk.
    pub fn stop(&self) -> Result<(), PolarsError> {
        info!(
            "stopping session {}",
            self.app_name.as_deref().unwrap_or("<unnamed>")
        );
        self.udf_registry.clear()
    }
}

impl Default for SparkSession {
    fn default() -> Self {
        Self::builder().get_or_create()
    }
}

fn type_error(name: &str, expected: &str, value: &JsonValue) -> PolarsError {
    PolarsError::SchemaMismatch(
        format!("create_dataframe: column '{name}' expects {expected}, got {value}").into(),
    )
}

/// Build one column from JSON cells. Strings are accepted for every scalar type and parsed.
fn json_cells_to_series(
    name: &str,
    data_type: &DataType,
    cells: &[&JsonValue],
) -> Result<Series, PolarsError> {
    let series = match data_type {
        DataType::String => {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|v| match v {
                    JsonValue::Null => None,
                    JsonValue::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                })
                .collect();
            Series::new(name.into(), values)
        }
        DataType::Integer | DataType::Long => {
            let values = cells
                .iter()
                .map(|v| match v {
                    JsonValue::Null => Ok(None),
                    JsonValue::Number(n) => n
                        .as_i64()
                        .map(Some)
                        .ok_or_else(|| type_error(name, "an integer", v)),
                    JsonValue::String(s) => s
                        .trim()
                        .parse::<i64>()
                        .map(Some)
                        .map_err(|_| type_error(name, "an integer", v)),
                    _ => Err(type_error(name, "an integer", v)),
                })
                .collect::<Result<Vec<Option<i64>>, _>>()?;
            Series::new(name.into(), values)
        }
        DataType::Float | DataType::Double => {
            let values = cells
                .iter()
                .map(|v| match v {
                    JsonValue::Null => Ok(None),
                    JsonValue::Number(n) => n
                        .as_f64()
                        .map(Some)
                        .ok_or_else(|| type_error(name, "a number", v)),
                    JsonValue::String(s) => s
                        .trim()
                        .parse::<f64>()
                        .map(Some)
                        .map_err(|_| type_error(name, "a number", v)),
                    _ => Err(type_error(name, "a number", v)),
                })
                .collect::<Result<Vec<Option<f64>>, _>>()?;
            Series::new(name.into(), values)
        }
        DataType::Boolean => {
            let values = cells
                .iter()
                .map(|v| match v {
                    JsonValue::Null => Ok(None),
                    JsonValue::Bool(b) => Ok(Some(*b)),
                    JsonValue::String(s) => match s.trim().to_lowercase().as_str() {
                        "true" => Ok(Some(true)),
                        "false" => Ok(Some(false)),
                        _ => Err(type_error(name, "a boolean", v)),
                    },
                    _ => Err(type_error(name, "a boolean", v)),
                })
                .collect::<Result<Vec<Option<bool>>, _>>()?;
            Series::new(name.into(), values)
        }
        DataType::Date => {
            let values = cells
                .iter()
                .map(|v| match v {
                    JsonValue::Null => Ok(None),
                    JsonValue::String(s) => chrono::NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                        .map(|d| Some(crate::date_utils::naive_date_to_days(d)))
                        .map_err(|_| type_error(name, "a yyyy-MM-dd date", v)),
                    _ => Err(type_error(name, "a yyyy-MM-dd date", v)),
                })
                .collect::<Result<Vec<Option<i32>>, _>>()?;
            Series::new(name.into(), values).cast(&polars::prelude::DataType::Date)?
        }
        DataType::Timestamp => {
            let values = cells
                .iter()
                .map(|v| match v {
                    JsonValue::Null => Ok(None),
                    JsonValue::String(s) => {
                        chrono::NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S")
                            .map(|dt| Some(dt.and_utc().timestamp_micros()))
                            .map_err(|_| type_error(name, "a yyyy-MM-dd HH:mm:ss timestamp", v))
                    }
                    _ => Err(type_error(name, "a yyyy-MM-dd HH:mm:ss timestamp", v)),
                })
                .collect::<Result<Vec<Option<i64>>, _>>()?;
            Series::new(name.into(), values).cast(&polars::prelude::DataType::Datetime(
                TimeUnit::Microseconds,
                None,
            ))?
        }
        DataType::Array(inner) => {
            let mut lists: Vec<Option<Series>> = Vec::with_capacity(cells.len());
            for v in cells {
                match v {
                    JsonValue::Null => lists.push(None),
                    JsonValue::Array(items) => {
                        let refs: Vec<&JsonValue> = items.iter().collect();
                        lists.push(Some(json_cells_to_series("", inner, &refs)?));
                    }
                    _ => return Err(type_error(name, "an array", v)),
                }
            }
            let ca: ListChunked = lists.into_iter().collect();
            ca.into_series()
                .with_name(name.into())
                .cast(&data_type.to_polars())?
        }
    };
    Ok(series)
}
