//! DataFrameReader for reading CSV, Parquet and JSON-lines files (and directories of
//! part files written by `DataFrameWriter`).

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};
use polars::prelude::PolarsError;

use crate::config::parse_bool;
use crate::dataframe::{part_files, DataFrame};
use crate::schema::StructType;

use super::SparkSession;

/// Default number of rows scanned when `inferSchema` is on.
const INFER_SCHEMA_LENGTH: usize = 100;

/// DataFrameReader for reading various file formats
/// Similar to PySpark's DataFrameReader with option/options/format/schema/load/table
pub struct DataFrameReader {
    pub(super) session: SparkSession,
    options: HashMap<String, String>,
    format: Option<String>,
    schema: Option<StructType>,
}

impl DataFrameReader {
    pub fn new(session: SparkSession) -> Self {
        DataFrameReader {
            session,
            options: HashMap::new(),
            format: None,
            schema: None,
        }
    }

    /// Add a single option (PySpark: option(key, value)). Returns self for chaining.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Add multiple options (PySpark: options(**kwargs)). Returns self for chaining.
    pub fn options(mut self, opts: impl IntoIterator<Item = (String, String)>) -> Self {
        for (k, v) in opts {
            self.options.insert(k, v);
        }
        self
    }

    /// Set the format for load() (PySpark: format("parquet") etc).
    pub fn format(mut self, fmt: impl Into<String>) -> Self {
        self.format = Some(fmt.into());
        self
    }

    /// Declare the schema instead of inferring it (PySpark: schema(StructType)).
    /// CSV columns are taken by position and named after the schema fields.
    pub fn schema(mut self, schema: &StructType) -> Self {
        self.schema = Some(schema.clone());
        self
    }

    /// Load data from path using format (or infer from extension) and options.
    /// A directory is read as the concatenation of its `part-*` files.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<DataFrame, PolarsError> {
        let path = path.as_ref();
        if path.is_dir() {
            return self.load_dir(path, self.format.as_deref());
        }
        match self.resolve_format(path)?.as_str() {
            "parquet" | "delta" => self.parquet(path),
            "csv" => self.csv(path),
            "json" | "jsonl" => self.json(path),
            other => Err(PolarsError::ComputeError(
                format!("load: unsupported format '{other}' for '{}'", path.display()).into(),
            )),
        }
    }

    /// Return the named table (PySpark: table(name)).
    pub fn table(&self, name: &str) -> Result<DataFrame, PolarsError> {
        self.session.table(name)
    }

    fn resolve_format(&self, path: &Path) -> Result<String, PolarsError> {
        self.format
            .as_ref()
            .map(|s| s.to_lowercase())
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(|s| s.to_lowercase())
            })
            .ok_or_else(|| {
                PolarsError::ComputeError(
                    format!(
                        "load: could not infer format for path '{}'. Use format('parquet'|'csv'|'json') before load.",
                        path.display()
                    )
                    .into(),
                )
            })
    }

    /// Read every part file of `dir`. With a `requested` format, each part must be of
    /// that format; otherwise the format of each part follows its extension.
    fn load_dir(&self, dir: &Path, requested: Option<&str>) -> Result<DataFrame, PolarsError> {
        let parts = part_files(dir)?;
        debug!("load {}: {} part file(s)", dir.display(), parts.len());
        let requested = requested.map(|f| f.to_lowercase());
        let mut combined: Option<polars::prelude::DataFrame> = None;
        for part in &parts {
            let found = part
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .unwrap_or_default();
            let family = match &requested {
                Some(format) => {
                    let family = format_family(format).ok_or_else(|| {
                        PolarsError::ComputeError(
                            format!("load: unsupported format '{format}'").into(),
                        )
                    })?;
                    if format_family(&found) != Some(family) {
                        return Err(PolarsError::ComputeError(
                            format!(
                                "load: {} is not a {format} part file; {} holds data in another format",
                                part.display(),
                                dir.display()
                            )
                            .into(),
                        ));
                    }
                    family
                }
                None => format_family(&found).ok_or_else(|| {
                    PolarsError::ComputeError(
                        format!("load: unsupported format '{found}' in {}", dir.display())
                            .into(),
                    )
                })?,
            };
            let pl_df = match family {
                "parquet" => self.read_parquet(part)?,
                "csv" => self.read_csv(part)?,
                _ => self.read_json(part)?,
            };
            match combined.as_mut() {
                Some(acc) => {
                    acc.vstack_mut(&pl_df)?;
                }
                None => combined = Some(pl_df),
            }
        }
        let pl_df = match (combined, &self.schema) {
            (Some(df), _) => df,
            (None, Some(schema)) => {
                polars::prelude::DataFrame::empty_with_schema(&schema.to_polars_schema())
            }
            (None, None) => {
                return Err(PolarsError::ComputeError(
                    format!("load: no data files in {}", dir.display()).into(),
                ))
            }
        };
        Ok(self.wrap(pl_df))
    }

    fn wrap(&self, pl_df: polars::prelude::DataFrame) -> DataFrame {
        DataFrame::from_polars_with_options(pl_df, self.session.is_case_sensitive())
    }

    fn flag(&self, key: &str) -> Option<bool> {
        self.options.get(key).map(|v| parse_bool(v))
    }

    fn apply_csv_options(
        &self,
        reader: polars::prelude::LazyCsvReader,
    ) -> polars::prelude::LazyCsvReader {
        use polars::prelude::NullValues;
        let mut r = reader
            .with_has_header(self.flag("header").unwrap_or(false))
            .with_missing_is_null(true);
        if let Some(schema) = &self.schema {
            r = r.with_schema(Some(std::sync::Arc::new(schema.to_polars_schema())));
        } else if self.flag("inferSchema").unwrap_or(false) {
            let n = self
                .options
                .get("inferSchemaLength")
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(INFER_SCHEMA_LENGTH);
            r = r.with_infer_schema_length(Some(n));
        } else {
            // Spark reads every column as string unless inferSchema is set.
            r = r.with_infer_schema_length(Some(0));
        }
        let sep = self
            .options
            .get("sep")
            .or_else(|| self.options.get("delimiter"));
        if let Some(b) = sep.and_then(|s| s.bytes().next()) {
            r = r.with_separator(b);
        }
        if let Some(null_val) = self.options.get("nullValue") {
            r = r.with_null_values(Some(NullValues::AllColumnsSingle(null_val.as_str().into())));
        }
        r
    }

    fn read_csv(&self, path: &Path) -> Result<polars::prelude::DataFrame, PolarsError> {
        use polars::prelude::*;
        let path_display = path.display();
        let reader = self.apply_csv_options(LazyCsvReader::new(path));
        let lf = reader.finish().map_err(|e| {
            PolarsError::ComputeError(format!("read csv({path_display}): {e}").into())
        })?;
        let mut pl_df = lf.collect().map_err(|e| {
            PolarsError::ComputeError(
                format!("read csv({path_display}): collect failed: {e}").into(),
            )
        })?;
        if self.schema.is_none() && !self.flag("header").unwrap_or(false) {
            let names: Vec<String> = (0..pl_df.width()).map(|i| format!("_c{i}")).collect();
            pl_df.set_column_names(names.iter().map(|s| s.as_str()))?;
        }
        Ok(pl_df)
    }

    fn read_parquet(&self, path: &Path) -> Result<polars::prelude::DataFrame, PolarsError> {
        use polars::prelude::*;
        let lf = LazyFrame::scan_parquet(path, ScanArgsParquet::default())?;
        let lf = self.cast_to_schema(lf);
        lf.collect().map_err(|e| {
            PolarsError::ComputeError(format!("read parquet({}): {e}", path.display()).into())
        })
    }

    fn read_json(&self, path: &Path) -> Result<polars::prelude::DataFrame, PolarsError> {
        use polars::prelude::*;
        use std::num::NonZeroUsize;
        let mut reader = LazyJsonLineReader::new(path);
        let n = self
            .options
            .get("inferSchemaLength")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(INFER_SCHEMA_LENGTH);
        reader = reader.with_infer_schema_length(NonZeroUsize::new(n));
        let lf = self.cast_to_schema(reader.finish()?);
        lf.collect().map_err(|e| {
            PolarsError::ComputeError(format!("read json({}): {e}", path.display()).into())
        })
    }

    /// Project onto the declared schema (order and types) for self-describing formats.
    fn cast_to_schema(&self, lf: polars::prelude::LazyFrame) -> polars::prelude::LazyFrame {
        use polars::prelude::col;
        match &self.schema {
            Some(schema) => {
                let exprs: Vec<polars::prelude::Expr> = schema
                    .fields()
                    .iter()
                    .map(|f| col(f.name.as_str()).cast(f.data_type.to_polars()))
                    .collect();
                lf.select(exprs)
            }
            None => lf,
        }
    }

    /// Read a CSV file (PySpark: read.csv). `header` defaults to false, like Spark.
    pub fn csv(&self, path: impl AsRef<Path>) -> Result<DataFrame, PolarsError> {
        let path = path.as_ref();
        if path.is_dir() {
            return self.load_dir(path, Some("csv"));
        }
        let pl_df = self.read_csv(path)?;
        info!("read csv {}: {} rows", path.display(), pl_df.height());
        Ok(self.wrap(pl_df))
    }

    pub fn parquet(&self, path: impl AsRef<Path>) -> Result<DataFrame, PolarsError> {
        let path = path.as_ref();
        if path.is_dir() {
            return self.load_dir(path, Some("parquet"));
        }
        let pl_df = self.read_parquet(path)?;
        info!("read parquet {}: {} rows", path.display(), pl_df.height());
        Ok(self.wrap(pl_df))
    }

    /// Read JSON lines (one object per line).
    pub fn json(&self, path: impl AsRef<Path>) -> Result<DataFrame, PolarsError> {
        let path = path.as_ref();
        if path.is_dir() {
            return self.load_dir(path, Some("json"));
        }
        let pl_df = self.read_json(path)?;
        info!("read json {}: {} rows", path.display(), pl_df.height());
        Ok(self.wrap(pl_df))
    }
}

/// Part-file family of a format name or file extension: `parquet`, `csv` or `json`.
pub(crate) fn format_family(name: &str) -> Option<&'static str> {
    match name {
        "parquet" | "delta" => Some("parquet"),
        "csv" => Some("csv"),
        "json" | "jsonl" => Some("json"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StructType;

    fn write_csv(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn csv_with_schema_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "items.csv",
            "id,weight\nFDA15,9.3\nDRC01,\n",
        );
        let spark = SparkSession::builder().app_name("reader").get_or_create();
        let schema = StructType::from_ddl("Item_Identifier string, Item_Weight string").unwrap();
        let df = spark
            .read()
            .format("csv")
            .schema(&schema)
            .option("header", "true")
            .load(&path)
            .unwrap();
        assert_eq!(df.columns().unwrap(), vec!["Item_Identifier", "Item_Weight"]);
        let rows = df.collect_as_json_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Item_Weight"], serde_json::json!("9.3"));
        assert!(rows[1]["Item_Weight"].is_null());
    }

    #[test]
    fn csv_without_header_uses_positional_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "raw.csv", "a,1\nb,2\n");
        let spark = SparkSession::builder().app_name("reader").get_or_create();
        let df = spark.read().csv(&path).unwrap();
        assert_eq!(df.columns().unwrap(), vec!["_c0", "_c1"]);
        let rows = df.collect_as_json_rows().unwrap();
        assert_eq!(rows[1]["_c1"], serde_json::json!("2"));
    }

    #[test]
    fn infer_schema_reads_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "n.csv", "k;v\na;1\nb;2\n");
        let spark = SparkSession::builder().app_name("reader").get_or_create();
        let df = spark
            .read()
            .option("header", "true")
            .option("inferSchema", "true")
            .option("sep", ";")
            .csv(&path)
            .unwrap();
        let rows = df.collect_as_json_rows().unwrap();
        assert_eq!(rows[1]["v"], serde_json::json!(2));
    }

    #[test]
    fn unknown_extension_needs_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "data", "a\n");
        let spark = SparkSession::builder().app_name("reader").get_or_create();
        let err = spark.read().load(&path).unwrap_err();
        assert!(err.to_string().contains("could not infer format"));
    }
}
