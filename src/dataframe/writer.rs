//! DataFrameWriter: save modes, output formats, part-file directory layout and managed tables.

use super::DataFrame;
use crate::schema::StructType;
use crate::session::SparkSession;
use log::{info, warn};
use polars::prelude::{
    CsvWriter, DataFrame as PlDataFrame, JsonFormat, JsonWriter, ParquetWriter, PolarsError,
    SerWriter,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub(crate) const SUCCESS_MARKER: &str = "_SUCCESS";
pub(crate) const TABLE_METADATA_FILE: &str = "_table.json";

/// What to do when the target already exists (PySpark DataFrameWriter.mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// Add another part file next to the existing ones.
    Append,
    /// Remove the existing target first.
    Overwrite,
    /// Fail (Spark default, `error` / `errorifexists`).
    #[default]
    ErrorIfExists,
    /// Leave the existing target untouched and write nothing.
    Ignore,
}

impl FromStr for SaveMode {
    type Err = PolarsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "append" => Ok(SaveMode::Append),
            "overwrite" => Ok(SaveMode::Overwrite),
            "error" | "errorifexists" | "default" => Ok(SaveMode::ErrorIfExists),
            "ignore" => Ok(SaveMode::Ignore),
            other => Err(PolarsError::InvalidOperation(
                format!(
                    "unknown save mode '{other}'; expected append, overwrite, error, errorifexists or ignore"
                )
                .into(),
            )),
        }
    }
}

/// Output format for generic write (PySpark DataFrameWriter.format).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFormat {
    Parquet,
    Csv,
    Json,
    /// Stored with the Parquet part-file layout.
    Delta,
}

impl WriteFormat {
    pub fn name(&self) -> &'static str {
        match self {
            WriteFormat::Parquet => "parquet",
            WriteFormat::Csv => "csv",
            WriteFormat::Json => "json",
            WriteFormat::Delta => "delta",
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            WriteFormat::Parquet | WriteFormat::Delta => "parquet",
            WriteFormat::Csv => "csv",
            WriteFormat::Json => "json",
        }
    }
}

impl FromStr for WriteFormat {
    type Err = PolarsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "parquet" => Ok(WriteFormat::Parquet),
            "csv" => Ok(WriteFormat::Csv),
            "json" | "jsonl" => Ok(WriteFormat::Json),
            "delta" => Ok(WriteFormat::Delta),
            other => Err(PolarsError::InvalidOperation(
                format!("unsupported write format '{other}'; expected parquet, csv, json or delta")
                    .into(),
            )),
        }
    }
}

/// Metadata stored next to a managed table's part files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub(crate) struct TableMetadata {
    pub name: String,
    pub format: String,
    pub schema: StructType,
}

/// Builder for writing DataFrame to path (PySpark DataFrameWriter).
pub struct DataFrameWriter<'a> {
    df: &'a DataFrame,
    mode: SaveMode,
    format: String,
    options: HashMap<String, String>,
}

impl<'a> DataFrameWriter<'a> {
    pub(super) fn new(df: &'a DataFrame) -> Self {
        DataFrameWriter {
            df,
            mode: SaveMode::default(),
            format: WriteFormat::Parquet.name().to_string(),
            options: HashMap::new(),
        }
    }

    pub fn mode(mut self, mode: SaveMode) -> Self {
        self.mode = mode;
        self
    }

    /// Format name: `parquet` (default), `csv`, `json`, `delta`. Validated on save.
    pub fn format(mut self, format: &str) -> Self {
        self.format = format.to_string();
        self
    }

    /// Writer option (`header`, `sep`, `path`).
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn options(mut self, opts: impl IntoIterator<Item = (String, String)>) -> Self {
        for (k, v) in opts {
            self.options.insert(k, v);
        }
        self
    }

    /// Write a directory of part files at `path`, following the save mode.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PolarsError> {
        let format = WriteFormat::from_str(&self.format)?;
        write_parts(self.df.df.as_ref(), path.as_ref(), format, self.mode, &self.options)?;
        Ok(())
    }

    /// Write to the `path` option (PySpark `.option('path', ...).save()`).
    pub fn save_default(&self) -> Result<(), PolarsError> {
        let path = self.options.get("path").ok_or_else(|| {
            PolarsError::InvalidOperation(
                "save: no path given; pass one or set option(\"path\", ...)".into(),
            )
        })?;
        self.save(path)
    }

    /// Save as a managed table `<warehouse>/<name>/` and register it in the session catalog
    /// (PySpark saveAsTable). Only `parquet` and `delta` formats are accepted.
    pub fn save_as_table(&self, session: &SparkSession, name: &str) -> Result<(), PolarsError> {
        let format = WriteFormat::from_str(&self.format)?;
        if !matches!(format, WriteFormat::Parquet | WriteFormat::Delta) {
            return Err(PolarsError::InvalidOperation(
                format!("save_as_table: format '{}' is not supported for tables", self.format)
                    .into(),
            ));
        }
        let dir = session.table_path(name);
        let written = write_parts(
            self.df.df.as_ref(),
            &dir,
            WriteFormat::Parquet,
            self.mode,
            &self.options,
        )?;
        if !written {
            return Ok(());
        }
        let metadata = TableMetadata {
            name: name.to_string(),
            format: format.name().to_string(),
            schema: self.df.schema()?,
        };
        let json = serde_json::to_string_pretty(&metadata)
            .map_err(|e| PolarsError::ComputeError(format!("table metadata: {e}").into()))?;
        fs::write(dir.join(TABLE_METADATA_FILE), json).map_err(|e| {
            PolarsError::ComputeError(format!("write table metadata: {e}").into())
        })?;
        session.register_table(name, dir.clone())?;
        info!("saved table {name} ({}) at {}", format.name(), dir.display());
        Ok(())
    }
}

fn truthy(options: &HashMap<String, String>, key: &str) -> bool {
    options
        .get(key)
        .map(|v| crate::config::parse_bool(v))
        .unwrap_or(false)
}

/// Write `df` as one more part file in `dir`. Returns false when the save mode skipped the write.
fn write_parts(
    df: &PlDataFrame,
    dir: &Path,
    format: WriteFormat,
    mode: SaveMode,
    options: &HashMap<String, String>,
) -> Result<bool, PolarsError> {
    if dir.exists() {
        match mode {
            SaveMode::ErrorIfExists => {
                return Err(PolarsError::ComputeError(
                    format!("path {} already exists (save mode error)", dir.display()).into(),
                ))
            }
            SaveMode::Ignore => {
                warn!("{} already exists; save mode ignore, nothing written", dir.display());
                return Ok(false);
            }
            SaveMode::Overwrite => {
                info!("overwriting {}", dir.display());
                let removed = if dir.is_dir() {
                    fs::remove_dir_all(dir)
                } else {
                    fs::remove_file(dir)
                };
                removed.map_err(|e| {
                    PolarsError::ComputeError(
                        format!("overwrite {}: {e}", dir.display()).into(),
                    )
                })?;
            }
            SaveMode::Append => {
                if !dir.is_dir() {
                    return Err(PolarsError::ComputeError(
                        format!("append: {} is not a directory", dir.display()).into(),
                    ));
                }
                let foreign = part_files(dir)?.into_iter().find(|p| {
                    p.extension().and_then(|e| e.to_str()) != Some(format.extension())
                });
                if let Some(part) = foreign {
                    return Err(PolarsError::ComputeError(
                        format!(
                            "append: {} holds {} which is not {} data; use overwrite to replace it",
                            dir.display(),
                            part.display(),
                            format.name()
                        )
                        .into(),
                    ));
                }
            }
        }
    }
    fs::create_dir_all(dir).map_err(|e| {
        PolarsError::ComputeError(format!("create {}: {e}", dir.display()).into())
    })?;
    let part = dir.join(format!(
        "part-{:05}-{}.{}",
        part_files(dir)?.len(),
        chrono::Utc::now().timestamp_millis(),
        format.extension()
    ));
    let mut file = File::create(&part).map_err(|e| {
        PolarsError::ComputeError(format!("write {} create: {e}", format.name()).into())
    })?;
    let mut to_write = df.clone();
    match format {
        WriteFormat::Parquet | WriteFormat::Delta => {
            ParquetWriter::new(&mut file)
                .finish(&mut to_write)
                .map_err(|e| PolarsError::ComputeError(format!("write parquet: {e}").into()))?;
        }
        WriteFormat::Csv => {
            let separator = options
                .get("sep")
                .or_else(|| options.get("delimiter"))
                .and_then(|s| s.bytes().next())
                .unwrap_or(b',');
            CsvWriter::new(&mut file)
                .include_header(truthy(options, "header"))
                .with_separator(separator)
                .finish(&mut to_write)
                .map_err(|e| PolarsError::ComputeError(format!("write csv: {e}").into()))?;
        }
        WriteFormat::Json => {
            JsonWriter::new(&mut file)
                .with_json_format(JsonFormat::JsonLines)
                .finish(&mut to_write)
                .map_err(|e| PolarsError::ComputeError(format!("write json: {e}").into()))?;
        }
    }
    File::create(dir.join(SUCCESS_MARKER)).map_err(|e| {
        PolarsError::ComputeError(format!("write {SUCCESS_MARKER}: {e}").into())
    })?;
    info!(
        "wrote {} rows as {} to {} ({mode:?})",
        df.height(),
        format.name(),
        part.display()
    );
    Ok(true)
}

/// Data files of a written directory (`part-*`), sorted by name. Markers and metadata
/// (`_SUCCESS`, `_table.json`, hidden files) are skipped.
pub(crate) fn part_files(dir: &Path) -> Result<Vec<PathBuf>, PolarsError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        PolarsError::ComputeError(format!("list {}: {e}", dir.display()).into())
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            PolarsError::ComputeError(format!("list {}: {e}", dir.display()).into())
        })?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('_') || name.starts_with('.') || !entry.path().is_file() {
            continue;
        }
        files.push(entry.path());
    }
    files.sort();
    Ok(files)
}
