//! Shared helpers for integration tests (SparkSession and DataFrame setup).
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value as JsonValue;
use spark_transformations::{tutorial, DataFrame, SparkSession};

/// Create a SparkSession with a descriptive app name for tests.
pub fn spark() -> SparkSession {
    SparkSession::builder()
        .app_name("spark_transformations_tests")
        .get_or_create()
}

/// Session whose managed tables live under `warehouse`.
pub fn spark_with_warehouse(warehouse: &std::path::Path) -> SparkSession {
    SparkSession::builder()
        .app_name("spark_transformations_tests")
        .config(
            "spark.sql.warehouse.dir",
            warehouse.to_string_lossy().to_string(),
        )
        .get_or_create()
}

pub fn sales_csv() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join("BigMart_Sales.csv")
}

/// The bundled 20-row BigMart sample, read with the declared all-string schema.
pub fn sales_df() -> DataFrame {
    tutorial::load_sales(&spark(), sales_csv()).unwrap()
}

pub fn rows(df: &DataFrame) -> Vec<HashMap<String, JsonValue>> {
    df.collect_as_json_rows().unwrap()
}

/// Values of one column, in row order.
pub fn column_values(df: &DataFrame, name: &str) -> Vec<JsonValue> {
    rows(df)
        .into_iter()
        .map(|mut r| r.remove(name).unwrap_or(JsonValue::Null))
        .collect()
}

pub fn assert_close(actual: &JsonValue, expected: f64) {
    let v = actual
        .as_f64()
        .unwrap_or_else(|| panic!("expected a number, got {actual}"));
    assert!(
        (v - expected).abs() < 1e-6,
        "expected {expected}, got {v}"
    );
}
