//! Spark Transformations - PySpark-style DataFrame transformations in Rust
//!
//! This library provides a PySpark-flavoured API (session, reader, column functions,
//! group by / pivot, joins, window functions, UDFs and writers) built on top of Polars,
//! plus the BigMart sales walkthrough in [`tutorial`].
//!
//! ```
//! use spark_transformations::{col, lit_str, when, SparkSession};
//!
//! let spark = SparkSession::builder().app_name("doc").get_or_create();
//! let df = spark
//!     .create_dataframe(
//!         vec![(1, 10, "Meat".to_string()), (2, 20, "Dairy".to_string())],
//!         vec!["id", "qty", "Item_Type"],
//!     )
//!     .unwrap();
//! let flagged = df
//!     .with_column(
//!         "Veg_flag",
//!         &when(&col("Item_Type").eq(&lit_str("Meat")), &lit_str("Non-Veg"))
//!             .otherwise(&lit_str("Veg")),
//!     )
//!     .unwrap();
//! assert_eq!(flagged.count().unwrap(), 2);
//! ```

pub mod column;
pub mod config;
pub mod dataframe;
pub(crate) mod date_utils;
pub mod error;
pub mod functions;
pub mod schema;
pub mod session;
pub mod tutorial;
pub mod type_coercion;
pub mod udf_registry;
pub mod udfs;
pub mod window;

pub use column::Column;
pub use config::SparklessConfig;
pub use dataframe::{
    DataFrame, DataFrameNa, DataFrameWriter, FillValue, GroupedData, JoinType,
    PivotedGroupedData, SaveMode, WriteFormat,
};
pub use error::EngineError;
pub use functions::*;
pub use schema::{DataType, StructField, StructType};
pub use session::{DataFrameReader, SparkSession, SparkSessionBuilder};
pub use udf_registry::{RustUdf, UdfRegistry, UserDefinedFunction};
pub use window::{Window, WindowSpec};

/// Re-export for API that returns Polars errors.
pub use polars::error::PolarsError;
/// Re-export for UDF closures over column values.
pub use polars::prelude::Series;
