//! The BigMart sales walkthrough: every step of the transformations tutorial as a function
//! returning titled DataFrames, ready to print or inspect.
//!
//! ```no_run
//! use spark_transformations::{tutorial, SparkSession};
//!
//! let spark = SparkSession::builder().app_name("tutorial").get_or_create();
//! for (title, df) in tutorial::run(&spark, "data/BigMart_Sales.csv", "target/out").unwrap() {
//!     println!("== {title}");
//!     df.show(Some(5)).unwrap();
//! }
//! ```

use std::path::Path;

use log::{info, warn};
use polars::prelude::{IntoSeries, PolarsError, Series};
use serde_json::{json, Value as JsonValue};

use crate::dataframe::{DataFrame, JoinType, SaveMode};
use crate::error::EngineError;
use crate::functions::{
    array_contains, avg, col, collect_list, current_date, date_add, date_format, datediff,
    dense_rank, initcap, lit_i32, lit_str, lower, rank, row_number, split, sum, udf_f64, upper,
    when,
};
use crate::schema::{DataType, StructField, StructType};
use crate::session::SparkSession;
use crate::window::Window;

/// Titled results of one or more tutorial steps, in execution order.
pub type Steps = Vec<(String, DataFrame)>;

/// Columns of the BigMart sales file, all read as nullable strings.
pub const SALES_COLUMNS: [&str; 12] = [
    "Item_Identifier",
    "Item_Weight",
    "Item_Fat_Content",
    "Item_Visibility",
    "Item_Type",
    "Item_MRP",
    "Outlet_Identifier",
    "Outlet_Establishment_Year",
    "Outlet_Size",
    "Outlet_Location_Type",
    "Outlet_Type",
    "Item_Outlet_Sales",
];

/// Name the managed table is saved under.
pub const TABLE_NAME: &str = "myTable";

pub fn sales_schema() -> StructType {
    StructType::new(
        SALES_COLUMNS
            .iter()
            .map(|name| StructField::new(*name, DataType::String, true))
            .collect(),
    )
}

/// `spark.read.format('csv').schema(schema).option('header', True).load(path)`
pub fn load_sales(spark: &SparkSession, path: impl AsRef<Path>) -> Result<DataFrame, PolarsError> {
    spark
        .read()
        .format("csv")
        .schema(&sales_schema())
        .option("header", "true")
        .load(path)
}

pub fn string_steps(df: &DataFrame) -> Result<Steps, PolarsError> {
    let item_type = col("Item_Type");
    Ok(vec![
        (
            "upper(Item_Type)".to_string(),
            df.with_column("Item_Type", &upper(&item_type))?,
        ),
        (
            "lower(Item_Type)".to_string(),
            df.with_column("Item_Type", &lower(&item_type))?,
        ),
        (
            "initcap(Item_Type)".to_string(),
            df.with_column("Item_Type", &initcap(&item_type))?,
        ),
        (
            "select initcap as Item".to_string(),
            df.select_cols(vec![initcap(&item_type).alias("Item")])?,
        ),
        (
            "select upper as ITEM".to_string(),
            df.select_cols(vec![upper(&item_type).alias("ITEM")])?,
        ),
        (
            "select lower as item".to_string(),
            df.select_cols(vec![lower(&item_type).alias("item")])?,
        ),
    ])
}

/// Adds `curr_date`, `week_after`, `week_before` and `date_diff`, then reformats
/// `week_after` as `dd-MM-yyyy`. Returns the extended frame with the intermediate steps.
pub fn date_steps(df: &DataFrame) -> Result<(DataFrame, Steps), PolarsError> {
    let mut steps = Steps::new();
    let df = df.with_column("curr_date", &current_date())?;
    steps.push(("curr_date".to_string(), df.clone()));
    let df = df.with_column("week_after", &date_add(&col("curr_date"), 7))?;
    steps.push(("week_after = date_add(curr_date, 7)".to_string(), df.clone()));
    let df = df.with_column("week_before", &date_add(&col("curr_date"), -7))?;
    steps.push(("week_before = date_add(curr_date, -7)".to_string(), df.clone()));
    let df = df.with_column(
        "date_diff",
        &datediff(&col("curr_date"), &col("week_before")),
    )?;
    steps.push(("date_diff = datediff(curr_date, week_before)".to_string(), df.clone()));
    let df = df.with_column("week_after", &date_format(&col("week_after"), "dd-MM-yyyy"))?;
    steps.push(("date_format(week_after, dd-MM-yyyy)".to_string(), df.clone()));
    Ok((df, steps))
}

pub fn null_steps(df: &DataFrame) -> Result<Steps, PolarsError> {
    Ok(vec![
        ("dropna('any')".to_string(), df.dropna("any", None)?),
        ("dropna('all')".to_string(), df.dropna("all", None)?),
        (
            "dropna(subset=['Outlet_Size'])".to_string(),
            df.dropna("any", Some(vec!["Outlet_Size"]))?,
        ),
        ("fillna('NotAvailable')".to_string(), df.fillna("NotAvailable", None)?),
        (
            "fillna('NotAVailable', subset=['Outlet_Size'])".to_string(),
            df.na().fill("NotAVailable", Some(vec!["Outlet_Size"]))?,
        ),
    ])
}

pub fn array_steps(df: &DataFrame) -> Result<Steps, PolarsError> {
    let outlet_type = col("Outlet_Type");
    let split_df = df.with_column("Outlet_Type", &split(&outlet_type, " "))?;
    Ok(vec![
        ("split(Outlet_Type, ' ')".to_string(), split_df.clone()),
        (
            "split(Outlet_Type, ' ')[1]".to_string(),
            df.with_column("Outlet_Type", &split(&outlet_type, " ").get_item(1))?,
        ),
        ("explode(Outlet_Type)".to_string(), split_df.explode("Outlet_Type")?),
        (
            "Type1_flag = array_contains(Outlet_Type, 'Type1')".to_string(),
            split_df.with_column(
                "Type1_flag",
                &array_contains(&outlet_type, &lit_str("Type1")),
            )?,
        ),
    ])
}

/// `username string, books string` sample used for collect_list.
pub fn books(spark: &SparkSession) -> Result<DataFrame, PolarsError> {
    let rows = [
        ("user1", "book1"),
        ("user1", "book2"),
        ("user2", "book3"),
        ("user3", "book4"),
        ("user3", "book5"),
    ];
    spark.create_dataframe_from_ddl(string_rows(&rows), "username string, books string")
}

pub fn employees(spark: &SparkSession) -> Result<DataFrame, PolarsError> {
    let rows: Vec<Vec<JsonValue>> = [
        ("1", "gaur", "d01"),
        ("2", "kit", "d02"),
        ("3", "sam", "d03"),
        ("4", "tim", "d03"),
        ("5", "aman", "d05"),
        ("6", "nad", "d06"),
    ]
    .iter()
    .map(|(id, name, dept)| vec![json!(id), json!(name), json!(dept)])
    .collect();
    spark.create_dataframe_from_ddl(rows, "emp_id STRING, emp_name STRING, dept_id STRING")
}

pub fn departments(spark: &SparkSession) -> Result<DataFrame, PolarsError> {
    let rows = [
        ("d01", "HR"),
        ("d02", "Marketing"),
        ("d03", "Accounts"),
        ("d04", "IT"),
        ("d05", "Finance"),
    ];
    spark.create_dataframe_from_ddl(string_rows(&rows), "dept_id STRING, department STRING")
}

fn string_rows(rows: &[(&str, &str)]) -> Vec<Vec<JsonValue>> {
    rows.iter().map(|(a, b)| vec![json!(a), json!(b)]).collect()
}

pub fn aggregation_steps(spark: &SparkSession, df: &DataFrame) -> Result<Steps, PolarsError> {
    let mrp = col("Item_MRP");
    let by_type = df.group_by(vec!["Item_Type"])?;
    let books = books(spark)?;
    let for_pivot = df.select(vec!["Item_Type", "Outlet_Size", "Item_MRP"])?;
    let pivoted = for_pivot
        .group_by(vec!["Item_Type"])?
        .pivot("Outlet_Size")?
        .agg(vec![avg(&mrp)])?;
    Ok(vec![
        ("sum(Item_MRP) by Item_Type".to_string(), by_type.agg(vec![sum(&mrp)])?),
        (
            "avg(Item_MRP) as ItemAvg_MRP by Item_Type".to_string(),
            by_type.agg(vec![avg(&mrp).alias("ItemAvg_MRP")])?,
        ),
        ("books".to_string(), books.clone()),
        (
            "collect_list(books) by username".to_string(),
            books
                .group_by(vec!["username"])?
                .agg(vec![collect_list(&col("books"))])?,
        ),
        ("pivot input".to_string(), for_pivot),
        ("pivot(Outlet_Size) avg(Item_MRP)".to_string(), pivoted),
    ])
}

/// Adds `Veg_flag` (`Non-Veg` for Meat, else `Veg`) and shows the chained
/// `Veg_exp_flag`. Returns the frame with `Veg_flag`.
pub fn conditional_steps(df: &DataFrame) -> Result<(DataFrame, Steps), PolarsError> {
    let df = df.with_column(
        "Veg_flag",
        &when(&col("Item_Type").eq(&lit_str("Meat")), &lit_str("Non-Veg"))
            .otherwise(&lit_str("Veg")),
    )?;
    let is_veg = col("Veg_flag").eq(&lit_str("Veg"));
    let mrp = col("Item_MRP");
    let flagged = df.with_column(
        "Veg_exp_flag",
        &when(&is_veg.and(&mrp.lt(&lit_i32(100))), &lit_str("Veg_Inexpensive"))
            .when(&is_veg.and(&mrp.gt(&lit_i32(100))), &lit_str("Veg_Expensive"))
            .otherwise(&lit_str("Non-Veg")),
    )?;
    let steps = vec![
        ("Veg_flag".to_string(), df.clone()),
        ("Veg_exp_flag".to_string(), flagged),
    ];
    Ok((df, steps))
}

pub fn join_steps(spark: &SparkSession) -> Result<Steps, PolarsError> {
    let df1 = employees(spark)?;
    let df2 = departments(spark)?;
    let mut steps = vec![
        ("employees".to_string(), df1.clone()),
        ("departments".to_string(), df2.clone()),
    ];
    for how in ["inner", "left", "right", "anti"] {
        let join_type: JoinType = how.parse()?;
        steps.push((
            format!("{how} join on dept_id"),
            df1.join_on(&df2, vec!["dept_id"], vec!["dept_id"], join_type)?,
        ));
    }
    Ok(steps)
}

pub fn window_steps(df: &DataFrame) -> Result<Steps, PolarsError> {
    let ranked = df
        .with_column(
            "RowNum_Col",
            &row_number().over(&Window::order_by([col("Item_Identifier")])),
        )?
        .with_column(
            "Rank_Col",
            &rank().over(&Window::order_by([col("Item_Identifier").desc()])),
        )?
        .with_column(
            "DenseRank_Col",
            &dense_rank().over(&Window::order_by([col("Item_Identifier").desc()])),
        )?;
    let running = Window::order_by(["Item_Type"])
        .rows_between(Window::UNBOUNDED_PRECEDING, Window::CURRENT_ROW);
    let total = Window::order_by(["Item_Type"])
        .rows_between(Window::UNBOUNDED_PRECEDING, Window::UNBOUNDED_FOLLOWING);
    let mrp = col("Item_MRP");
    Ok(vec![
        ("row_number / rank / dense_rank".to_string(), ranked),
        (
            "CumSum".to_string(),
            df.with_column("CumSum", &sum(&mrp).over(&running))?,
        ),
        (
            "TotalSum".to_string(),
            df.with_column("TotalSum", &sum(&mrp).over(&total))?,
        ),
    ])
}

/// `udf(my_fun)` squaring `Item_MRP.cast('float')`. No return type is declared, so the
/// result column holds strings.
pub fn udf_steps(df: &DataFrame) -> Result<Steps, PolarsError> {
    let my_fun = udf_f64("my_fun", "string", |x| x * x)?;
    let squared = my_fun.call(&[&col("Item_MRP").cast("float")?])?;
    Ok(vec![(
        "my_square_MRP".to_string(),
        df.with_column("my_square_MRP", &squared)?,
    )])
}

/// Same square UDF, registered on the session and resolved by name.
pub fn registered_udf_steps(spark: &SparkSession, df: &DataFrame) -> Result<Steps, PolarsError> {
    spark.register_udf("square", |cols: &[Series]| {
        let input = cols[0].cast(&polars::prelude::DataType::Float64)?;
        let values = input.f64()?;
        let out: polars::prelude::Float64Chunked =
            values.into_iter().map(|v| v.map(|x| x * x)).collect();
        Ok(out.with_name(input.name().clone()).into_series())
    })?;
    spark.set_active();
    let squared = crate::functions::call_udf("square", &[col("Item_MRP")])?;
    Ok(vec![(
        "call_udf(square, Item_MRP)".to_string(),
        df.with_column("square_MRP", &squared)?,
    )])
}

/// Writers: csv with each save mode, parquet overwrite, then a delta managed table.
/// Each step's frame is what was read back from the target.
pub fn write_steps(
    spark: &SparkSession,
    df: &DataFrame,
    out_dir: impl AsRef<Path>,
) -> Result<Steps, EngineError> {
    let csv_path = out_dir.as_ref().join("CSV").join("data.csv");
    let csv_path_str = csv_path.to_string_lossy().to_string();
    let mut steps = Steps::new();

    match df.write().format("csv").save(&csv_path) {
        Ok(()) => {}
        Err(e) => match EngineError::from(e) {
            EngineError::AlreadyExists(msg) => {
                // a previous run left its outputs behind; start the sequence over from csv
                warn!("csv save refused: {msg}; replacing the previous output");
                df.write()
                    .format("csv")
                    .mode(SaveMode::Overwrite)
                    .save(&csv_path)?;
            }
            other => return Err(other),
        },
    }
    steps.push(("csv (mode error)".to_string(), read_back(spark, "csv", &csv_path)?));

    for mode in ["append", "overwrite", "ignore"] {
        df.write()
            .format("csv")
            .mode(mode.parse::<SaveMode>()?)
            .option("path", csv_path_str.clone())
            .save_default()?;
        steps.push((
            format!("csv (mode {mode})"),
            read_back(spark, "csv", &csv_path)?,
        ));
    }

    df.write()
        .format("parquet")
        .mode(SaveMode::Overwrite)
        .option("path", csv_path_str)
        .save_default()?;
    steps.push((
        "parquet (mode overwrite)".to_string(),
        read_back(spark, "parquet", &csv_path)?,
    ));

    df.write()
        .format("delta")
        .mode(SaveMode::Overwrite)
        .save_as_table(spark, TABLE_NAME)?;
    steps.push((format!("table {TABLE_NAME}"), spark.table(TABLE_NAME)?));
    Ok(steps)
}

fn read_back(spark: &SparkSession, format: &str, path: &Path) -> Result<DataFrame, PolarsError> {
    spark.read().format(format).load(path)
}

/// Run the whole walkthrough on `csv_path`, writing outputs under `out_dir`.
pub fn run(
    spark: &SparkSession,
    csv_path: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
) -> Result<Steps, EngineError> {
    let df = load_sales(spark, csv_path.as_ref())?;
    info!("loaded {} sales rows", df.count()?);
    let mut steps: Steps = vec![("sales".to_string(), df.clone())];
    steps.extend(string_steps(&df)?);
    let (df, dated) = date_steps(&df)?;
    steps.extend(dated);
    steps.extend(null_steps(&df)?);
    steps.extend(array_steps(&df)?);
    steps.extend(aggregation_steps(spark, &df)?);
    let (df, conditional) = conditional_steps(&df)?;
    steps.extend(conditional);
    steps.extend(join_steps(spark)?);
    steps.extend(window_steps(&df)?);
    steps.extend(udf_steps(&df)?);
    steps.extend(registered_udf_steps(spark, &df)?);
    steps.extend(write_steps(spark, &df, out_dir)?);
    Ok(steps)
}
