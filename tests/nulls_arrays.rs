//! dropna / fillna policies and split / getItem / explode / array_contains.

mod common;

use common::{column_values, rows, sales_df, spark};
use serde_json::{json, Value as JsonValue};
use spark_transformations::{array_contains, col, lit_str, split, tutorial, FillValue};

#[test]
fn dropna_how_and_subset() {
    let df = sales_df();
    assert_eq!(df.dropna("any", None).unwrap().count().unwrap(), 14);
    assert_eq!(df.dropna("all", None).unwrap().count().unwrap(), 20);
    assert_eq!(
        df.dropna("any", Some(vec!["Outlet_Size"]))
            .unwrap()
            .count()
            .unwrap(),
        17
    );
    assert_eq!(
        df.na()
            .drop("any", Some(vec!["Item_Weight", "Outlet_Size"]))
            .unwrap()
            .count()
            .unwrap(),
        14
    );
}

#[test]
fn dropna_rejects_unknown_how() {
    let err = sales_df().dropna("some", None).unwrap_err();
    assert!(err.to_string().contains("some"));
}

#[test]
fn dropna_thresh_counts_non_nulls() {
    let spark = spark();
    let df = spark
        .create_dataframe_from_ddl(
            vec![
                vec![json!("a"), json!("b"), json!("c")],
                vec![json!("a"), JsonValue::Null, JsonValue::Null],
                vec![JsonValue::Null, JsonValue::Null, JsonValue::Null],
            ],
            "x string, y string, z string",
        )
        .unwrap();
    assert_eq!(df.dropna_thresh(2, None).unwrap().count().unwrap(), 1);
    assert_eq!(df.dropna_thresh(1, None).unwrap().count().unwrap(), 2);
}

#[test]
fn fillna_fills_every_string_column() {
    let out = sales_df().fillna("NotAvailable", None).unwrap();
    assert_eq!(out.dropna("any", None).unwrap().count().unwrap(), 20);
    let sizes = column_values(&out, "Outlet_Size");
    assert_eq!(sizes[3], json!("NotAvailable"));
    let weights = column_values(&out, "Item_Weight");
    assert_eq!(weights[7], json!("NotAvailable"));
}

#[test]
fn fillna_subset_leaves_other_columns() {
    let out = sales_df()
        .na()
        .fill("NotAVailable", Some(vec!["Outlet_Size"]))
        .unwrap();
    assert_eq!(column_values(&out, "Outlet_Size")[8], json!("NotAVailable"));
    assert!(column_values(&out, "Item_Weight")[7].is_null());
}

#[test]
fn fillna_matches_value_type_to_column_type() {
    let spark = spark();
    let df = spark
        .create_dataframe_from_ddl(
            vec![vec![JsonValue::Null, JsonValue::Null]],
            "name string, qty bigint",
        )
        .unwrap();
    let numeric = df.fillna(0i64, None).unwrap();
    let row = &rows(&numeric)[0];
    assert!(row["name"].is_null());
    assert_eq!(row["qty"], json!(0));
    let text = df.fillna(FillValue::from("n/a"), None).unwrap();
    let row = &rows(&text)[0];
    assert_eq!(row["name"], json!("n/a"));
    assert!(row["qty"].is_null());
}

#[test]
fn fillna_unknown_subset_column_is_an_error() {
    assert!(sales_df()
        .fillna("x", Some(vec!["no_such_column"]))
        .is_err());
}

#[test]
fn split_and_get_item() {
    let df = sales_df();
    let parts = df
        .with_column("Outlet_Type", &split(&col("Outlet_Type"), " "))
        .unwrap();
    assert_eq!(
        column_values(&parts, "Outlet_Type")[0],
        json!(["Supermarket", "Type1"])
    );
    let second = df
        .with_column("Outlet_Type", &split(&col("Outlet_Type"), " ").get_item(1))
        .unwrap();
    let values = column_values(&second, "Outlet_Type");
    assert_eq!(values[0], json!("Type1"));
    assert_eq!(values[3], json!("Store"));
    let missing = df
        .with_column("third", &split(&col("Outlet_Type"), " ").get_item(5))
        .unwrap();
    assert!(column_values(&missing, "third").iter().all(|v| v.is_null()));
}

#[test]
fn explode_gives_one_row_per_word() {
    let steps = tutorial::array_steps(&sales_df()).unwrap();
    let (_, exploded) = &steps[2];
    assert_eq!(exploded.count().unwrap(), 40);
    let values = column_values(exploded, "Outlet_Type");
    assert_eq!(values[0], json!("Supermarket"));
    assert_eq!(values[1], json!("Type1"));
    assert_eq!(column_values(exploded, "Item_Identifier")[1], json!("FDA15"));
}

#[test]
fn explode_drops_null_and_empty_arrays_unless_outer() {
    let spark = spark();
    let df = spark
        .create_dataframe_from_rows(
            vec![
                vec![json!("a"), json!(["x", "y"])],
                vec![json!("b"), JsonValue::Null],
                vec![json!("c"), json!([])],
            ],
            vec![
                ("id".to_string(), "string".to_string()),
                ("tags".to_string(), "array<string>".to_string()),
            ],
        )
        .unwrap();
    let exploded = df.explode("tags").unwrap();
    assert_eq!(column_values(&exploded, "id"), vec![json!("a"), json!("a")]);
    let outer = df.explode_outer("tags").unwrap();
    assert_eq!(outer.count().unwrap(), 4);
    assert!(column_values(&outer, "tags")[2].is_null());
}

#[test]
fn array_contains_flags_type1_outlets() {
    let df = sales_df()
        .with_column("Outlet_Type", &split(&col("Outlet_Type"), " "))
        .unwrap()
        .with_column(
            "Type1_flag",
            &array_contains(&col("Outlet_Type"), &lit_str("Type1")),
        )
        .unwrap();
    let flagged = df.filter(col("Type1_flag").into_expr()).unwrap();
    assert_eq!(flagged.count().unwrap(), 13);
}
