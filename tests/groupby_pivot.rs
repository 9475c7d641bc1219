//! groupBy aggregates, collect_list, pivot and when/otherwise labelling.

mod common;

use common::{assert_close, column_values, rows, sales_df, spark};
use serde_json::json;
use spark_transformations::{
    avg, col, collect_list, collect_set, count, lit_i32, lit_str, max, sum, tutorial, when,
};

#[test]
fn sum_by_item_type_in_first_seen_order() {
    let out = sales_df()
        .group_by(vec!["Item_Type"])
        .unwrap()
        .agg(vec![sum(&col("Item_MRP"))])
        .unwrap();
    assert_eq!(out.columns().unwrap(), vec!["Item_Type", "sum(Item_MRP)"]);
    assert_eq!(out.count().unwrap(), 11);
    let first = &rows(&out)[0];
    assert_eq!(first["Item_Type"], json!("Dairy"));
    assert_close(&first["sum(Item_MRP)"], 249.8092 + 144.1102);
}

#[test]
fn avg_with_alias() {
    let out = sales_df()
        .group_by(vec!["item_type"])
        .unwrap()
        .agg(vec![avg(&col("Item_MRP")).alias("ItemAvg_MRP")])
        .unwrap();
    assert_eq!(out.columns().unwrap(), vec!["Item_Type", "ItemAvg_MRP"]);
    let meat = rows(&out)
        .into_iter()
        .find(|r| r["Item_Type"] == json!("Meat"))
        .unwrap();
    assert_close(&meat["ItemAvg_MRP"], (141.618 + 230.5352) / 2.0);
}

#[test]
fn several_aggregates_at_once() {
    let out = sales_df()
        .group_by(vec!["Outlet_Identifier"])
        .unwrap()
        .agg(vec![count(&col("Item_Identifier")), max(&col("Item_Weight"))])
        .unwrap();
    let out049 = rows(&out)
        .into_iter()
        .find(|r| r["Outlet_Identifier"] == json!("OUT049"))
        .unwrap();
    assert_eq!(out049["count(Item_Identifier)"], json!(4));
}

#[test]
fn collect_list_keeps_input_order() {
    let spark = spark();
    let books = tutorial::books(&spark).unwrap();
    let out = books
        .group_by(vec!["username"])
        .unwrap()
        .agg(vec![collect_list(&col("books"))])
        .unwrap();
    assert_eq!(out.columns().unwrap(), vec!["username", "collect_list(books)"]);
    let lists = column_values(&out, "collect_list(books)");
    assert_eq!(lists[0], json!(["book1", "book2"]));
    assert_eq!(lists[1], json!(["book3"]));
    assert_eq!(lists[2], json!(["book4", "book5"]));
}

#[test]
fn collect_set_drops_duplicates_and_nulls() {
    let spark = spark();
    let df = spark
        .create_dataframe_from_ddl(
            vec![
                vec![json!("user1"), json!("book2")],
                vec![json!("user1"), json!("book1")],
                vec![json!("user1"), json!("book2")],
                vec![json!("user2"), json!(null)],
                vec![json!("user2"), json!("book3")],
            ],
            "username string, books string",
        )
        .unwrap();
    let out = df
        .group_by(vec!["username"])
        .unwrap()
        .agg(vec![collect_set(&col("books")), collect_list(&col("books"))])
        .unwrap();
    let sets = column_values(&out, "collect_set(books)");
    assert_eq!(sets[0], json!(["book2", "book1"]));
    assert_eq!(sets[1], json!(["book3"]));
    let lists = column_values(&out, "collect_list(books)");
    assert_eq!(lists[0], json!(["book2", "book1", "book2"]));
}

#[test]
fn pivot_on_outlet_size() {
    let df = sales_df()
        .select(vec!["Item_Type", "Outlet_Size", "Item_MRP"])
        .unwrap();
    let out = df
        .group_by(vec!["Item_Type"])
        .unwrap()
        .pivot("Outlet_Size")
        .unwrap()
        .agg(vec![avg(&col("Item_MRP"))])
        .unwrap();
    assert_eq!(
        out.columns().unwrap(),
        vec!["Item_Type", "null", "High", "Medium", "Small"]
    );
    assert_eq!(out.count().unwrap(), 11);
    let dairy = &rows(&out)[0];
    assert_close(&dairy["Medium"], 249.8092);
    assert_close(&dairy["Small"], 144.1102);
    assert!(dairy["High"].is_null());
    assert!(dairy["null"].is_null());
    let frozen = rows(&out)
        .into_iter()
        .find(|r| r["Item_Type"] == json!("Frozen Foods"))
        .unwrap();
    assert_close(&frozen["null"], (96.9726 + 187.8214) / 2.0);
}

#[test]
fn pivot_with_explicit_values() {
    let df = sales_df();
    let out = df
        .group_by(vec!["Item_Type"])
        .unwrap()
        .pivot_values("Outlet_Size", vec!["Small"])
        .unwrap()
        .agg(vec![sum(&col("Item_MRP"))])
        .unwrap();
    assert_eq!(out.columns().unwrap(), vec!["Item_Type", "Small"]);
}

#[test]
fn when_otherwise_first_branch_wins() {
    let (df, _) = tutorial::conditional_steps(&sales_df()).unwrap();
    let flags = column_values(&df, "Veg_flag");
    assert_eq!(flags.iter().filter(|v| **v == json!("Non-Veg")).count(), 2);
    assert_eq!(flags[0], json!("Veg"));

    let is_veg = col("Veg_flag").eq(&lit_str("Veg"));
    let mrp = col("Item_MRP");
    let labelled = df
        .with_column(
            "Veg_exp_flag",
            &when(&is_veg.and(&mrp.lt(&lit_i32(100))), &lit_str("Veg_Inexpensive"))
                .when(&is_veg.and(&mrp.gt(&lit_i32(100))), &lit_str("Veg_Expensive"))
                .otherwise(&lit_str("Non-Veg")),
        )
        .unwrap();
    let labels = column_values(&labelled, "Veg_exp_flag");
    assert_eq!(labels[0], json!("Veg_Expensive"));
    assert_eq!(labels[1], json!("Veg_Inexpensive"));
    assert_eq!(labels[2], json!("Non-Veg"));
}

#[test]
fn when_without_otherwise_yields_null() {
    let df = sales_df()
        .with_column(
            "meat",
            &when(&col("Item_Type").eq(&lit_str("Meat")), &lit_str("yes")).end(),
        )
        .unwrap();
    let values = column_values(&df, "meat");
    assert!(values[0].is_null());
    assert_eq!(values[2], json!("yes"));
}
