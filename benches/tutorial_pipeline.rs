//! Benchmarks: group by / pivot / window steps of the walkthrough on a synthetic sales frame.
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use polars::prelude::{DataFrame as PlDataFrame, IntoColumn, NamedFrom, Series};
use spark_transformations::{avg, col, row_number, sum, DataFrame, SparkSession, Window};

const ITEM_TYPES: [&str; 5] = ["Dairy", "Meat", "Snack Foods", "Household", "Breakfast"];
const SIZES: [Option<&str>; 4] = [Some("Small"), Some("Medium"), Some("High"), None];

fn sales(spark: &SparkSession, n: usize) -> DataFrame {
    let ids: Vec<String> = (0..n).map(|i| format!("FD{:05}", i)).collect();
    let types: Vec<&str> = (0..n).map(|i| ITEM_TYPES[i % ITEM_TYPES.len()]).collect();
    let sizes: Vec<Option<&str>> = (0..n).map(|i| SIZES[i % SIZES.len()]).collect();
    let mrp: Vec<String> = (0..n).map(|i| format!("{}.5", 30 + (i % 220))).collect();
    let pl = PlDataFrame::new(vec![
        Series::new("Item_Identifier".into(), ids).into_column(),
        Series::new("Item_Type".into(), types).into_column(),
        Series::new("Outlet_Size".into(), sizes).into_column(),
        Series::new("Item_MRP".into(), mrp).into_column(),
    ])
    .expect("sales frame");
    spark.create_dataframe_from_polars(pl)
}

fn bench_group_and_pivot(c: &mut Criterion, n: usize) {
    let spark = SparkSession::builder().app_name("bench").get_or_create();
    let df = sales(&spark, n);
    c.bench_function(&format!("group_sum_{}", n), |b| {
        b.iter(|| {
            let out = df
                .group_by(vec!["Item_Type"])
                .expect("group_by")
                .agg(vec![sum(&col("Item_MRP"))])
                .expect("agg");
            black_box(out)
        })
    });
    c.bench_function(&format!("pivot_avg_{}", n), |b| {
        b.iter(|| {
            let out = df
                .group_by(vec!["Item_Type"])
                .expect("group_by")
                .pivot("Outlet_Size")
                .expect("pivot")
                .agg(vec![avg(&col("Item_MRP"))])
                .expect("agg");
            black_box(out)
        })
    });
}

fn bench_windows(c: &mut Criterion, n: usize) {
    let spark = SparkSession::builder().app_name("bench").get_or_create();
    let df = sales(&spark, n);
    let running = Window::order_by(["Item_Type"])
        .rows_between(Window::UNBOUNDED_PRECEDING, Window::CURRENT_ROW);
    c.bench_function(&format!("row_number_and_cumsum_{}", n), |b| {
        b.iter(|| {
            let out = df
                .with_column(
                    "rn",
                    &row_number().over(&Window::order_by([col("Item_Identifier").desc()])),
                )
                .expect("row_number")
                .with_column("CumSum", &sum(&col("Item_MRP")).over(&running))
                .expect("cumsum");
            black_box(out)
        })
    });
}

fn benches(c: &mut Criterion) {
    for n in [1_000, 100_000] {
        bench_group_and_pivot(c, n);
        bench_windows(c, n);
    }
}

criterion_group!(tutorial_benches, benches);
criterion_main!(tutorial_benches);
