//! End-to-end run of the walkthrough on the bundled sample.

mod common;

use common::{sales_csv, spark_with_warehouse};
use spark_transformations::tutorial;

#[test]
fn full_walkthrough_runs_and_is_repeatable() {
    let tmp = tempfile::tempdir().unwrap();
    let spark = spark_with_warehouse(&tmp.path().join("warehouse"));
    let out = tmp.path().join("out");

    let steps = tutorial::run(&spark, sales_csv(), &out).unwrap();
    let titles: Vec<&str> = steps.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(titles[0], "sales");
    assert!(titles.contains(&"pivot(Outlet_Size) avg(Item_MRP)"));
    assert!(titles.contains(&"anti join on dept_id"));
    assert_eq!(*titles.last().unwrap(), "table myTable");

    let count_of = |title: &str| {
        steps
            .iter()
            .find(|(t, _)| t == title)
            .map(|(_, df)| df.count().unwrap())
            .unwrap()
    };
    assert_eq!(count_of("sales"), 20);
    assert_eq!(count_of("dropna('any')"), 14);
    assert_eq!(count_of("explode(Outlet_Type)"), 40);
    assert_eq!(count_of("csv (mode append)"), 40);
    assert_eq!(count_of("csv (mode overwrite)"), 20);
    assert_eq!(count_of("csv (mode ignore)"), 20);
    assert_eq!(count_of("table myTable"), 20);

    // The csv path now holds parquet parts; a second run starts the writes over.
    let again = tutorial::run(&spark, sales_csv(), &out).unwrap();
    assert_eq!(again.len(), steps.len());
    let again_count = |title: &str| {
        again
            .iter()
            .find(|(t, _)| t == title)
            .map(|(_, df)| df.count().unwrap())
            .unwrap()
    };
    assert_eq!(again_count("csv (mode error)"), 20);
    assert_eq!(again_count("csv (mode append)"), 40);
    assert_eq!(again_count("parquet (mode overwrite)"), 20);
    assert_eq!(again_count("table myTable"), 20);
}

#[test]
fn missing_input_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let spark = spark_with_warehouse(tmp.path());
    assert!(tutorial::run(&spark, tmp.path().join("nope.csv"), tmp.path()).is_err());
}
