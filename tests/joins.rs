//! Employee / department joins from the walkthrough.

mod common;

use common::{column_values, rows, spark};
use serde_json::json;
use spark_transformations::{tutorial, JoinType};

fn tables() -> (spark_transformations::DataFrame, spark_transformations::DataFrame) {
    let spark = spark();
    (
        tutorial::employees(&spark).unwrap(),
        tutorial::departments(&spark).unwrap(),
    )
}

#[test]
fn inner_join_keeps_matching_employees() {
    let (emp, dept) = tables();
    let out = emp
        .join_on(&dept, vec!["dept_id"], vec!["dept_id"], JoinType::Inner)
        .unwrap();
    assert_eq!(out.count().unwrap(), 5);
    assert_eq!(
        out.columns().unwrap(),
        vec!["emp_id", "emp_name", "dept_id", "dept_id_right", "department"]
    );
    assert_eq!(
        column_values(&out, "emp_name"),
        vec![json!("gaur"), json!("kit"), json!("sam"), json!("tim"), json!("aman")]
    );
}

#[test]
fn left_join_keeps_unmatched_employee_with_nulls() {
    let (emp, dept) = tables();
    let out = emp
        .join_on(&dept, vec!["dept_id"], vec!["dept_id"], JoinType::Left)
        .unwrap();
    assert_eq!(out.count().unwrap(), 6);
    let nad = &rows(&out)[5];
    assert_eq!(nad["emp_name"], json!("nad"));
    assert!(nad["department"].is_null());
    assert!(nad["dept_id_right"].is_null());
}

#[test]
fn right_join_keeps_department_without_employees() {
    let (emp, dept) = tables();
    let out = emp
        .join_on(&dept, vec!["dept_id"], vec!["dept_id"], JoinType::Right)
        .unwrap();
    assert_eq!(out.count().unwrap(), 6);
    let it = rows(&out)
        .into_iter()
        .find(|r| r["department"] == json!("IT"))
        .unwrap();
    assert!(it["emp_name"].is_null());
    assert_eq!(it["dept_id_right"], json!("d04"));
}

#[test]
fn anti_join_finds_employee_without_department() {
    let (emp, dept) = tables();
    let how: JoinType = "anti".parse().unwrap();
    let out = emp
        .join_on(&dept, vec!["dept_id"], vec!["dept_id"], how)
        .unwrap();
    assert_eq!(out.columns().unwrap(), vec!["emp_id", "emp_name", "dept_id"]);
    let only = &rows(&out)[0];
    assert_eq!(out.count().unwrap(), 1);
    assert_eq!(only["emp_name"], json!("nad"));
    assert_eq!(only["dept_id"], json!("d06"));
}

#[test]
fn join_on_same_name_keeps_one_key_column() {
    let (emp, dept) = tables();
    let out = emp.join(&dept, vec!["dept_id"], JoinType::Outer).unwrap();
    assert_eq!(
        out.columns().unwrap(),
        vec!["dept_id", "emp_id", "emp_name", "department"]
    );
    assert_eq!(out.count().unwrap(), 7);
}

#[test]
fn unknown_join_key_is_reported() {
    let (emp, dept) = tables();
    let err = emp
        .join_on(&dept, vec!["department"], vec!["dept_id"], JoinType::Inner)
        .unwrap_err();
    assert!(err.to_string().contains("department"));
}
