use std::fs;

use super::*;

fn cell(value: &str) -> Cell {
    Some(value.to_string())
}

#[test]
fn load_csv_maps_empty_fields_to_missing_and_pads_short_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("reviews.csv");
    fs::write(&path, "review,rating,date\n\"Good, fast\",5,2023-01-15\nSlow,,\nShort\n")
        .expect("write fixture");

    let table = Table::load_csv(&path).expect("csv loads");

    assert_eq!(table.columns(), ["review", "rating", "date"]);
    assert_eq!(table.len(), 3);
    assert_eq!(table.rows()[0][0], cell("Good, fast"));
    assert_eq!(table.rows()[1][1], None);
    assert_eq!(table.rows()[2], vec![cell("Short"), None, None]);
}

#[test]
fn load_csv_reports_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = Table::load_csv(&dir.path().join("absent.csv")).expect_err("missing file fails");
    assert!(err.to_string().contains("input file not found"));
}

#[test]
fn write_csv_creates_parent_directories() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("out.csv");

    let mut table = Table::new(vec!["review".to_string(), "rating".to_string()]);
    table.push_row(vec![cell("Works"), None]);
    table.write_csv(&path).expect("csv writes");

    assert_eq!(fs::read_to_string(&path).expect("read back"), "review,rating\nWorks,\n");
}

#[test]
fn dedup_by_column_keeps_first_occurrence_and_is_idempotent() {
    let mut table = Table::new(vec!["review".to_string(), "bank".to_string()]);
    table.push_row(vec![cell("Great app"), cell("CBE")]);
    table.push_row(vec![cell("Great app"), cell("BOA")]);
    table.push_row(vec![cell("Crashes"), cell("BOA")]);

    assert_eq!(table.dedup_by_column("review"), 1);
    assert_eq!(table.rows()[0][1], cell("CBE"));

    let once = table.clone();
    assert_eq!(table.dedup_by_column("review"), 0);
    assert_eq!(table, once);
}

#[test]
fn select_columns_reorders_and_fills_absent_columns() {
    let mut table = Table::new(vec!["bank".to_string(), "review".to_string()]);
    table.push_row(vec![cell("CBE"), cell("Nice")]);

    let selected = table.select_columns(&["review", "rating", "bank"]);

    assert_eq!(selected.columns(), ["review", "rating", "bank"]);
    assert_eq!(selected.rows()[0], vec![cell("Nice"), None, cell("CBE")]);
}

#[test]
fn from_records_appends_source_app_only_when_requested() {
    let record = ReviewRecord {
        review: "Fine".to_string(),
        rating: Some(3),
        date: "2024-02-01".to_string(),
        bank: "BOA".to_string(),
        source: "Google Play (US)".to_string(),
        source_app: Some("com.boa.app".to_string()),
    };

    let plain = Table::from_records(vec![record.clone()], false);
    assert_eq!(plain.columns().len(), 5);

    let tagged = Table::from_records(vec![record], true);
    assert_eq!(tagged.columns().last().map(String::as_str), Some("source_app"));
    assert_eq!(tagged.rows()[0][1], cell("3"));
    assert_eq!(tagged.rows()[0][5], cell("com.boa.app"));
}
