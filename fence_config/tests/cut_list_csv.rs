use std::fs;

use fence_config::{CutRow, load_cut_list_csv, parse_cut_list};
use rstest::rstest;
use tempfile::tempdir;

#[test]
fn loads_rows_in_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cuts.csv");
    fs::write(&path, "label,inches\nrail, 23.5\nstile,11.25\n").unwrap();

    let rows = load_cut_list_csv(&path).expect("load");
    assert_eq!(
        rows,
        vec![
            CutRow {
                label: "rail".into(),
                inches: 23.5
            },
            CutRow {
                label: "stile".into(),
                inches: 11.25
            },
        ]
    );
}

#[rstest]
#[case("name,length\nrail,23.5\n", "headers 'label,inches'")]
#[case("label,inches\nrail,abc\n", "invalid CSV row 2")]
#[case("label,inches\nrail,-1\n", "must be a positive number")]
#[case("label,inches\nrail,0\n", "must be a positive number")]
#[case("label,inches\n", "no rows")]
fn rejects_bad_files(#[case] body: &str, #[case] needle: &str) {
    let err = parse_cut_list(body.as_bytes()).expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "expected '{needle}' in '{err}'"
    );
}

#[test]
fn missing_file_names_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.csv");
    let err = load_cut_list_csv(&path).expect_err("missing");
    assert!(format!("{err}").contains("nope.csv"));
}
