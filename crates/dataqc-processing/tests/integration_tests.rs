//! Integration tests for loading, profiling and target discovery.
//!
//! These tests run the public API against the CSV fixtures.

use dataqc_processing::{
    EdaProfiler, ProcessingError, discover_target, ensure_not_empty, read_csv_bytes,
    read_csv_path, render_html_report,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

// ============================================================================
// Profiling
// ============================================================================

#[test]
fn test_profile_sensor_fixture() {
    let df = read_csv_path(fixtures_path().join("sensors.csv")).unwrap();
    let summary = EdaProfiler::profile(&df).unwrap();

    assert_eq!(summary.shape, (8, 3));
    assert_eq!(summary.missing["sensor_a"], 1);
    assert_eq!(summary.missing["sensor_b"], 1);
    assert_eq!(summary.missing["site"], 0);
    assert_eq!(summary.duplicates, 2);
    assert_eq!(summary.outliers["sensor_a"], 1);
    assert!(!summary.outliers.contains_key("site"));
    assert_eq!(summary.head.len(), 5);
}

#[test]
fn test_profile_summary_serializes_to_json_shape() {
    let df = read_csv_path(fixtures_path().join("clicks.csv")).unwrap();
    let summary = EdaProfiler::profile(&df).unwrap();
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["shape"], serde_json::json!([4, 3]));
    assert_eq!(json["duplicates"], serde_json::json!(0));
    assert_eq!(json["head"][1]["age"], serde_json::json!(40));
    assert_eq!(json["head"][1]["clicked"], serde_json::json!(1));
}

#[test]
fn test_profile_does_not_modify_frame() {
    let df = read_csv_path(fixtures_path().join("sensors.csv")).unwrap();
    let before = df.clone();
    EdaProfiler::profile(&df).unwrap();
    assert!(df.equals_missing(&before));
}

// ============================================================================
// Target Discovery
// ============================================================================

#[test]
fn test_clicks_fixture_has_named_target() {
    let df = read_csv_path(fixtures_path().join("clicks.csv")).unwrap();
    assert_eq!(discover_target(&df).unwrap().as_deref(), Some("clicked"));
}

#[test]
fn test_sensor_fixture_binary_column_is_target() {
    let df = read_csv_path(fixtures_path().join("sensors.csv")).unwrap();
    assert_eq!(discover_target(&df).unwrap().as_deref(), Some("site"));
}

#[test]
fn test_continuous_data_has_no_target() {
    let df = read_csv_bytes(b"a,b\n1.5,2.5\n3.5,4.5\n5.5,6.5\n").unwrap();
    assert_eq!(discover_target(&df).unwrap(), None);
}

// ============================================================================
// Error Handling
// ============================================================================

#[test]
fn test_empty_upload_is_input_error() {
    let err = read_csv_bytes(b"   \n").unwrap_err();
    assert!(matches!(err, ProcessingError::DatasetRead(_)));
    assert!(err.is_input_error());
}

#[test]
fn test_header_only_upload_is_empty() {
    let df = read_csv_bytes(b"age,clicked\n").unwrap();
    let err = ensure_not_empty(&df).unwrap_err();
    assert_eq!(err.to_string(), "CSV file is empty");
}

// ============================================================================
// Reporting
// ============================================================================

#[test]
fn test_html_report_from_fixture() {
    let df = read_csv_path(fixtures_path().join("sensors.csv")).unwrap();
    let summary = EdaProfiler::profile(&df).unwrap();
    let html = render_html_report(&summary);

    assert!(html.starts_with("<html>"));
    assert!(html.contains("Data Quality Report"));
    assert!(html.contains("<li>sensor_a: 1</li>"));
    assert!(html.contains("Duplicate rows: 2"));
}
