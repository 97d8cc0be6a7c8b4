//! Loading release metadata from JSON exports

use courier_ingest::{load_records, IngestError};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_json_rows() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("choir.json");
    fs::write(
        &path,
        r#"[
            {"Primary Artists": "Nairobi Choir", "Label": "Acme", "ISRC Code": "US123",
             "UPC Code": 12345, "Track Titles": "Test Song", "Duration": "3:45",
             "Genre": "Gospel", "Published Year": 2023},
            {"Track Titles": null, "UPC Code": null},
            {"Track Titles": "Second Song", "UPC Code": "00012346", "Duration": "1:02:03"}
        ]"#,
    )
    .unwrap();

    let records = load_records(&path).unwrap();
    assert_eq!(records.len(), 2, "blank row is skipped");

    let first = &records[0];
    assert_eq!(first.primary_artists, "Nairobi Choir");
    assert_eq!(first.upc, "12345");
    assert_eq!(first.isrc, "US123");
    assert_eq!(first.formatted_duration(), "PT3M45S");
    assert_eq!(first.published_year, Some(2023));
    assert_eq!(first.copyright_year, None);

    let second = &records[1];
    assert_eq!(second.upc, "00012346");
    assert_eq!(second.label, "UNKNOWN_LABEL");
    assert_eq!(second.isrc, "UNKNOWN_ISRC");
    assert_eq!(second.formatted_duration(), "PT2M3S");
}

#[test]
fn test_json_must_be_an_array() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("rows.json");
    fs::write(&path, r#"{"track_titles": "Solo"}"#).unwrap();

    assert!(matches!(load_records(&path), Err(IngestError::Malformed(_))));
}

#[test]
fn test_unsupported_extension() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("rows.csv");
    fs::write(&path, "track_titles\nSolo\n").unwrap();

    assert!(matches!(
        load_records(&path),
        Err(IngestError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_missing_workbook_is_an_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("missing.xlsx");

    assert!(load_records(&path).is_err());
}
