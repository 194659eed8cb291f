//! Integration tests for export functionality
//!
//! Tests the export layer across different scenarios:
//! - Output directory creation and path derivation
//! - Info sidecar export
//! - Error handling for invalid and corrupted input

mod common;

use common::{two_message_log, ULogBuilder};
use std::fs;
use tempfile::TempDir;
use ulog2csv::export::*;
use ulog2csv::{parse_ulog_bytes, parse_ulog_file, LoadOptions, ULogError};

#[test]
fn test_export_creates_output_directory() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let nonexistent_dir = temp_dir.path().join("nonexistent").join("output");
    let path = two_message_log().write_to(&temp_dir.path().join("flight.ulg"));

    let log = parse_ulog_file(&path, &LoadOptions::default(), false).unwrap();
    let export_opts = ExportOptions {
        output_dir: Some(nonexistent_dir.to_str().unwrap().to_string()),
        ..ExportOptions::default()
    };

    let report = export_to_csv(&log, &path, &export_opts, false)
        .expect("CSV export should succeed and create directories");

    assert!(nonexistent_dir.exists(), "Output directory should be created");
    assert_eq!(report.csv_path, nonexistent_dir.join("flight.csv"));
    assert!(report.csv_path.exists(), "CSV file should be created in new directory");
    assert_eq!(report.rows_written, 5);
    assert_eq!(report.columns, 5);
    assert!(report.info_path.is_none());
}

#[test]
fn test_export_defaults_to_input_directory() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = two_message_log().write_to(&temp_dir.path().join("LOG001.ULG"));

    let log = parse_ulog_file(&path, &LoadOptions::default(), false).unwrap();
    let report = export_to_csv(&log, &path, &ExportOptions::default(), false).unwrap();

    assert_eq!(report.csv_path, temp_dir.path().join("LOG001.csv"));
    assert!(report.csv_path.exists());
}

#[test]
fn test_export_overwrites_existing_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = two_message_log().write_to(&temp_dir.path().join("flight.ulg"));
    let csv_path = temp_dir.path().join("flight.csv");
    fs::write(&csv_path, "stale content that is much longer than the real output ".repeat(50))
        .unwrap();

    let log = parse_ulog_file(&path, &LoadOptions::default(), false).unwrap();
    export_to_csv(&log, &path, &ExportOptions::default(), false).unwrap();

    let content = fs::read_to_string(&csv_path).unwrap();
    assert!(content.starts_with("TIME_StartTime,x,y,TIME_StartTime,z\n"));
    assert!(!content.contains("stale"));
}

#[test]
fn test_export_info_sidecar() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = ULogBuilder::new()
        .info("sys_name", "PX4, autopilot")
        .parameter("SYS_AUTOSTART", 4001)
        .format("A:uint64_t timestamp;float x;")
        .add_logged(0, 0, "A")
        .data(0, 100, &[1.0])
        .logging(b'4', 120, "Low battery")
        .dropout(15)
        .write_to(&temp_dir.path().join("flight.ulg"));

    let log = parse_ulog_file(&path, &LoadOptions::default(), false).unwrap();
    let export_opts = ExportOptions {
        info: true,
        ..ExportOptions::default()
    };
    let report = export_to_csv(&log, &path, &export_opts, false).unwrap();

    let info_path = report.info_path.expect("Info path should be reported");
    assert_eq!(info_path, temp_dir.path().join("flight.info.csv"));

    let content = fs::read_to_string(&info_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "section,timestamp,key,value");
    assert!(lines.contains(&"info,,sys_name,\"PX4, autopilot\""));
    assert!(lines.contains(&"parameter,,SYS_AUTOSTART,4001"));
    assert!(lines.contains(&"log,120,WARNING,Low battery"));
    assert!(lines.contains(&"dropout,100,duration_ms,15"));
}

#[test]
fn test_invalid_file_is_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("not_a_log.ulg");
    fs::write(&path, b"definitely not a ulog file").unwrap();

    let err = parse_ulog_file(&path, &LoadOptions::default(), false).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ULogError>(),
        Some(ULogError::InvalidMagic)
    ));
}

#[test]
fn test_missing_input_file_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let result = parse_ulog_file(
        &temp_dir.path().join("missing.ulg"),
        &LoadOptions::default(),
        false,
    );
    assert!(result.is_err());
}

#[test]
fn test_corrupted_section_is_skipped() {
    let bytes = two_message_log()
        .raw(&[0x04, 0x00, 0x00, 0xDE, 0xAD, 0xBE, 0xEF, 0x00])
        .sync()
        .data(1, 350, &[7.5])
        .finish();

    let log = parse_ulog_bytes(&bytes, &LoadOptions::default(), false).unwrap();
    assert!(log.stats.corrupted);
    assert_eq!(log.record_sets[1].sample_count(), 3);
}

#[test]
fn test_invalid_utf8_respects_ignore_flag() {
    let bytes = ULogBuilder::new()
        .format("A:uint64_t timestamp;float x;")
        .add_logged(0, 0, "A")
        .data(0, 100, &[1.0])
        .logging(b'6', 110, "ok")
        .raw(&[0x0C, 0x00, b'L', b'6'])
        .raw(&200u64.to_le_bytes())
        .raw(&[b'b', 0xFF, b'd'])
        .finish();

    assert!(parse_ulog_bytes(&bytes, &LoadOptions::default(), false).is_err());

    let options = LoadOptions {
        message_filter: None,
        ignore_string_errors: true,
    };
    let log = parse_ulog_bytes(&bytes, &options, false).unwrap();
    assert_eq!(log.logged_messages.len(), 2);
    assert_eq!(log.logged_messages[1].message, "b\u{FFFD}d");
}
