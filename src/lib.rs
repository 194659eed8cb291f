//! ULog to CSV Library
//!
//! A Rust library for loading PX4 ULog flight logs and flattening every
//! logged message type into one wide CSV table.
//!
//! # Features
//!
//! - **`csv`** (default): Enable CSV export functionality
//! - **`cli`** (default): Build the command-line interface binary
//! - **`serde`**: Enable serialization/deserialization of types
//!
//! # Quick Start
//!
//! Load a log file and inspect its record sets:
//! ```rust,no_run
//! use ulog2csv::{parse_ulog_file, LoadOptions};
//! use std::path::Path;
//!
//! let log = parse_ulog_file(Path::new("flight.ulg"), &LoadOptions::default(), false).unwrap();
//! for record_set in &log.record_sets {
//!     println!("{}: {} samples", record_set.name, record_set.sample_count());
//! }
//! println!("Flight duration: {:.1} s", log.duration_seconds());
//! ```
//!
//! Export to CSV format:
//! ```rust,no_run
//! use ulog2csv::{export_to_csv, parse_ulog_file, ExportOptions, LoadOptions, RowLayout};
//! use std::path::Path;
//!
//! let input = Path::new("flight.ulg");
//! let log = parse_ulog_file(input, &LoadOptions::default(), false).unwrap();
//! let export_options = ExportOptions {
//!     delimiter: ";".to_string(),
//!     output_dir: Some("csv".to_string()),
//!     row_layout: RowLayout::Merged,
//!     ..ExportOptions::default()
//! };
//! let report = export_to_csv(&log, input, &export_options, false).unwrap();
//! println!("Exported to: {}", report.csv_path.display());
//! ```
//!
//! # Public API
//!
//! ## Parsing Functions
//! - [`parse_ulog_file`] - Load a ULog file from disk
//! - [`parse_ulog_bytes`] - Load ULog data from memory
//!
//! ## Data Types
//! - [`ULogData`] - Loaded log: record sets plus metadata
//! - [`RecordSet`] - One message type's field schema and samples
//! - [`LoadOptions`] - Message filter and string error handling
//! - [`ExportOptions`] - Configuration for export operations
//! - [`ExportReport`] - Results of export operations with output paths
//!
//! ## Table Assembly
//! - [`Table`] - Header and rows across all record sets
//! - [`RowLayout`] - Block-structured or timestamp-merged rows
//!
//! ## Export Functions
//! - [`export_to_csv`] - Export record sets to CSV format
//! - [`export_info_to_csv`] - Export log metadata to the info sidecar
//! - [`compute_export_paths`] - Helper for consistent path computation

pub mod conversion;
pub mod error;
#[cfg(feature = "csv")]
pub mod export;
pub mod filters;
pub mod parser;
pub mod table;
pub mod types;

pub use conversion::{format_value, log_level_name, timestamp_to_seconds};
pub use error::ULogError;
#[cfg(feature = "csv")]
pub use export::{
    compute_export_paths, export_info_to_csv, export_to_csv, write_table, ExportOptions,
    ExportReport,
};
pub use filters::NameFilter;
pub use parser::{parse_ulog_bytes, parse_ulog_file, LoadOptions};
pub use table::{HeaderLayout, RowLayout, Table, START_TIME_COLUMN, TIMESTAMP_FIELD};
pub use types::*;

// Re-export Result type for convenience
pub use anyhow::Result;
