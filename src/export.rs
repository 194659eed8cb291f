//! Export functionality for ULog data
//!
//! Writes the assembled table to a delimited text file and, optionally, the
//! log metadata (info, parameters, messages, dropouts) to an `.info.csv`
//! sidecar next to it.

use crate::conversion::{format_value, log_level_name};
use crate::filters::NameFilter;
use crate::table::{RowLayout, Table};
use crate::types::ULogData;
use crate::Result;
use anyhow::Context;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Export options for controlling the CSV output
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Field delimiter, written verbatim between cells
    pub delimiter: String,
    /// Directory for output files (default: same as input file)
    pub output_dir: Option<String>,
    /// Only export these columns (`None` exports every field)
    pub columns: Option<NameFilter>,
    pub row_layout: RowLayout,
    /// Also write the `.info.csv` sidecar
    pub info: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            output_dir: None,
            columns: None,
            row_layout: RowLayout::Blocks,
            info: false,
        }
    }
}

/// Paths and counts of a finished export
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub csv_path: PathBuf,
    pub info_path: Option<PathBuf>,
    pub rows_written: usize,
    pub columns: usize,
}

/// Output prefix for `input_path`: a trailing `.ulg` (any case) is removed and
/// the directory is replaced with `output_dir` when given.
///
/// Append `.csv` / `.info.csv` to get the actual file names.
pub fn compute_export_paths(input_path: &Path, output_dir: Option<&str>) -> PathBuf {
    let file_name = input_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "ulog".to_string());

    let base_name = match file_name.len().checked_sub(4) {
        Some(split)
            if file_name.is_char_boundary(split)
                && file_name[split..].eq_ignore_ascii_case(".ulg") =>
        {
            file_name[..split].to_string()
        }
        _ => file_name,
    };

    match output_dir {
        Some(dir) => Path::new(dir).join(base_name),
        None => input_path.with_file_name(base_name),
    }
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut path = prefix.as_os_str().to_owned();
    path.push(suffix);
    PathBuf::from(path)
}

/// Export all record sets of `log` to `<prefix>.csv`
pub fn export_to_csv(
    log: &ULogData,
    input_path: &Path,
    export_options: &ExportOptions,
    debug: bool,
) -> Result<ExportReport> {
    if let Some(dir) = &export_options.output_dir {
        let output_dir = Path::new(dir);
        if !output_dir.exists() {
            std::fs::create_dir_all(output_dir)
                .with_context(|| format!("Failed to create output directory: {output_dir:?}"))?;
            if debug {
                println!("Created output directory: {output_dir:?}");
            }
        }
    }

    let prefix = compute_export_paths(input_path, export_options.output_dir.as_deref());
    let csv_path = with_suffix(&prefix, ".csv");

    let table = Table::assemble(&log.record_sets, export_options.columns.as_ref())
        .with_context(|| format!("Failed to assemble CSV table for {input_path:?}"))?;

    if debug {
        println!("=== EXPORTING CSV ===");
        println!(
            "Record sets: {}, columns: {}, layout: {:?}",
            table.block_names().len(),
            table.header().len(),
            export_options.row_layout
        );
    }

    let rows_written = {
        let file = File::create(&csv_path)
            .with_context(|| format!("Failed to create CSV file: {csv_path:?}"))?;
        let mut writer = BufWriter::new(file);

        let rows_written = write_table(
            &mut writer,
            table.header(),
            table.rows_with_layout(export_options.row_layout),
            &export_options.delimiter,
        )
        .with_context(|| format!("Failed to write CSV file: {csv_path:?}"))?;

        writer
            .flush()
            .with_context(|| format!("Failed to flush CSV file: {csv_path:?}"))?;
        rows_written
    };

    if debug {
        println!("Wrote {} rows to {:?}", rows_written, csv_path);
    }

    let info_path = if export_options.info {
        let info_path = with_suffix(&prefix, ".info.csv");
        export_info_to_csv(log, &info_path)?;
        Some(info_path)
    } else {
        None
    };

    Ok(ExportReport {
        csv_path,
        info_path,
        rows_written,
        columns: table.header().len(),
    })
}

/// Write the header and every row, joined by `delimiter`. Returns the number of data rows.
pub fn write_table<W: Write>(
    writer: &mut W,
    header: &[String],
    rows: impl Iterator<Item = Vec<String>>,
    delimiter: &str,
) -> std::io::Result<usize> {
    writeln!(writer, "{}", header.join(delimiter))?;

    let mut count = 0;
    for row in rows {
        writeln!(writer, "{}", row.join(delimiter))?;
        count += 1;
    }
    Ok(count)
}

/// Write log metadata as `section,timestamp,key,value` records
pub fn export_info_to_csv(log: &ULogData, output_path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("Failed to create info CSV file: {output_path:?}"))?;

    writer.write_record(["section", "timestamp", "key", "value"])?;

    for (key, value) in &log.info {
        writer.write_record(["info", "", key.as_str(), value.as_str()])?;
    }

    for (key, values) in &log.info_multiple {
        for value in values {
            writer.write_record(["info_multiple", "", key.as_str(), value.as_str()])?;
        }
    }

    for (name, value) in &log.initial_parameters {
        writer.write_record(["parameter", "", name.as_str(), format_value(value).as_str()])?;
    }

    for param in &log.changed_parameters {
        writer.write_record([
            "changed_parameter",
            param.timestamp_us.to_string().as_str(),
            param.name.as_str(),
            format_value(&param.value).as_str(),
        ])?;
    }

    for message in &log.logged_messages {
        let key = match message.tag {
            Some(tag) => format!("{}[{}]", log_level_name(message.log_level), tag),
            None => log_level_name(message.log_level).to_string(),
        };
        writer.write_record([
            "log",
            message.timestamp_us.to_string().as_str(),
            key.as_str(),
            message.message.as_str(),
        ])?;
    }

    for dropout in &log.dropouts {
        writer.write_record([
            "dropout",
            dropout.timestamp_us.to_string().as_str(),
            "duration_ms",
            dropout.duration_ms.to_string().as_str(),
        ])?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush info CSV file: {output_path:?}"))?;
    Ok(())
}
