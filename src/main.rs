//! CLI binary for ULog to CSV conversion
//!
//! Loads a ULog file and writes all of its message types into one CSV file.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use std::path::{Path, PathBuf};
use ulog2csv::{
    export_to_csv, parse_ulog_file, ExportOptions, LoadOptions, NameFilter, RowLayout,
};

fn build_command() -> Command {
    Command::new("ulog2csv")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert a ULog file to a single CSV file containing every logged message.")
        .arg(
            Arg::new("file")
                .help("ULog file to convert")
                .value_name("file.ulg")
                .required(false)
                .index(1),
        )
        .arg(
            Arg::new("messages")
                .short('m')
                .long("messages")
                .help("Only consider given messages. Must be a comma-separated list of names, like 'sensor_combined,vehicle_gps_position'")
                .value_name("MESSAGES"),
        )
        .arg(
            Arg::new("delimiter")
                .short('d')
                .long("delimiter")
                .help("Use delimiter in CSV (default is ',')")
                .value_name("DELIMITER")
                .default_value(","),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Output directory (default is same as input file)")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("ignore")
                .short('i')
                .long("ignore")
                .help("Ignore string parsing exceptions")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("columns")
                .short('c')
                .long("columns")
                .help("Only export given columns. Comma-separated list of field names or message.field")
                .value_name("COLUMNS"),
        )
        .arg(
            Arg::new("merge")
                .long("merge")
                .help("Merge rows of all messages on timestamp instead of writing one block per message")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("info")
                .long("info")
                .help("Also export info, parameters, logged messages and dropouts to <name>.info.csv")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug output and detailed parsing information")
                .action(ArgAction::SetTrue),
        )
}

/// Create the output directory if needed. Returns whether it was created.
fn prepare_output_dir(dir: Option<&str>) -> Result<bool> {
    let Some(dir) = dir else {
        return Ok(false);
    };
    let output_dir = Path::new(dir);
    if output_dir.is_dir() {
        return Ok(false);
    }
    println!("Creating output directory {dir}");
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {output_dir:?}"))?;
    Ok(true)
}

fn main() -> Result<()> {
    let matches = build_command().get_matches();

    let debug = matches.get_flag("debug");

    let Some(file) = matches.get_one::<String>("file") else {
        // No file provided, show help and exit
        build_command().print_help()?;
        println!();
        return Ok(());
    };
    let input_path = PathBuf::from(file);

    if debug {
        println!(
            "ulog2csv {} ({})",
            env!("CARGO_PKG_VERSION"),
            option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
        );
        println!("Input file: {input_path:?}");
    }

    let load_options = LoadOptions {
        message_filter: matches
            .get_one::<String>("messages")
            .and_then(|list| NameFilter::parse(list)),
        ignore_string_errors: matches.get_flag("ignore"),
    };

    let export_options = ExportOptions {
        delimiter: matches
            .get_one::<String>("delimiter")
            .cloned()
            .unwrap_or_else(|| ",".to_string()),
        output_dir: matches.get_one::<String>("output").cloned(),
        columns: matches
            .get_one::<String>("columns")
            .and_then(|list| NameFilter::parse(list)),
        row_layout: if matches.get_flag("merge") {
            RowLayout::Merged
        } else {
            RowLayout::Blocks
        },
        info: matches.get_flag("info"),
    };

    prepare_output_dir(export_options.output_dir.as_deref())?;

    let log = parse_ulog_file(&input_path, &load_options, debug)?;

    if log.stats.corrupted {
        eprintln!(
            "Warning: file corruption detected, skipped {} bytes",
            log.stats.skipped_bytes
        );
    }
    if log.stats.truncated {
        eprintln!("Warning: log ends with a truncated message");
    }

    let report = export_to_csv(&log, &input_path, &export_options, debug)?;

    println!("Exported data to: {}", report.csv_path.display());
    if let Some(info_path) = &report.info_path {
        println!("Exported info to: {}", info_path.display());
    }
    println!("Data converted");

    Ok(())
}
