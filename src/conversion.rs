//! Value conversion utilities for CSV output
//!
//! Contains the text formatting used for every CSV cell, plus helpers for
//! rendering log levels and timestamps in the info export.

use crate::types::Value;

/// Format a decoded value as CSV cell text
pub fn format_value(value: &Value) -> String {
    match *value {
        Value::Int(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::Float(v) => format_float(v as f64, v.fract() == 0.0, v.to_string()),
        Value::Double(v) => format_float(v, v.fract() == 0.0, v.to_string()),
        // Booleans are stored as a byte in the log, keep them numeric
        Value::Bool(v) => u8::from(v).to_string(),
    }
}

/// Shortest round-trip text, always with a decimal point for finite values.
///
/// `Display` for floats never uses exponent notation, so large integral
/// values are written out in full followed by `.0`.
fn format_float(value: f64, integral: bool, shortest: String) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        }
    } else if integral {
        format!("{shortest}.0")
    } else {
        shortest
    }
}

/// Convert a ULog log level byte to its name
///
/// Levels are stored as ASCII digits '0' (emergency) to '7' (debug).
pub fn log_level_name(level: u8) -> &'static str {
    match level {
        b'0' => "EMERGENCY",
        b'1' => "ALERT",
        b'2' => "CRITICAL",
        b'3' => "ERROR",
        b'4' => "WARNING",
        b'5' => "NOTICE",
        b'6' => "INFO",
        b'7' => "DEBUG",
        _ => "UNKNOWN",
    }
}

/// Convert a microsecond timestamp to seconds
pub fn timestamp_to_seconds(timestamp_us: u64) -> f64 {
    timestamp_us as f64 / 1_000_000.0
}
