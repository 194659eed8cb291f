use crate::types::{MessageFormat, RecordSet, Value};
use std::collections::{BTreeMap, HashMap};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// ULog file header and flag bits
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ULogHeader {
    pub version: u8,
    /// Logging start time in microseconds
    pub start_timestamp_us: u64,
    pub compat_flags: [u8; 8],
    pub incompat_flags: [u8; 8],
    pub appended_offsets: [u64; 3],
}

impl ULogHeader {
    pub fn has_appended_data(&self) -> bool {
        self.incompat_flags[0] & 0x01 != 0
    }
}

/// Text message emitted by the logging system (`L` / `C` messages)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LoggedMessage {
    pub log_level: u8,
    pub tag: Option<u16>,
    pub timestamp_us: u64,
    pub message: String,
}

/// Parameter value change recorded after logging started
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChangedParameter {
    pub timestamp_us: u64,
    pub name: String,
    pub value: Value,
}

/// Gap in the logged data
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dropout {
    pub timestamp_us: u64,
    pub duration_ms: u16,
}

/// Message statistics
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParseStats {
    pub total_messages: u64,
    pub data_messages: u64,
    /// Data messages for message ids that are filtered out or unknown
    pub skipped_data_messages: u64,
    /// Messages of an unknown type, skipped by their size
    pub unknown_messages: u64,
    pub total_bytes: u64,
    /// Bytes skipped while resynchronising after corruption
    pub skipped_bytes: u64,
    pub corrupted: bool,
    pub truncated: bool,
}

/// Complete decoded ULog file
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ULogData {
    pub header: ULogHeader,
    pub formats: HashMap<String, MessageFormat>,
    /// Record sets in subscription order, only those with samples
    pub record_sets: Vec<RecordSet>,
    pub info: BTreeMap<String, String>,
    pub info_multiple: BTreeMap<String, Vec<String>>,
    pub initial_parameters: BTreeMap<String, Value>,
    pub changed_parameters: Vec<ChangedParameter>,
    pub logged_messages: Vec<LoggedMessage>,
    pub dropouts: Vec<Dropout>,
    pub stats: ParseStats,
}

impl ULogData {
    /// Get a record set by message name and multi id
    pub fn record_set(&self, name: &str, multi_id: u8) -> Option<&RecordSet> {
        self.record_sets
            .iter()
            .find(|set| set.name == name && set.multi_id == multi_id)
    }

    /// Total number of samples across all record sets
    pub fn total_samples(&self) -> usize {
        self.record_sets.iter().map(RecordSet::sample_count).sum()
    }

    /// Time span covered by the data in microseconds
    pub fn duration_us(&self) -> u64 {
        let ranges: Vec<(u64, u64)> = self
            .record_sets
            .iter()
            .filter_map(RecordSet::time_range)
            .collect();
        let start = ranges.iter().map(|r| r.0).min().unwrap_or(0);
        let end = ranges.iter().map(|r| r.1).max().unwrap_or(0);
        end.saturating_sub(start)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_us() as f64 / 1_000_000.0
    }
}
