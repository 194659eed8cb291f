//! Name filters for selecting messages and columns
//!
//! Both `--messages` and `--columns` take a comma-separated allow-list.
//! Message filters are applied by the loader when a message is subscribed;
//! column filters are applied by the table assembler before the header is built.

use crate::types::RecordSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Comma-separated allow-list of names
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NameFilter {
    names: Vec<String>,
}

impl NameFilter {
    /// Parse a list like `sensor_combined,vehicle_gps_position`.
    ///
    /// Returns `None` when the list is empty, meaning "no filtering".
    pub fn parse(list: &str) -> Option<Self> {
        let names: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(Self { names })
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Match a field either by bare name or qualified as `message.field`
    pub fn matches_field(&self, message: &str, field: &str) -> bool {
        self.names.iter().any(|n| {
            n == field
                || n.strip_prefix(message)
                    .and_then(|rest| rest.strip_prefix('.'))
                    .map(|rest| rest == field)
                    .unwrap_or(false)
        })
    }

    /// Indices of the fields of `record_set` selected by this filter
    pub fn select_fields(&self, record_set: &RecordSet) -> Vec<usize> {
        record_set
            .fields
            .iter()
            .enumerate()
            .filter(|(_, field)| self.matches_field(&record_set.name, &field.name))
            .map(|(i, _)| i)
            .collect()
    }
}
