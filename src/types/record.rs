use crate::types::format::FieldDefinition;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Decoded primitive value
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    Bool(bool),
}

impl Value {
    /// Unsigned view of an integer value, used for timestamps
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::UInt(v) => Some(v),
            Value::Int(v) if v >= 0 => Some(v as u64),
            _ => None,
        }
    }
}

/// All samples of one subscribed message, stored column-major
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecordSet {
    pub name: String,
    pub multi_id: u8,
    pub msg_id: u16,
    pub fields: Vec<FieldDefinition>,
    /// One column per entry of `fields`, all of equal length
    pub columns: Vec<Vec<Value>>,
}

impl RecordSet {
    pub fn new(name: String, multi_id: u8, msg_id: u16, fields: Vec<FieldDefinition>) -> Self {
        let columns = vec![Vec::new(); fields.len()];
        Self {
            name,
            multi_id,
            msg_id,
            fields,
            columns,
        }
    }

    /// Append one decoded sample (one value per field, in field order)
    pub fn push_sample(&mut self, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.columns.len());
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.push(value);
        }
    }

    pub fn sample_count(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.field_index(name).map(|i| self.columns[i].as_slice())
    }

    /// Timestamp of a sample, if the message has a timestamp field
    pub fn timestamp_at(&self, sample: usize) -> Option<u64> {
        let index = self.field_index("timestamp")?;
        self.columns[index].get(sample)?.as_u64()
    }

    /// First and last timestamp of this record set
    pub fn time_range(&self) -> Option<(u64, u64)> {
        let column = self.column("timestamp")?;
        let first = column.first()?.as_u64()?;
        let last = column.last()?.as_u64()?;
        Some((first, last))
    }
}
