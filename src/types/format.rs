#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Primitive or nested type of a format field
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FieldType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    Bool,
    Char,
    /// Another message format, referenced by name
    Nested(String),
}

impl FieldType {
    pub fn parse(type_name: &str) -> Self {
        match type_name {
            "int8_t" => FieldType::Int8,
            "uint8_t" => FieldType::UInt8,
            "int16_t" => FieldType::Int16,
            "uint16_t" => FieldType::UInt16,
            "int32_t" => FieldType::Int32,
            "uint32_t" => FieldType::UInt32,
            "int64_t" => FieldType::Int64,
            "uint64_t" => FieldType::UInt64,
            "float" => FieldType::Float,
            "double" => FieldType::Double,
            "bool" => FieldType::Bool,
            "char" => FieldType::Char,
            other => FieldType::Nested(other.to_string()),
        }
    }

    /// Size in bytes of a primitive type, `None` for nested types
    pub fn primitive_size(&self) -> Option<usize> {
        match self {
            FieldType::Int8 | FieldType::UInt8 | FieldType::Bool | FieldType::Char => Some(1),
            FieldType::Int16 | FieldType::UInt16 => Some(2),
            FieldType::Int32 | FieldType::UInt32 | FieldType::Float => Some(4),
            FieldType::Int64 | FieldType::UInt64 | FieldType::Double => Some(8),
            FieldType::Nested(_) => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, FieldType::Nested(_))
    }
}

/// One `type name` entry of a format definition
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FormatField {
    pub field_type: FieldType,
    /// Declared array length, `None` for scalars
    pub array_size: Option<usize>,
    pub name: String,
}

impl FormatField {
    pub fn is_padding(&self) -> bool {
        self.name.starts_with("_padding")
    }

    pub fn element_count(&self) -> usize {
        self.array_size.unwrap_or(1)
    }
}

/// Message format as declared by an `F` message
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MessageFormat {
    pub name: String,
    pub fields: Vec<FormatField>,
}

/// Flattened primitive field of a subscribed message
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldDefinition {
    /// Flattened name, e.g. `accel[2]` or `esc[0].esc_rpm`
    pub name: String,
    pub field_type: FieldType,
    /// Byte offset inside the data payload (after the message id)
    pub offset: usize,
}

/// Decoding layout of a subscribed message
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MessageLayout {
    pub fields: Vec<FieldDefinition>,
    /// Full size in bytes including padding
    pub size: usize,
}

impl MessageLayout {
    /// Minimum payload length that still covers every non-padding field
    pub fn required_size(&self) -> usize {
        self.fields
            .iter()
            .map(|f| f.offset + f.field_type.primitive_size().unwrap_or(0))
            .max()
            .unwrap_or(0)
    }
}
