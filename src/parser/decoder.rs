use crate::error::{Result, ULogError};
use crate::parser::stream::decode_string;
use crate::types::{FieldDefinition, FieldType, FormatField, MessageFormat, MessageLayout, Value};
use std::collections::HashMap;

/// Maximum nesting depth of format definitions to prevent stack overflow
const MAX_RECURSION_DEPTH: usize = 32;

/// Message payloads are sized by a u16
const MAX_MESSAGE_SIZE: usize = u16::MAX as usize;

fn too_large(type_name: &str) -> ULogError {
    ULogError::InvalidFormat(format!(
        "format '{}' exceeds the maximum message size of {} bytes",
        type_name, MAX_MESSAGE_SIZE
    ))
}

/// Flatten a message format (and its nested types) into primitive fields with byte offsets
pub fn build_layout(
    message_name: &str,
    formats: &HashMap<String, MessageFormat>,
) -> Result<MessageLayout> {
    let mut layout = MessageLayout::default();
    let size = flatten_format(message_name, "", 0, formats, &mut layout.fields, 0)?;
    layout.size = size;
    Ok(layout)
}

/// Returns the byte size of `type_name`, appending its fields (offset by `base`) to `out`
fn flatten_format(
    type_name: &str,
    prefix: &str,
    base: usize,
    formats: &HashMap<String, MessageFormat>,
    out: &mut Vec<FieldDefinition>,
    depth: usize,
) -> Result<usize> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(ULogError::RecursionLimit(type_name.to_string()));
    }

    let format = formats
        .get(type_name)
        .ok_or_else(|| ULogError::UnknownFormat(type_name.to_string()))?;

    let mut offset: usize = 0;
    for field in &format.fields {
        let size = flatten_field(field, prefix, base + offset, formats, out, depth)?;
        offset = offset
            .checked_add(size)
            .filter(|total| *total <= MAX_MESSAGE_SIZE)
            .ok_or_else(|| too_large(type_name))?;
    }
    Ok(offset)
}

fn flatten_field(
    field: &FormatField,
    prefix: &str,
    base: usize,
    formats: &HashMap<String, MessageFormat>,
    out: &mut Vec<FieldDefinition>,
    depth: usize,
) -> Result<usize> {
    let count = field.element_count();

    if let Some(element_size) = field.field_type.primitive_size() {
        let size = element_size
            .checked_mul(count)
            .filter(|total| *total <= MAX_MESSAGE_SIZE)
            .ok_or_else(|| too_large(&field.name))?;
        if !field.is_padding() {
            for i in 0..count {
                let name = if count > 1 {
                    format!("{}{}[{}]", prefix, field.name, i)
                } else {
                    format!("{}{}", prefix, field.name)
                };
                out.push(FieldDefinition {
                    name,
                    field_type: field.field_type.clone(),
                    offset: base + i * element_size,
                });
            }
        }
        return Ok(size);
    }

    let FieldType::Nested(nested_name) = &field.field_type else {
        unreachable!("primitive types always have a size");
    };

    let mut size = 0;
    for i in 0..count {
        let nested_prefix = if count > 1 {
            format!("{}{}[{}].", prefix, field.name, i)
        } else {
            format!("{}{}.", prefix, field.name)
        };
        // Padding inside nested types is still skipped by the recursive call
        let mut nested_fields = Vec::new();
        let element_size = flatten_format(
            nested_name,
            &nested_prefix,
            base + size,
            formats,
            &mut nested_fields,
            depth + 1,
        )?;
        if !field.is_padding() {
            out.extend(nested_fields);
        }
        // A zero-sized type has no fields, the remaining elements add nothing
        if element_size == 0 {
            break;
        }
        size += element_size;
        if size > MAX_MESSAGE_SIZE {
            return Err(too_large(&field.name));
        }
    }
    Ok(size)
}

/// Decode one primitive value from the start of `bytes`
pub fn decode_value(field_type: &FieldType, bytes: &[u8]) -> Result<Value> {
    let size = field_type
        .primitive_size()
        .ok_or_else(|| ULogError::InvalidMessage(format!("cannot decode {:?} as a value", field_type)))?;
    if bytes.len() < size {
        return Err(ULogError::UnexpectedEof);
    }

    let mut buf = [0u8; 8];
    buf[..size].copy_from_slice(&bytes[..size]);

    let value = match field_type {
        FieldType::Int8 => Value::Int(bytes[0] as i8 as i64),
        FieldType::Char => Value::Int(bytes[0] as i8 as i64),
        FieldType::UInt8 => Value::UInt(bytes[0] as u64),
        FieldType::Bool => Value::Bool(bytes[0] != 0),
        FieldType::Int16 => Value::Int(i16::from_le_bytes([buf[0], buf[1]]) as i64),
        FieldType::UInt16 => Value::UInt(u16::from_le_bytes([buf[0], buf[1]]) as u64),
        FieldType::Int32 => Value::Int(i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as i64),
        FieldType::UInt32 => {
            Value::UInt(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as u64)
        }
        FieldType::Float => Value::Float(f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])),
        FieldType::Int64 => Value::Int(i64::from_le_bytes(buf)),
        FieldType::UInt64 => Value::UInt(u64::from_le_bytes(buf)),
        FieldType::Double => Value::Double(f64::from_le_bytes(buf)),
        FieldType::Nested(_) => unreachable!("nested types have no primitive size"),
    };
    Ok(value)
}

/// Decode one data sample according to a message layout
pub fn decode_sample(layout: &MessageLayout, payload: &[u8]) -> Result<Vec<Value>> {
    if payload.len() < layout.required_size() {
        return Err(ULogError::InvalidMessage(format!(
            "data message too short: {} bytes, need {}",
            payload.len(),
            layout.required_size()
        )));
    }

    layout
        .fields
        .iter()
        .map(|field| decode_value(&field.field_type, &payload[field.offset..]))
        .collect()
}

/// Value of an info message: text for char arrays, otherwise scalar(s)
pub fn decode_info_value(
    key: &FormatField,
    bytes: &[u8],
    ignore_string_errors: bool,
) -> Result<String> {
    if key.field_type == FieldType::Char && key.array_size.is_some() {
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        return decode_string(&bytes[..end], ignore_string_errors);
    }

    let size = key.field_type.primitive_size().ok_or_else(|| {
        ULogError::InvalidMessage(format!("unsupported info type for '{}'", key.name))
    })?;

    let values = bytes
        .chunks(size)
        .take(key.element_count())
        .map(|chunk| decode_value(&key.field_type, chunk).map(|v| crate::conversion::format_value(&v)))
        .collect::<Result<Vec<_>>>()?;
    Ok(values.join(" "))
}
