use crate::error::{Result, ULogError};
use crate::parser::stream::{decode_string, ULogDataStream};
use crate::types::{FieldType, FormatField, MessageFormat, ULogHeader};

/// ULog magic bytes at the start of every file
pub const ULOG_MAGIC: [u8; 7] = [0x55, 0x4c, 0x6f, 0x67, 0x01, 0x12, 0x35];
pub const FILE_HEADER_SIZE: usize = 16;

/// No array can hold more elements than a message payload has bytes
const MAX_ARRAY_SIZE: usize = u16::MAX as usize;

/// Incompat bit 0 of byte 0: data appended at the offsets in the flag bits message
const INCOMPAT_DATA_APPENDED: u8 = 0x01;

/// Parse the 16-byte file header
pub fn parse_file_header(stream: &mut ULogDataStream) -> Result<ULogHeader> {
    let magic = stream.read_bytes(ULOG_MAGIC.len()).map_err(|_| ULogError::InvalidMagic)?;
    if magic != ULOG_MAGIC {
        return Err(ULogError::InvalidMagic);
    }

    let version = stream.read_byte()?;
    let start_timestamp_us = stream.read_u64()?;

    Ok(ULogHeader {
        version,
        start_timestamp_us,
        ..ULogHeader::default()
    })
}

/// Parse a flag bits (`B`) payload into the header
pub fn parse_flag_bits(payload: &[u8], header: &mut ULogHeader) -> Result<()> {
    let mut stream = ULogDataStream::new(payload);
    header.compat_flags.copy_from_slice(stream.read_bytes(8)?);
    header.incompat_flags.copy_from_slice(stream.read_bytes(8)?);
    for offset in header.appended_offsets.iter_mut() {
        *offset = stream.read_u64()?;
    }

    let unknown_first = header.incompat_flags[0] & !INCOMPAT_DATA_APPENDED;
    if unknown_first != 0 || header.incompat_flags[1..].iter().any(|b| *b != 0) {
        return Err(ULogError::UnsupportedIncompatFlags(header.incompat_flags));
    }

    Ok(())
}

/// Split a `type[n]` declaration into the base type and array size
fn parse_type_declaration(declaration: &str) -> Result<(FieldType, Option<usize>)> {
    match declaration.find('[') {
        Some(open) => {
            let close = declaration[open..]
                .find(']')
                .map(|len| open + len)
                .ok_or_else(|| {
                    ULogError::InvalidFormat(format!("unterminated array type '{}'", declaration))
                })?;
            let size: usize = declaration[open + 1..close].trim().parse().map_err(|_| {
                ULogError::InvalidFormat(format!("invalid array size in '{}'", declaration))
            })?;
            if size > MAX_ARRAY_SIZE {
                return Err(ULogError::InvalidFormat(format!(
                    "array size {} too large in '{}'",
                    size, declaration
                )));
            }
            Ok((FieldType::parse(&declaration[..open]), Some(size)))
        }
        None => Ok((FieldType::parse(declaration), None)),
    }
}

/// Parse one `type name` pair
pub fn parse_field_declaration(declaration: &str) -> Result<FormatField> {
    let mut parts = declaration.trim().splitn(2, ' ');
    let type_part = parts.next().unwrap_or("");
    let name = parts.next().map(str::trim).unwrap_or("");
    if type_part.is_empty() || name.is_empty() {
        return Err(ULogError::InvalidFormat(format!(
            "field declaration '{}' needs a type and a name",
            declaration
        )));
    }

    let (field_type, array_size) = parse_type_declaration(type_part)?;
    Ok(FormatField {
        field_type,
        array_size,
        name: name.to_string(),
    })
}

/// Parse a format (`F`) payload like `name:uint64_t timestamp;float x;`
pub fn parse_format(payload: &[u8], ignore_string_errors: bool) -> Result<MessageFormat> {
    let text = decode_string(payload, ignore_string_errors)?;
    let (name, body) = text
        .split_once(':')
        .ok_or_else(|| ULogError::InvalidFormat(format!("missing ':' in '{}'", text)))?;

    let fields = body
        .split(';')
        .filter(|decl| !decl.trim().is_empty())
        .map(parse_field_declaration)
        .collect::<Result<Vec<_>>>()?;

    Ok(MessageFormat {
        name: name.trim().to_string(),
        fields,
    })
}

/// Read a length-prefixed key (`"type name"`) used by info and parameter messages
pub fn parse_key(stream: &mut ULogDataStream, ignore_string_errors: bool) -> Result<FormatField> {
    let key_len = stream.read_byte()? as usize;
    let key_bytes = stream.read_bytes(key_len)?;
    let key = decode_string(key_bytes, ignore_string_errors)?;
    parse_field_declaration(&key)
}
