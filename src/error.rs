use std::fmt;

/// Custom error types for ULog loading and CSV assembly
#[derive(Debug)]
pub enum ULogError {
    /// I/O errors
    Io(std::io::Error),
    /// UTF-8 decoding errors in string-typed content
    Utf8(std::str::Utf8Error),
    /// File does not start with the ULog magic bytes
    InvalidMagic,
    /// Incompatible flag bits this reader does not understand
    UnsupportedIncompatFlags([u8; 8]),
    /// End of data reached in the middle of a value
    UnexpectedEof,
    /// Malformed format definition
    InvalidFormat(String),
    /// A message or nested type refers to a format that was never defined
    UnknownFormat(String),
    /// Malformed message payload
    InvalidMessage(String),
    /// Nested type definitions are too deep (or cyclic)
    RecursionLimit(String),
    /// A record set has no `timestamp` field
    MissingTimestamp(String),
    /// Export format error
    Export(String),
}

impl fmt::Display for ULogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ULogError::Io(err) => write!(f, "I/O error: {}", err),
            ULogError::Utf8(err) => write!(f, "UTF-8 error: {}", err),
            ULogError::InvalidMagic => write!(f, "Not a ULog file (invalid magic bytes)"),
            ULogError::UnsupportedIncompatFlags(flags) => {
                write!(f, "Unsupported incompatible flags: {:02x?}", flags)
            }
            ULogError::UnexpectedEof => write!(f, "Unexpected end of file"),
            ULogError::InvalidFormat(msg) => write!(f, "Invalid format definition: {}", msg),
            ULogError::UnknownFormat(name) => write!(f, "Unknown message format: {}", name),
            ULogError::InvalidMessage(msg) => write!(f, "Invalid message: {}", msg),
            ULogError::RecursionLimit(name) => {
                write!(f, "Nested type recursion limit exceeded in format: {}", name)
            }
            ULogError::MissingTimestamp(name) => {
                write!(f, "Message '{}' has no timestamp field", name)
            }
            ULogError::Export(msg) => write!(f, "Export error: {}", msg),
        }
    }
}

impl std::error::Error for ULogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ULogError::Io(err) => Some(err),
            ULogError::Utf8(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ULogError {
    fn from(err: std::io::Error) -> Self {
        ULogError::Io(err)
    }
}

impl From<std::str::Utf8Error> for ULogError {
    fn from(err: std::str::Utf8Error) -> Self {
        ULogError::Utf8(err)
    }
}

pub type Result<T> = std::result::Result<T, ULogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ULogError::MissingTimestamp("vehicle_status".to_string()).to_string(),
            "Message 'vehicle_status' has no timestamp field"
        );
        assert_eq!(
            ULogError::InvalidMagic.to_string(),
            "Not a ULog file (invalid magic bytes)"
        );
    }

    #[test]
    fn test_utf8_error_has_source() {
        let bytes = vec![0xffu8, 0xfe];
        let err: ULogError = std::str::from_utf8(&bytes).unwrap_err().into();
        assert!(std::error::Error::source(&err).is_some());
    }
}
