pub mod decoder;
pub mod header;
pub mod loader;
pub mod stream;

pub use loader::{parse_ulog_bytes, parse_ulog_file, LoadOptions};
pub use stream::ULogDataStream;
