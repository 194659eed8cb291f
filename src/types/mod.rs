pub mod format;
pub mod log;
pub mod record;

pub use format::*;
pub use log::*;
pub use record::*;
