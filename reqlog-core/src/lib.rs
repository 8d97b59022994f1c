pub mod config;
pub mod entry;
pub mod error;

pub use config::ReqLogConfig;
pub use entry::LogEntry;
pub use error::ReqLogError;
