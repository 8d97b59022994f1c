use crate::store::LogStore;
use reqlog_core::entry::LogEntry;
use reqlog_core::error::ReqLogError;
use std::sync::Arc;
use tracing::debug;

/// Read side of the request log, as served to external consumers.
#[derive(Debug, Clone)]
pub struct LogReader {
    store: Arc<LogStore>,
}

impl LogReader {
    pub fn new(store: Arc<LogStore>) -> Self {
        Self { store }
    }

    /// Entries oldest first. A store that does not exist yet is created, so
    /// a fresh deployment reads as an empty list.
    ///
    /// Every failure here is a read failure: a store that cannot be created
    /// cannot be read either.
    pub fn read(&self) -> Result<Vec<LogEntry>, ReqLogError> {
        self.store.ensure_initialized().map_err(|e| match e {
            ReqLogError::Initialization { path, source } => {
                ReqLogError::StoreUnreadable { path, source }
            }
            other => other,
        })?;

        let entries = self.store.read_all()?;
        debug!(count = entries.len(), "Read request log");
        Ok(entries)
    }
}
