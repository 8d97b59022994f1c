use http::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for reqlog.
#[derive(Error, Debug)]
pub enum ReqLogError {
    #[error("Log store unreadable at {path}: {source}")]
    StoreUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Log store write failed at {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Log store initialization failed at {path}: {source}")]
    Initialization {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Log store at {path} has an unexpected header: {found:?}")]
    CorruptHeader { path: PathBuf, found: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Log store lock poisoned")]
    LockPoisoned,
}

impl ReqLogError {
    /// Map to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReqLogError::StoreUnreadable { .. } => StatusCode::NOT_FOUND,
            ReqLogError::CorruptHeader { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for failures on the read path, which are reported to callers.
    pub fn is_read_error(&self) -> bool {
        matches!(
            self,
            ReqLogError::StoreUnreadable { .. } | ReqLogError::CorruptHeader { .. }
        )
    }
}
