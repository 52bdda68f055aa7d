//! Error taxonomy shared by every memo store.

use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoError {
    /// A required field is missing or blank.
    #[error("{0}")]
    Validation(String),
    /// The referenced memo does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The backing storage failed to read or write.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl MemoError {
    pub fn storage(err: impl Display) -> Self {
        Self::Storage(err.to_string())
    }

    pub fn memo_not_found(memo_id: i64) -> Self {
        Self::NotFound(format!("Memo #{} not found", memo_id))
    }
}

impl From<std::io::Error> for MemoError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err)
    }
}

impl From<serde_json::Error> for MemoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("Malformed memo data: {}", err))
    }
}
