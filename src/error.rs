//! Error types for the collection store.

use crate::types::ItemId;
use thiserror::Error;

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate id: {0}")]
    DuplicateId(ItemId),

    #[error("item not found: {0}")]
    NotFound(ItemId),

    #[error("{0} is not serializable")]
    NotSerializable(&'static str),

    #[error("transaction failed at step {step}: {source}")]
    TransactionFailed {
        step: usize,
        #[source]
        source: Box<StoreError>,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
