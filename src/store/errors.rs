//! Store error types.

use thiserror::Error;
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no {kind} document with id {id}")]
    NotFound { kind: &'static str, id: Uuid },
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
