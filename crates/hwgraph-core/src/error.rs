//! Inventory error types.

use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by [`crate::Inventory`] operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// A device record in a registration batch is malformed.
    #[error("Invalid device record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    /// Request arguments failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The addressed entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The operation conflicts with the current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Graph store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl InventoryError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }
}
