use thiserror::Error;

use crate::graph::LiteralError;

/// Errors raised by graph store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(String),

    /// An edge endpoint does not exist.
    #[error("Vertex not found: {0}")]
    MissingVertex(String),

    /// A property value could not be rendered into a statement.
    #[error("Literal error: {0}")]
    Literal(#[from] LiteralError),

    /// A row came back in a shape the backend cannot decode.
    #[error("Malformed row: {0}")]
    MalformedRow(String),
}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}
