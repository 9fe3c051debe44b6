//! Error types for the object store engine
//!
//! Engine errors surface to repository callers unchanged; the variants here
//! are the storage half of the application error taxonomy.

use thiserror::Error;

/// Store result type
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// No usable persistence substrate (the database file cannot be opened
    /// or created in this environment).
    #[error("Local storage is unavailable: {0}")]
    Unavailable(String),

    /// Another open connection holds the database while a schema upgrade is
    /// in progress. Callers typically ask the user to close other sessions.
    #[error("Schema upgrade is blocked by another open connection")]
    Blocked,

    #[error("Unknown object store: {0}")]
    UnknownStore(String),

    #[error("Unknown index '{index}' on object store '{store}'")]
    UnknownIndex { store: String, index: String },

    #[error("Record has no usable key at path '{key_path}' for store '{store}'")]
    MissingKey { store: String, key_path: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
