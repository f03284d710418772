//! Error types for ZQLZ

use thiserror::Error;

/// Error reported by connectivity collaborators and row mappers
#[derive(Error, Debug)]
pub enum ZqlzError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Raised by custom row mappers and connections that fit no other kind
    #[error("{0}")]
    Other(String),
}

/// Result type alias for ZQLZ operations
pub type Result<T> = std::result::Result<T, ZqlzError>;
