//! Common error types for Atelier

use thiserror::Error;

/// Common result type for Atelier operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Atelier engine
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested project, blueprint or branch not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generated content failed structural validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal engine error
    #[error("Internal error: {0}")]
    Internal(String),
}
