//! Error types for cache and configuration operations

use thiserror::Error;

/// Main error type for backend, serialization and configuration failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Backend storage operation failed
    #[error("backend error: {0}")]
    Backend(String),

    /// Serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Backend constructor configuration was rejected
    #[error("invalid backend configuration: {0}")]
    Config(String),

    /// No backend is registered under the requested name
    #[error("unknown cache backend: {0}")]
    UnknownBackend(String),

    /// Declarative settings could not be read
    #[error("settings error: {0}")]
    Settings(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
