//! Directory error types.

use thiserror::Error;

/// Errors that can occur while talking to a directory server.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The server could not be reached or the connection dropped.
    #[error("connection error: {0}")]
    Connection(String),

    /// The server rejected a bind.
    #[error("bind rejected: {0}")]
    Bind(String),

    /// A search failed.
    #[error("search error: {0}")]
    Search(String),

    /// A search that must match at most one entry matched several.
    #[error("non unique result for {0}")]
    NonUnique(String),

    /// The backend configuration cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
