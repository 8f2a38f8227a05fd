//! Error types for agentmeter-core

use thiserror::Error;

/// Main error type for the agentmeter-core library
///
/// The aggregation engine never produces these; only the collaborators that
/// touch the outside world do (record store, config, usage endpoint).
#[derive(Error, Debug)]
pub enum Error {
    /// Record store error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Usage endpoint error
    #[error("usage error: {0}")]
    Usage(String),

    /// Session not found
    #[error("session not found: {0}")]
    SessionNotFound(String),
}

/// Result type alias for agentmeter-core
pub type Result<T> = std::result::Result<T, Error>;
