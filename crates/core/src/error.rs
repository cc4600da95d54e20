use thiserror::Error;

pub use crate::config::ConfigError;

/// Errors surfaced by the API client and the registry.
///
/// Transport and decode failures are not errors here: they come back as a
/// `-1` response so callers keep a single success/pending/failure branch.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The request id is already tracked as pending.
    #[error("Request {0} is already pending")]
    DuplicateRequest(String),
}

/// Result type alias for client and registry operations
pub type Result<T> = std::result::Result<T, ApiError>;
