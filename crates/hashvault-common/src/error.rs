//! Error types for Hashvault

use thiserror::Error;

/// Result type alias for Hashvault operations
pub type Result<T> = std::result::Result<T, HashvaultError>;

/// Main error type for Hashvault
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashvaultError {
    #[error("Invalid hash: {0}")]
    InvalidHash(String),
}
