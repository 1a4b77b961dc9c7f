//! Error types for `mqtls` core library.

use thiserror::Error;

/// Result type alias using `mqtls` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `mqtls` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
