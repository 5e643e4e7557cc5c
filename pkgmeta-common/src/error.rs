//! Common error types for pkgmeta

use thiserror::Error;

/// Common result type for pkgmeta operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across pkgmeta crates
///
/// The fusion engine itself never fails; these cover the ambient
/// operations around it (configuration and input loading).
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON input could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
