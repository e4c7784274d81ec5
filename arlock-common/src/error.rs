//! Error types shared across arlock crates
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for arlock-common
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or parsing errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML deserialization errors
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using arlock-common Error
pub type Result<T> = std::result::Result<T, Error>;
