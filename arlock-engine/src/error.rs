//! Error types for arlock-engine
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for arlock-engine
#[derive(Error, Debug)]
pub enum Error {
    /// Barcode detector internal errors
    #[error("Detector error: {0}")]
    Detector(String),

    /// Tracking session errors
    #[error("Session error: {0}")]
    Session(String),

    /// Remote object fetch errors
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Content construction errors (undecodable image bytes, bad asset)
    #[error("Content error: {0}")]
    Content(String),

    /// Shared configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] arlock_common::Error),

    /// HTTP transport errors from the object store
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Pipeline channel closed (shutdown in progress)
    #[error("Pipeline channel closed")]
    ChannelClosed,

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Convenience Result type using arlock-engine Error
pub type Result<T> = std::result::Result<T, Error>;
