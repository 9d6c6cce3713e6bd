//! Error handling for GCodeGuard
//!
//! The streaming fixer itself never fails: malformed words become absent
//! fields and persistence failures are logged and swallowed. The types here
//! cover the explicit, fallible edges of the system:
//! - Configuration errors (validation of the machine envelope)
//! - Store errors (the key-value persistence collaborator)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Configuration error type
///
/// Raised when a safety configuration or envelope fails validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Axis minimum is not below its maximum
    #[error("Invalid travel for {axis} axis: min {min} must be below max {max}")]
    InvalidAxisLimits {
        /// The axis letter.
        axis: char,
        /// Configured minimum travel.
        min: f64,
        /// Configured maximum travel.
        max: f64,
    },

    /// A value that must be strictly positive is not
    #[error("{field} must be > 0 (got {value})")]
    NonPositive {
        /// The offending field.
        field: String,
        /// The rejected value.
        value: f64,
    },

    /// A value falls outside its allowed range
    #[error("{field} out of range ({value}): {reason}")]
    OutOfRange {
        /// The offending field.
        field: String,
        /// The rejected value.
        value: f64,
        /// Why the value is rejected.
        reason: String,
    },

    /// The configuration file extension is not supported
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),
}

/// Key-value store error type
///
/// Represents failures of the durable blob store used for configuration and
/// the learning database.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Reading a blob failed
    #[error("Failed to read '{key}': {reason}")]
    Read {
        /// The blob key.
        key: String,
        /// Underlying failure.
        reason: String,
    },

    /// Writing a blob failed
    #[error("Failed to write '{key}': {reason}")]
    Write {
        /// The blob key.
        key: String,
        /// Underlying failure.
        reason: String,
    },

    /// A blob exists but cannot be decoded
    #[error("Corrupt blob '{key}': {reason}")]
    Corrupt {
        /// The blob key.
        key: String,
        /// Decoder message.
        reason: String,
    },
}

/// Main error type for GCodeGuard
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Persistence error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Check if this is a persistence error
    pub fn is_store_error(&self) -> bool {
        matches!(self, Error::Store(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
