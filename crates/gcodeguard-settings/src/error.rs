//! Error types for the settings crate.
//!
//! This module provides structured error types for configuration files and
//! the persistence collaborator.

use gcodeguard_core::{ConfigError, StoreError};
use std::io;
use thiserror::Error;

/// Errors that can occur during settings operations.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The configuration file could not be loaded.
    #[error("Failed to load settings: {0}")]
    LoadError(String),

    /// The configuration file could not be saved.
    #[error("Failed to save settings: {0}")]
    SaveError(String),

    /// The data directory could not be found or created.
    #[error("Data directory error: {0}")]
    DataDirectory(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// A configuration validation error occurred.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A persistence error occurred.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

impl From<SettingsError> for gcodeguard_core::Error {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Config(e) => Self::Config(e),
            SettingsError::Store(e) => Self::Store(e),
            SettingsError::IoError(e) => Self::Io(e),
            SettingsError::JsonError(e) => Self::Json(e),
            other => Self::other(other.to_string()),
        }
    }
}
