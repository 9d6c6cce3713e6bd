//! # GCodeGuard Settings
//!
//! Configuration and persistence for the safety engine.
//!
//! This crate provides:
//! - The machine envelope and rule thresholds (`SafetyConfig`)
//! - JSON/TOML configuration files with validation
//! - The key-value store the engine persists its blobs through

pub mod config;
pub mod error;
pub mod persistence;

pub use config::{
    AxisLimits, Envelope, LearningSettings, RuleThresholds, SafetyConfig, SpindleDefaults,
};
pub use error::{SettingsError, SettingsResult};
pub use persistence::{
    load_blob, save_blob, JsonFileStore, KeyValueStore, MemoryStore, StoreHandle, CONFIG_KEY,
    LEARNING_KEY,
};
