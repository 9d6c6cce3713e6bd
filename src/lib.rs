//! # GCodeGuard
//!
//! A G-code safety fixer for hobby and small-shop CNC routers. Every line on
//! its way to the machine is checked against the machine envelope, the stock
//! and what earlier tool breakages taught, then corrected or refused.
//!
//! ## Architecture
//!
//! GCodeGuard is organized as a workspace with multiple crates:
//!
//! 1. **gcodeguard-core** - Errors, units, tool and material descriptors
//! 2. **gcodeguard-gcode** - Line tokenizer and modal machine state tracking
//! 3. **gcodeguard-settings** - Machine envelope configuration and key-value persistence
//! 4. **gcodeguard-safety** - Rules, fix synthesis, breakage learning and the engine
//! 5. **gcodeguard** - Re-exports and the command-line front end
//!
//! ## Features
//!
//! - **Streaming checks**: one line at a time, with state that follows modal
//!   motion, units, distance mode, spindle and tool
//! - **Auto-fixes**: spindle starts, rapid conversion, retracts, feed and
//!   soft-limit clamps, all marked with a `[safety-fix]` comment
//! - **Breakage learning**: reported failures tighten per tool/material limits
//!   that later programs are held to
//! - **File mode**: whole programs with stock detection, statistics and a
//!   summary header

pub use gcodeguard_core::{
    ConfigError, Error, MaterialCategory, MaterialId, Result, StoreError, ToolDescriptor,
    ToolTable, ToolType, Units,
};

pub use gcodeguard_gcode::{
    parse, FirstMatchTokenizer, Instruction, LineTokenizer, MachineState, MotionMode, Position,
};

pub use gcodeguard_settings::{
    Envelope, JsonFileStore, KeyValueStore, MemoryStore, RuleThresholds, SafetyConfig,
    SettingsError, StoreHandle,
};

pub use gcodeguard_safety::{
    BreakageCause, BreakageIncident, BreakageReport, FileReport, FileStatistics, Fix,
    FixDirective, LearnedPattern, LearningStore, ProcessResult, RuleEngine, SafetyEngine,
    SafetyListener, SafetyRule, SensorSnapshot, StockModel,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Output to stderr, so fixed programs can be piped from stdout
/// - RUST_LOG environment variable support
/// - INFO as the default level
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing::Level::INFO.to_string()));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    Ok(())
}
