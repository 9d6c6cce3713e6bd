//! # GCodeGuard Safety
//!
//! Inspects every G-code line before it reaches the machine, corrects what it
//! safely can and learns tighter limits from reported tool breakage.
//!
//! This crate provides:
//! - An ordered battery of safety rules over parsed lines and machine state
//! - The fix synthesizer that composes rule output into corrected text
//! - The breakage learning store with exact and fallback pattern matching
//! - Stock detection from program comments
//! - The per-connection `SafetyEngine` that drives it all, line by line or
//!   over a whole file

pub mod engine;
pub mod fix;
pub mod learning;
pub mod listener;
pub mod rules;
pub mod stock;

pub use engine::{
    BreakageReport, FileReport, FileStatistics, LineWarning, ProcessResult, SafetyEngine,
};
pub use fix::{synthesize, Fix, FixDirective, FIX_MARKER};
pub use learning::{
    pattern_key, Adjustment, BreakageCause, BreakageIncident, IncidentContext, LearnedPattern,
    LearningDatabase, LearningStore, PatternMatch, SensorSnapshot,
};
pub use listener::{SafetyListener, SafetyListenerHandle, SafetyListenerRef};
pub use rules::{CheckContext, CheckResult, RuleEngine, RuleHandle, SafetyRule};
pub use stock::StockModel;
