//! # GCodeGuard G-code
//!
//! Line parsing and modal state tracking for the safety engine.
//!
//! This crate provides:
//! - A tokenizer that turns one text line into semantic numeric fields
//! - The machine state tracker that follows position, feed, spindle and modal
//!   groups across the instruction stream

pub mod parser;
pub mod state;

pub use parser::{format_value, parse, FirstMatchTokenizer, Instruction, LineTokenizer, Word};
pub use state::{Axis, DistanceMode, MachineState, MotionMode, Position};
