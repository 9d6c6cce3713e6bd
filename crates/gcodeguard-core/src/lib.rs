//! # GCodeGuard Core
//!
//! Core types shared by every GCodeGuard crate:
//! - the error taxonomy used by configuration and persistence
//! - unit handling for G20/G21 programs
//! - tool and material descriptors used to key learned safety limits

pub mod data;
pub mod error;
pub mod units;

pub use data::{
    materials::{MaterialCategory, MaterialId},
    tools::{ToolDescriptor, ToolTable, ToolType},
};
pub use error::{ConfigError, Error, Result, StoreError};
pub use units::{Units, MM_PER_INCH};
