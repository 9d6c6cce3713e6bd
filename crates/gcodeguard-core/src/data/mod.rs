//! Tool and material data
//!
//! Descriptors that identify the cutter and stock in use. Together they form
//! the key under which breakage history and learned limits are stored.

pub mod materials;
pub mod tools;
