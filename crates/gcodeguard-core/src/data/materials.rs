//! Material identifiers and categories
//!
//! Materials are free-form names ("hardwood", "Aluminum 6061") supplied by the
//! operator or scanned from program comments. They are normalised so that the
//! same stock always maps to the same learned pattern, and classified into a
//! broad category that drives the chip-load heuristics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Material categories for chip-load heuristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum MaterialCategory {
    /// Natural and engineered wood
    Wood,
    /// Plastics and foams
    Plastic,
    /// Non-ferrous metals (aluminum, brass, copper)
    NonFerrousMetal,
    /// Ferrous metals (steel, stainless)
    FerrousMetal,
    /// Composite materials (carbon fiber, fiberglass)
    Composite,
    /// Not recognised
    Unknown,
}

impl MaterialCategory {
    /// Recommended chip load range in mm/tooth for a cutter of `diameter` mm
    ///
    /// Ranges scale linearly with diameter and are deliberately wide; they flag
    /// gross rubbing or overload, not tuning opportunities.
    pub fn chip_load_range(&self, diameter: f64) -> (f64, f64) {
        let (min_per_mm, max_per_mm) = match self {
            Self::Wood => (0.004, 0.05),
            Self::Plastic => (0.004, 0.04),
            Self::NonFerrousMetal => (0.002, 0.015),
            Self::FerrousMetal => (0.001, 0.008),
            Self::Composite => (0.002, 0.02),
            Self::Unknown => (0.001, 0.05),
        };
        (min_per_mm * diameter, max_per_mm * diameter)
    }
}

impl fmt::Display for MaterialCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wood => write!(f, "Wood"),
            Self::Plastic => write!(f, "Plastic"),
            Self::NonFerrousMetal => write!(f, "Non-Ferrous Metal"),
            Self::FerrousMetal => write!(f, "Ferrous Metal"),
            Self::Composite => write!(f, "Composite"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Material identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub String);

impl MaterialId {
    /// Build an identifier from a free-form name
    ///
    /// Lowercases, trims and collapses whitespace/dashes into single underscores,
    /// so "Hard Wood" and "hard-wood" share one identifier.
    pub fn normalized(name: &str) -> Self {
        let mut id = String::with_capacity(name.len());
        let mut pending_sep = false;
        for ch in name.trim().chars() {
            if ch.is_whitespace() || ch == '-' || ch == '_' {
                pending_sep = !id.is_empty();
            } else {
                if pending_sep {
                    id.push('_');
                    pending_sep = false;
                }
                id.extend(ch.to_lowercase());
            }
        }
        if id.is_empty() {
            id.push_str("unknown");
        }
        Self(id)
    }

    /// Classify the material by keyword
    pub fn category(&self) -> MaterialCategory {
        const WOOD: &[&str] = &[
            "wood", "oak", "maple", "walnut", "cherry", "pine", "birch", "ply", "mdf", "hdf",
            "beech", "ash", "cedar", "bamboo",
        ];
        const PLASTIC: &[&str] = &[
            "acrylic", "pmma", "hdpe", "uhmw", "delrin", "acetal", "pvc", "abs", "nylon",
            "polycarbonate", "foam", "plastic",
        ];
        const NON_FERROUS: &[&str] = &["alu", "brass", "copper", "bronze", "zinc"];
        const FERROUS: &[&str] = &["steel", "stainless", "iron"];
        const COMPOSITE: &[&str] = &["carbon", "fiberglass", "g10", "fr4", "composite"];

        let name = self.0.as_str();
        let has = |words: &[&str]| words.iter().any(|w| name.contains(w));
        if has(FERROUS) {
            MaterialCategory::FerrousMetal
        } else if has(COMPOSITE) {
            MaterialCategory::Composite
        } else if has(NON_FERROUS) {
            MaterialCategory::NonFerrousMetal
        } else if has(PLASTIC) {
            MaterialCategory::Plastic
        } else if has(WOOD) {
            MaterialCategory::Wood
        } else {
            MaterialCategory::Unknown
        }
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MaterialId {
    fn from(name: &str) -> Self {
        Self::normalized(name)
    }
}
