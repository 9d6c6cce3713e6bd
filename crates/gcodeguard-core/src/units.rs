//! Unit conversion utilities
//!
//! Programs may run in millimetres (G21) or inches (G20). All safety checks
//! work in millimetres; corrective values are converted back to the program's
//! active units before they are written into the output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Millimetres per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Program units mode (modal group 6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// G21
    #[default]
    Millimeters,
    /// G20
    Inches,
}

impl Units {
    /// Map a G word to a units mode, if it is one
    pub fn from_gcode(code: f64) -> Option<Self> {
        if code == 20.0 {
            Some(Self::Inches)
        } else if code == 21.0 {
            Some(Self::Millimeters)
        } else {
            None
        }
    }

    /// Scale factor from program units to millimetres
    pub fn scale(self) -> f64 {
        match self {
            Self::Millimeters => 1.0,
            Self::Inches => MM_PER_INCH,
        }
    }

    /// Convert a program-unit value to millimetres
    pub fn to_mm(self, value: f64) -> f64 {
        value * self.scale()
    }

    /// Convert a millimetre value to program units
    pub fn from_mm(self, value: f64) -> f64 {
        value / self.scale()
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Millimeters => write!(f, "mm"),
            Self::Inches => write!(f, "in"),
        }
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mm" | "metric" | "g21" => Ok(Self::Millimeters),
            "in" | "inch" | "inches" | "g20" => Ok(Self::Inches),
            _ => Err(format!("Unknown units: {}", s)),
        }
    }
}
