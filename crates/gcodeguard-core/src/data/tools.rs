//! Tool descriptors and the per-connection tool table
//!
//! This module provides:
//! - Tool types used to group learned limits
//! - Tool geometry needed for chip-load estimates
//! - A table mapping T numbers to descriptors

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Tool types for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ToolType {
    /// Flat end mill
    EndMill,
    /// Ball end mill / ball nose
    BallNose,
    /// V-bit engraving tool
    VBit,
    /// Drill bit (twist drill)
    Drill,
    /// Fine engraving tool
    Engraver,
    /// Surfacing / fly cutter
    Surfacing,
    /// Anything else
    Other,
}

impl ToolType {
    /// Get all tool types
    pub fn all() -> &'static [ToolType] {
        &[
            ToolType::EndMill,
            ToolType::BallNose,
            ToolType::VBit,
            ToolType::Drill,
            ToolType::Engraver,
            ToolType::Surfacing,
            ToolType::Other,
        ]
    }

    /// Stable identifier used in pattern keys
    pub fn key_name(&self) -> &'static str {
        match self {
            Self::EndMill => "endmill",
            Self::BallNose => "ballnose",
            Self::VBit => "vbit",
            Self::Drill => "drill",
            Self::Engraver => "engraver",
            Self::Surfacing => "surfacing",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ToolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndMill => write!(f, "Flat End Mill"),
            Self::BallNose => write!(f, "Ball End Mill"),
            Self::VBit => write!(f, "V-Bit"),
            Self::Drill => write!(f, "Drill Bit"),
            Self::Engraver => write!(f, "Engraving Bit"),
            Self::Surfacing => write!(f, "Surfacing Bit"),
            Self::Other => write!(f, "Other"),
        }
    }
}

impl FromStr for ToolType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "endmill" | "flat" | "flatendmill" | "upcut" | "downcut" | "compression" => {
                Ok(Self::EndMill)
            }
            "ballnose" | "ball" | "ballendmill" => Ok(Self::BallNose),
            "vbit" | "vgroove" | "chamfer" => Ok(Self::VBit),
            "drill" | "drillbit" => Ok(Self::Drill),
            "engraver" | "engraving" | "engravingbit" => Ok(Self::Engraver),
            "surfacing" | "flycutter" | "spoilboard" => Ok(Self::Surfacing),
            "other" | "specialty" => Ok(Self::Other),
            _ => Err(format!("Unknown tool type: {}", s)),
        }
    }
}

/// Cutter geometry as far as the safety engine needs it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool type
    pub tool_type: ToolType,
    /// Cutting diameter in mm, if known
    #[serde(default)]
    pub diameter: Option<f64>,
    /// Number of flutes, if known
    #[serde(default)]
    pub flutes: Option<u32>,
}

impl ToolDescriptor {
    /// Create a descriptor with unknown geometry
    pub fn new(tool_type: ToolType) -> Self {
        Self {
            tool_type,
            diameter: None,
            flutes: None,
        }
    }

    /// Set the cutting diameter in mm
    pub fn with_diameter(mut self, diameter: f64) -> Self {
        self.diameter = Some(diameter);
        self
    }

    /// Set the flute count
    pub fn with_flutes(mut self, flutes: u32) -> Self {
        self.flutes = Some(flutes);
        self
    }

    /// Chip load (mm per tooth) for a feed/rpm pair, when the geometry allows it
    pub fn chip_load(&self, feed: f64, rpm: f64) -> Option<f64> {
        let flutes = self.flutes.filter(|&n| n > 0)?;
        if rpm <= 0.0 || feed <= 0.0 {
            return None;
        }
        Some(feed / (rpm * flutes as f64))
    }

    /// Get a descriptive string for the tool
    pub fn description_short(&self) -> String {
        match (self.diameter, self.flutes) {
            (Some(d), Some(n)) => format!("{} {}mm, {} flutes", self.tool_type, d, n),
            (Some(d), None) => format!("{} {}mm", self.tool_type, d),
            _ => self.tool_type.to_string(),
        }
    }
}

/// Tool table - maps T numbers to descriptors for one machine connection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolTable {
    tools: HashMap<u32, ToolDescriptor>,
    /// Used when the program never selects a numbered tool
    #[serde(default)]
    fallback: Option<ToolDescriptor>,
}

impl ToolTable {
    /// Create a new empty tool table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the descriptor for a tool number
    pub fn add_tool(&mut self, number: u32, tool: ToolDescriptor) {
        tracing::debug!("Tool T{} set to {}", number, tool.description_short());
        self.tools.insert(number, tool);
    }

    /// Set the descriptor used when no numbered tool applies
    pub fn set_fallback(&mut self, tool: Option<ToolDescriptor>) {
        self.fallback = tool;
    }

    /// Get a tool by number
    pub fn get_tool(&self, number: u32) -> Option<&ToolDescriptor> {
        self.tools.get(&number)
    }

    /// Resolve the descriptor for the active tool number
    pub fn resolve(&self, active: Option<u32>) -> Option<&ToolDescriptor> {
        active
            .and_then(|n| self.tools.get(&n))
            .or(self.fallback.as_ref())
    }

    /// Get the number of numbered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the table has no numbered tools
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
