//! Learned limits per tool and material

use super::incident::BreakageIncident;
use chrono::{DateTime, Utc};
use gcodeguard_core::{MaterialId, ToolDescriptor, ToolType};
use gcodeguard_gcode::format_value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Share of the failing feed/depth kept as the new limit
pub const TIGHTEN_FACTOR: f64 = 0.7;
/// Spindle speed raise applied after a low-rpm failure
pub const RPM_RAISE_FACTOR: f64 = 1.3;

/// Pattern key for a tool and material: `<tool type>|<diameter>|<material>`
pub fn pattern_key(tool: &ToolDescriptor, material: &MaterialId) -> String {
    let diameter = tool
        .diameter
        .map(format_value)
        .unwrap_or_else(|| "unknown".to_string());
    format!("{}|{}|{}", tool.tool_type.key_name(), diameter, material)
}

/// Limits learned for one (tool type, diameter, material) combination
///
/// `None` means unbounded. Maxima only decrease and the minimum only
/// increases as incidents accumulate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedPattern {
    pub key: String,
    pub tool_type: ToolType,
    pub diameter: Option<f64>,
    pub material: MaterialId,
    /// mm/min
    pub max_safe_feed: Option<f64>,
    /// mm
    pub max_safe_depth: Option<f64>,
    /// 0 when no minimum has been learned
    pub min_safe_rpm: f64,
    pub incident_count: u32,
    pub last_updated: DateTime<Utc>,
}

impl LearnedPattern {
    /// Unbounded pattern for a tool and material
    pub fn new(tool: &ToolDescriptor, material: &MaterialId) -> Self {
        Self {
            key: pattern_key(tool, material),
            tool_type: tool.tool_type,
            diameter: tool.diameter,
            material: material.clone(),
            max_safe_feed: None,
            max_safe_depth: None,
            min_safe_rpm: 0.0,
            incident_count: 0,
            last_updated: Utc::now(),
        }
    }

    /// Tighten the limits with one incident
    pub fn tighten(&mut self, incident: &BreakageIncident, raise_rpm: bool) {
        if incident.feed > 0.0 {
            let limit = floor_to(incident.feed * TIGHTEN_FACTOR, 1.0);
            self.max_safe_feed = Some(self.max_safe_feed.map_or(limit, |f| f.min(limit)));
        }
        if incident.depth > 0.0 {
            let limit = floor_to(incident.depth * TIGHTEN_FACTOR, 0.01);
            self.max_safe_depth = Some(self.max_safe_depth.map_or(limit, |d| d.min(limit)));
        }
        if raise_rpm && incident.rpm > 0.0 {
            self.min_safe_rpm = self.min_safe_rpm.max((incident.rpm * RPM_RAISE_FACTOR - 1e-9).ceil());
        }
        self.incident_count += 1;
        self.last_updated = incident.timestamp.max(self.last_updated);
    }
}

/// Round down to a multiple of `step`, ignoring float noise below 1e-9
fn floor_to(value: f64, step: f64) -> f64 {
    ((value / step) + 1e-9).floor() / step.recip()
}

/// Persisted learning state: the incident log and the pattern table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningDatabase {
    #[serde(default)]
    pub incidents: Vec<BreakageIncident>,
    #[serde(default)]
    pub patterns: BTreeMap<String, LearnedPattern>,
}
