//! Breakage incidents and cause inference

use chrono::{DateTime, Utc};
use gcodeguard_core::{MaterialId, ToolDescriptor};
use gcodeguard_gcode::Position;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Feed (mm/min) above which any breakage is attributed to feed alone
pub const FEED_CEILING: f64 = 5000.0;
/// Spindle speed below which high feeds are suspicious
pub const LOW_RPM: f64 = 10000.0;
/// Feed above which a low spindle speed is suspicious
pub const HIGH_FEED: f64 = 2000.0;
/// Depth (mm) treated as a deep single pass when the diameter is unknown
pub const DEEP_PASS_DEPTH: f64 = 3.0;
/// Chatter score (0-100) above which chatter is a cause
pub const CHATTER_THRESHOLD: f64 = 70.0;
/// Spindle load (percent of rated) above which overload is a cause
pub const OVERLOAD_PERCENT: f64 = 90.0;

/// Readings from external sensors at the time of the failure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// Vibration-derived chatter score, 0-100
    #[serde(default)]
    pub chatter_score: Option<f64>,
    /// Spindle drive load in percent of rated
    #[serde(default)]
    pub spindle_load: Option<f64>,
    /// Spindle drive output current
    #[serde(default)]
    pub output_amps: Option<f64>,
    /// Drive fault code, when the VFD reported one
    #[serde(default)]
    pub fault_code: Option<u32>,
}

/// Probable cause of a breakage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum BreakageCause {
    /// Chip load above the material's range
    ChipLoadHigh { chip_load: f64, max: f64 },
    /// Chip load below the material's range (rubbing, heat)
    ChipLoadLow { chip_load: f64, min: f64 },
    /// Feed above the absolute ceiling
    FeedAboveCeiling,
    /// Low spindle speed combined with a high feed
    LowRpmHighFeed,
    /// Too deep for one pass
    DeepSinglePass,
    /// Chatter reported by the vibration sensor
    ChatterDetected { score: f64 },
    /// Spindle drive overloaded
    SpindleOverload { load: f64 },
    /// Spindle drive reported a fault
    DriveFault { code: u32 },
}

impl fmt::Display for BreakageCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChipLoadHigh { chip_load, max } => {
                write!(f, "chip load {:.4} mm/tooth above {:.4}", chip_load, max)
            }
            Self::ChipLoadLow { chip_load, min } => {
                write!(f, "chip load {:.4} mm/tooth below {:.4}", chip_load, min)
            }
            Self::FeedAboveCeiling => write!(f, "feed above {} mm/min", FEED_CEILING),
            Self::LowRpmHighFeed => write!(f, "low spindle speed with high feed"),
            Self::DeepSinglePass => write!(f, "deep single pass"),
            Self::ChatterDetected { score } => write!(f, "chatter detected (score {})", score),
            Self::SpindleOverload { load } => write!(f, "spindle overload ({}%)", load),
            Self::DriveFault { code } => write!(f, "spindle drive fault {}", code),
        }
    }
}

/// Everything known about a failure, resolved against machine state
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentContext {
    pub position: Position,
    /// mm/min
    pub feed: f64,
    pub rpm: f64,
    /// Depth of cut (mm)
    pub depth: f64,
    pub tool: ToolDescriptor,
    pub material: MaterialId,
    pub notes: String,
    pub sensors: Option<SensorSnapshot>,
}

/// A recorded tool failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakageIncident {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub position: Position,
    pub feed: f64,
    pub rpm: f64,
    pub depth: f64,
    pub tool: ToolDescriptor,
    pub material: MaterialId,
    pub causes: Vec<BreakageCause>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub sensors: Option<SensorSnapshot>,
}

impl BreakageIncident {
    /// Build an incident from its context, inferring causes
    pub fn from_context(context: IncidentContext) -> Self {
        let causes = infer_causes(&context);
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            position: context.position,
            feed: context.feed,
            rpm: context.rpm,
            depth: context.depth,
            tool: context.tool,
            material: context.material,
            causes,
            notes: context.notes,
            sensors: context.sensors,
        }
    }

    pub fn has_cause(&self, predicate: impl Fn(&BreakageCause) -> bool) -> bool {
        self.causes.iter().any(predicate)
    }
}

/// Heuristic cause analysis
pub fn infer_causes(context: &IncidentContext) -> Vec<BreakageCause> {
    let mut causes = Vec::new();

    if let (Some(chip_load), Some(diameter)) = (
        context.tool.chip_load(context.feed, context.rpm),
        context.tool.diameter,
    ) {
        let (min, max) = context.material.category().chip_load_range(diameter);
        if chip_load > max {
            causes.push(BreakageCause::ChipLoadHigh { chip_load, max });
        } else if chip_load < min {
            causes.push(BreakageCause::ChipLoadLow { chip_load, min });
        }
    }

    if context.feed > FEED_CEILING {
        causes.push(BreakageCause::FeedAboveCeiling);
    }

    if context.rpm < LOW_RPM && context.feed > HIGH_FEED {
        causes.push(BreakageCause::LowRpmHighFeed);
    }

    let deep_limit = context.tool.diameter.unwrap_or(DEEP_PASS_DEPTH);
    if context.depth > deep_limit {
        causes.push(BreakageCause::DeepSinglePass);
    }

    if let Some(sensors) = &context.sensors {
        if let Some(score) = sensors.chatter_score.filter(|s| *s > CHATTER_THRESHOLD) {
            causes.push(BreakageCause::ChatterDetected { score });
        }
        if let Some(load) = sensors.spindle_load.filter(|l| *l > OVERLOAD_PERCENT) {
            causes.push(BreakageCause::SpindleOverload { load });
        }
        if let Some(code) = sensors.fault_code.filter(|c| *c != 0) {
            causes.push(BreakageCause::DriveFault { code });
        }
    }

    causes
}
