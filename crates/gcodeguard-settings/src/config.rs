//! Safety configuration
//!
//! The machine envelope and rule thresholds the safety engine checks against.
//! Values are plain bounded numbers in millimetres and mm/min; they are read
//! only during a run.

use crate::error::{SettingsError, SettingsResult};
use gcodeguard_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Slack allowed on travel limits (mm)
const LIMIT_EPSILON: f64 = 1e-6;

/// Travel limits for one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisLimits {
    pub min: f64,
    pub max: f64,
}

impl AxisLimits {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `value` lies within the travel
    pub fn contains(&self, value: f64) -> bool {
        // Relative words accumulate float error; ignore it
        value >= self.min - LIMIT_EPSILON && value <= self.max + LIMIT_EPSILON
    }

    /// Nearest in-travel value
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

/// Machine envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Envelope {
    pub x: AxisLimits,
    pub y: AxisLimits,
    pub z: AxisLimits,
    /// Maximum feed for moves with an XY component (mm/min)
    pub max_feed_xy: f64,
    /// Maximum feed for Z-only moves (mm/min)
    pub max_feed_z: f64,
    /// Feed appended to cutting moves that have none (mm/min)
    pub default_feed: f64,
    /// Height for retracts before traverses
    pub safe_z: f64,
    /// Height required before a tool change
    pub retract_z: f64,
    /// Rapids must not end below this height
    pub max_rapid_z: f64,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            x: AxisLimits::new(0.0, 350.0),
            y: AxisLimits::new(0.0, 350.0),
            z: AxisLimits::new(-60.0, 50.0),
            max_feed_xy: 5000.0,
            max_feed_z: 1000.0,
            default_feed: 1000.0,
            safe_z: 5.0,
            retract_z: 10.0,
            max_rapid_z: 2.0,
        }
    }
}

impl Envelope {
    /// Limits for an axis letter
    pub fn limits(&self, axis: char) -> Option<&AxisLimits> {
        match axis.to_ascii_uppercase() {
            'X' => Some(&self.x),
            'Y' => Some(&self.y),
            'Z' => Some(&self.z),
            _ => None,
        }
    }

    /// Validate the envelope
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (axis, limits) in [('X', &self.x), ('Y', &self.y), ('Z', &self.z)] {
            if !(limits.min < limits.max) {
                return Err(ConfigError::InvalidAxisLimits {
                    axis,
                    min: limits.min,
                    max: limits.max,
                });
            }
        }

        positive("max_feed_xy", self.max_feed_xy)?;
        positive("max_feed_z", self.max_feed_z)?;
        positive("default_feed", self.default_feed)?;

        if self.default_feed > self.max_feed_xy {
            return Err(ConfigError::OutOfRange {
                field: "default_feed".to_string(),
                value: self.default_feed,
                reason: format!("exceeds max_feed_xy {}", self.max_feed_xy),
            });
        }

        for (field, value) in [
            ("safe_z", self.safe_z),
            ("retract_z", self.retract_z),
            ("max_rapid_z", self.max_rapid_z),
        ] {
            if !self.z.contains(value) {
                return Err(ConfigError::OutOfRange {
                    field: field.to_string(),
                    value,
                    reason: format!("outside Z travel {}..{}", self.z.min, self.z.max),
                });
            }
        }

        Ok(())
    }
}

/// Constants used by the rule heuristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    /// Z drop (mm) above which a ramping feed move counts as steep
    pub steep_ramp_depth: f64,
    /// Z drop (mm) above which a straight plunge is reported
    pub straight_plunge_depth: f64,
    /// XY travel (mm) above which a rapid inside material is forced to retract
    pub long_rapid_distance: f64,
    /// Allowed mismatch (mm) between start and end radius of an arc
    pub arc_tolerance: f64,
    /// Widening applied to limits borrowed from other materials
    pub fallback_margin: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            steep_ramp_depth: 3.0,
            straight_plunge_depth: 1.0,
            long_rapid_distance: 50.0,
            arc_tolerance: 0.05,
            fallback_margin: 1.2,
        }
    }
}

/// Spindle settings used by synthesised commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpindleDefaults {
    /// Speed for an inserted spindle-on line
    pub default_rpm: f64,
}

impl Default for SpindleDefaults {
    fn default() -> Self {
        Self {
            default_rpm: 12000.0,
        }
    }
}

/// Learning database settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningSettings {
    /// Most recent incidents kept in the log
    pub max_incidents: usize,
}

impl Default for LearningSettings {
    fn default() -> Self {
        Self { max_incidents: 500 }
    }
}

/// Complete safety configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Master switch; a disabled engine passes lines through untouched
    pub enabled: bool,
    /// Apply fixes; when false, problems are only reported
    pub auto_fix: bool,
    pub envelope: Envelope,
    pub thresholds: RuleThresholds,
    pub spindle: SpindleDefaults,
    pub learning: LearningSettings,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_fix: true,
            envelope: Envelope::default(),
            thresholds: RuleThresholds::default(),
            spindle: SpindleDefaults::default(),
            learning: LearningSettings::default(),
        }
    }
}

impl SafetyConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = match extension(path)? {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded safety config from {}", path.display());
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match extension(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, content).map_err(|e| {
            SettingsError::SaveError(format!("{}: {}", path.display(), e))
        })?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.envelope.validate()?;

        positive("steep_ramp_depth", self.thresholds.steep_ramp_depth)?;
        positive("straight_plunge_depth", self.thresholds.straight_plunge_depth)?;
        positive("long_rapid_distance", self.thresholds.long_rapid_distance)?;
        positive("arc_tolerance", self.thresholds.arc_tolerance)?;
        if self.thresholds.fallback_margin < 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "fallback_margin".to_string(),
                value: self.thresholds.fallback_margin,
                reason: "must be at least 1.0".to_string(),
            });
        }

        positive("default_rpm", self.spindle.default_rpm)?;
        positive("max_incidents", self.learning.max_incidents as f64)?;
        Ok(())
    }
}

enum Format {
    Json,
    Toml,
}

fn extension(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive {
            field: field.to_string(),
            value,
        })
    }
}
