//! Safety rules
//!
//! Each rule inspects one parsed line against the machine state as it was
//! before that line, and reports warnings, fix directives or a block verdict
//! into a shared [`CheckResult`]. Rules never mutate state and never see each
//! other's fixes; composition is the synthesizer's job.
//!
//! [`RuleEngine::standard`] registers the built-in battery in its required
//! order:
//!
//! 1. spindle before cut
//! 2. dangerous rapid
//! 3. plunge shape
//! 4. feed bounds
//! 5. soft limits
//! 6. arc validity
//! 7. tool change guard
//! 8. long rapid in material
//! 9. learned pattern guard

mod arc;
mod envelope;
mod learned;
mod motion;
mod tool_change;

pub use arc::ArcValidityRule;
pub use envelope::SoftLimitRule;
pub use learned::LearnedPatternRule;
pub use motion::{DangerousRapidRule, FeedBoundsRule, PlungeShapeRule, SpindleBeforeCutRule};
pub use tool_change::{LongRapidRule, ToolChangeRule};

use crate::fix::{Fix, FixDirective};
use crate::learning::LearningStore;
use crate::stock::StockModel;
use gcodeguard_core::{MaterialId, ToolDescriptor};
use gcodeguard_gcode::{format_value, DistanceMode, Instruction, MachineState, MotionMode, Position};
use gcodeguard_settings::{Envelope, RuleThresholds, SafetyConfig};
use std::sync::Arc;

/// Everything a rule may look at for one line
pub struct CheckContext<'a> {
    pub instruction: &'a Instruction,
    /// State before the line executes
    pub state: &'a MachineState,
    pub config: &'a SafetyConfig,
    pub stock: &'a StockModel,
    pub learning: &'a LearningStore,
    pub tool: &'a ToolDescriptor,
    pub material: &'a MaterialId,
}

impl<'a> CheckContext<'a> {
    pub fn envelope(&self) -> &Envelope {
        &self.config.envelope
    }

    pub fn thresholds(&self) -> &RuleThresholds {
        &self.config.thresholds
    }

    /// Motion the line will execute, modal motion included
    pub fn motion(&self) -> Option<MotionMode> {
        self.state.motion_for(self.instruction)
    }

    /// Whether the line is a fed move (G1/G2/G3)
    pub fn is_cutting_move(&self) -> bool {
        self.motion().is_some_and(MotionMode::is_feed_move)
    }

    pub fn is_rapid(&self) -> bool {
        self.motion() == Some(MotionMode::Rapid)
    }

    /// Endpoint in mm
    pub fn target(&self) -> Position {
        self.state.target(self.instruction)
    }

    /// Feed in mm/min, `None` when neither the line nor the state sets one
    pub fn resolved_feed(&self) -> Option<f64> {
        self.state.resolved_feed(self.instruction)
    }

    /// Whether the move changes X or Y
    pub fn moves_xy(&self) -> bool {
        let target = self.target();
        target.x != self.state.position.x || target.y != self.state.position.y
    }

    /// Feed limit for the move's class (Z-only moves use the Z limit)
    pub fn feed_limit(&self) -> f64 {
        if self.instruction.has_xy() {
            self.envelope().max_feed_xy
        } else {
            self.envelope().max_feed_z
        }
    }

    /// Highest feed a steep ramp may run at
    pub fn plunge_feed_cap(&self) -> f64 {
        self.envelope().max_feed_z * 0.5
    }

    /// Whether the move ramps down steeply while also moving in XY
    pub fn is_steep_ramp(&self) -> bool {
        let drop = self.state.position.z - self.target().z;
        drop > self.thresholds().steep_ramp_depth && self.moves_xy()
    }

    /// A millimetre feed expressed in the line's units
    ///
    /// Rounded down to the output precision so the written feed never
    /// exceeds the limit it was derived from.
    pub fn feed_word(&self, feed_mm: f64) -> f64 {
        round_down(self.state.to_program_feed(self.instruction, feed_mm))
    }

    /// Whether a retract may be inserted ahead of this line
    ///
    /// Under G91 an inserted move shifts every later relative Z word, so
    /// retracts are only reported there.
    pub fn can_retract(&self) -> bool {
        self.state.distance_mode == DistanceMode::Absolute
    }

    /// Whether an XY rapid starts inside material and gets a retract first
    pub fn rapid_retracts(&self) -> bool {
        self.is_rapid()
            && self.instruction.has_xy()
            && self.state.position.z < 0.0
            && self.can_retract()
    }

    /// Feed a rapid ending below the rapid floor is converted to
    ///
    /// `None` when the line stays a rapid. A rapid that gets a retract is
    /// measured from the retract height.
    pub fn rapid_conversion_feed(&self) -> Option<f64> {
        if !self.is_rapid() || self.instruction.z.is_none() {
            return None;
        }
        let target = self.target();
        if target.z >= self.envelope().max_rapid_z {
            return None;
        }
        let start_z = if self.rapid_retracts() {
            self.envelope().safe_z
        } else {
            self.state.position.z
        };
        let steep = start_z - target.z > self.thresholds().steep_ramp_depth && self.moves_xy();
        Some(if steep {
            self.plunge_feed_cap()
        } else {
            self.envelope().max_feed_z
        })
    }

    /// Absolute rapid to `height_mm` in the current units
    pub fn retract_line(&self, height_mm: f64) -> String {
        format!("G0 Z{}", format_value(self.state.units.from_mm(height_mm)))
    }

    /// Spindle-on line at the current or default speed
    pub fn spindle_on_line(&self) -> String {
        let rpm = if self.state.spindle_rpm > 0.0 {
            self.state.spindle_rpm
        } else {
            self.config.spindle.default_rpm
        };
        format!("M3 S{}", format_value(rpm))
    }
}

/// Round down to four decimals, the precision of written words
pub(crate) fn round_down(value: f64) -> f64 {
    (value * 10_000.0 + 1e-6).floor() / 10_000.0
}

/// Round up to four decimals
pub(crate) fn round_up(value: f64) -> f64 {
    (value * 10_000.0 - 1e-6).ceil() / 10_000.0
}

/// Output of the rule battery for one line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckResult {
    pub warnings: Vec<String>,
    pub fixes: Vec<Fix>,
    pub blocked: bool,
}

impl CheckResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn fix(&mut self, rule: &str, directive: FixDirective) {
        self.fixes.push(Fix::new(rule, directive));
    }

    /// Refuse the line; it must not be transmitted
    pub fn block(&mut self, message: impl Into<String>) {
        self.blocked = true;
        self.warnings.push(message.into());
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.fixes.is_empty() && !self.blocked
    }
}

/// A single safety check
pub trait SafetyRule: Send + Sync {
    /// Get the name/identifier of this rule
    fn name(&self) -> &str;

    /// Get a description of what this rule checks
    fn description(&self) -> &str;

    /// Inspect one line, adding findings to `result`
    fn check(&self, ctx: &CheckContext<'_>, result: &mut CheckResult);

    /// Check if this rule is enabled
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Arc-wrapped rule for thread-safe sharing
pub type RuleHandle = Arc<dyn SafetyRule>;

/// Ordered rule battery
#[derive(Clone)]
pub struct RuleEngine {
    rules: Vec<RuleHandle>,
}

impl RuleEngine {
    /// Create an engine with no rules
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create an engine with the built-in rules in their required order
    pub fn standard() -> Self {
        let mut engine = Self::new();
        engine
            .register(Arc::new(SpindleBeforeCutRule))
            .register(Arc::new(DangerousRapidRule))
            .register(Arc::new(PlungeShapeRule))
            .register(Arc::new(FeedBoundsRule))
            .register(Arc::new(SoftLimitRule))
            .register(Arc::new(ArcValidityRule))
            .register(Arc::new(ToolChangeRule))
            .register(Arc::new(LongRapidRule))
            .register(Arc::new(LearnedPatternRule));
        engine
    }

    /// Register a rule; rules run in registration order
    pub fn register(&mut self, rule: RuleHandle) -> &mut Self {
        self.rules.push(rule);
        self
    }

    /// Run every enabled rule over one line
    pub fn check(&self, ctx: &CheckContext<'_>) -> CheckResult {
        let mut result = CheckResult::new();
        if ctx.instruction.is_empty() {
            return result;
        }
        for rule in self.rules.iter().filter(|r| r.is_enabled()) {
            rule.check(ctx, &mut result);
        }
        result
    }

    /// Names of registered rules, in order
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules", &self.rule_names())
            .finish()
    }
}
