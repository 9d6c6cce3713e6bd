//! Learned pattern guard

use super::{CheckContext, CheckResult, SafetyRule};
use crate::fix::FixDirective;
use crate::learning::PatternMatch;
use gcodeguard_gcode::format_value;

/// Applies limits learned from past breakages to cuts into material
#[derive(Debug, Clone, Copy, Default)]
pub struct LearnedPatternRule;

impl SafetyRule for LearnedPatternRule {
    fn name(&self) -> &str {
        "learned_pattern"
    }

    fn description(&self) -> &str {
        "Clamps feed and raises spindle speed to limits learned from tool breakage"
    }

    fn check(&self, ctx: &CheckContext<'_>, result: &mut CheckResult) {
        // A low rapid is held to the same limits as the cut it becomes
        let converted = ctx.rapid_conversion_feed();
        if !ctx.is_cutting_move() && converted.is_none() {
            return;
        }
        let target = ctx.target();
        if !ctx.stock.is_in_material(target.z) {
            return;
        }

        let depth = ctx.stock.depth_at(target.z);
        let feed = converted
            .or_else(|| ctx.resolved_feed())
            .unwrap_or(ctx.envelope().default_feed);
        let rpm = ctx.instruction.s.unwrap_or(ctx.state.spindle_rpm);

        let adjustment = ctx.learning.check(ctx.tool, ctx.material, feed, depth, rpm);
        if !adjustment.is_needed() {
            return;
        }

        let source = match &adjustment.matched {
            PatternMatch::Exact { key } => format!("learned for {}", key),
            PatternMatch::Fallback { keys } => {
                format!("borrowed from {} related pattern(s)", keys.len())
            }
            PatternMatch::None => "learned".to_string(),
        };

        if let Some(limit) = adjustment.max_feed {
            result.warn(format!(
                "Feed F{} exceeds safe feed F{} ({}); clamping",
                format_value(feed),
                format_value(limit),
                source
            ));
            result.fix(
                self.name(),
                FixDirective::SetFeed {
                    value: ctx.feed_word(limit),
                },
            );
        }

        if let Some(min_rpm) = adjustment.min_rpm {
            result.warn(format!(
                "Spindle speed S{} below safe minimum S{} ({}); raising",
                format_value(rpm),
                format_value(min_rpm),
                source
            ));
            // A speed word on the line itself would cancel a prepended one
            let directive = if ctx.instruction.s.is_some() {
                FixDirective::SetSpindle { value: min_rpm }
            } else {
                FixDirective::PrependLine {
                    line: format!("S{}", format_value(min_rpm)),
                }
            };
            result.fix(self.name(), directive);
        }

        if let Some(limit) = adjustment.max_depth {
            result.warn(format!(
                "Depth of cut {} mm exceeds safe depth {} mm ({})",
                format_value(depth),
                format_value(limit),
                source
            ));
        }
    }
}
