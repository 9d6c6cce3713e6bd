//! Soft limits

use super::{round_down, round_up, CheckContext, CheckResult, SafetyRule};
use crate::fix::FixDirective;
use gcodeguard_gcode::{format_value, Axis};

/// Clamps axis targets to the machine envelope
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftLimitRule;

impl SafetyRule for SoftLimitRule {
    fn name(&self) -> &str {
        "soft_limits"
    }

    fn description(&self) -> &str {
        "Clamps X/Y/Z targets outside the machine envelope to the nearest bound"
    }

    fn check(&self, ctx: &CheckContext<'_>, result: &mut CheckResult) {
        if !ctx.state.is_positioning(ctx.instruction) {
            return;
        }

        let mut violated: Vec<String> = Vec::new();
        for axis in Axis::all() {
            let Some(value) = ctx.state.resolve_axis(ctx.instruction, axis) else {
                continue;
            };
            let Some(limits) = ctx.envelope().limits(axis.letter()) else {
                continue;
            };
            if limits.contains(value) {
                continue;
            }

            let clamped = limits.clamp(value);
            violated.push(format!(
                "{} ({} -> {})",
                axis,
                format_value(value),
                format_value(clamped)
            ));

            // Round toward the inside of the envelope
            let word = ctx.state.to_program_axis(ctx.instruction, axis, clamped);
            let word = if value > limits.max {
                round_down(word)
            } else {
                round_up(word)
            };
            result.fix(self.name(), FixDirective::SetAxis { axis, value: word });
        }

        if !violated.is_empty() {
            result.warn(format!(
                "Soft limit violation on {}; clamped to machine envelope",
                violated.join(", ")
            ));
        }
    }
}
