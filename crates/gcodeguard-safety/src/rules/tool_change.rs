//! Tool change and long traverse checks

use super::{CheckContext, CheckResult, SafetyRule};
use crate::fix::FixDirective;
use gcodeguard_gcode::format_value;

/// Retracts and stops the spindle before a tool change
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolChangeRule;

impl ToolChangeRule {
    fn is_tool_change(ctx: &CheckContext<'_>) -> bool {
        let instruction = ctx.instruction;
        let bare_t = instruction.t.is_some()
            && instruction.g.is_none()
            && instruction.m.is_none()
            && !instruction.has_axis();
        instruction.m == Some(6.0) || bare_t
    }
}

impl SafetyRule for ToolChangeRule {
    fn name(&self) -> &str {
        "tool_change"
    }

    fn description(&self) -> &str {
        "Retracts to the tool change height and stops the spindle before M6/T"
    }

    fn check(&self, ctx: &CheckContext<'_>, result: &mut CheckResult) {
        if !Self::is_tool_change(ctx) {
            return;
        }
        let retract_z = ctx.envelope().retract_z;

        if ctx.state.position.z < retract_z && !ctx.can_retract() {
            result.warn(format!(
                "Tool change at Z{} below retract height Z{}; relative mode, retract before the change",
                format_value(ctx.state.position.z),
                format_value(retract_z)
            ));
        } else if ctx.state.position.z < retract_z {
            result.warn(format!(
                "Tool change at Z{} below retract height Z{}; retracting",
                format_value(ctx.state.position.z),
                format_value(retract_z)
            ));
            result.fix(
                self.name(),
                FixDirective::PrependLine {
                    line: ctx.retract_line(retract_z),
                },
            );
        }

        if ctx.state.spindle_on {
            result.warn("Tool change with spindle running; stopping spindle");
            result.fix(
                self.name(),
                FixDirective::PrependLine {
                    line: "M5".to_string(),
                },
            );
        }
    }
}

/// Long rapid traverses while the tool is below the surface
#[derive(Debug, Clone, Copy, Default)]
pub struct LongRapidRule;

impl SafetyRule for LongRapidRule {
    fn name(&self) -> &str {
        "long_rapid"
    }

    fn description(&self) -> &str {
        "Retracts before long XY rapids that start below Z0"
    }

    fn check(&self, ctx: &CheckContext<'_>, result: &mut CheckResult) {
        let instruction = ctx.instruction;
        if !ctx.is_rapid() || instruction.z.is_some() || !instruction.has_xy() {
            return;
        }
        if ctx.state.position.z >= 0.0 {
            return;
        }

        let distance = ctx.state.position.distance_xy(&ctx.target());
        let threshold = ctx.thresholds().long_rapid_distance;
        if distance > threshold && !ctx.can_retract() {
            result.warn(format!(
                "Rapid of {} mm inside material exceeds {} mm; relative mode, retract before this move",
                format_value(distance),
                format_value(threshold)
            ));
        } else if distance > threshold {
            let safe_z = ctx.envelope().safe_z;
            result.warn(format!(
                "Rapid of {} mm inside material exceeds {} mm; retracting to Z{}",
                format_value(distance),
                format_value(threshold),
                format_value(safe_z)
            ));
            result.fix(
                self.name(),
                FixDirective::PrependLine {
                    line: ctx.retract_line(safe_z),
                },
            );
        }
    }
}
