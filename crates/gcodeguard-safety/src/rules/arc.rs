//! Arc validity

use super::{CheckContext, CheckResult, SafetyRule};
use crate::fix::FixDirective;
use gcodeguard_gcode::format_value;

/// Blocks arcs that cannot be executed and drops conflicting radius words
#[derive(Debug, Clone, Copy, Default)]
pub struct ArcValidityRule;

impl SafetyRule for ArcValidityRule {
    fn name(&self) -> &str {
        "arc_validity"
    }

    fn description(&self) -> &str {
        "Blocks arcs without endpoint or geometry and checks endpoint consistency"
    }

    fn check(&self, ctx: &CheckContext<'_>, result: &mut CheckResult) {
        let Some(motion) = ctx.motion().filter(|m| m.is_arc()) else {
            return;
        };
        let instruction = ctx.instruction;

        if !instruction.has_xy() {
            result.block(format!("BLOCKED: {} arc has no X/Y endpoint", motion.gcode()));
            return;
        }

        let has_radius = instruction.r.is_some();
        let has_center = instruction.has_center_offset();
        match (has_radius, has_center) {
            (false, false) => {
                result.block(format!(
                    "BLOCKED: {} arc has neither R nor I/J",
                    motion.gcode()
                ));
                return;
            }
            (true, true) => {
                result.warn(format!(
                    "{} arc has both R and I/J; dropping R",
                    motion.gcode()
                ));
                result.fix(self.name(), FixDirective::RemoveToken { letter: 'R' });
            }
            _ => {}
        }

        let units = ctx.state.units_for(instruction);
        let start = ctx.state.position;
        let end = ctx.target();
        let tolerance = ctx.thresholds().arc_tolerance;

        if has_center {
            let cx = start.x + units.to_mm(instruction.i.unwrap_or(0.0));
            let cy = start.y + units.to_mm(instruction.j.unwrap_or(0.0));
            let start_radius = (start.x - cx).hypot(start.y - cy);
            let end_radius = (end.x - cx).hypot(end.y - cy);
            let error = (start_radius - end_radius).abs();
            if error > tolerance {
                result.warn(format!(
                    "{} arc endpoint is {} mm off the circle",
                    motion.gcode(),
                    format_value(error)
                ));
            }
        } else if let Some(r) = instruction.r {
            let radius = units.to_mm(r).abs();
            let chord = start.distance_xy(&end);
            if chord > 2.0 * radius + tolerance {
                result.warn(format!(
                    "{} arc radius {} mm cannot reach endpoint {} mm away",
                    motion.gcode(),
                    format_value(radius),
                    format_value(chord)
                ));
            }
        }
    }
}
