//! Spindle, rapid, plunge and feed checks

use super::{CheckContext, CheckResult, SafetyRule};
use crate::fix::FixDirective;
use gcodeguard_gcode::format_value;

/// Starts the spindle before a fed move descends into material
#[derive(Debug, Clone, Copy, Default)]
pub struct SpindleBeforeCutRule;

impl SafetyRule for SpindleBeforeCutRule {
    fn name(&self) -> &str {
        "spindle_before_cut"
    }

    fn description(&self) -> &str {
        "Starts the spindle before a cutting move enters material"
    }

    fn check(&self, ctx: &CheckContext<'_>, result: &mut CheckResult) {
        if !ctx.is_cutting_move() || ctx.state.spindle_on {
            return;
        }
        if matches!(ctx.instruction.m, Some(m) if m == 3.0 || m == 4.0) {
            return;
        }

        let target = ctx.target();
        if target.z < ctx.state.position.z && ctx.stock.is_in_material(target.z) {
            result.warn(format!(
                "Cutting move to Z{} with spindle off; starting spindle",
                format_value(target.z)
            ));
            result.fix(
                self.name(),
                FixDirective::PrependLine {
                    line: ctx.spindle_on_line(),
                },
            );
        }
    }
}

/// Rapids that end low or travel inside material
#[derive(Debug, Clone, Copy, Default)]
pub struct DangerousRapidRule;

impl SafetyRule for DangerousRapidRule {
    fn name(&self) -> &str {
        "dangerous_rapid"
    }

    fn description(&self) -> &str {
        "Converts low rapids to controlled feeds and retracts before rapid traverses in material"
    }

    fn check(&self, ctx: &CheckContext<'_>, result: &mut CheckResult) {
        if !ctx.is_rapid() {
            return;
        }
        let envelope = ctx.envelope();
        let target = ctx.target();
        let retract = ctx.rapid_retracts();
        // The move starts from the retract height when one is inserted
        let start_z = if retract {
            envelope.safe_z
        } else {
            ctx.state.position.z
        };

        if ctx.instruction.has_xy() && ctx.state.position.z < 0.0 && !retract {
            result.warn(format!(
                "Rapid XY move at Z{} is dangerous; relative mode, retract before this move",
                format_value(ctx.state.position.z)
            ));
        }
        if retract {
            result.warn(format!(
                "Rapid XY move at Z{} is dangerous; retracting to Z{} first",
                format_value(ctx.state.position.z),
                format_value(envelope.safe_z)
            ));
            result.fix(
                self.name(),
                FixDirective::PrependLine {
                    line: ctx.retract_line(envelope.safe_z),
                },
            );
        }

        if let Some(feed) = ctx.rapid_conversion_feed() {
            result.warn(format!(
                "Rapid to Z{} below Z{} is dangerous; converting to G1 F{}",
                format_value(target.z),
                format_value(envelope.max_rapid_z),
                format_value(feed)
            ));
            result.fix(
                self.name(),
                FixDirective::ReplaceToken {
                    letter: 'G',
                    from: 0.0,
                    to: 1.0,
                },
            );
            result.fix(
                self.name(),
                FixDirective::SetFeed {
                    value: ctx.feed_word(feed),
                },
            );

            // The converted move now cuts; it needs the spindle too
            if !ctx.state.spindle_on && target.z < start_z && ctx.stock.is_in_material(target.z)
            {
                result.warn("Converted rapid enters material with spindle off; starting spindle");
                result.fix(
                    self.name(),
                    FixDirective::PrependLine {
                        line: ctx.spindle_on_line(),
                    },
                );
            }
        }
    }
}

/// Steep ramps and straight plunges
#[derive(Debug, Clone, Copy, Default)]
pub struct PlungeShapeRule;

impl SafetyRule for PlungeShapeRule {
    fn name(&self) -> &str {
        "plunge_shape"
    }

    fn description(&self) -> &str {
        "Caps the feed of steep ramping moves and reports deep straight plunges"
    }

    fn check(&self, ctx: &CheckContext<'_>, result: &mut CheckResult) {
        if !ctx.is_cutting_move() {
            return;
        }
        let drop = ctx.state.position.z - ctx.target().z;
        if drop <= 0.0 {
            return;
        }

        if ctx.moves_xy() {
            if !ctx.is_steep_ramp() {
                return;
            }
            let feed = ctx
                .resolved_feed()
                .unwrap_or(ctx.envelope().default_feed);
            let cap = ctx.plunge_feed_cap();
            if feed > cap {
                result.warn(format!(
                    "Steep ramp of {} mm at F{}; capping feed to F{}",
                    format_value(drop),
                    format_value(feed),
                    format_value(cap)
                ));
                result.fix(
                    self.name(),
                    FixDirective::SetFeed {
                        value: ctx.feed_word(cap),
                    },
                );
            }
        } else if drop > ctx.thresholds().straight_plunge_depth {
            result.warn(format!(
                "Straight plunge of {} mm; consider ramping or pecking",
                format_value(drop)
            ));
        }
    }
}

/// Missing and excessive feed rates
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedBoundsRule;

impl SafetyRule for FeedBoundsRule {
    fn name(&self) -> &str {
        "feed_bounds"
    }

    fn description(&self) -> &str {
        "Supplies a default feed to cutting moves without one and clamps feeds to the machine limit"
    }

    fn check(&self, ctx: &CheckContext<'_>, result: &mut CheckResult) {
        if !ctx.is_cutting_move() {
            return;
        }
        let limit = ctx.feed_limit();

        match ctx.resolved_feed() {
            None => {
                let feed = ctx.envelope().default_feed.min(limit);
                result.warn(format!(
                    "Cutting move without feed rate; using F{}",
                    format_value(feed)
                ));
                result.fix(
                    self.name(),
                    FixDirective::AppendToken {
                        letter: 'F',
                        value: ctx.feed_word(feed),
                    },
                );
            }
            Some(feed) if feed > limit => {
                result.warn(format!(
                    "Feed F{} exceeds machine limit F{}; clamping",
                    format_value(feed),
                    format_value(limit)
                ));
                result.fix(
                    self.name(),
                    FixDirective::SetFeed {
                        value: ctx.feed_word(limit),
                    },
                );
            }
            Some(_) => {}
        }
    }
}
