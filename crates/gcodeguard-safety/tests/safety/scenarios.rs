//! End-to-end line scenarios

use crate::common::{endmill_6mm, engine, engine_with, has_warning, run};
use gcodeguard_gcode::Position;
use gcodeguard_safety::BreakageReport;

#[test]
fn test_low_rapid_becomes_controlled_feed() {
    let mut engine = engine_with(|c| {
        c.envelope.max_rapid_z = 2.0;
        c.envelope.max_feed_z = 800.0;
    });

    let result = engine.process("G0 Z-10");
    assert!(!result.blocked);
    assert_eq!(
        result.fixed_text,
        "M3 S12000 ; [safety-fix]\nG1 Z-10 F800 ; [safety-fix]"
    );
    assert!(has_warning(&result, "dangerous"));
    assert_eq!(engine.state().position.z, -10.0);
    assert!(engine.state().spindle_on);
}

#[test]
fn test_missing_feed_gets_default() {
    let mut engine = engine();
    let result = engine.process("G1 X10 Y10");
    assert_eq!(result.fixed_text, "G1 X10 Y10 F1000 ; [safety-fix]");
    assert_eq!(engine.state().feed, 1000.0);
}

#[test]
fn test_spindle_started_before_plunge() {
    let mut engine = engine();
    let result = engine.process("G1 Z-5 F2000");

    let lines: Vec<&str> = result.fixed_text.lines().collect();
    assert_eq!(lines[0], "M3 S12000 ; [safety-fix]");
    // Z-only moves are held to the Z feed limit
    assert_eq!(lines[1], "G1 Z-5 F1000 ; [safety-fix]");
    assert!(has_warning(&result, "spindle off"));
}

#[test]
fn test_out_of_envelope_target_clamped() {
    let mut engine = engine();
    let result = engine.process("G1 X500 F1000");
    assert_eq!(result.fixed_text, "G1 X350 F1000 ; [safety-fix]");
    assert!(has_warning(&result, "Soft limit"));
    assert_eq!(engine.state().position.x, 350.0);
}

#[test]
fn test_learned_feed_limit_applied() {
    let mut engine = engine_with(|c| c.envelope.max_feed_z = 3000.0);
    engine.tools_mut().set_fallback(Some(endmill_6mm()));
    engine.set_material(Some("hardwood"));

    for feed in [3000.0, 2500.0] {
        engine.report_breakage(
            BreakageReport::new("snapped on entry")
                .with_feed(feed)
                .with_rpm(18000.0)
                .with_depth(3.0),
        );
    }
    let pattern = engine.learning().pattern("endmill|6|hardwood").unwrap();
    assert_eq!(pattern.max_safe_feed, Some(1750.0));
    assert_eq!(pattern.incident_count, 2);

    run(&mut engine, &["M3 S18000"]);
    let result = engine.process("G1 Z-2 F2600");
    assert_eq!(result.fixed_text, "G1 Z-2 F1750 ; [safety-fix]");
    assert!(has_warning(&result, "safe feed"));
}

#[test]
fn test_arc_without_endpoint_blocked() {
    let mut engine = engine();
    let result = engine.process("G2 I5 J0");

    assert!(result.blocked);
    assert_eq!(result.fixed_text, "G2 I5 J0");
    assert!(result.fixes.is_empty());
    assert!(has_warning(&result, "no X/Y endpoint"));
    assert_eq!(engine.state().position, Position::new(0.0, 0.0, 5.0));
}

#[test]
fn test_arc_without_radius_or_center_blocked() {
    let mut engine = engine();
    let result = engine.process("G2 X10 Y10");

    assert!(result.blocked);
    assert_eq!(result.fixed_text, "G2 X10 Y10");
    assert!(result.fixes.is_empty());
    assert!(result.warnings[0].starts_with("BLOCKED"));
    assert_eq!(engine.state().position, Position::new(0.0, 0.0, 5.0));
}
