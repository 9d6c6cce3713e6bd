use crate::common::{endmill_6mm, engine, engine_with, has_warning, run};
use gcodeguard_core::MaterialId;
use gcodeguard_gcode::{parse, Instruction, LineTokenizer};
use gcodeguard_safety::{BreakageReport, ProcessResult, SafetyEngine, SafetyListener};
use gcodeguard_settings::{KeyValueStore, MemoryStore, SafetyConfig, CONFIG_KEY};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const PROGRAM: &str = "G21\nG90\nG0 Z-10\nG1 X10 Y10\nG0 X100 Y0\n";

#[test]
fn test_process_file_summary_and_statistics() {
    let mut engine = engine();
    let report = engine.process_file(PROGRAM);

    assert_eq!(report.total_fixes, 5);
    assert!(report
        .fixed_text
        .starts_with("; ---- GCodeGuard safety summary ----\n; fixes applied: 5 on 2 line(s)\n"));
    assert!(report.fixed_text.ends_with(
        "M3 S12000 ; [safety-fix]\nG1 Z-10 F1000 ; [safety-fix]\nG1 X10 Y10\nG0 Z5 ; [safety-fix]\nG0 X100 Y0\n"
    ));

    let stats = &report.statistics;
    assert_eq!(stats.total_lines, 5);
    assert_eq!(stats.instruction_lines, 5);
    assert_eq!(stats.fixed_lines, 2);
    assert_eq!(stats.blocked_lines, 0);
    assert_eq!(stats.warning_count, 4);
    assert_eq!(stats.fixes_by_kind["prepend-line"], 3);
    assert_eq!(stats.fixes_by_kind["replace-token"], 1);
    assert_eq!(stats.fixes_by_kind["set-feed"], 1);
    assert!(!stats.stock_defined);

    let lines: Vec<usize> = report.warnings.iter().map(|w| w.line).collect();
    assert_eq!(lines, vec![3, 3, 5, 5]);
}

#[test]
fn test_process_file_is_idempotent() {
    let mut engine = engine();
    let first = engine.process_file(PROGRAM);
    let second = engine.process_file(&first.fixed_text);

    assert_eq!(second.total_fixes, 0);
    assert_eq!(second.fixed_text, first.fixed_text);
}

#[test]
fn test_reprocessing_replaces_summary_header() {
    let mut engine = engine();
    let first = engine.process_file(PROGRAM);

    let mut config = engine.config().clone();
    config.envelope.max_feed_z = 600.0;
    engine.set_config(config).unwrap();
    let second = engine.process_file(&first.fixed_text);

    assert_eq!(second.total_fixes, 1);
    assert_eq!(second.fixed_text.matches("GCodeGuard safety summary").count(), 1);
    assert!(second
        .fixed_text
        .starts_with("; ---- GCodeGuard safety summary ----\n; fixes applied: 1 on 1 line(s)\n"));
    assert!(second.fixed_text.contains("G1 Z-10 F600 ; [safety-fix]\n"));
    assert_eq!(second.statistics.total_lines, 7);
}

#[test]
fn test_process_file_comments_out_blocked_lines() {
    let mut engine = engine();
    let report = engine.process_file("G21\nG2 X10 Y10\nG1 X5 F100\n");

    assert_eq!(report.fixed_text, "G21\n; BLOCKED: G2 X10 Y10\nG1 X5 F100\n");
    assert_eq!(report.statistics.blocked_lines, 1);
    assert_eq!(report.total_fixes, 0);
    assert_eq!(engine.state().position.x, 5.0);
}

#[test]
fn test_clean_file_unchanged() {
    let mut engine = engine();
    let text = "(profile)\nG21\nG0 Z5\n\nG1 X10 F500\n";
    let report = engine.process_file(text);

    assert_eq!(report.fixed_text, text);
    assert_eq!(report.statistics.total_lines, 5);
    assert_eq!(report.statistics.instruction_lines, 3);

    let report = engine.process_file("G1 X10 F500");
    assert_eq!(report.fixed_text, "G1 X10 F500");
}

#[test]
fn test_process_file_resets_state() {
    let mut engine = engine();
    run(&mut engine, &["G91", "G20", "M3 S10000"]);

    engine.process_file("G1 X10 F500\n");
    let state = engine.state();
    assert_eq!(state.position.x, 10.0);
    assert!(!state.spindle_on);
}

#[test]
fn test_program_material_drives_learning() {
    let mut engine = engine_with(|c| c.envelope.max_feed_z = 3000.0);
    engine.tools_mut().set_fallback(Some(endmill_6mm()));
    engine.report_breakage(
        BreakageReport::new("walnut burl")
            .with_material("Hard Wood")
            .with_feed(2000.0)
            .with_rpm(18000.0),
    );

    let report = engine.process_file("(Material: Hard Wood)\nM3 S18000\nG1 Z-1 F2000\n");
    assert!(report.statistics.stock_defined);
    assert_eq!(engine.current_material(), MaterialId::normalized("hard_wood"));
    assert!(report.fixed_text.contains("G1 Z-1 F1400 ; [safety-fix]"));
}

#[test]
fn test_explicit_material_overrides_program() {
    let mut engine = engine();
    engine.set_material(Some("Birch Ply"));
    engine.process_file("(Material: MDF)\nG0 Z5\n");
    assert_eq!(engine.current_material(), MaterialId::normalized("birch ply"));

    engine.set_material(None);
    assert_eq!(engine.current_material(), MaterialId::normalized("mdf"));
}

#[test]
fn test_disabled_engine_passes_through() {
    let mut engine = engine_with(|c| c.enabled = false);
    let result = engine.process("G0 Z-10");

    assert_eq!(result.fixed_text, "G0 Z-10");
    assert!(result.warnings.is_empty());
    assert_eq!(engine.state().position.z, -10.0);
}

#[test]
fn test_warn_only_mode() {
    let mut engine = engine_with(|c| c.auto_fix = false);
    let result = engine.process("G1 X10 Y10");

    assert_eq!(result.fixed_text, "G1 X10 Y10");
    assert!(result.fixes.is_empty());
    assert!(has_warning(&result, "without feed"));
    assert_eq!(engine.state().position.x, 10.0);
}

#[test]
fn test_comment_and_blank_lines_pass_through() {
    let mut engine = engine();
    for line in ["", "   ", "(setup)", "; done"] {
        let result = engine.process(line);
        assert_eq!(result.fixed_text, line);
        assert!(result.warnings.is_empty());
    }
}

#[derive(Default)]
struct Counter {
    fixes: AtomicUsize,
    warnings: AtomicUsize,
    blocks: AtomicUsize,
}

impl SafetyListener for Counter {
    fn on_fix(&self, _result: &ProcessResult) {
        self.fixes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_warning(&self, _warning: &str) {
        self.warnings.fetch_add(1, Ordering::SeqCst);
    }

    fn on_block(&self, _result: &ProcessResult) {
        self.blocks.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_listeners() {
    let mut engine = engine();
    let counter = Arc::new(Counter::default());
    let handle = engine.add_listener(counter.clone());

    engine.process("G1 X10 Y10");
    engine.process("G2 X1 Y1");
    engine.process("G0 Z5");
    assert_eq!(counter.fixes.load(Ordering::SeqCst), 1);
    assert_eq!(counter.blocks.load(Ordering::SeqCst), 1);
    assert_eq!(counter.warnings.load(Ordering::SeqCst), 2);

    assert!(engine.remove_listener(&handle));
    assert!(!engine.remove_listener(&handle));
    engine.process("G1 X20 F9000");
    assert_eq!(counter.fixes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_report_breakage_uses_machine_state() {
    let mut engine = engine();
    engine.tools_mut().add_tool(1, endmill_6mm());
    run(&mut engine, &["T1 M6", "M3 S16000", "G1 Z-2 F600"]);

    let incident = engine.report_breakage(BreakageReport::new("snapped"));
    assert_eq!(incident.feed, 600.0);
    assert_eq!(incident.rpm, 16000.0);
    assert_eq!(incident.depth, 2.0);
    assert_eq!(incident.position.z, -2.0);
    assert_eq!(incident.tool, endmill_6mm());
    assert_eq!(incident.material, MaterialId::normalized("unknown"));

    let pattern = engine.learning().pattern("endmill|6|unknown").unwrap();
    assert_eq!(pattern.max_safe_feed, Some(420.0));
    assert_eq!(pattern.max_safe_depth, Some(1.4));
}

#[test]
fn test_config_and_learning_persist() {
    let store = MemoryStore::new();
    {
        let mut engine = SafetyEngine::with_store(Arc::new(store.clone()));
        let mut config = SafetyConfig::default();
        config.envelope.safe_z = 8.0;
        engine.set_config(config).unwrap();
        engine.set_material(Some("Oak"));
        engine.save_config().unwrap();
        engine.report_breakage(BreakageReport::new("chipped").with_feed(1500.0));
    }

    let engine = SafetyEngine::with_store(Arc::new(store));
    assert_eq!(engine.config().envelope.safe_z, 8.0);
    assert_eq!(engine.state().position.z, 8.0);
    assert_eq!(engine.current_material(), MaterialId::normalized("oak"));
    assert_eq!(engine.learning().incidents().len(), 1);
}

#[test]
fn test_invalid_stored_config_ignored() {
    let store = MemoryStore::new();
    store
        .set(
            CONFIG_KEY,
            r#"{"config": {"envelope": {"safe_z": 100.0}}}"#,
        )
        .unwrap();

    let engine = SafetyEngine::with_store(Arc::new(store));
    assert_eq!(engine.config(), &SafetyConfig::default());
}

#[test]
fn test_set_config_rejects_invalid() {
    let mut engine = engine();
    let mut config = SafetyConfig::default();
    config.envelope.max_feed_xy = 0.0;

    assert!(engine.set_config(config).is_err());
    assert_eq!(engine.config(), &SafetyConfig::default());
    // No store attached
    assert!(engine.save_config().is_ok());
}

/// Resolves repeated X words to the last one
struct LastXTokenizer;

impl LineTokenizer for LastXTokenizer {
    fn name(&self) -> &str {
        "last-x"
    }

    fn parse(&self, line: &str) -> Instruction {
        let mut instruction = parse(line);
        if let Some(x) = instruction
            .words
            .iter()
            .rev()
            .find(|w| w.letter == 'X')
            .and_then(|w| w.value)
        {
            instruction.x = Some(x);
        }
        instruction
    }
}

#[test]
fn test_custom_tokenizer() {
    let mut engine = engine();
    assert!(engine.process("G1 X5 X400 F100").fixes.is_empty());

    engine.reset_state();
    engine.set_tokenizer(Box::new(LastXTokenizer));
    let result = engine.process("G1 X5 X400 F100");
    assert!(result.fixes.iter().any(|f| f.rule == "soft_limits"));
}
