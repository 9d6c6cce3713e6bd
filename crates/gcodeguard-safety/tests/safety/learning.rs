use crate::common::{endmill_6mm, incident};
use gcodeguard_core::{MaterialId, StoreError, ToolDescriptor, ToolType};
use gcodeguard_safety::learning::infer_causes;
use gcodeguard_safety::{
    pattern_key, BreakageCause, LearningStore, PatternMatch, SensorSnapshot,
};
use gcodeguard_settings::{KeyValueStore, MemoryStore, StoreHandle, LEARNING_KEY};
use std::sync::Arc;

#[test]
fn test_pattern_keys() {
    assert_eq!(
        pattern_key(&endmill_6mm(), &MaterialId::normalized("Hardwood")),
        "endmill|6|hardwood"
    );
    assert_eq!(
        pattern_key(
            &ToolDescriptor::new(ToolType::VBit),
            &MaterialId::normalized("cast acrylic")
        ),
        "vbit|unknown|cast_acrylic"
    );
    assert_eq!(
        pattern_key(
            &ToolDescriptor::new(ToolType::EndMill).with_diameter(3.175),
            &MaterialId::normalized("mdf")
        ),
        "endmill|3.175|mdf"
    );
}

#[test]
fn test_cause_chip_load_high() {
    let causes = infer_causes(&incident(endmill_6mm(), "oak", 12000.0, 10000.0, 0.0));
    assert!(matches!(causes[0], BreakageCause::ChipLoadHigh { .. }));
    assert!(causes.contains(&BreakageCause::FeedAboveCeiling));
    assert!(!causes.contains(&BreakageCause::LowRpmHighFeed));
}

#[test]
fn test_cause_chip_load_low() {
    let causes = infer_causes(&incident(endmill_6mm(), "oak", 200.0, 24000.0, 0.0));
    assert!(matches!(causes.as_slice(), [BreakageCause::ChipLoadLow { .. }]));
}

#[test]
fn test_cause_low_rpm_high_feed() {
    let causes = infer_causes(&incident(endmill_6mm(), "oak", 2500.0, 8000.0, 0.0));
    assert!(causes.contains(&BreakageCause::LowRpmHighFeed));
}

#[test]
fn test_cause_deep_pass() {
    let small = ToolDescriptor::new(ToolType::EndMill).with_diameter(3.0);
    let causes = infer_causes(&incident(small, "oak", 500.0, 18000.0, 4.0));
    assert!(causes.contains(&BreakageCause::DeepSinglePass));

    let unknown = ToolDescriptor::new(ToolType::Other);
    assert!(infer_causes(&incident(unknown.clone(), "oak", 500.0, 18000.0, 3.5))
        .contains(&BreakageCause::DeepSinglePass));
    assert!(infer_causes(&incident(unknown, "oak", 500.0, 18000.0, 2.5)).is_empty());
}

#[test]
fn test_cause_from_sensors() {
    let mut context = incident(ToolDescriptor::new(ToolType::Other), "oak", 500.0, 18000.0, 0.0);
    context.sensors = Some(SensorSnapshot {
        chatter_score: Some(85.0),
        spindle_load: Some(95.0),
        output_amps: Some(6.2),
        fault_code: Some(7),
    });
    let causes = infer_causes(&context);
    assert_eq!(
        causes,
        vec![
            BreakageCause::ChatterDetected { score: 85.0 },
            BreakageCause::SpindleOverload { load: 95.0 },
            BreakageCause::DriveFault { code: 7 },
        ]
    );

    context.sensors = Some(SensorSnapshot {
        chatter_score: Some(20.0),
        fault_code: Some(0),
        ..SensorSnapshot::default()
    });
    assert!(infer_causes(&context).is_empty());
}

#[test]
fn test_limits_only_tighten() {
    let mut learning = LearningStore::in_memory();
    learning.record_incident(incident(endmill_6mm(), "hardwood", 2500.0, 18000.0, 3.0));
    learning.record_incident(incident(endmill_6mm(), "hardwood", 3000.0, 18000.0, 5.0));

    let pattern = learning.pattern("endmill|6|hardwood").unwrap();
    assert_eq!(pattern.max_safe_feed, Some(1750.0));
    assert_eq!(pattern.max_safe_depth, Some(2.1));
    assert_eq!(pattern.min_safe_rpm, 0.0);
    assert_eq!(pattern.incident_count, 2);
}

#[test]
fn test_rpm_raised_only_for_low_rpm_failures() {
    let mut learning = LearningStore::in_memory();
    learning.record_incident(incident(endmill_6mm(), "hardwood", 3000.0, 8000.0, 0.0));
    learning.record_incident(incident(endmill_6mm(), "hardwood", 1000.0, 6000.0, 0.0));

    let pattern = learning.pattern("endmill|6|hardwood").unwrap();
    assert_eq!(pattern.min_safe_rpm, 10400.0);
    assert_eq!(pattern.max_safe_feed, Some(700.0));
}

#[test]
fn test_check_exact_and_fallback() {
    let mut learning = LearningStore::in_memory();
    learning.record_incident(incident(endmill_6mm(), "oak", 2500.0, 8000.0, 2.0));
    learning.record_incident(incident(endmill_6mm(), "maple", 3000.0, 18000.0, 1.0));

    let oak = MaterialId::normalized("oak");
    let exact = learning.check(&endmill_6mm(), &oak, 1800.0, 1.0, 9000.0);
    assert_eq!(
        exact.matched,
        PatternMatch::Exact {
            key: "endmill|6|oak".to_string()
        }
    );
    assert_eq!(exact.max_feed, Some(1750.0));
    assert_eq!(exact.max_depth, None);
    assert_eq!(exact.min_rpm, Some(10400.0));

    // Most restrictive of oak (1750, 1.4) and maple (2100, 0.7), widened by 1.2
    let walnut = MaterialId::normalized("walnut");
    let fallback = learning.check(&endmill_6mm(), &walnut, 2200.0, 1.0, 9000.0);
    assert!(matches!(fallback.matched, PatternMatch::Fallback { ref keys } if keys.len() == 2));
    assert!((fallback.max_feed.unwrap() - 2100.0).abs() < 1e-9);
    assert!((fallback.max_depth.unwrap() - 0.84).abs() < 1e-9);
    assert_eq!(fallback.min_rpm, None);

    let within = learning.check(&endmill_6mm(), &walnut, 2000.0, 0.5, 9000.0);
    assert!(!within.is_needed());

    let drill = ToolDescriptor::new(ToolType::Drill).with_diameter(6.0);
    let unrelated = learning.check(&drill, &oak, 9000.0, 10.0, 0.0);
    assert_eq!(unrelated.matched, PatternMatch::None);
    assert!(!unrelated.is_needed());
}

#[test]
fn test_incident_log_capped() {
    let mut learning = LearningStore::in_memory();
    learning.set_max_incidents(3);
    for feed in [1000.0, 1100.0, 1200.0, 1300.0, 1400.0] {
        learning.record_incident(incident(endmill_6mm(), "mdf", feed, 18000.0, 0.0));
    }

    let feeds: Vec<f64> = learning.incidents().iter().map(|i| i.feed).collect();
    assert_eq!(feeds, vec![1200.0, 1300.0, 1400.0]);
    assert_eq!(learning.pattern("endmill|6|mdf").unwrap().incident_count, 5);
}

#[test]
fn test_clear_all() {
    let store = MemoryStore::new();
    let mut learning = LearningStore::with_store(Arc::new(store.clone()));
    learning.record_incident(incident(endmill_6mm(), "mdf", 1000.0, 18000.0, 0.0));
    learning.clear_all();

    assert!(learning.incidents().is_empty());
    assert_eq!(learning.patterns().count(), 0);
    assert!(LearningStore::with_store(Arc::new(store)).incidents().is_empty());
}

#[test]
fn test_database_survives_reload() {
    let store = MemoryStore::new();
    let mut learning = LearningStore::with_store(Arc::new(store.clone()));
    learning.record_incident(incident(endmill_6mm(), "mdf", 1000.0, 18000.0, 2.0));
    assert!(store.get(LEARNING_KEY).unwrap().is_some());

    let reloaded = LearningStore::with_store(Arc::new(store));
    assert_eq!(reloaded.incidents().len(), 1);
    assert_eq!(reloaded.incidents()[0].id, learning.incidents()[0].id);
    let pattern = reloaded.pattern("endmill|6|mdf").unwrap();
    assert_eq!(pattern.max_safe_feed, Some(700.0));
    assert_eq!(pattern.incident_count, 1);
}

#[test]
fn test_corrupt_database_starts_empty() {
    let store = MemoryStore::new();
    store.set(LEARNING_KEY, "{\"incidents\": 12").unwrap();

    let learning = LearningStore::with_store(Arc::new(store));
    assert!(learning.incidents().is_empty());
}

struct ReadOnlyStore;

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    fn set(&self, key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Write {
            key: key.to_string(),
            reason: "read-only".to_string(),
        })
    }
}

#[test]
fn test_write_failure_keeps_memory() {
    let store: StoreHandle = Arc::new(ReadOnlyStore);
    let mut learning = LearningStore::with_store(store);
    learning.record_incident(incident(endmill_6mm(), "mdf", 1000.0, 18000.0, 0.0));

    assert_eq!(learning.incidents().len(), 1);
    assert_eq!(
        learning.pattern("endmill|6|mdf").unwrap().max_safe_feed,
        Some(700.0)
    );
}
