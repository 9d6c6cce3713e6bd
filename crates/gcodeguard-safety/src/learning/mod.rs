//! Breakage learning
//!
//! Every reported tool failure is logged as a [`BreakageIncident`] and folded
//! into the [`LearnedPattern`] for its tool and material. Patterns only ever
//! tighten; [`LearningStore::clear_all`] is the one way back to unbounded.
//!
//! The database is written to the key-value store after every update. Write
//! failures are logged and the in-memory state is kept, so a flaky store never
//! costs the session what it has learned.

mod incident;
mod pattern;

pub use incident::{
    infer_causes, BreakageCause, BreakageIncident, IncidentContext, SensorSnapshot,
    CHATTER_THRESHOLD, DEEP_PASS_DEPTH, FEED_CEILING, HIGH_FEED, LOW_RPM, OVERLOAD_PERCENT,
};
pub use pattern::{pattern_key, LearnedPattern, LearningDatabase, RPM_RAISE_FACTOR, TIGHTEN_FACTOR};

use gcodeguard_core::{MaterialId, ToolDescriptor};
use gcodeguard_settings::{load_blob, save_blob, StoreHandle, LEARNING_KEY};
use serde::{Deserialize, Serialize};

/// Default incident log cap
pub const DEFAULT_MAX_INCIDENTS: usize = 500;
/// Default widening for limits borrowed from other materials
pub const DEFAULT_FALLBACK_MARGIN: f64 = 1.2;

/// How a pattern was found for the current tool and material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternMatch {
    /// Nothing learned for this tool type
    None,
    /// A pattern for exactly this tool and material
    Exact { key: String },
    /// Most restrictive limits of same-type patterns on other materials
    Fallback { keys: Vec<String> },
}

/// Limits the current parameters violate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub matched: PatternMatch,
    /// Feed limit (mm/min), set when the feed exceeds it
    pub max_feed: Option<f64>,
    /// Depth limit (mm), set when the depth exceeds it
    pub max_depth: Option<f64>,
    /// Minimum spindle speed, set when the rpm is below it
    pub min_rpm: Option<f64>,
}

impl Adjustment {
    fn none() -> Self {
        Self {
            matched: PatternMatch::None,
            max_feed: None,
            max_depth: None,
            min_rpm: None,
        }
    }

    /// Whether any limit is violated
    pub fn is_needed(&self) -> bool {
        self.max_feed.is_some() || self.max_depth.is_some() || self.min_rpm.is_some()
    }
}

/// Incident log and learned patterns for one machine
pub struct LearningStore {
    db: LearningDatabase,
    store: Option<StoreHandle>,
    max_incidents: usize,
    fallback_margin: f64,
}

impl std::fmt::Debug for LearningStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearningStore")
            .field("incidents", &self.db.incidents.len())
            .field("patterns", &self.db.patterns.len())
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl Default for LearningStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl LearningStore {
    /// Store without persistence
    pub fn in_memory() -> Self {
        Self {
            db: LearningDatabase::default(),
            store: None,
            max_incidents: DEFAULT_MAX_INCIDENTS,
            fallback_margin: DEFAULT_FALLBACK_MARGIN,
        }
    }

    /// Store backed by `store`, loading any saved database
    ///
    /// An unreadable or corrupt blob is logged and the store starts empty.
    pub fn with_store(store: StoreHandle) -> Self {
        let db = match load_blob::<LearningDatabase>(store.as_ref(), LEARNING_KEY) {
            Ok(Some(db)) => {
                tracing::debug!(
                    "Loaded learning database: {} incidents, {} patterns",
                    db.incidents.len(),
                    db.patterns.len()
                );
                db
            }
            Ok(None) => LearningDatabase::default(),
            Err(e) => {
                tracing::warn!("Starting with empty learning database: {}", e);
                LearningDatabase::default()
            }
        };

        Self {
            db,
            store: Some(store),
            max_incidents: DEFAULT_MAX_INCIDENTS,
            fallback_margin: DEFAULT_FALLBACK_MARGIN,
        }
    }

    /// Cap the incident log, trimming the oldest entries
    pub fn set_max_incidents(&mut self, max: usize) {
        self.max_incidents = max.max(1);
        self.trim_incidents();
    }

    /// Widening applied to fallback limits
    pub fn set_fallback_margin(&mut self, margin: f64) {
        self.fallback_margin = margin.max(1.0);
    }

    /// Log a failure, infer its causes and tighten the matching pattern
    pub fn record_incident(&mut self, context: IncidentContext) -> BreakageIncident {
        let incident = BreakageIncident::from_context(context);
        tracing::info!(
            "Recorded breakage {} ({}, {}): {} cause(s)",
            incident.id,
            incident.tool.description_short(),
            incident.material,
            incident.causes.len()
        );

        self.db.incidents.push(incident.clone());
        self.trim_incidents();
        self.learn(&incident);
        incident
    }

    /// Tighten the pattern for the incident's tool and material, then persist
    pub fn learn(&mut self, incident: &BreakageIncident) -> &LearnedPattern {
        let key = pattern_key(&incident.tool, &incident.material);
        let raise_rpm = incident.has_cause(|c| matches!(c, BreakageCause::LowRpmHighFeed));

        let pattern = self
            .db
            .patterns
            .entry(key.clone())
            .or_insert_with(|| LearnedPattern::new(&incident.tool, &incident.material));
        pattern.tighten(incident, raise_rpm);

        tracing::info!(
            "Pattern {} now: feed <= {:?}, depth <= {:?}, rpm >= {}",
            key,
            pattern.max_safe_feed,
            pattern.max_safe_depth,
            pattern.min_safe_rpm
        );

        self.persist();
        &self.db.patterns[&key]
    }

    /// Compare parameters against learned limits
    ///
    /// The exact pattern wins. Without one, the most restrictive limits of
    /// patterns for the same tool type on other materials apply, widened by
    /// the fallback margin.
    pub fn check(
        &self,
        tool: &ToolDescriptor,
        material: &MaterialId,
        feed: f64,
        depth: f64,
        rpm: f64,
    ) -> Adjustment {
        let key = pattern_key(tool, material);

        let (matched, feed_limit, depth_limit, rpm_min) = match self.db.patterns.get(&key) {
            Some(pattern) => (
                PatternMatch::Exact { key },
                pattern.max_safe_feed,
                pattern.max_safe_depth,
                Some(pattern.min_safe_rpm).filter(|r| *r > 0.0),
            ),
            None => {
                let related: Vec<&LearnedPattern> = self
                    .db
                    .patterns
                    .values()
                    .filter(|p| p.tool_type == tool.tool_type)
                    .collect();
                if related.is_empty() {
                    return Adjustment::none();
                }
                let most_restrictive = |values: Vec<f64>| values.into_iter().reduce(f64::min);
                let feed_limit = most_restrictive(
                    related.iter().filter_map(|p| p.max_safe_feed).collect(),
                )
                .map(|f| f * self.fallback_margin);
                let depth_limit = most_restrictive(
                    related.iter().filter_map(|p| p.max_safe_depth).collect(),
                )
                .map(|d| d * self.fallback_margin);
                (
                    PatternMatch::Fallback {
                        keys: related.iter().map(|p| p.key.clone()).collect(),
                    },
                    feed_limit,
                    depth_limit,
                    None,
                )
            }
        };

        Adjustment {
            matched,
            max_feed: feed_limit.filter(|limit| feed > *limit),
            max_depth: depth_limit.filter(|limit| depth > *limit),
            min_rpm: rpm_min.filter(|min| rpm < *min),
        }
    }

    /// Pattern by key
    pub fn pattern(&self, key: &str) -> Option<&LearnedPattern> {
        self.db.patterns.get(key)
    }

    /// All patterns, ordered by key
    pub fn patterns(&self) -> impl Iterator<Item = &LearnedPattern> {
        self.db.patterns.values()
    }

    /// Incident log, oldest first
    pub fn incidents(&self) -> &[BreakageIncident] {
        &self.db.incidents
    }

    pub fn database(&self) -> &LearningDatabase {
        &self.db
    }

    /// Forget every incident and pattern
    pub fn clear_all(&mut self) {
        self.db = LearningDatabase::default();
        tracing::info!("Cleared learning database");
        self.persist();
    }

    fn trim_incidents(&mut self) {
        let len = self.db.incidents.len();
        if len > self.max_incidents {
            self.db.incidents.drain(..len - self.max_incidents);
        }
    }

    fn persist(&self) {
        let Some(store) = &self.store else { return };
        if let Err(e) = save_blob(store.as_ref(), LEARNING_KEY, &self.db) {
            tracing::warn!("Failed to persist learning database: {}", e);
        }
    }
}
