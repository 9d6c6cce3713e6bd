//! Safety engine
//!
//! One [`SafetyEngine`] exists per machine connection. It owns the machine
//! state, envelope, stock model, learning store and tool table, and runs every
//! outgoing line through the rule battery and the fix synthesizer.
//!
//! The engine is strictly causal: a line's fixes depend only on the lines
//! before it, and the machine state advances only over text that is about to
//! be transmitted. Blocked lines never advance it. Replaying a program needs
//! an explicit [`SafetyEngine::reset_state`] first; [`SafetyEngine::process_file`]
//! does this itself.

use crate::fix::{synthesize, Fix};
use crate::learning::{BreakageIncident, IncidentContext, LearningStore, SensorSnapshot};
use crate::listener::{SafetyListenerHandle, SafetyListenerRef};
use crate::rules::{CheckContext, RuleEngine};
use crate::stock::StockModel;
use gcodeguard_core::{ConfigError, MaterialId, StoreError, ToolDescriptor, ToolTable, ToolType};
use gcodeguard_gcode::{FirstMatchTokenizer, LineTokenizer, MachineState, Position};
use gcodeguard_settings::{load_blob, save_blob, SafetyConfig, StoreHandle, CONFIG_KEY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of processing one line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// Text to transmit; may span several lines when lines were prepended
    pub fixed_text: String,
    pub warnings: Vec<String>,
    /// Fixes applied to produce `fixed_text`
    pub fixes: Vec<Fix>,
    /// The line must not be transmitted
    pub blocked: bool,
}

impl ProcessResult {
    fn passthrough(line: &str) -> Self {
        Self {
            fixed_text: line.to_string(),
            warnings: Vec::new(),
            fixes: Vec::new(),
            blocked: false,
        }
    }

    pub fn is_modified(&self) -> bool {
        !self.fixes.is_empty()
    }
}

/// Warning attached to a 1-based program line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineWarning {
    pub line: usize,
    pub warning: String,
}

/// Aggregate counts for one processed program
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileStatistics {
    pub total_lines: usize,
    /// Lines carrying at least one word
    pub instruction_lines: usize,
    pub fixed_lines: usize,
    pub blocked_lines: usize,
    pub warning_count: usize,
    /// Applied fixes per directive kind
    pub fixes_by_kind: BTreeMap<String, usize>,
    pub stock_defined: bool,
}

/// Result of processing a whole program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    pub fixed_text: String,
    pub total_fixes: usize,
    pub warnings: Vec<LineWarning>,
    pub statistics: FileStatistics,
}

/// An observed tool failure
///
/// Fields left unset are taken from the engine's current state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakageReport {
    pub notes: String,
    pub position: Option<Position>,
    /// mm/min
    pub feed: Option<f64>,
    pub rpm: Option<f64>,
    /// Depth of cut (mm)
    pub depth: Option<f64>,
    pub tool: Option<ToolDescriptor>,
    pub material: Option<String>,
    pub sensors: Option<SensorSnapshot>,
}

impl BreakageReport {
    pub fn new(notes: impl Into<String>) -> Self {
        Self {
            notes: notes.into(),
            ..Self::default()
        }
    }

    pub fn with_feed(mut self, feed: f64) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn with_rpm(mut self, rpm: f64) -> Self {
        self.rpm = Some(rpm);
        self
    }

    pub fn with_depth(mut self, depth: f64) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_tool(mut self, tool: ToolDescriptor) -> Self {
        self.tool = Some(tool);
        self
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn with_sensors(mut self, sensors: SensorSnapshot) -> Self {
        self.sensors = Some(sensors);
        self
    }
}

/// Configuration blob persisted under [`CONFIG_KEY`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredConfig {
    #[serde(default)]
    config: SafetyConfig,
    #[serde(default)]
    stock: StockModel,
    #[serde(default)]
    material: Option<MaterialId>,
}

/// Streaming safety checker for one machine connection
pub struct SafetyEngine {
    config: SafetyConfig,
    state: MachineState,
    /// Stock used when a program carries no stock hints
    base_stock: StockModel,
    stock: StockModel,
    learning: LearningStore,
    tools: ToolTable,
    material: Option<MaterialId>,
    tokenizer: Box<dyn LineTokenizer>,
    rules: RuleEngine,
    listeners: Vec<(SafetyListenerHandle, SafetyListenerRef)>,
    store: Option<StoreHandle>,
}

impl std::fmt::Debug for SafetyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafetyEngine")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("stock", &self.stock)
            .field("learning", &self.learning)
            .field("tokenizer", &self.tokenizer.name())
            .field("rules", &self.rules)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for SafetyEngine {
    fn default() -> Self {
        Self::new(SafetyConfig::default())
    }
}

impl SafetyEngine {
    /// Engine with in-memory learning
    pub fn new(config: SafetyConfig) -> Self {
        Self::build(config, StockModel::default(), None, LearningStore::in_memory(), None)
    }

    /// Engine persisting configuration and learning through `store`
    ///
    /// A saved configuration replaces the default; an unreadable one is
    /// logged and ignored.
    pub fn with_store(store: StoreHandle) -> Self {
        let stored = match load_blob::<StoredConfig>(store.as_ref(), CONFIG_KEY) {
            Ok(Some(stored)) => match stored.config.validate() {
                Ok(()) => stored,
                Err(e) => {
                    tracing::warn!("Ignoring stored safety config: {}", e);
                    StoredConfig::default()
                }
            },
            Ok(None) => StoredConfig::default(),
            Err(e) => {
                tracing::warn!("Ignoring stored safety config: {}", e);
                StoredConfig::default()
            }
        };

        let learning = LearningStore::with_store(store.clone());
        Self::build(
            stored.config,
            stored.stock,
            stored.material,
            learning,
            Some(store),
        )
    }

    fn build(
        config: SafetyConfig,
        stock: StockModel,
        material: Option<MaterialId>,
        mut learning: LearningStore,
        store: Option<StoreHandle>,
    ) -> Self {
        learning.set_max_incidents(config.learning.max_incidents);
        learning.set_fallback_margin(config.thresholds.fallback_margin);
        Self {
            state: MachineState::new(config.envelope.safe_z),
            config,
            base_stock: stock.clone(),
            stock,
            learning,
            tools: ToolTable::new(),
            material,
            tokenizer: Box::new(FirstMatchTokenizer::new()),
            rules: RuleEngine::standard(),
            listeners: Vec::new(),
            store,
        }
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    /// Replace the configuration after validating it
    pub fn set_config(&mut self, config: SafetyConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.learning
            .set_max_incidents(config.learning.max_incidents);
        self.learning
            .set_fallback_margin(config.thresholds.fallback_margin);
        self.config = config;
        Ok(())
    }

    /// Write configuration, stock and material to the store
    pub fn save_config(&self) -> Result<(), StoreError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let stored = StoredConfig {
            config: self.config.clone(),
            stock: self.base_stock.clone(),
            material: self.material.clone(),
        };
        save_blob(store.as_ref(), CONFIG_KEY, &stored)
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    /// Stock model in effect
    pub fn stock(&self) -> &StockModel {
        &self.stock
    }

    /// Stock to use for programs without stock hints
    pub fn set_stock(&mut self, stock: StockModel) {
        self.base_stock = stock.clone();
        self.stock = stock;
    }

    pub fn learning(&self) -> &LearningStore {
        &self.learning
    }

    pub fn learning_mut(&mut self) -> &mut LearningStore {
        &mut self.learning
    }

    pub fn tools(&self) -> &ToolTable {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolTable {
        &mut self.tools
    }

    pub fn set_tool_table(&mut self, tools: ToolTable) {
        self.tools = tools;
    }

    /// Set the active material; `None` falls back to the program's hint
    pub fn set_material(&mut self, material: Option<&str>) {
        self.material = material.map(MaterialId::normalized);
    }

    /// Material the learned guard currently applies
    pub fn current_material(&self) -> MaterialId {
        self.material
            .clone()
            .or_else(|| self.stock.material.as_deref().map(MaterialId::normalized))
            .unwrap_or_else(|| MaterialId::normalized("unknown"))
    }

    /// Tool the learned guard currently applies
    pub fn current_tool(&self) -> ToolDescriptor {
        self.tools
            .resolve(self.state.active_tool)
            .cloned()
            .unwrap_or_else(|| ToolDescriptor::new(ToolType::Other))
    }

    /// Substitute the line tokenizer
    pub fn set_tokenizer(&mut self, tokenizer: Box<dyn LineTokenizer>) {
        self.tokenizer = tokenizer;
    }

    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RuleEngine {
        &mut self.rules
    }

    /// Subscribe to fix, warning and block notifications
    pub fn add_listener(&mut self, listener: SafetyListenerRef) -> SafetyListenerHandle {
        let handle = SafetyListenerHandle(uuid::Uuid::new_v4().to_string());
        self.listeners.push((handle.clone(), listener));
        handle
    }

    /// Unsubscribe; returns false for an unknown handle
    pub fn remove_listener(&mut self, handle: &SafetyListenerHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(h, _)| h != handle);
        self.listeners.len() != before
    }

    /// Restore the machine state for a new job
    pub fn reset_state(&mut self) {
        self.state.reset(self.config.envelope.safe_z);
    }

    /// Check and fix one line
    ///
    /// Never fails. A blocked result keeps the original text and must not be
    /// transmitted; the machine state is left untouched.
    pub fn process(&mut self, line: &str) -> ProcessResult {
        self.process_line(line).0
    }

    fn process_line(&mut self, line: &str) -> (ProcessResult, bool) {
        let instruction = self.tokenizer.parse(line);
        if instruction.is_empty() {
            return (ProcessResult::passthrough(line), false);
        }
        if !self.config.enabled {
            self.state.update(&instruction);
            return (ProcessResult::passthrough(line), true);
        }

        let tool = self.current_tool();
        let material = self.current_material();
        let check = {
            let ctx = CheckContext {
                instruction: &instruction,
                state: &self.state,
                config: &self.config,
                stock: &self.stock,
                learning: &self.learning,
                tool: &tool,
                material: &material,
            };
            self.rules.check(&ctx)
        };

        if check.blocked {
            tracing::warn!("Blocked line '{}': {}", line.trim(), check.warnings.join("; "));
            let result = ProcessResult {
                fixed_text: line.to_string(),
                warnings: check.warnings,
                fixes: Vec::new(),
                blocked: true,
            };
            self.notify(&result);
            return (result, true);
        }

        let result = if self.config.auto_fix && !check.fixes.is_empty() {
            let fixed_text = synthesize(&instruction, &check.fixes);
            for fix in &check.fixes {
                tracing::debug!("{}: {}", fix.rule, fix.directive);
            }
            for output in fixed_text.lines() {
                let parsed = self.tokenizer.parse(output);
                self.state.update(&parsed);
            }
            ProcessResult {
                fixed_text,
                warnings: check.warnings,
                fixes: check.fixes,
                blocked: false,
            }
        } else {
            self.state.update(&instruction);
            ProcessResult {
                fixed_text: line.to_string(),
                warnings: check.warnings,
                fixes: Vec::new(),
                blocked: false,
            }
        };

        self.notify(&result);
        (result, true)
    }

    fn notify(&self, result: &ProcessResult) {
        for (_, listener) in &self.listeners {
            for warning in &result.warnings {
                listener.on_warning(warning);
            }
            if result.blocked {
                listener.on_block(result);
            } else if result.is_modified() {
                listener.on_fix(result);
            }
        }
    }

    /// Check and fix a complete program
    ///
    /// Resets the machine state, scans the text for stock hints, then runs
    /// every line in order. Blocked lines are commented out. When anything
    /// was fixed a summary comment block is placed at the top, replacing the
    /// one left by an earlier pass.
    pub fn process_file(&mut self, text: &str) -> FileReport {
        self.reset_state();
        let scanned = StockModel::scan(text);
        self.stock = if scanned.defined {
            scanned
        } else {
            self.base_stock.clone()
        };

        let mut statistics = FileStatistics {
            stock_defined: self.stock.defined,
            ..FileStatistics::default()
        };
        let mut output: Vec<String> = Vec::new();
        let mut warnings: Vec<LineWarning> = Vec::new();
        let mut total_fixes = 0;
        let previous_header = summary_header_len(text);

        for (index, line) in text.lines().enumerate() {
            if index < previous_header {
                continue;
            }
            statistics.total_lines += 1;
            let (result, is_instruction) = self.process_line(line);
            if is_instruction {
                statistics.instruction_lines += 1;
            }

            warnings.extend(result.warnings.iter().map(|warning| LineWarning {
                line: index + 1,
                warning: warning.clone(),
            }));

            if result.blocked {
                statistics.blocked_lines += 1;
                output.push(format!("; BLOCKED: {}", line.trim()));
                continue;
            }

            if result.is_modified() {
                statistics.fixed_lines += 1;
                total_fixes += result.fixes.len();
                for fix in &result.fixes {
                    *statistics
                        .fixes_by_kind
                        .entry(fix.directive.kind().to_string())
                        .or_insert(0) += 1;
                }
            }
            output.push(result.fixed_text);
        }
        statistics.warning_count = warnings.len();

        let mut fixed_text = output.join("\n");
        if text.ends_with('\n') {
            fixed_text.push('\n');
        }
        if total_fixes > 0 {
            fixed_text = summary_header(total_fixes, &statistics) + &fixed_text;
        } else if previous_header > 0 {
            let kept: Vec<&str> = text.lines().take(previous_header).collect();
            fixed_text = kept.join("\n") + "\n" + &fixed_text;
        }

        tracing::info!(
            "Processed {} lines: {} fixes on {} lines, {} warnings, {} blocked",
            statistics.total_lines,
            total_fixes,
            statistics.fixed_lines,
            statistics.warning_count,
            statistics.blocked_lines
        );

        FileReport {
            fixed_text,
            total_fixes,
            warnings,
            statistics,
        }
    }

    /// Feed an observed tool failure into the learning store
    ///
    /// Unset report fields are filled from the current machine state, tool
    /// and material.
    pub fn report_breakage(&mut self, report: BreakageReport) -> BreakageIncident {
        let position = report.position.unwrap_or(self.state.position);
        let context = IncidentContext {
            position,
            feed: report.feed.unwrap_or(self.state.feed),
            rpm: report.rpm.unwrap_or(self.state.spindle_rpm),
            depth: report
                .depth
                .unwrap_or_else(|| self.stock.depth_at(position.z)),
            tool: report.tool.unwrap_or_else(|| self.current_tool()),
            material: report
                .material
                .as_deref()
                .map(MaterialId::normalized)
                .unwrap_or_else(|| self.current_material()),
            notes: report.notes,
            sensors: report.sensors,
        };
        self.learning.record_incident(context)
    }
}

const SUMMARY_START: &str = "; ---- GCodeGuard safety summary ----";
const SUMMARY_END: &str = "; -----------------------------------";

/// Number of lines taken by a summary block at the top of `text`, 0 if none
fn summary_header_len(text: &str) -> usize {
    let mut lines = text.lines();
    if lines.next().map(str::trim_end) != Some(SUMMARY_START) {
        return 0;
    }
    lines
        .position(|line| line.trim_end() == SUMMARY_END)
        .map_or(0, |end| end + 2)
}

fn summary_header(total_fixes: usize, statistics: &FileStatistics) -> String {
    let mut header = format!("{}\n", SUMMARY_START);
    header.push_str(&format!(
        "; fixes applied: {} on {} line(s)\n",
        total_fixes, statistics.fixed_lines
    ));
    for (kind, count) in &statistics.fixes_by_kind {
        header.push_str(&format!(";   {}: {}\n", kind, count));
    }
    header.push_str(&format!("; warnings: {}\n", statistics.warning_count));
    header.push_str(&format!("; blocked lines: {}\n", statistics.blocked_lines));
    header.push_str(&format!("{}\n", SUMMARY_END));
    header
}
