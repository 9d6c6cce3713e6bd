use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use gcodeguard::{
    init_logging, BreakageReport, JsonFileStore, SafetyConfig, SafetyEngine, SensorSnapshot,
    ToolDescriptor, ToolType,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "gcodeguard",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATE"), ")"),
    about = "Checks G-code before it reaches the machine and learns from tool breakage"
)]
struct Cli {
    /// Directory holding the persisted configuration and learning database
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check and fix a G-code program
    Fix(FixArgs),
    /// Record a tool breakage
    Report(ReportArgs),
    /// List learned patterns
    Patterns {
        #[arg(long)]
        json: bool,
    },
    /// List recorded breakage incidents
    Incidents {
        #[arg(long)]
        json: bool,
    },
    /// Forget every incident and learned pattern
    ResetLearning,
    /// Write the default configuration to a .json or .toml file
    InitConfig { path: PathBuf },
}

#[derive(Args, Debug)]
struct ToolArgs {
    /// Tool type (endmill, ballnose, vbit, drill, engraver, surfacing)
    #[arg(long)]
    tool_type: Option<String>,
    /// Cutting diameter in mm
    #[arg(long, requires = "tool_type")]
    diameter: Option<f64>,
    #[arg(long, requires = "tool_type")]
    flutes: Option<u32>,
}

impl ToolArgs {
    fn descriptor(&self) -> anyhow::Result<Option<ToolDescriptor>> {
        let Some(name) = &self.tool_type else {
            return Ok(None);
        };
        let tool_type: ToolType = name.parse().map_err(anyhow::Error::msg)?;
        let mut tool = ToolDescriptor::new(tool_type);
        if let Some(diameter) = self.diameter {
            tool = tool.with_diameter(diameter);
        }
        if let Some(flutes) = self.flutes {
            tool = tool.with_flutes(flutes);
        }
        Ok(Some(tool))
    }
}

#[derive(Args, Debug)]
struct FixArgs {
    input: PathBuf,
    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Configuration file (.json or .toml); replaces the stored configuration
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    material: Option<String>,
    /// Report problems without rewriting lines
    #[arg(long)]
    warn_only: bool,
    #[command(flatten)]
    tool: ToolArgs,
}

#[derive(Args, Debug)]
struct ReportArgs {
    notes: String,
    /// Feed at failure (mm/min)
    #[arg(long)]
    feed: Option<f64>,
    #[arg(long)]
    rpm: Option<f64>,
    /// Depth of cut at failure (mm)
    #[arg(long)]
    depth: Option<f64>,
    #[arg(long)]
    material: Option<String>,
    #[command(flatten)]
    tool: ToolArgs,
    /// Chatter score from a vibration sensor, 0-100
    #[arg(long)]
    chatter: Option<f64>,
    /// Spindle load in percent of rated
    #[arg(long)]
    spindle_load: Option<f64>,
    /// Spindle drive fault code
    #[arg(long)]
    fault_code: Option<u32>,
}

impl ReportArgs {
    fn sensors(&self) -> Option<SensorSnapshot> {
        if self.chatter.is_none() && self.spindle_load.is_none() && self.fault_code.is_none() {
            return None;
        }
        Some(SensorSnapshot {
            chatter_score: self.chatter,
            spindle_load: self.spindle_load,
            output_amps: None,
            fault_code: self.fault_code,
        })
    }

    fn to_report(&self) -> anyhow::Result<BreakageReport> {
        let mut report = BreakageReport::new(self.notes.clone());
        report.feed = self.feed;
        report.rpm = self.rpm;
        report.depth = self.depth;
        report.material = self.material.clone();
        report.tool = self.tool.descriptor()?;
        report.sensors = self.sensors();
        Ok(report)
    }
}

fn open_engine(data_dir: Option<&Path>) -> anyhow::Result<SafetyEngine> {
    let store = match data_dir {
        Some(dir) => JsonFileStore::new(dir),
        None => JsonFileStore::in_data_dir()?,
    };
    tracing::debug!("Using data directory {}", store.dir().display());
    Ok(SafetyEngine::with_store(Arc::new(store)))
}

fn run_fix(engine: &mut SafetyEngine, args: &FixArgs) -> anyhow::Result<()> {
    if let Some(path) = &args.config {
        let config = SafetyConfig::load_from_file(path)?;
        engine.set_config(config)?;
        engine.save_config()?;
        tracing::info!("Stored configuration from {}", path.display());
    }
    if args.warn_only {
        let mut config = engine.config().clone();
        config.auto_fix = false;
        engine.set_config(config)?;
    }
    if let Some(material) = &args.material {
        engine.set_material(Some(material));
    }
    if let Some(tool) = args.tool.descriptor()? {
        engine.tools_mut().set_fallback(Some(tool));
    }

    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let report = engine.process_file(&text);

    for warning in &report.warnings {
        eprintln!("line {}: {}", warning.line, warning.warning);
    }
    let stats = &report.statistics;
    eprintln!(
        "{} fixes on {} of {} lines, {} warnings, {} blocked",
        report.total_fixes,
        stats.fixed_lines,
        stats.total_lines,
        stats.warning_count,
        stats.blocked_lines
    );

    match &args.output {
        Some(path) => std::fs::write(path, &report.fixed_text)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{}", report.fixed_text),
    }
    Ok(())
}

fn run_report(engine: &mut SafetyEngine, args: &ReportArgs) -> anyhow::Result<()> {
    let incident = engine.report_breakage(args.to_report()?);
    println!(
        "Recorded {} ({}, {})",
        incident.id,
        incident.tool.description_short(),
        incident.material
    );
    if incident.causes.is_empty() {
        println!("  no probable cause identified");
    }
    for cause in &incident.causes {
        println!("  probable cause: {}", cause);
    }
    Ok(())
}

fn run_patterns(engine: &SafetyEngine, json: bool) -> anyhow::Result<()> {
    if json {
        let patterns: Vec<_> = engine.learning().patterns().collect();
        println!("{}", serde_json::to_string_pretty(&patterns)?);
        return Ok(());
    }

    let limit = |value: Option<f64>| value.map_or_else(|| "-".to_string(), |v| v.to_string());
    for pattern in engine.learning().patterns() {
        println!(
            "{:<32} feed<={:<8} depth<={:<6} rpm>={:<8} incidents={}",
            pattern.key,
            limit(pattern.max_safe_feed),
            limit(pattern.max_safe_depth),
            pattern.min_safe_rpm,
            pattern.incident_count
        );
    }
    Ok(())
}

fn run_incidents(engine: &SafetyEngine, json: bool) -> anyhow::Result<()> {
    let incidents = engine.learning().incidents();
    if json {
        println!("{}", serde_json::to_string_pretty(incidents)?);
        return Ok(());
    }

    for incident in incidents {
        let causes: Vec<String> = incident.causes.iter().map(ToString::to_string).collect();
        println!(
            "{} {} {} F{} S{} depth {}: {}",
            incident.timestamp.format("%Y-%m-%d %H:%M"),
            incident.tool.description_short(),
            incident.material,
            incident.feed,
            incident.rpm,
            incident.depth,
            if causes.is_empty() {
                "no probable cause".to_string()
            } else {
                causes.join(", ")
            }
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    match &cli.command {
        Commands::InitConfig { path } => {
            SafetyConfig::default().save_to_file(path)?;
            println!("Wrote {}", path.display());
        }
        command => {
            let mut engine = open_engine(cli.data_dir.as_deref())?;
            match command {
                Commands::Fix(args) => run_fix(&mut engine, args)?,
                Commands::Report(args) => run_report(&mut engine, args)?,
                Commands::Patterns { json } => run_patterns(&engine, *json)?,
                Commands::Incidents { json } => run_incidents(&engine, *json)?,
                Commands::ResetLearning => {
                    engine.learning_mut().clear_all();
                    println!("Learning database cleared");
                }
                Commands::InitConfig { .. } => {}
            }
        }
    }

    Ok(())
}
