//! Wavefront CLI - run and inspect tool plans

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use clap::{Parser, Subcommand};
use colored::Colorize;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use wavefront::config::{OutputFormat, WaveConfig};
use wavefront::error::{FixSuggestion, WaveError};
use wavefront::runtime::{builtin_tools, Executor, NoopReporter, ProgressReporter, StepOutcome};
use wavefront::{validate_plan, Plan, RunReport, ToolRegistry};

#[derive(Parser)]
#[command(name = "wavefront")]
#[command(about = "Wavefront - wave-by-wave parallel executor for tool plans")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a plan file with the built-in tools
    Run {
        /// Path to a plan (.yaml or .json)
        file: PathBuf,

        /// Maximum number of tools running at once
        #[arg(short, long, allow_negative_numbers = true)]
        max_concurrent: Option<i64>,

        /// Print the run result as JSON instead of progress lines
        #[arg(long)]
        json: bool,

        /// Config file (default: ~/.config/wavefront/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate a plan and preview its waves
    Check {
        /// Path to a plan (.yaml or .json)
        file: PathBuf,
    },

    /// List built-in tools
    Tools,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so `--json` output stays parseable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            file,
            max_concurrent,
            json,
            config,
        } => run_plan(&file, max_concurrent, json, config.as_deref()).await,
        Commands::Check { file } => check_plan(&file).await,
        Commands::Tools => {
            list_tools();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

/// Read without blocking the runtime; `.json` files are parsed as JSON
async fn load_plan(file: &Path) -> Result<Plan, WaveError> {
    let content = tokio::fs::read_to_string(file).await?;
    Plan::from_str_for_path(&content, file)
}

async fn run_plan(
    file: &Path,
    max_concurrent: Option<i64>,
    json: bool,
    config_path: Option<&Path>,
) -> Result<(), WaveError> {
    let config = WaveConfig::resolve(config_path, max_concurrent)?;
    let json = json || config.output.format == OutputFormat::Json;
    let plan = load_plan(file).await?;

    let executor = Executor::builder()
        .registry(builtin_tools())
        .max_concurrent(config.max_concurrent()?)
        .build()?;

    let report = if json {
        executor.run(&plan, &NoopReporter).await
    } else {
        println!(
            "{} Running plan with {} steps (max concurrent: {})...\n",
            "→".cyan(),
            plan.len(),
            executor
                .max_concurrent()
                .map_or_else(|| "unbounded".to_string(), |n| n.to_string())
                .cyan()
        );
        if let Some(rationale) = &plan.rationale {
            println!("  {} {}\n", "Rationale:".dimmed(), rationale);
        }
        executor.run(&plan, &ConsoleReporter::new()).await
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else {
        print_summary(&report);
    }

    match report.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn print_summary(report: &RunReport) {
    let succeeded = report.state.count_succeeded();
    let failed = report.state.count_failed();
    let duration = format!("{:.2}s", report.duration.as_secs_f32());

    println!();
    if report.is_success() {
        println!(
            "{} Run completed: {} steps in {} waves ({})",
            "✓".green(),
            succeeded,
            report.waves.len(),
            duration
        );
    } else {
        println!(
            "{} Run failed: {} succeeded, {} failed ({})",
            "✗".red(),
            succeeded,
            failed,
            duration
        );
    }
}

async fn check_plan(file: &Path) -> Result<(), WaveError> {
    let plan = load_plan(file).await?;
    let graph = validate_plan(&plan)?;

    println!("{} Plan '{}' is valid", "✓".green(), file.display());
    println!("  Steps: {}", plan.len());
    if let Some(rationale) = &plan.rationale {
        println!("  Rationale: {}", rationale);
    }

    let waves = graph.waves();
    println!("  Waves: {}", waves.len());
    for (index, wave) in waves.iter().enumerate() {
        let ids: Vec<&str> = wave.iter().map(AsRef::as_ref).collect();
        println!("    {} {}", format!("[{}]", index).dimmed(), ids.join(", "));
    }

    Ok(())
}

fn list_tools() {
    let tools = builtin_tools();
    println!("{}", "Built-in tools:".cyan().bold());
    for id in tools.tool_ids() {
        println!("  {}", id);
    }
}

/// Coloured progress lines: `[⟳] step running...` then `[n/total] step ✓ (0.1s)`
struct ConsoleReporter {
    completed: AtomicUsize,
    total: AtomicUsize,
    started: Mutex<FxHashMap<String, Instant>>,
}

impl ConsoleReporter {
    fn new() -> Self {
        Self {
            completed: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            started: Mutex::new(FxHashMap::default()),
        }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn on_step_start(&self, step_id: &str, wave: usize, total_steps: usize) -> anyhow::Result<()> {
        self.total.store(total_steps, Ordering::Relaxed);
        self.started.lock().insert(step_id.to_string(), Instant::now());
        println!(
            "  {} {} {}",
            "[⟳]".yellow(),
            step_id,
            format!("running (wave {})...", wave).dimmed()
        );
        Ok(())
    }

    fn on_step_finish(&self, step_id: &str, outcome: StepOutcome<'_>) -> anyhow::Result<()> {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        let total = self.total.load(Ordering::Relaxed);
        let elapsed = self
            .started
            .lock()
            .remove(step_id)
            .map(|t| t.elapsed().as_secs_f32())
            .unwrap_or_default();

        let counter = format!("[{}/{}]", completed, total);
        let duration = format!("({:.1}s)", elapsed).dimmed();

        match outcome {
            StepOutcome::Succeeded(_) => {
                println!("  {} {} {} {}", counter.green(), step_id, "✓".green(), duration)
            }
            StepOutcome::Failed(err) => {
                println!("  {} {} {} {}", counter.red(), step_id, "✗".red(), duration);
                println!("      {} {}", "Error:".red(), err);
            }
        }
        Ok(())
    }
}
