//! dbpilot CLI: run planning cycles against a simulated database.

mod scenario;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use dbpilot_core::PilotConfig;
use dbpilot_forecast::{QueryTrace, WorkloadForecast};
use dbpilot_oracle::LinearCostModel;
use dbpilot_planner::{generate_actions, CsvTraceSource, Pilot, PlanningOutcome};
use dbpilot_sim::{SimEngine, SimSettings};

use crate::scenario::{apply_scenario_config, parse_scenario, Scenario};

#[derive(Parser)]
#[command(name = "dbpilot")]
#[command(about = "Self-driving configuration planner over a recorded query trace", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one planning cycle and apply the best action
    Plan {
        /// Path to the scenario YAML file
        #[arg(short, long)]
        scenario: PathBuf,

        /// query_text.csv
        #[arg(long)]
        query_text: PathBuf,

        /// query_trace.csv
        #[arg(long)]
        query_trace: PathBuf,

        /// Segment width in microseconds (overrides config)
        #[arg(long)]
        interval_us: Option<u64>,

        /// Expansions per cycle (overrides config)
        #[arg(long)]
        rollout_budget: Option<usize>,

        /// Maximum search depth (overrides config)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Sampling seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,

        /// Print the planning manifest as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how a trace is segmented
    Segments {
        #[arg(long)]
        query_text: PathBuf,

        #[arg(long)]
        query_trace: PathBuf,

        /// Segment width in microseconds (overrides config)
        #[arg(long)]
        interval_us: Option<u64>,

        /// Bindings kept per query per segment (overrides config)
        #[arg(long)]
        num_samples: Option<usize>,
    },

    /// List the candidate actions a scenario generates
    Actions {
        #[arg(short, long)]
        scenario: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Plan {
            scenario,
            query_text,
            query_trace,
            interval_us,
            rollout_budget,
            max_depth,
            seed,
            json,
        } => {
            let overrides = Overrides {
                interval_us,
                rollout_budget,
                max_depth,
                seed,
                num_samples: None,
            };
            plan(&scenario, &query_text, &query_trace, &overrides, json)
        }
        Commands::Segments {
            query_text,
            query_trace,
            interval_us,
            num_samples,
        } => {
            let overrides = Overrides {
                interval_us,
                num_samples,
                ..Overrides::default()
            };
            segments(&query_text, &query_trace, &overrides)
        }
        Commands::Actions { scenario } => actions(&scenario),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[derive(Debug, Default)]
struct Overrides {
    interval_us: Option<u64>,
    num_samples: Option<usize>,
    rollout_budget: Option<usize>,
    max_depth: Option<usize>,
    seed: Option<u64>,
}

/// Env, then scenario, then command-line flags.
fn resolve_config(scenario: Option<&Scenario>, overrides: &Overrides) -> PilotConfig {
    let mut config = PilotConfig::from_env();
    if let Some(s) = scenario {
        apply_scenario_config(&mut config, &s.config);
    }
    if let Some(v) = overrides.interval_us {
        config.forecast_interval_us = v;
    }
    if let Some(v) = overrides.num_samples {
        config.num_samples = v;
    }
    if let Some(v) = overrides.rollout_budget {
        config.rollout_budget = v;
    }
    if let Some(v) = overrides.max_depth {
        config.max_search_depth = v;
    }
    if let Some(v) = overrides.seed {
        config.seed = Some(v);
    }
    debug!(
        interval_us = config.forecast_interval_us,
        num_samples = config.num_samples,
        rollout_budget = config.rollout_budget,
        max_depth = config.max_search_depth,
        seed = ?config.seed,
        "resolved pilot config"
    );
    config
}

fn load_scenario(path: &Path) -> Result<Scenario, Box<dyn std::error::Error>> {
    let yaml_content = fs::read_to_string(path)?;
    let scenario = parse_scenario(&yaml_content)?;
    debug!(
        path = %path.display(),
        tables = scenario.tables.len(),
        functions = scenario.functions.len(),
        knobs = scenario.knobs.len(),
        "loaded scenario"
    );
    Ok(scenario)
}

fn plan(
    scenario_path: &Path,
    query_text: &Path,
    query_trace: &Path,
    overrides: &Overrides,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = load_scenario(scenario_path)?;
    let config = resolve_config(Some(&scenario), overrides);

    let engine = SimEngine::new(scenario.database()?);
    let settings = SimSettings::new(scenario.knobs.clone());
    let catalog = generate_actions(&scenario.actions)?;
    let source = CsvTraceSource::new(query_text, query_trace);

    let mut pilot = Pilot::new(
        config,
        source,
        engine,
        settings,
        catalog,
        LinearCostModel::uniform(),
    )?;

    let outcome = pilot.perform_planning()?;
    info!(
        applied = outcome.manifest().is_some(),
        segments = pilot.num_segments(),
        "plan command finished"
    );
    match outcome {
        PlanningOutcome::Skipped(reason) => {
            println!("Planning skipped: {:?}", reason);
        }
        PlanningOutcome::Applied(manifest) if json => {
            println!("{}", serde_json::to_string_pretty(&manifest)?);
        }
        PlanningOutcome::Applied(manifest) => {
            println!("✓ Applied {}", manifest.applied_command);
            println!("  Segments: {}", manifest.num_segments);
            println!("  Candidate actions: {}", manifest.num_candidate_actions);
            println!(
                "  Cost: {:.2} (baseline {:.2})",
                manifest.chosen_cost, manifest.baseline_cost
            );
            println!(
                "  Rollouts: {} ({} nodes)",
                manifest.rollouts, manifest.tree_size
            );
            println!(
                "  Duration: {}ms",
                manifest.finished_ms - manifest.started_ms
            );
            println!("  Forecast hash: {}", manifest.forecast_hash);
        }
    }
    Ok(())
}

fn segments(
    query_text: &Path,
    query_trace: &Path,
    overrides: &Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(None, overrides);
    config.validate()?;
    let trace = QueryTrace::from_csv_files(query_text, query_trace)?;
    let forecast =
        WorkloadForecast::build(&trace, config.forecast_interval_us, config.num_samples)?;
    info!(
        events = trace.len(),
        segments = forecast.num_segments(),
        "segments command finished"
    );

    println!("Forecast Segments");
    println!("=================");
    println!(
        "{} events, {} queries, {} segments of {}us",
        trace.len(),
        forecast.queries().count(),
        forecast.num_segments(),
        forecast.interval_us()
    );
    for segment in forecast.segments() {
        println!(
            "  {}. [{}, {}) - {} arrivals",
            segment.index,
            segment.start_us,
            segment.end_us,
            segment.total_arrivals()
        );
        for qid in segment.query_ids() {
            println!(
                "       {}: {} arrivals, {} samples",
                qid,
                segment.arrivals(qid),
                segment.samples(qid).len()
            );
        }
    }
    Ok(())
}

fn actions(scenario_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = load_scenario(scenario_path)?;
    let catalog = generate_actions(&scenario.actions)?;

    println!("Candidate Actions ({})", catalog.len());
    for action in catalog.iter() {
        let command = action
            .to_command(&scenario.knobs)
            .unwrap_or_else(|e| format!("<{}>", e));
        let inverse = catalog
            .inverse_of(action.id)
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".into());
        println!("  {}  {}  (inverse {})", action, command, inverse);
    }
    Ok(())
}
