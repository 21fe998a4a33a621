use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sphere_config::{default_simulation_config, load_simulation_config_from_path, SimulationConfig};
use sphere_core::{Simulation, SimulationRunner};
use sphere_types::{MetricsSnapshot, SimEvent};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "sphere-cli")]
#[command(about = "Bounded-volume sphere movement simulation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs a headless simulation and prints a summary.
    Run {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 100)]
        ticks: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long)]
        entities: Option<u32>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Times a headless run after the initial growth tick and prints throughput.
    Benchmark {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 200)]
        ticks: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long)]
        entities: Option<u32>,
    },
    /// Drives the background runner in real time, growing the population mid-run.
    Live {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 5.0)]
        seconds: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 1_000)]
        grow_by: u64,
        #[arg(long, default_value_t = 2.0)]
        grow_after_seconds: f64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Pretty,
    Json,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    ticks: u32,
    seed: u64,
    final_tick: u64,
    population: u32,
    avoidance_steers_last_tick: u32,
    bounces_last_tick: u32,
}

#[derive(Debug, Serialize)]
struct BenchmarkSummary {
    ticks: u32,
    population: u32,
    elapsed_ms: u128,
    avg_ms_per_tick: f64,
    ns_per_entity_tick: f64,
    final_metrics: MetricsSnapshot,
}

#[derive(Debug, Default, Serialize)]
struct LiveSummary {
    ticks: u64,
    frames_received: u64,
    entities_added: u64,
    growth_rejections: u64,
    lagged_events: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "sphere_cli=info,sphere_core=info".to_owned()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            ticks,
            seed,
            entities,
            format,
            out,
        } => run_command(config, ticks, seed, entities, format, out),
        Commands::Benchmark {
            config,
            ticks,
            seed,
            entities,
        } => benchmark_command(config, ticks, seed, entities),
        Commands::Live {
            config,
            seconds,
            seed,
            grow_by,
            grow_after_seconds,
        } => live_command(config, seconds, seed, grow_by, grow_after_seconds).await,
    }
}

fn run_command(
    config_path: Option<PathBuf>,
    ticks: u32,
    seed: u64,
    entities: Option<u32>,
    format: OutputFormat,
    out: Option<PathBuf>,
) -> Result<()> {
    let cfg = load_config(config_path, entities)?;
    let mut sim = Simulation::new(cfg, seed)?;
    sim.step_n(ticks)?;
    let metrics = sim.metrics();

    let summary = RunSummary {
        ticks,
        seed,
        final_tick: sim.ticks(),
        population: metrics.population,
        avoidance_steers_last_tick: metrics.avoidance_steers_last_tick,
        bounces_last_tick: metrics.bounces_last_tick,
    };

    let text = match format {
        OutputFormat::Pretty => format!(
            "ticks={} seed={} final_tick={} population={} steers_last_tick={} bounces_last_tick={}",
            summary.ticks,
            summary.seed,
            summary.final_tick,
            summary.population,
            summary.avoidance_steers_last_tick,
            summary.bounces_last_tick
        ),
        OutputFormat::Json => serde_json::to_string_pretty(&summary)?,
    };
    write_output(text, out)
}

fn benchmark_command(
    config_path: Option<PathBuf>,
    ticks: u32,
    seed: u64,
    entities: Option<u32>,
) -> Result<()> {
    let cfg = load_config(config_path, entities)?;
    let mut sim = Simulation::new(cfg, seed)?;
    // The first tick applies the initial growth; keep it out of the timing.
    sim.tick()?;

    let ticks = ticks.max(1);
    let start = Instant::now();
    sim.step_n(ticks)?;
    let elapsed = start.elapsed();
    let population = sim.metrics().population;

    let summary = BenchmarkSummary {
        ticks,
        population,
        elapsed_ms: elapsed.as_millis(),
        avg_ms_per_tick: elapsed.as_secs_f64() * 1000.0 / f64::from(ticks),
        ns_per_entity_tick: elapsed.as_secs_f64() * 1.0e9
            / (f64::from(ticks) * f64::from(population.max(1))),
        final_metrics: sim.metrics().clone(),
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn live_command(
    config_path: Option<PathBuf>,
    seconds: f64,
    seed: u64,
    grow_by: u64,
    grow_after_seconds: f64,
) -> Result<()> {
    let cfg = load_config(config_path, None)?;
    let runner = SimulationRunner::new(cfg, seed)?;
    let mut events = runner.subscribe();
    runner.start().await?;

    let deadline = tokio::time::sleep(Duration::from_secs_f64(seconds.max(0.0)));
    let grow_at = tokio::time::sleep(Duration::from_secs_f64(grow_after_seconds.max(0.0)));
    tokio::pin!(deadline, grow_at);
    let mut grown = grow_by == 0;
    let mut summary = LiveSummary::default();

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = &mut grow_at, if !grown => {
                grown = true;
                info!(count = grow_by, "requesting population growth");
                runner.request_growth(grow_by);
            }
            event = events.recv() => match event {
                Ok(SimEvent::Frame(frame)) => {
                    summary.frames_received += 1;
                    debug!(tick = frame.tick, population = frame.positions.len(), "frame");
                }
                Ok(SimEvent::EntitiesAdded { added, population }) => {
                    summary.entities_added += u64::from(added);
                    info!(added, population, "entities added");
                }
                Ok(SimEvent::GrowthRejected { requested, reason }) => {
                    summary.growth_rejections += 1;
                    warn!(requested, %reason, "growth rejected");
                }
                Ok(SimEvent::Stopped { .. }) => {}
                Err(RecvError::Lagged(skipped)) => {
                    summary.lagged_events += skipped;
                    warn!(skipped, "event subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    summary.ticks = runner.stop().await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn load_config(path: Option<PathBuf>, entities: Option<u32>) -> Result<SimulationConfig> {
    let mut cfg = match path {
        Some(path) => load_simulation_config_from_path(&path)?,
        None => default_simulation_config(),
    };
    if let Some(entities) = entities {
        cfg.initial_entities = entities;
    }
    Ok(cfg)
}

fn write_output(text: String, out: Option<PathBuf>) -> Result<()> {
    if let Some(path) = out {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating output directory {}", parent.display())
            })?;
        }
        fs::write(&path, text).with_context(|| format!("failed writing {}", path.display()))?;
        println!("wrote output to {}", path.display());
    } else {
        println!("{text}");
    }
    Ok(())
}
