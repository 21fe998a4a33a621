#[cfg(feature = "profiling")]
use sphere_config::default_simulation_config;
#[cfg(feature = "profiling")]
use sphere_core::profiling::{self, PhaseCounterSnapshot, ProfilingSnapshot};
#[cfg(feature = "profiling")]
use sphere_core::Simulation;
#[cfg(feature = "profiling")]
use std::time::{Duration, Instant};

#[cfg(feature = "profiling")]
#[derive(Clone, Copy)]
struct Args {
    ticks: u32,
    warmup_ticks: u32,
    entities: u32,
    seed: u64,
}

#[cfg(feature = "profiling")]
fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[cfg(not(feature = "profiling"))]
fn main() {
    eprintln!(
        "This example requires the `profiling` feature.\n\
         Run: cargo run -p sphere-core --release --features profiling --example profile_tick_path -- --help"
    );
    std::process::exit(1);
}

#[cfg(feature = "profiling")]
fn run() -> Result<(), String> {
    let args = parse_args()?;
    let mut config = default_simulation_config();
    config.initial_entities = args.entities;
    let mut sim = Simulation::new(config, args.seed)
        .map_err(|err| format!("failed to initialize simulation: {err}"))?;

    sim.step_n(args.warmup_ticks.max(1))
        .map_err(|err| format!("warmup failed: {err}"))?;

    profiling::reset();
    let started = Instant::now();
    sim.step_n(args.ticks)
        .map_err(|err| format!("profiled run failed: {err}"))?;
    let elapsed = started.elapsed();

    print_report(args, &profiling::snapshot(), elapsed);
    Ok(())
}

#[cfg(feature = "profiling")]
fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        ticks: 500,
        warmup_ticks: 50,
        entities: 20_000,
        seed: 42,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--ticks" => args.ticks = parse_value(&mut iter, "--ticks")?,
            "--warmup-ticks" => args.warmup_ticks = parse_value(&mut iter, "--warmup-ticks")?,
            "--entities" => args.entities = parse_value(&mut iter, "--entities")?,
            "--seed" => args.seed = parse_value(&mut iter, "--seed")?,
            "--help" | "-h" => {
                println!("Profiles the per-tick phases of the sphere simulation.");
                println!(
                    "  cargo run -p sphere-core --release --features profiling --example profile_tick_path -- \
                     [--ticks N] [--warmup-ticks N] [--entities N] [--seed N]"
                );
                std::process::exit(0);
            }
            _ => {
                return Err(format!("unknown flag `{flag}`. Use `--help` for usage."));
            }
        }
    }

    if args.ticks == 0 {
        return Err("`--ticks` must be >= 1".to_owned());
    }

    Ok(args)
}

#[cfg(feature = "profiling")]
fn parse_value<T>(iter: &mut impl Iterator<Item = String>, flag: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = iter
        .next()
        .ok_or_else(|| format!("missing value for `{flag}`"))?;
    raw.parse::<T>()
        .map_err(|err| format!("invalid value `{raw}` for `{flag}`: {err}"))
}

#[cfg(feature = "profiling")]
fn print_report(args: Args, snapshot: &ProfilingSnapshot, elapsed: Duration) {
    let ticks = f64::from(args.ticks);
    println!(
        "{} ticks, {} entities, seed {}: {:.3} ms/tick wall",
        args.ticks,
        args.entities,
        args.seed,
        elapsed.as_secs_f64() * 1_000.0 / ticks
    );
    print_row("tick total", snapshot.tick_total);
    print_row("grow", snapshot.grow);
    print_row("build grid", snapshot.build_grid);
    print_row("movement", snapshot.movement);
    print_row("publish", snapshot.publish);
}

#[cfg(feature = "profiling")]
fn print_row(label: &str, counter: PhaseCounterSnapshot) {
    println!(
        "  {label:<12} {:>10.1} us avg over {} calls",
        counter.avg_ns() / 1_000.0,
        counter.calls
    );
}
