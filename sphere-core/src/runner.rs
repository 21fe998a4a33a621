use crate::{SimError, Simulation};
use sphere_config::SimulationConfig;
use sphere_types::SimEvent;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct RunnerShared {
    running: AtomicBool,
    pending_growth: AtomicU64,
    population: AtomicU32,
}

#[derive(Default)]
struct RuntimeState {
    simulation: Option<Simulation>,
    runner: Option<JoinHandle<Result<Simulation, SimError>>>,
}

/// Drives a [`Simulation`] on a background task, one tick after another.
///
/// Growth requested through the runner is applied at the next Grow boundary.
/// `stop` lets the tick in flight finish before releasing the buffers.
pub struct SimulationRunner {
    shared: Arc<RunnerShared>,
    events: broadcast::Sender<SimEvent>,
    runtime: Mutex<RuntimeState>,
}

impl SimulationRunner {
    pub fn new(config: SimulationConfig, seed: u64) -> Result<Self, SimError> {
        Ok(Self::from_simulation(Simulation::new(config, seed)?))
    }

    pub fn from_simulation(simulation: Simulation) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shared = RunnerShared::default();
        shared
            .population
            .store(simulation.entity_count() as u32, Ordering::Release);
        Self {
            shared: Arc::new(shared),
            events,
            runtime: Mutex::new(RuntimeState {
                simulation: Some(simulation),
                runner: None,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Population as of the last published tick.
    pub fn entity_count(&self) -> u32 {
        self.shared.population.load(Ordering::Acquire)
    }

    pub fn request_growth(&self, count: u64) {
        let _ = self
            .shared
            .pending_growth
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| {
                Some(pending.saturating_add(count))
            });
    }

    /// Growth queued for the next tick the runner schedules.
    pub fn pending_growth(&self) -> u64 {
        self.shared.pending_growth.load(Ordering::Acquire)
    }

    pub async fn start(&self) -> Result<(), SimError> {
        let mut runtime = self.runtime.lock().await;
        if runtime.runner.is_some() {
            return Err(SimError::AlreadyRunning);
        }
        let simulation = runtime
            .simulation
            .take()
            .ok_or_else(|| SimError::Worker("simulation was lost by a failed run".to_owned()))?;

        info!(
            population = simulation.entity_count(),
            ticks = simulation.ticks(),
            "simulation starting"
        );
        self.shared.running.store(true, Ordering::Release);
        runtime.runner = Some(tokio::spawn(run_loop(
            simulation,
            self.shared.clone(),
            self.events.clone(),
        )));
        Ok(())
    }

    /// Stops scheduling ticks, joins the tick in flight and frees all buffers.
    /// Returns the number of ticks simulated so far.
    pub async fn stop(&self) -> Result<u64, SimError> {
        let mut runtime = self.runtime.lock().await;
        let handle = runtime.runner.take().ok_or(SimError::NotRunning)?;
        self.shared.running.store(false, Ordering::Release);

        let joined = handle
            .await
            .map_err(|err| SimError::Worker(format!("tick loop join error: {err}")))?;
        let mut simulation = match joined {
            Ok(simulation) => simulation,
            Err(err) => {
                error!("tick loop ended with error: {err}");
                return Err(err);
            }
        };

        let ticks = simulation.ticks();
        simulation.release();
        self.shared.population.store(0, Ordering::Release);
        runtime.simulation = Some(simulation);

        info!(ticks, "simulation stopped");
        let _ = self.events.send(SimEvent::Stopped { ticks });
        Ok(ticks)
    }
}

impl Drop for SimulationRunner {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
    }
}

async fn run_loop(
    mut simulation: Simulation,
    shared: Arc<RunnerShared>,
    events: broadcast::Sender<SimEvent>,
) -> Result<Simulation, SimError> {
    let tick_interval = match simulation.config().ticks_per_second {
        0 => None,
        tps => Some(Duration::from_secs_f64(1.0 / f64::from(tps))),
    };

    while shared.running.load(Ordering::Acquire) {
        let tick_started = Instant::now();

        let pending = shared.pending_growth.swap(0, Ordering::AcqRel);
        simulation.request_growth(pending);

        let (returned, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = simulation.tick();
            (simulation, outcome)
        })
        .await
        .map_err(|err| {
            shared.running.store(false, Ordering::Release);
            error!("tick worker failed: {err}");
            SimError::Worker(format!("tick worker join error: {err}"))
        })?;
        simulation = returned;

        match outcome {
            Ok(report) => {
                shared
                    .population
                    .store(report.metrics.population, Ordering::Release);
                if report.added > 0 {
                    let _ = events.send(SimEvent::EntitiesAdded {
                        added: report.added,
                        population: report.metrics.population,
                    });
                }
                // Subscribers consume this frame while the next tick builds its grid.
                let _ = events.send(SimEvent::Frame(simulation.frame_snapshot()));
            }
            Err(SimError::Allocation {
                requested,
                population,
            }) => {
                warn!(requested, population, "population growth rejected");
                let _ = events.send(SimEvent::GrowthRejected {
                    requested,
                    reason: SimError::Allocation {
                        requested,
                        population,
                    }
                    .to_string(),
                });
            }
            Err(err) => {
                shared.running.store(false, Ordering::Release);
                error!("tick failed: {err}");
                return Err(err);
            }
        }

        match tick_interval {
            Some(interval) => {
                let remaining = interval.saturating_sub(tick_started.elapsed());
                tokio::time::sleep(remaining).await;
            }
            None => tokio::task::yield_now().await,
        }
    }

    Ok(simulation)
}
