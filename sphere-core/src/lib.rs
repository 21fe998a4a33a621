use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sphere_config::{validate_simulation_config, SimulationConfig};
use sphere_types::{EntityState, FrameSnapshot, MetricsSnapshot, TickPhase};
use thiserror::Error;

pub mod chunk;
pub mod grid;
pub mod movement;
mod runner;
mod spawn;
mod tick;

#[cfg(feature = "profiling")]
#[path = "../profiling/profiling.rs"]
pub mod profiling;

#[cfg(test)]
mod tests;

pub use chunk::Chunk;
pub use grid::{classify_cell, Grid, GridLayout};
pub use movement::{MovementParams, PassSummary};
pub use runner::SimulationRunner;

use grid::GridHandles;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),
    #[error("cannot grow population of {population} by {requested} entities")]
    Allocation { requested: u64, population: usize },
    #[error("simulation is already running")]
    AlreadyRunning,
    #[error("simulation is not running")]
    NotRunning,
    #[error("entities can only be placed between ticks, not during {0:?}")]
    MidTick(TickPhase),
    #[error("simulation worker failed: {0}")]
    Worker(String),
}

#[derive(Debug, Clone, Copy, Default)]
struct TickProgress {
    added: u32,
    pass: PassSummary,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
    layout: GridLayout,
    params: MovementParams,
    tick: u64,
    seed: u64,
    rng: ChaCha8Rng,
    positions: Vec<Vec3>,
    next_positions: Vec<Vec3>,
    directions: Vec<Vec3>,
    grids: GridHandles,
    pending_growth: u64,
    phase: TickPhase,
    progress: TickProgress,
    metrics: MetricsSnapshot,
}

impl Simulation {
    /// Validates `config` and queues `initial_entities` for the first Grow phase.
    pub fn new(config: SimulationConfig, seed: u64) -> Result<Self, SimError> {
        validate_simulation_config(&config).map_err(SimError::InvalidConfig)?;

        let layout = GridLayout::new(
            Vec3::from_array(config.volume_center),
            Vec3::from_array(config.volume_size),
            config.separation_count,
        );
        let params = MovementParams::from_config(&config);
        let pending_growth = u64::from(config.initial_entities);

        Ok(Self {
            config,
            layout,
            params,
            tick: 0,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            positions: Vec::new(),
            next_positions: Vec::new(),
            directions: Vec::new(),
            grids: GridHandles::default(),
            pending_growth,
            phase: TickPhase::Grow,
            progress: TickProgress::default(),
            metrics: MetricsSnapshot::default(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Phase that the next call to [`Simulation::step_phase`] will run.
    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    pub fn entity_count(&self) -> usize {
        self.positions.len()
    }

    pub fn pending_growth(&self) -> u64 {
        self.pending_growth
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn directions(&self) -> &[Vec3] {
        &self.directions
    }

    /// Grid of the tick in progress, whether staged by BuildGrid or already
    /// handed to the movement pass. `None` between ticks.
    pub fn grid(&self) -> Option<&Grid> {
        self.grids.staged().or_else(|| self.grids.previous())
    }

    pub fn metrics(&self) -> &MetricsSnapshot {
        &self.metrics
    }

    /// Queues `count` entities; they are spawned at the next Grow phase.
    pub fn request_growth(&mut self, count: u64) {
        self.pending_growth = self.pending_growth.saturating_add(count);
    }

    pub fn entity(&self, index: usize) -> Option<EntityState> {
        let position = self.positions.get(index)?;
        let direction = self.directions.get(index)?;
        Some(EntityState {
            index: index as u32,
            position: position.to_array(),
            direction: direction.to_array(),
        })
    }

    pub fn entities(&self) -> Vec<EntityState> {
        (0..self.entity_count())
            .filter_map(|index| self.entity(index))
            .collect()
    }

    pub fn frame_snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            tick: self.tick,
            positions: self.positions.iter().map(|p| p.to_array()).collect(),
        }
    }

    /// Frees every buffer and drops queued growth. The tick counter survives.
    pub fn release(&mut self) {
        self.positions = Vec::new();
        self.next_positions = Vec::new();
        self.directions = Vec::new();
        self.grids.clear();
        self.pending_growth = 0;
        self.phase = TickPhase::Grow;
        self.progress = TickProgress::default();
        self.metrics.population = 0;
    }

    fn debug_assert_consistent_state(&self) {
        if cfg!(debug_assertions) {
            debug_assert_eq!(self.positions.len(), self.directions.len());
            debug_assert_eq!(self.positions.len(), self.next_positions.len());
            for direction in &self.directions {
                debug_assert!(
                    (direction.length() - 1.0).abs() < 1.0e-3,
                    "direction {direction} is not unit length"
                );
            }
        }
    }
}
