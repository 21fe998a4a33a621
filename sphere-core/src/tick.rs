use crate::grid::Grid;
use crate::movement::run_movement_pass;
#[cfg(feature = "profiling")]
use crate::profiling;
use crate::{SimError, Simulation, TickProgress};
use sphere_types::{TickPhase, TickReport};
#[cfg(feature = "profiling")]
use std::time::Instant;
use tracing::trace;

impl Simulation {
    /// Runs the remaining phases of the current tick through Publish.
    pub fn tick(&mut self) -> Result<TickReport, SimError> {
        #[cfg(feature = "profiling")]
        let tick_started = Instant::now();

        loop {
            if self.step_phase()? == TickPhase::Publish {
                break;
            }
        }

        #[cfg(feature = "profiling")]
        profiling::record_tick_total(tick_started.elapsed());

        Ok(TickReport {
            tick: self.tick,
            added: self.metrics.added_last_tick,
            metrics: self.metrics.clone(),
        })
    }

    pub fn step_n(&mut self, count: u32) -> Result<Vec<TickReport>, SimError> {
        let mut reports = Vec::with_capacity(count as usize);
        for _ in 0..count {
            reports.push(self.tick()?);
        }
        Ok(reports)
    }

    /// Runs exactly one phase and returns it. A failed Grow leaves the
    /// simulation at the Grow boundary with its previous buffers.
    pub fn step_phase(&mut self) -> Result<TickPhase, SimError> {
        let phase = self.phase;

        #[cfg(feature = "profiling")]
        let phase_started = Instant::now();

        match phase {
            TickPhase::Grow => self.grow_phase()?,
            TickPhase::BuildGrid => self.build_grid_phase(),
            TickPhase::Move => self.move_phase(),
            TickPhase::Publish => self.publish_phase(),
        }

        #[cfg(feature = "profiling")]
        profiling::record_tick_phase(phase, phase_started.elapsed());

        self.phase = phase.next();
        Ok(phase)
    }

    fn grow_phase(&mut self) -> Result<(), SimError> {
        self.progress = TickProgress::default();
        let requested = std::mem::take(&mut self.pending_growth);
        self.progress.added = self.grow_population(requested)?;
        Ok(())
    }

    fn build_grid_phase(&mut self) {
        let grid = Grid::build(self.layout, &self.positions, self.params.min_batch);
        self.metrics.occupied_cells_last_tick = grid.occupied_cells() as u32;
        self.metrics.max_chunk_occupancy_last_tick = grid.max_occupancy() as u32;
        self.grids.stage(grid);
    }

    fn move_phase(&mut self) {
        self.grids.publish();
        let grid = self
            .grids
            .previous()
            .expect("grid must be staged before the movement phase");
        self.progress.pass = run_movement_pass(
            &self.positions,
            &mut self.next_positions,
            &mut self.directions,
            grid,
            &self.params,
        );
        std::mem::swap(&mut self.positions, &mut self.next_positions);
    }

    fn publish_phase(&mut self) {
        self.grids.release();
        self.debug_assert_consistent_state();

        let progress = self.progress;
        self.tick = self.tick.saturating_add(1);
        self.metrics.ticks = self.tick;
        self.metrics.population = self.positions.len() as u32;
        self.metrics.added_last_tick = progress.added;
        self.metrics.total_added += u64::from(progress.added);
        self.metrics.avoidance_steers_last_tick = progress.pass.steered;
        self.metrics.bounces_last_tick = progress.pass.bounces;

        trace!(
            tick = self.tick,
            population = self.metrics.population,
            steered = progress.pass.steered,
            bounces = progress.pass.bounces,
            "tick published"
        );
    }
}
