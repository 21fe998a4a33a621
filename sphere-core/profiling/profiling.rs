use sphere_types::TickPhase;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Clone, Copy, Debug, Default)]
pub struct PhaseCounterSnapshot {
    pub total_ns: u64,
    pub calls: u64,
}

impl PhaseCounterSnapshot {
    pub fn avg_ns(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.total_ns as f64 / self.calls as f64
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProfilingSnapshot {
    pub tick_total: PhaseCounterSnapshot,
    pub grow: PhaseCounterSnapshot,
    pub build_grid: PhaseCounterSnapshot,
    pub movement: PhaseCounterSnapshot,
    pub publish: PhaseCounterSnapshot,
}

#[derive(Debug)]
struct AtomicPhaseCounter {
    total_ns: AtomicU64,
    calls: AtomicU64,
}

impl AtomicPhaseCounter {
    const fn new() -> Self {
        Self {
            total_ns: AtomicU64::new(0),
            calls: AtomicU64::new(0),
        }
    }

    fn record(&self, elapsed: Duration) {
        self.total_ns
            .fetch_add(duration_to_ns(elapsed), Ordering::Relaxed);
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.total_ns.store(0, Ordering::Relaxed);
        self.calls.store(0, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PhaseCounterSnapshot {
        PhaseCounterSnapshot {
            total_ns: self.total_ns.load(Ordering::Relaxed),
            calls: self.calls.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
struct ProfilingState {
    tick_total: AtomicPhaseCounter,
    grow: AtomicPhaseCounter,
    build_grid: AtomicPhaseCounter,
    movement: AtomicPhaseCounter,
    publish: AtomicPhaseCounter,
}

impl ProfilingState {
    const fn new() -> Self {
        Self {
            tick_total: AtomicPhaseCounter::new(),
            grow: AtomicPhaseCounter::new(),
            build_grid: AtomicPhaseCounter::new(),
            movement: AtomicPhaseCounter::new(),
            publish: AtomicPhaseCounter::new(),
        }
    }

    fn counter(&self, phase: TickPhase) -> &AtomicPhaseCounter {
        match phase {
            TickPhase::Grow => &self.grow,
            TickPhase::BuildGrid => &self.build_grid,
            TickPhase::Move => &self.movement,
            TickPhase::Publish => &self.publish,
        }
    }

    fn reset(&self) {
        self.tick_total.reset();
        for phase in TickPhase::ALL {
            self.counter(phase).reset();
        }
    }

    fn snapshot(&self) -> ProfilingSnapshot {
        ProfilingSnapshot {
            tick_total: self.tick_total.snapshot(),
            grow: self.grow.snapshot(),
            build_grid: self.build_grid.snapshot(),
            movement: self.movement.snapshot(),
            publish: self.publish.snapshot(),
        }
    }
}

static PROFILING_STATE: ProfilingState = ProfilingState::new();

fn duration_to_ns(elapsed: Duration) -> u64 {
    elapsed.as_nanos().min(u128::from(u64::MAX)) as u64
}

pub(crate) fn record_tick_total(elapsed: Duration) {
    PROFILING_STATE.tick_total.record(elapsed);
}

pub(crate) fn record_tick_phase(phase: TickPhase, elapsed: Duration) {
    PROFILING_STATE.counter(phase).record(elapsed);
}

pub fn reset() {
    PROFILING_STATE.reset();
}

pub fn snapshot() -> ProfilingSnapshot {
    PROFILING_STATE.snapshot()
}
