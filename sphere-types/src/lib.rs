use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TickPhase {
    Grow,
    BuildGrid,
    Move,
    Publish,
}

impl TickPhase {
    pub const ALL: [TickPhase; 4] = [
        TickPhase::Grow,
        TickPhase::BuildGrid,
        TickPhase::Move,
        TickPhase::Publish,
    ];

    pub fn next(self) -> TickPhase {
        match self {
            TickPhase::Grow => TickPhase::BuildGrid,
            TickPhase::BuildGrid => TickPhase::Move,
            TickPhase::Move => TickPhase::Publish,
            TickPhase::Publish => TickPhase::Grow,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EntityState {
    pub index: u32,
    pub position: [f32; 3],
    pub direction: [f32; 3],
}

/// Positions by slot index as of the end of `tick`, for presentation sync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FrameSnapshot {
    pub tick: u64,
    pub positions: Vec<[f32; 3]>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub population: u32,
    pub added_last_tick: u32,
    pub total_added: u64,
    pub avoidance_steers_last_tick: u32,
    pub bounces_last_tick: u32,
    pub occupied_cells_last_tick: u32,
    pub max_chunk_occupancy_last_tick: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub added: u32,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum SimEvent {
    EntitiesAdded { added: u32, population: u32 },
    GrowthRejected { requested: u64, reason: String },
    Frame(FrameSnapshot),
    Stopped { ticks: u64 },
}
