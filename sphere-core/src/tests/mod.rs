pub(super) use super::*;
pub(super) use glam::Vec3;
pub(super) use sphere_config::SimulationConfig;
pub(super) use sphere_types::TickPhase;
pub(super) use std::collections::BTreeSet;

mod grid_build;
mod support;
