use super::*;

pub(super) const EPSILON: f32 = 1.0e-5;

pub(super) fn test_config() -> SimulationConfig {
    SimulationConfig {
        volume_size: [10.0, 10.0, 10.0],
        volume_center: [0.0, 0.0, 0.0],
        spawn_border_offset: 1.0,
        initial_entities: 0,
        speed: 0.0,
        sphere_radius: 0.5,
        avoidance_enabled: true,
        separation_count: 3,
        tick_seconds: 0.1,
        ticks_per_second: 0,
        parallel_min_batch: 1,
    }
}

pub(super) fn sim_with(config: SimulationConfig, entities: &[([f32; 3], [f32; 3])]) -> Simulation {
    let mut sim = Simulation::new(config, 7).expect("simulation should initialize");
    for (position, direction) in entities {
        sim.spawn_at(Vec3::from_array(*position), Vec3::from_array(*direction))
            .expect("entity should spawn");
    }
    sim
}

pub(super) fn assert_vec3_near(actual: Vec3, expected: Vec3) {
    assert!(
        actual.abs_diff_eq(expected, EPSILON),
        "expected {expected}, got {actual}"
    );
}

pub(super) fn membership(grid: &Grid) -> Vec<BTreeSet<u32>> {
    grid.chunks()
        .iter()
        .map(|chunk| chunk.as_slice().iter().copied().collect())
        .collect()
}

pub(super) fn layout_for(config: &SimulationConfig) -> GridLayout {
    GridLayout::new(
        Vec3::from_array(config.volume_center),
        Vec3::from_array(config.volume_size),
        config.separation_count,
    )
}

/// Runs Grow and BuildGrid so the built grid can be inspected before Move.
pub(super) fn build_only(sim: &mut Simulation) -> &Grid {
    assert_eq!(sim.step_phase().expect("grow"), TickPhase::Grow);
    assert_eq!(sim.step_phase().expect("build"), TickPhase::BuildGrid);
    sim.grid().expect("grid should be published to the movement pass")
}
