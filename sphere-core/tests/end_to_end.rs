use glam::Vec3;
use sphere_config::SimulationConfig;
use sphere_core::{classify_cell, Simulation};
use sphere_types::{SimEvent, TickPhase};

fn scenario_config() -> SimulationConfig {
    SimulationConfig {
        volume_size: [10.0, 10.0, 10.0],
        volume_center: [0.0, 0.0, 0.0],
        spawn_border_offset: 0.0,
        initial_entities: 0,
        speed: 0.0,
        sphere_radius: 0.5,
        avoidance_enabled: true,
        separation_count: 3,
        tick_seconds: 1.0 / 60.0,
        ticks_per_second: 0,
        parallel_min_batch: 1,
    }
}

#[test]
fn overlapping_pair_in_the_center_cell_turns_apart() {
    let mut sim = Simulation::new(scenario_config(), 42).expect("simulation init");
    sim.spawn_at(Vec3::ZERO, Vec3::Y).expect("spawn first");
    sim.spawn_at(Vec3::new(0.5, 0.0, 0.0), Vec3::Z)
        .expect("spawn second");

    assert_eq!(sim.step_phase().expect("grow"), TickPhase::Grow);
    assert_eq!(sim.step_phase().expect("build grid"), TickPhase::BuildGrid);
    let grid = sim.grid().expect("grid staged for movement");
    assert_eq!(grid.cell_of(0), 13);
    assert_eq!(grid.cell_of(1), 13);
    assert_eq!(grid.chunk(13).as_slice(), &[0_u32, 1]);

    let report = sim.tick().expect("finish tick");
    assert_eq!(report.tick, 1);
    assert_eq!(report.metrics.avoidance_steers_last_tick, 2);

    let directions = sim.directions();
    assert!(directions[0].abs_diff_eq(Vec3::NEG_X, 1.0e-5));
    assert!(directions[1].abs_diff_eq(Vec3::X, 1.0e-5));
    assert_eq!(sim.positions()[0], Vec3::ZERO);
    assert_eq!(sim.positions()[1], Vec3::new(0.5, 0.0, 0.0));
}

#[test]
fn classifier_places_the_volume_center_in_the_middle_cell() {
    let origin = Vec3::splat(-5.0);
    let cell = Vec3::splat(10.0 / 3.0);
    assert_eq!(classify_cell(Vec3::ZERO, origin, cell, 3), 13);
    assert_eq!(classify_cell(Vec3::splat(5.0), origin, cell, 3), 26);
}

#[test]
fn default_config_runs_a_short_session() {
    let mut config = sphere_config::default_simulation_config();
    config.initial_entities = 500;
    let mut sim = Simulation::new(config, 42).expect("simulation init");

    let reports = sim.step_n(30).expect("thirty ticks");
    assert_eq!(reports.len(), 30);
    assert_eq!(reports[0].added, 500);
    assert!(reports[1..].iter().all(|report| report.added == 0));
    assert_eq!(sim.entity_count(), 500);

    // bounced entities may sit past a face, never by a whole cell
    let half = Vec3::from_array(sim.config().volume_size) / 2.0
        + Vec3::from_array(sim.config().cell_size());
    let center = Vec3::from_array(sim.config().volume_center);
    for position in sim.positions() {
        assert!(
            ((*position - center).abs() - half).max_element() < 0.0,
            "{position} escaped the volume"
        );
    }
}

#[test]
fn events_serialize_with_a_type_tag() {
    let event = SimEvent::EntitiesAdded {
        added: 3,
        population: 7,
    };
    let json = serde_json::to_value(&event).expect("serialize event");
    assert_eq!(json["type"], "EntitiesAdded");
    assert_eq!(json["data"]["population"], 7);

    let back: SimEvent = serde_json::from_value(json).expect("deserialize event");
    assert_eq!(back, event);
}
