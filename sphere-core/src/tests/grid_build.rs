use super::support::*;
use super::*;

fn scattered_positions(count: usize) -> Vec<Vec3> {
    (0..count)
        .map(|i| {
            let f = i as f32;
            Vec3::new(
                (f * 1.37).sin() * 4.9,
                (f * 0.73).cos() * 4.9,
                ((f * 2.11).sin() * (f * 0.19).cos()) * 4.9,
            )
        })
        .collect()
}

#[test]
fn every_entity_lands_in_exactly_one_chunk() {
    let layout = layout_for(&test_config());
    let positions = scattered_positions(500);
    let grid = Grid::build(layout, &positions, 16);

    assert_eq!(grid.chunks().len(), 27);
    let total: usize = grid.chunks().iter().map(Chunk::len).sum();
    assert_eq!(total, positions.len());

    let mut seen = vec![0_u32; positions.len()];
    for chunk in grid.chunks() {
        for entity in chunk.iter() {
            seen[entity] += 1;
        }
    }
    assert!(seen.iter().all(|count| *count == 1));
}

#[test]
fn cell_of_matches_chunk_membership_and_classifier() {
    let layout = layout_for(&test_config());
    let positions = scattered_positions(200);
    let grid = Grid::build(layout, &positions, 1);

    for (entity, position) in positions.iter().enumerate() {
        let cell = grid.cell_of(entity);
        assert_eq!(cell as i64, layout.classify(*position));
        assert!(grid.chunk(cell).iter().any(|e| e == entity));
    }
}

#[test]
fn rebuilding_from_unchanged_positions_is_idempotent() {
    let layout = layout_for(&test_config());
    let positions = scattered_positions(300);
    let first = Grid::build(layout, &positions, 8);
    let second = Grid::build(layout, &positions, 64);
    assert_eq!(membership(&first), membership(&second));
}

#[test]
fn chunks_keep_entity_insertion_order() {
    let layout = layout_for(&test_config());
    let positions = vec![Vec3::ZERO, Vec3::new(4.0, 4.0, 4.0), Vec3::new(0.1, 0.0, 0.0)];
    let grid = Grid::build(layout, &positions, 1);
    assert_eq!(grid.chunk(13).as_slice(), &[0, 2]);
    assert_eq!(grid.chunk(26).as_slice(), &[1]);
    assert_eq!(grid.occupied_cells(), 2);
    assert_eq!(grid.max_occupancy(), 2);
}

#[test]
fn empty_population_builds_empty_chunks() {
    let layout = layout_for(&test_config());
    let grid = Grid::build(layout, &[], 64);
    assert_eq!(grid.population(), 0);
    assert_eq!(grid.chunks().len(), 27);
    assert!(grid.chunks().iter().all(Chunk::is_empty));
}

#[test]
#[should_panic(expected = "outside a grid")]
fn out_of_range_cell_id_fails_fast() {
    let layout = layout_for(&test_config());
    let positions = vec![Vec3::ZERO, Vec3::new(40.0, 0.0, 0.0)];
    let _ = Grid::build(layout, &positions, 1);
}

#[test]
fn simulation_build_phase_publishes_grid_for_movement() {
    let mut sim = sim_with(
        test_config(),
        &[([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]), ([4.0, 4.0, 4.0], [0.0, 1.0, 0.0])],
    );
    let grid = build_only(&mut sim);
    assert_eq!(grid.population(), 2);
    assert_eq!(grid.cell_of(0), 13);
    assert_eq!(grid.cell_of(1), 26);
    assert_eq!(sim.phase(), TickPhase::Move);
}
