use crate::grid::Grid;
use glam::Vec3;
use rayon::prelude::*;
use sphere_config::SimulationConfig;

const AXES: [Vec3; 3] = [Vec3::X, Vec3::Y, Vec3::Z];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementParams {
    pub speed: f32,
    pub dt: f32,
    pub sphere_radius: f32,
    pub avoidance_enabled: bool,
    pub volume_center: Vec3,
    pub volume_half_extent: Vec3,
    pub min_batch: usize,
}

impl MovementParams {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            speed: config.speed,
            dt: config.tick_seconds,
            sphere_radius: config.sphere_radius,
            avoidance_enabled: config.avoidance_enabled,
            volume_center: Vec3::from_array(config.volume_center),
            volume_half_extent: (Vec3::from_array(config.volume_size) / 2.0).abs(),
            min_batch: config.parallel_min_batch.max(1),
        }
    }

    fn avoidance_distance(&self) -> f32 {
        self.sphere_radius * 2.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub steered: u32,
    pub bounces: u32,
}

impl PassSummary {
    fn merge(self, other: Self) -> Self {
        Self {
            steered: self.steered + other.steered,
            bounces: self.bounces + other.bounces,
        }
    }
}

/// Advances every entity one step.
///
/// Other entities are always read from `positions` (the start-of-tick buffer);
/// each task writes only its own slot of `next_positions` and `directions`.
pub fn run_movement_pass(
    positions: &[Vec3],
    next_positions: &mut [Vec3],
    directions: &mut [Vec3],
    grid: &Grid,
    params: &MovementParams,
) -> PassSummary {
    assert_eq!(
        positions.len(),
        directions.len(),
        "position and direction buffers must have equal length"
    );
    assert_eq!(
        positions.len(),
        next_positions.len(),
        "position double buffer lengths diverged"
    );
    assert_eq!(
        positions.len(),
        grid.population(),
        "grid was built for a different population"
    );

    next_positions
        .par_iter_mut()
        .zip(directions.par_iter_mut())
        .enumerate()
        .with_min_len(params.min_batch)
        .map(|(entity, (next, direction))| {
            let (position, outcome) =
                step_entity(entity, positions, *direction, grid, params);
            *next = position;
            *direction = outcome.direction;
            PassSummary {
                steered: u32::from(outcome.steered),
                bounces: outcome.bounces,
            }
        })
        .reduce(PassSummary::default, PassSummary::merge)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub direction: Vec3,
    pub steered: bool,
    pub bounces: u32,
}

pub fn step_entity(
    entity: usize,
    positions: &[Vec3],
    direction: Vec3,
    grid: &Grid,
    params: &MovementParams,
) -> (Vec3, StepOutcome) {
    let position = positions[entity] + direction * params.speed * params.dt;
    let mut outcome = StepOutcome {
        direction,
        steered: false,
        bounces: 0,
    };

    if params.avoidance_enabled {
        if let Some((closest, distance)) = closest_neighbor(entity, position, positions, grid) {
            if distance < params.avoidance_distance() {
                // Coincident centers have no escape axis; the heading is kept.
                if let Some(away) = (position - positions[closest]).try_normalize() {
                    outcome.direction = away;
                    outcome.steered = true;
                }
            }
        }
    }

    let (direction, bounces) = bounce_off_volume(
        position,
        outcome.direction,
        params.volume_center,
        params.volume_half_extent,
    );
    outcome.direction = direction;
    outcome.bounces = bounces;
    (position, outcome)
}

/// Nearest other entity among the 27 cells around `entity`'s build cell.
/// Ties keep the first one found.
pub fn closest_neighbor(
    entity: usize,
    position: Vec3,
    positions: &[Vec3],
    grid: &Grid,
) -> Option<(usize, f32)> {
    let layout = grid.layout();
    let cell = grid.cell_of(entity);
    assert!(
        cell < layout.cell_count(),
        "cell {cell} of entity {entity} outside grid"
    );

    let mut closest = None;
    let mut closest_distance = f32::MAX;
    for neighbor in layout.neighbor_cells(cell).into_iter().flatten() {
        for other in grid.chunk(neighbor).iter() {
            if other == entity {
                continue;
            }
            let distance = position.distance(positions[other]);
            if distance < closest_distance {
                closest_distance = distance;
                closest = Some(other);
            }
        }
    }
    closest.map(|other| (other, closest_distance))
}

/// Reflects `direction` on every axis whose boundary `position` has crossed.
pub fn bounce_off_volume(
    position: Vec3,
    direction: Vec3,
    center: Vec3,
    half_extent: Vec3,
) -> (Vec3, u32) {
    let local = position - center;
    let mut direction = direction;
    let mut bounces = 0;
    for (axis, normal) in AXES.iter().enumerate() {
        if local[axis].abs() > half_extent[axis] {
            direction = reflect(direction, *normal * local[axis].signum());
            bounces += 1;
        }
    }
    if bounces > 0 {
        direction = direction.try_normalize().unwrap_or(direction);
    }
    (direction, bounces)
}

pub fn reflect(direction: Vec3, normal: Vec3) -> Vec3 {
    direction - 2.0 * direction.dot(normal) * normal
}
