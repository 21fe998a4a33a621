use crate::chunk::Chunk;
use glam::Vec3;
use rayon::prelude::*;

/// Fixed `S x S x S` partition of the simulation volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    origin: Vec3,
    cell_size: Vec3,
    separation: u32,
}

impl GridLayout {
    pub fn new(center: Vec3, size: Vec3, separation: u32) -> Self {
        Self {
            origin: center - size / 2.0,
            cell_size: size / separation as f32,
            separation,
        }
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn cell_size(&self) -> Vec3 {
        self.cell_size
    }

    pub fn separation(&self) -> u32 {
        self.separation
    }

    pub fn cell_count(&self) -> usize {
        let s = self.separation as usize;
        s * s * s
    }

    pub fn classify(&self, position: Vec3) -> i64 {
        classify_cell(position, self.origin, self.cell_size, self.separation)
    }

    pub fn contains_cell(&self, cell: i64) -> bool {
        cell >= 0 && (cell as u64) < self.cell_count() as u64
    }

    pub fn cell_coords(&self, cell: usize) -> [i64; 3] {
        let s = self.separation as usize;
        [
            (cell % s) as i64,
            ((cell / s) % s) as i64,
            (cell / (s * s)) as i64,
        ]
    }

    pub fn flatten(&self, coords: [i64; 3]) -> Option<usize> {
        let s = self.separation as i64;
        if coords.iter().any(|c| !(0..s).contains(c)) {
            return None;
        }
        Some((coords[0] + coords[1] * s + coords[2] * s * s) as usize)
    }

    /// The 3x3x3 block around `cell`; coordinates outside `[0, S)` yield `None`.
    pub fn neighbor_cells(&self, cell: usize) -> [Option<usize>; 27] {
        let [cx, cy, cz] = self.cell_coords(cell);
        let mut out = [None; 27];
        let mut slot = 0;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    out[slot] = self.flatten([cx + dx, cy + dy, cz + dz]);
                    slot += 1;
                }
            }
        }
        out
    }
}

/// Maps a position to a flattened cell id.
///
/// Coordinates truncate toward zero and only the exact `coordinate == S` case is
/// pulled back to `S - 1`; positions far outside the volume produce ids outside
/// `[0, S^3)`, which callers must treat as a precondition failure.
pub fn classify_cell(position: Vec3, origin: Vec3, cell_size: Vec3, separation: u32) -> i64 {
    let local = (position - origin) / cell_size;
    let s = separation as i64;
    let mut coords = [local.x as i64, local.y as i64, local.z as i64];
    for coord in &mut coords {
        if *coord == s {
            *coord -= 1;
        }
    }
    coords[0] + coords[1] * s + coords[2] * s * s
}

/// One wholesale build of the spatial grid.
#[derive(Debug, Clone)]
pub struct Grid {
    layout: GridLayout,
    chunks: Vec<Chunk>,
    cell_of: Vec<usize>,
}

impl Grid {
    /// Classifies every position in parallel, then scatters indices sequentially.
    pub fn build(layout: GridLayout, positions: &[Vec3], min_batch: usize) -> Self {
        let ids: Vec<i64> = positions
            .par_iter()
            .with_min_len(min_batch.max(1))
            .map(|position| layout.classify(*position))
            .collect();

        let mut chunks: Vec<Chunk> = (0..layout.cell_count()).map(|_| Chunk::new()).collect();
        let mut cell_of = Vec::with_capacity(ids.len());
        for (entity, id) in ids.into_iter().enumerate() {
            assert!(
                layout.contains_cell(id),
                "entity {entity} classified into cell {id} outside a grid of {} cells",
                layout.cell_count()
            );
            let cell = id as usize;
            chunks[cell].push(entity as u32);
            cell_of.push(cell);
        }

        Self {
            layout,
            chunks,
            cell_of,
        }
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, cell: usize) -> &Chunk {
        &self.chunks[cell]
    }

    /// Cell the entity was scattered into by this build.
    pub fn cell_of(&self, entity: usize) -> usize {
        self.cell_of[entity]
    }

    /// Number of entities scattered by this build.
    pub fn population(&self) -> usize {
        self.cell_of.len()
    }

    pub fn occupied_cells(&self) -> usize {
        self.chunks.iter().filter(|chunk| !chunk.is_empty()).count()
    }

    pub fn max_occupancy(&self) -> usize {
        self.chunks.iter().map(Chunk::len).max().unwrap_or(0)
    }
}

/// Double-buffered grid slots. BuildGrid stages into `building`; Move swaps it
/// into `previous` and reads it from there until Publish releases it.
#[derive(Debug, Clone, Default)]
pub(crate) struct GridHandles {
    previous: Option<Grid>,
    building: Option<Grid>,
}

impl GridHandles {
    pub(crate) fn stage(&mut self, grid: Grid) {
        debug_assert!(self.building.is_none(), "a grid build is already staged");
        self.building = Some(grid);
    }

    /// Hands the staged build to the movement pass.
    pub(crate) fn publish(&mut self) {
        self.previous = self.building.take();
    }

    pub(crate) fn previous(&self) -> Option<&Grid> {
        self.previous.as_ref()
    }

    pub(crate) fn staged(&self) -> Option<&Grid> {
        self.building.as_ref()
    }

    pub(crate) fn release(&mut self) {
        self.previous = None;
    }

    pub(crate) fn clear(&mut self) {
        self.previous = None;
        self.building = None;
    }
}
