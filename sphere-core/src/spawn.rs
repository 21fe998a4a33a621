use crate::{SimError, Simulation};
use glam::Vec3;
use rand::Rng;
use sphere_types::TickPhase;
use tracing::info;

impl Simulation {
    /// Appends `count` randomly placed entities; existing slots keep their index.
    pub(crate) fn grow_population(&mut self, count: u64) -> Result<u32, SimError> {
        if count == 0 {
            return Ok(0);
        }
        let population = self.entity_count();
        let allocation_error = || SimError::Allocation {
            requested: count,
            population,
        };
        let additional = usize::try_from(count).map_err(|_| allocation_error())?;
        let new_len = population
            .checked_add(additional)
            .filter(|len| *len <= u32::MAX as usize)
            .ok_or_else(allocation_error)?;

        self.reserve_slots(additional).map_err(|_| allocation_error())?;

        let spawn_half_extent = self.spawn_half_extent();
        let center = Vec3::from_array(self.config.volume_center);
        for _ in 0..additional {
            let offset = Vec3::new(
                self.rng.random_range(-spawn_half_extent.x..=spawn_half_extent.x),
                self.rng.random_range(-spawn_half_extent.y..=spawn_half_extent.y),
                self.rng.random_range(-spawn_half_extent.z..=spawn_half_extent.z),
            );
            let direction = self.random_heading();
            self.positions.push(center + offset);
            self.directions.push(direction);
        }
        self.next_positions.resize(new_len, Vec3::ZERO);

        info!(
            added = additional,
            population = new_len,
            "applied population growth"
        );
        Ok(additional as u32)
    }

    /// Places one entity immediately. Only allowed between ticks, while the next
    /// phase is Grow; mid-tick placement would outgrow the staged grid.
    ///
    /// `direction` is normalized; a zero vector falls back to a random heading.
    pub fn spawn_at(&mut self, position: Vec3, direction: Vec3) -> Result<u32, SimError> {
        if self.phase != TickPhase::Grow {
            return Err(SimError::MidTick(self.phase));
        }
        let population = self.entity_count();
        if population >= u32::MAX as usize {
            return Err(SimError::Allocation {
                requested: 1,
                population,
            });
        }
        self.reserve_slots(1).map_err(|_| SimError::Allocation {
            requested: 1,
            population,
        })?;

        let direction = match direction.try_normalize() {
            Some(direction) => direction,
            None => self.random_heading(),
        };
        self.positions.push(position);
        self.directions.push(direction);
        self.next_positions.push(position);
        self.metrics.population = self.positions.len() as u32;
        Ok(population as u32)
    }

    fn reserve_slots(
        &mut self,
        additional: usize,
    ) -> Result<(), std::collections::TryReserveError> {
        self.positions.try_reserve_exact(additional)?;
        self.directions.try_reserve_exact(additional)?;
        self.next_positions.try_reserve_exact(additional)?;
        Ok(())
    }

    fn spawn_half_extent(&self) -> Vec3 {
        let size = Vec3::from_array(self.config.volume_size);
        ((size - Vec3::splat(self.config.spawn_border_offset)) / 2.0).max(Vec3::ZERO)
    }

    fn random_heading(&mut self) -> Vec3 {
        loop {
            let candidate = Vec3::new(
                self.rng.random_range(-1.0..=1.0),
                self.rng.random_range(-1.0..=1.0),
                self.rng.random_range(-1.0..=1.0),
            );
            let length_squared = candidate.length_squared();
            if length_squared > 1.0e-6 && length_squared <= 1.0 {
                return candidate / length_squared.sqrt();
            }
        }
    }
}
