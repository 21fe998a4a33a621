/// Entity slot indices that fell into one grid cell during a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    entities: Vec<u32>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entities: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, entity: u32) {
        self.entities.push(entity);
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<u32> {
        self.entities.get(slot).copied()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.entities
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.entities.iter().map(|&entity| entity as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order_and_clears() {
        let mut chunk = Chunk::new();
        assert!(chunk.is_empty());
        chunk.push(7);
        chunk.push(2);
        chunk.push(9);
        assert_eq!(chunk.len(), 3);
        assert_eq!(chunk.as_slice(), &[7, 2, 9]);
        assert_eq!(chunk.get(1), Some(2));
        assert_eq!(chunk.get(3), None);

        chunk.clear();
        assert!(chunk.is_empty());
        assert_eq!(chunk.iter().count(), 0);
    }
}
