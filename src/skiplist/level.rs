//! Geometric height draws for new nodes.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::MAX_LEVEL_CAPACITY;

/// Draws node heights with P(height = k) = 2^-k for k below the capacity
/// and the remaining mass on the capacity itself.
///
/// Entropy-seeded by default; [`LevelGenerator::with_seed`] pins the draw
/// sequence so tests can assert on exact structure.
pub struct LevelGenerator {
    rng: StdRng,
    capacity: usize,
}

impl LevelGenerator {
    pub fn new(capacity: usize) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            capacity: capacity.clamp(1, MAX_LEVEL_CAPACITY),
        }
    }

    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            capacity: capacity.clamp(1, MAX_LEVEL_CAPACITY),
        }
    }

    /// Height for the next inserted node, in `1..=capacity`.
    pub fn next_height(&mut self) -> usize {
        let mut height = 1;
        while height < self.capacity && self.rng.gen::<bool>() {
            height += 1;
        }
        height
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl fmt::Debug for LevelGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LevelGenerator")
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heights_stay_in_range() {
        let mut heights = LevelGenerator::with_seed(4, 9);
        for _ in 0..1000 {
            let h = heights.next_height();
            assert!((1..=4).contains(&h));
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = LevelGenerator::with_seed(32, 77);
        let mut b = LevelGenerator::with_seed(32, 77);
        let left: Vec<usize> = (0..64).map(|_| a.next_height()).collect();
        let right: Vec<usize> = (0..64).map(|_| b.next_height()).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn roughly_half_the_draws_are_height_one() {
        let mut heights = LevelGenerator::with_seed(32, 3);
        let ones = (0..10_000)
            .filter(|_| heights.next_height() == 1)
            .count();
        // 3-sigma band around p = 1/2 over 10k draws.
        assert!((4_350..=5_650).contains(&ones), "got {ones}");
    }

    #[test]
    fn capacity_is_clamped() {
        assert_eq!(LevelGenerator::new(0).capacity(), 1);
        assert_eq!(
            LevelGenerator::new(MAX_LEVEL_CAPACITY + 10).capacity(),
            MAX_LEVEL_CAPACITY
        );
    }
}
