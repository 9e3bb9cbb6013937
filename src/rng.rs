//! # RandomNumberGenerator
//!
//! Every island owns exactly one `RandomNumberGenerator`, seeded from its rank,
//! and hands it explicitly to every operator call. There is no global random
//! state, so two runs with the same options produce the same trajectories.
//!
//! ## Example
//!
//! ```rust
//! use islandga::rng::RandomNumberGenerator;
//!
//! let mut a = RandomNumberGenerator::from_seed(3);
//! let mut b = RandomNumberGenerator::from_seed(3);
//! assert_eq!(a.sample_indices(10, 4), b.sample_indices(10, 4));
//! ```

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

/// A wrapper around the `rand` crate's `StdRng` exposing the draws the
/// genetic operators need.
#[derive(Debug, Clone)]
pub struct RandomNumberGenerator {
    pub rng: StdRng,
}

impl RandomNumberGenerator {
    /// Creates a new `RandomNumberGenerator` instance seeded from the system entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a new `RandomNumberGenerator` instance with a specific seed.
    ///
    /// This is how islands get independent, reproducible streams.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns a uniform draw from `[0, 1)`.
    pub fn probability(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Returns `true` with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.probability() < p
    }

    /// Returns a uniform integer in `[low, high)`.
    ///
    /// # Panics
    ///
    /// Panics if the range is empty, like `rand::Rng::gen_range`.
    pub fn gen_range(&mut self, low: usize, high: usize) -> usize {
        self.rng.gen_range(low..high)
    }

    /// Samples `amount` distinct indices from `0..length`, in draw order.
    ///
    /// Returns fewer than `amount` indices only if `amount > length`.
    pub fn sample_indices(&mut self, length: usize, amount: usize) -> Vec<usize> {
        rand::seq::index::sample(&mut self.rng, length, amount.min(length)).into_vec()
    }

    /// Picks a uniform index in `0..length` different from `excluded`.
    ///
    /// Returns `None` when no such index exists.
    pub fn index_other_than(&mut self, length: usize, excluded: usize) -> Option<usize> {
        let candidates = if excluded < length { length - 1 } else { length };
        if candidates == 0 {
            return None;
        }
        let pick = self.rng.gen_range(0..candidates);
        Some(if excluded < length && pick >= excluded {
            pick + 1
        } else {
            pick
        })
    }

    /// Shuffles a slice in place.
    pub fn shuffle<T>(&mut self, values: &mut [T]) {
        values.shuffle(&mut self.rng);
    }
}

impl Default for RandomNumberGenerator {
    fn default() -> Self {
        Self::new()
    }
}
