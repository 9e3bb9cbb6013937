//! # Genetic Operators
//!
//! Variation operators for job-repeated permutations. Both preserve the
//! multiset of job ids, so their output is always decodable when their input is.
//!
//! ```rust
//! use islandga::chromosome::Chromosome;
//! use islandga::operators::{job_based_crossover, swap_mutation};
//! use islandga::rng::RandomNumberGenerator;
//!
//! let mut rng = RandomNumberGenerator::from_seed(10);
//! let p1 = Chromosome::random(4, 3, &mut rng);
//! let p2 = Chromosome::random(4, 3, &mut rng);
//!
//! let mut child = job_based_crossover(&p1, &p2, 4, &mut rng).unwrap();
//! swap_mutation(&mut child, &mut rng);
//! assert!(child.is_valid(4, 3));
//! ```

pub mod crossover;
pub mod mutation;

pub use crossover::{crossover_with_subset, job_based_crossover};
pub use mutation::swap_mutation;
