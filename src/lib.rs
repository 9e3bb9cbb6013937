//! # islandga
//!
//! A parallel island-model genetic algorithm for the Job-Shop Scheduling
//! Problem. Each island evolves its own sub-population on its own thread;
//! every few generations islands exchange their best schedules over a
//! message-passing [`comm::Communicator`].
//!
//! ```rust
//! use islandga::evolution::{IslandLauncher, IslandOptions, MigrationTopology};
//! use islandga::instance::ProblemInstance;
//!
//! let instance: ProblemInstance = "2 2\n1 3 2 2\n2 2 1 4\n".parse().unwrap();
//! let options = IslandOptions::builder()
//!     .num_islands(2)
//!     .total_population_size(20)
//!     .num_generations(10)
//!     .migration_frequency(5)
//!     .migration_topology(MigrationTopology::Ring)
//!     .build()
//!     .unwrap();
//!
//! let summary = IslandLauncher::new(options, instance).launch().unwrap();
//! let best = summary.best.unwrap();
//! assert_eq!(best.individual.makespan, 7);
//! ```
pub mod chromosome;
pub mod comm;
pub mod error;
pub mod evaluation;
pub mod evolution;
pub mod instance;
pub mod operators;
pub mod rng;
pub mod selection;
pub mod strategy;

// Re-export commonly used types for convenience
pub use chromosome::{Chromosome, EvaluatedIndividual, JobId, Makespan};
pub use error::{GeneticError, OptionExt, Result, ResultExt};
pub use evolution::{IslandLauncher, IslandOptions, MigrationTopology, RunSummary};
pub use instance::ProblemInstance;
