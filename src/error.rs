//! # Error Types
//!
//! This module defines the error type shared by every stage of the island model:
//! configuration, instance loading, decoding, the genetic operators and the
//! message-passing layer between islands.
//!
//! Decode-time and operator errors (`InvalidChromosome`, `OperationIndexOverflow`,
//! `CrossoverUnderflow`) signal a broken invariant. They are never retried; the
//! island that hits one aborts and the launcher surfaces it wrapped in
//! [`GeneticError::Island`] with the rank and generation.
//!
//! ## Examples
//!
//! Using the `Result` type:
//!
//! ```rust
//! use islandga::error::{GeneticError, Result};
//!
//! fn check_islands(total: usize, islands: usize) -> Result<usize> {
//!     if islands == 0 || total % islands != 0 {
//!         return Err(GeneticError::Configuration(format!(
//!             "population {} cannot be split across {} islands",
//!             total, islands
//!         )));
//!     }
//!     Ok(total / islands)
//! }
//!
//! assert_eq!(check_islands(512, 4).unwrap(), 128);
//! assert!(check_islands(10, 4).is_err());
//! ```
//!
//! Using the `ResultExt` trait to add context to errors:
//!
//! ```rust
//! use islandga::error::{Result, ResultExt};
//! use std::fs;
//!
//! fn read_benchmark(path: &str) -> Result<String> {
//!     fs::read_to_string(path).context(format!("Failed to read benchmark {}", path))
//! }
//!
//! assert!(read_benchmark("/definitely/not/here.txt").is_err());
//! ```
//!
//! Using the `OptionExt` trait to convert `Option` to `Result`:
//!
//! ```rust
//! use islandga::error::{GeneticError, OptionExt};
//!
//! fn best_makespan(makespans: &[u64]) -> islandga::error::Result<u64> {
//!     makespans.iter().min().copied().ok_or_else_genetic(|| GeneticError::EmptyPopulation)
//! }
//!
//! assert_eq!(best_makespan(&[9, 7, 8]).unwrap(), 7);
//! ```

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Represents errors that can occur while running the island model.
#[derive(Error, Debug)]
pub enum GeneticError {
    /// Invalid options, or an island count that does not match the runtime size.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A problem instance with the wrong shape or out-of-range machine ids.
    #[error("Malformed instance: {0}")]
    MalformedInstance(String),

    /// A chromosome that cannot be decoded against the instance.
    #[error("Invalid chromosome: {reason}")]
    InvalidChromosome { reason: String },

    /// A job id occurs more often in a chromosome than the job has operations.
    #[error(
        "Operation index overflow: job {job} requested operation {index} but has {available} in chromosome {genes:?}"
    )]
    OperationIndexOverflow {
        job: usize,
        index: usize,
        available: usize,
        genes: Vec<usize>,
    },

    /// The second parent ran out of complementary genes during job-based crossover.
    #[error(
        "Crossover underflow: second parent exhausted while filling position {position} (parents {parent1:?} and {parent2:?})"
    )]
    CrossoverUnderflow {
        position: usize,
        parent1: Vec<usize>,
        parent2: Vec<usize>,
    },

    /// Error that occurs when an empty population is encountered.
    #[error("Empty population error: Cannot operate on an empty population")]
    EmptyPopulation,

    /// A fatal error raised inside an island's generational loop.
    #[error("Island {rank} failed in generation {generation}: {source}")]
    Island {
        rank: usize,
        generation: usize,
        #[source]
        source: Box<GeneticError>,
    },

    /// The message-passing runtime failed (disconnected peer, unknown rank).
    #[error("Communication error: {0}")]
    Communication(String),

    /// A peer island aborted its run, so the exchange can never complete.
    #[error("Peer island {0} aborted")]
    PeerAborted(usize),

    /// Error that occurs when an I/O operation fails.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A generic error with a custom message.
    #[error("{0}")]
    Other(String),
}

impl GeneticError {
    /// Returns `true` for errors that only mirror a failure on another island.
    pub fn is_secondary(&self) -> bool {
        match self {
            GeneticError::PeerAborted(_) => true,
            GeneticError::Island { source, .. } => source.is_secondary(),
            _ => false,
        }
    }
}

/// A specialized Result type for island model operations.
///
/// This type is a convenience wrapper around `std::result::Result` with the error type
/// fixed to `GeneticError`.
pub type Result<T> = std::result::Result<T, GeneticError>;

/// Extension trait for Result to add context to errors.
///
/// ## Examples
///
/// ```rust
/// use islandga::error::ResultExt;
///
/// fn parse_count(raw: &str) -> islandga::error::Result<usize> {
///     raw.parse::<usize>().context("Failed to parse island count")
/// }
///
/// assert_eq!(parse_count("4").unwrap(), 4);
/// assert!(parse_count("four").is_err());
/// ```
pub trait ResultExt<T, E> {
    /// Converts the error to a `GeneticError::Other` prefixed with `context`.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for std::result::Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| GeneticError::Other(format!("{}: {}", context, e)))
    }
}

/// Extension trait for Option to convert to Result with a custom error.
pub trait OptionExt<T> {
    /// Converts an `Option<T>` to a `Result<T, GeneticError>` using
    /// a closure to generate the error.
    fn ok_or_else_genetic<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> GeneticError;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_else_genetic<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> GeneticError,
    {
        self.ok_or_else(err_fn)
    }
}
