pub mod aggregate;
pub mod island;
pub mod launcher;
pub mod migration;
pub mod options;

pub use aggregate::{aggregate, reduce_best, GlobalBest};
pub use island::{Island, IslandOutcome, IslandReport, IslandState};
pub use launcher::{IslandLauncher, RunSummary};
pub use migration::{MigrationCoordinator, MigrationPartners};
pub use options::{CacheType, IslandOptions, IslandOptionsBuilder, MigrationTopology};
