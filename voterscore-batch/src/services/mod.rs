//! Registry access, score persistence and the batch recomputation pipeline

pub mod batch_updater;
pub mod persistence;
pub mod registry;

pub use batch_updater::{BatchScoreUpdater, RunStats};
pub use persistence::{BulkScoreWriter, DryRunWriter, FallbackScoreWriter, RowScoreWriter, ScoreWriter};
pub use registry::{PageRequest, Pagination, SqliteVoterRegistry, VoterSource};
