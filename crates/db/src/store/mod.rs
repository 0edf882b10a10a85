//! The `JobStore` port: the two concurrency primitives the lifecycle
//! manager needs from the relational store, plus plain row access.
//!
//! Callers may run in separate processes or machines, so mutual
//! exclusion for finalization is a database-level primitive (a
//! unique-constrained lock row) rather than an in-process lock, and
//! the summary refresh is a conditional update that only applies
//! while the persisted status is still `started`.

use async_trait::async_trait;
use plinth_core::types::DbId;

use crate::models::{JobInstance, JobStatus, NewJobInstance};

mod memory;
mod postgres;

pub use memory::MemJobStore;
pub use postgres::PgJobStore;

/// Errors from the state-store layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The referenced job instance does not exist.
    #[error("job instance {0} not found")]
    NotFound(DbId),
}

/// Persistence operations required by the job lifecycle manager.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job instance in `scheduled` status.
    async fn create(&self, new: NewJobInstance) -> Result<JobInstance, StoreError>;

    /// Fetch a job instance by ID.
    async fn find(&self, id: DbId) -> Result<Option<JobInstance>, StoreError>;

    /// IDs of all jobs currently in `started` status, for the poll loop.
    async fn list_started(&self) -> Result<Vec<DbId>, StoreError>;

    /// Record a successful submission: status becomes `started` and
    /// the initial summary and raw response are persisted together.
    async fn mark_started(&self, id: DbId, summary: &str, raw: &str) -> Result<(), StoreError>;

    /// Refresh `summary` and `raw`, but only if the persisted status
    /// is still `started` at write time. Returns whether the update
    /// applied. This is the guard against clobbering a status already
    /// advanced by a concurrent finalization.
    async fn update_summary_if_started(
        &self,
        id: DbId,
        summary: &str,
        raw: &str,
    ) -> Result<bool, StoreError>;

    /// Transition to `registeringFiles` and persist the given summary
    /// in the same write, so observers see the intermediate state
    /// before the (possibly slow) result transfer begins.
    async fn mark_registering(&self, id: DbId, summary: &str) -> Result<(), StoreError>;

    /// Record a terminal transition: status and end date are persisted
    /// together as the final act.
    async fn finish(&self, id: DbId, status: JobStatus) -> Result<(), StoreError>;

    /// Attempt to create the finalization lock row for a job. Returns
    /// `true` if this caller now owns finalization, `false` if another
    /// concurrent actor already claimed it. At-most-once per job.
    async fn acquire_finalization_lock(&self, id: DbId) -> Result<bool, StoreError>;

    /// Register an object-storage path as an output artifact of a job.
    /// Returns `false` when the path was already registered (duplicate
    /// registrations are expected and silently ignored).
    async fn register_output_file(&self, id: DbId, path: &str) -> Result<bool, StoreError>;

    /// All registered output paths of a job, in registration order.
    async fn output_files(&self, id: DbId) -> Result<Vec<String>, StoreError>;
}
