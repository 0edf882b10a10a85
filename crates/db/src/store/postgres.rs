//! PostgreSQL implementation of the [`JobStore`] port.
//!
//! The two concurrency primitives map onto plain SQL: the conditional
//! summary refresh is an `UPDATE ... WHERE status_id = started`, and
//! the finalization lock is an `INSERT ... ON CONFLICT DO NOTHING`
//! against the primary key of `job_finalization_locks`.

use async_trait::async_trait;
use plinth_core::types::DbId;
use sqlx::PgPool;

use crate::models::{JobInstance, JobStatus, NewJobInstance};

use super::{JobStore, StoreError};

/// Column list for `job_instances` queries.
const COLUMNS: &str = "\
    id, status_id, previous_id, owner, compute_url, parameters, \
    number_of_workers, cpu_limit, memory_limit, gpu_limit, \
    image, selfexec, selfpath, execshell, plugin_type, \
    summary, raw, end_date, created_at, updated_at";

/// [`JobStore`] backed by a PostgreSQL connection pool.
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, new: NewJobInstance) -> Result<JobInstance, StoreError> {
        let query = format!(
            "INSERT INTO job_instances \
                 (status_id, previous_id, owner, compute_url, parameters, \
                  number_of_workers, cpu_limit, memory_limit, gpu_limit, \
                  image, selfexec, selfpath, execshell, plugin_type) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, JobInstance>(&query)
            .bind(JobStatus::Scheduled.id())
            .bind(new.previous_id)
            .bind(&new.owner)
            .bind(&new.compute_url)
            .bind(serde_json::to_value(&new.parameters).unwrap_or_default())
            .bind(&new.number_of_workers)
            .bind(&new.cpu_limit)
            .bind(&new.memory_limit)
            .bind(&new.gpu_limit)
            .bind(&new.image)
            .bind(&new.selfexec)
            .bind(&new.selfpath)
            .bind(&new.execshell)
            .bind(&new.plugin_type)
            .fetch_one(&self.pool)
            .await?;
        Ok(job)
    }

    async fn find(&self, id: DbId) -> Result<Option<JobInstance>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM job_instances WHERE id = $1");
        Ok(sqlx::query_as::<_, JobInstance>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_started(&self) -> Result<Vec<DbId>, StoreError> {
        Ok(sqlx::query_scalar(
            "SELECT id FROM job_instances WHERE status_id = $1 ORDER BY id",
        )
        .bind(JobStatus::Started.id())
        .fetch_all(&self.pool)
        .await?)
    }

    async fn mark_started(&self, id: DbId, summary: &str, raw: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE job_instances \
             SET status_id = $2, summary = $3, raw = $4, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(JobStatus::Started.id())
        .bind(summary)
        .bind(raw)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_summary_if_started(
        &self,
        id: DbId,
        summary: &str,
        raw: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE job_instances \
             SET summary = $2, raw = $3, updated_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(id)
        .bind(summary)
        .bind(raw)
        .bind(JobStatus::Started.id())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_registering(&self, id: DbId, summary: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE job_instances \
             SET status_id = $2, summary = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(JobStatus::RegisteringFiles.id())
        .bind(summary)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn finish(&self, id: DbId, status: JobStatus) -> Result<(), StoreError> {
        tracing::info!(job_instance_id = id, status = status.as_str(), "Saving final job status");
        sqlx::query(
            "UPDATE job_instances \
             SET status_id = $2, end_date = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status.id())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn acquire_finalization_lock(&self, id: DbId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO job_finalization_locks (job_instance_id) VALUES ($1) \
             ON CONFLICT (job_instance_id) DO NOTHING",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn register_output_file(&self, id: DbId, path: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO job_output_files (job_instance_id, path) VALUES ($1, $2) \
             ON CONFLICT (job_instance_id, path) DO NOTHING",
        )
        .bind(id)
        .bind(path)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn output_files(&self, id: DbId) -> Result<Vec<String>, StoreError> {
        Ok(sqlx::query_scalar(
            "SELECT path FROM job_output_files WHERE job_instance_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?)
    }
}
