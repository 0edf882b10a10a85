//! State-store layer for plugin job orchestration.
//!
//! Exposes the [`store::JobStore`] port with two backends: PostgreSQL
//! ([`store::PgJobStore`], the production implementation) and an
//! in-memory store ([`store::MemJobStore`]) for tests and local
//! development.

pub mod models;
pub mod store;

/// Verify database connectivity with a trivial query.
pub async fn health_check(pool: &sqlx::PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
