//! Poll-loop worker binary.
//!
//! Periodically polls every job in `started` status. Each job's poll
//! cycle is independent: a failure is logged and never affects another
//! job's cycle. Submission is triggered by the API layer, not here.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plinth_db::store::{JobStore, PgJobStore};
use plinth_storage::s3::S3Storage;
use plinth_worker::config::WorkerConfig;
use plinth_worker::manager::JobManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plinth_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    let store = Arc::new(PgJobStore::new(pool));
    let storage = Arc::new(
        S3Storage::from_env(config.s3_bucket.clone(), config.s3_endpoint.as_deref()).await,
    );
    let manager = JobManager::new(store.clone(), storage);

    tracing::info!(interval = ?config.poll_interval, "Worker started, entering poll loop");
    let mut ticker = tokio::time::interval(config.poll_interval);
    loop {
        ticker.tick().await;
        let ids = match store.list_started().await {
            Ok(ids) => ids,
            Err(err) => {
                tracing::error!(error = %err, "Failed to list started jobs");
                continue;
            }
        };
        for id in ids {
            if let Err(err) = manager.poll(id).await {
                tracing::error!(job_instance_id = id, error = %err, "Poll cycle failed");
            }
        }
    }
}
