//! Worker configuration from environment variables.

use std::time::Duration;

use anyhow::Context;

/// Default seconds between poll cycles.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Runtime configuration of the poll-loop worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// S3 bucket holding job input/output objects.
    pub s3_bucket: String,
    /// Custom S3-compatible endpoint URL, if not using AWS proper.
    pub s3_endpoint: Option<String>,
    /// Delay between poll cycles over all `started` jobs.
    pub poll_interval: Duration,
}

impl WorkerConfig {
    /// Read configuration from the environment (after `dotenvy` has
    /// loaded any `.env` file).
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let s3_bucket = std::env::var("S3_BUCKET").context("S3_BUCKET is not set")?;
        let s3_endpoint = std::env::var("S3_ENDPOINT").ok();
        let poll_interval = match std::env::var("POLL_INTERVAL_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.parse()
                    .with_context(|| format!("invalid POLL_INTERVAL_SECS: {raw}"))?,
            ),
            Err(_) => Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        };
        Ok(Self {
            database_url,
            s3_bucket,
            s3_endpoint,
            poll_interval,
        })
    }
}
