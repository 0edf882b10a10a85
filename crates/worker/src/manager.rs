//! The job lifecycle manager.
//!
//! Composes the state store, object storage and the remote compute
//! client to drive one job instance through its state machine:
//!
//! ```text
//! scheduled -> started -> registeringFiles -> finishedSuccessfully
//!                  \-> finishedWithError          (terminal)
//!      (any non-terminal) -> cancelled            (terminal)
//! ```
//!
//! Poll cycles for a job may race (a retry overlapping a delayed
//! response, or separate worker processes). Safety under arbitrary
//! concurrent polling rests on two store primitives: the conditional
//! summary refresh that only applies while the persisted status is
//! still `started`, and the unique finalization-lock row that makes
//! the finished-successfully branch at-most-once.

use std::sync::Arc;

use plinth_compute::client::{ComputeClient, SubmitRequest, REQUEST_TIMEOUT};
use plinth_compute::summary::JobStatusSummary;
use plinth_core::encoding::{self, EncodingError};
use plinth_core::params::{build_command_args, CommandArgs};
use plinth_core::types::DbId;
use plinth_db::models::{JobInstance, JobStatus};
use plinth_db::store::{JobStore, StoreError};
use plinth_storage::archive::{self, ArchiveError};
use plinth_storage::ObjectStorage;

/// Storage prefix of the synthetic empty-input directory used for
/// jobs with no upstream job and no `path` parameter. The remote
/// service requires a non-empty input archive, so a small sentinel
/// object is kept here and shipped instead.
pub const EMPTY_INPUT_DIR: &str = "system/empty-input";

const EMPTY_INPUT_OBJECT: &str = "system/empty-input/empty.txt";
const EMPTY_INPUT_CONTENT: &str = "Empty input dir.";

/// Errors escaping a submit/poll cycle.
///
/// Remote-compute failures never appear here: submission failures
/// terminate the job as `cancelled` and polling failures are retried
/// on the next cycle. What remains is state-store failures, archive
/// unpack handling bugs and encoding failures.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("failed to encode raw response: {0}")]
    Encoding(#[from] EncodingError),

    #[error("job instance {0} not found")]
    NotFound(DbId),
}

/// Orchestrates the lifecycle of job instances.
///
/// One shared instance serves all jobs; it holds no per-job state.
/// A pooled [`reqwest::Client`] is reused across compute resources.
pub struct JobManager {
    store: Arc<dyn JobStore>,
    storage: Arc<dyn ObjectStorage>,
    http: reqwest::Client,
}

impl JobManager {
    pub fn new(store: Arc<dyn JobStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            store,
            storage,
            http,
        }
    }

    /// Submit a job to its remote compute service.
    ///
    /// Invoked once per job from the `scheduled` state. A cancellation
    /// requested before dispatch short-circuits: nothing is sent. On
    /// transport failure or a non-2xx response the job is terminally
    /// `cancelled`; on success, `unextpath` inputs are copied into the
    /// output location and the job transitions to `started` with its
    /// initial summary.
    pub async fn submit(&self, job_id: DbId) -> Result<(), ManagerError> {
        let job = self.load(job_id).await?;
        if job.status() == JobStatus::Cancelled {
            tracing::info!(job_instance_id = job.id, "Job cancelled before dispatch, skipping");
            return Ok(());
        }

        let args = build_command_args(&job.parameter_list());
        let input_dir = self.resolve_input_dir(&job, &args).await?;
        let data = archive::pack(self.storage.as_ref(), &[input_dir]).await?;

        let request = submit_request(&job, &args);
        let client = self.compute_client(&job);
        match client.submit(&request, data).await {
            Err(err) => {
                tracing::error!(jid = %request.jid, error = %err, "Job submission failed, giving up");
                self.store.finish(job.id, JobStatus::Cancelled).await?;
            }
            Ok(response) => {
                self.copy_unextpath_inputs(&job, &args).await?;
                let summary = JobStatusSummary::after_submit().to_json();
                let raw = encoding::compress_json(&response.to_json_value())?;
                self.store.mark_started(job.id, &summary, &raw).await?;
            }
        }
        Ok(())
    }

    /// Poll the remote status of a job and advance its state machine.
    ///
    /// Only meaningful while the job is `started`; any other status is
    /// returned unchanged. A transport/HTTP failure leaves the status
    /// untouched (the scheduler retries on the next cycle). On
    /// success the persisted summary and raw response are refreshed
    /// conditionally, then a terminal remote step status triggers
    /// finalization.
    pub async fn poll(&self, job_id: DbId) -> Result<JobStatus, ManagerError> {
        let job = self.load(job_id).await?;
        if job.status() != JobStatus::Started {
            return Ok(job.status());
        }

        let jid = job.job_id();
        let client = self.compute_client(&job);
        let response = match client.poll_status(&jid).await {
            Err(err) => {
                tracing::error!(jid = %jid, error = %err, "Status poll failed, will retry on next cycle");
                return Ok(JobStatus::Started);
            }
            Ok(response) => response,
        };
        tracing::info!(
            jid = %jid,
            remote_status = ?response.compute.d_ret.l_status,
            "Remote job status",
        );

        let summary = JobStatusSummary::from_response(&response);
        let raw = encoding::compress_json(&response.to_json_value())?;
        self.store
            .update_summary_if_started(job.id, &summary.to_json(), &raw)
            .await?;

        if response.finished_successfully() {
            self.finalize_success(&job, summary).await
        } else if response.finished_with_error() {
            self.store.finish(job.id, JobStatus::FinishedWithError).await?;
            Ok(JobStatus::FinishedWithError)
        } else {
            Ok(JobStatus::Started)
        }
    }

    /// Request remote-side cancellation of a running job.
    ///
    /// Placeholder: the remote service exposes no cancellation
    /// endpoint, so a running remote job cannot be interrupted. Local
    /// cancellation (marking the row `cancelled` before dispatch) is
    /// handled by the API layer and honored by [`submit`](Self::submit).
    pub async fn cancel(&self, job_id: DbId) -> Result<(), ManagerError> {
        tracing::debug!(job_instance_id = job_id, "Remote cancellation not implemented");
        Ok(())
    }

    // ---- internals ----

    async fn load(&self, id: DbId) -> Result<JobInstance, ManagerError> {
        self.store.find(id).await?.ok_or(ManagerError::NotFound(id))
    }

    fn compute_client(&self, job: &JobInstance) -> ComputeClient {
        ComputeClient::with_client(self.http.clone(), job.compute_url.clone())
    }

    /// Determine the job's input location.
    ///
    /// Precedence: the upstream job's output location, else the first
    /// comma-separated value of the first `path` parameter (leading
    /// slash stripped), else the synthetic empty-input directory.
    /// A job can carry both a `previous` link and `path` parameters;
    /// `previous` always wins.
    async fn resolve_input_dir(
        &self,
        job: &JobInstance,
        args: &CommandArgs,
    ) -> Result<String, ManagerError> {
        if let Some(previous_id) = job.previous_id {
            let previous = self.load(previous_id).await?;
            return Ok(previous.output_path());
        }
        if let Some((_, value)) = args.path_params.first() {
            let first = value.split(',').next().unwrap_or(value);
            return Ok(first.trim_start_matches('/').to_string());
        }
        Ok(self.ensure_empty_input().await)
    }

    /// Lazily create the empty-input sentinel object, tolerating the
    /// benign race where a concurrent submission creates it first.
    /// Storage failures are logged, not fatal: the prefix is returned
    /// regardless and packing degrades to an empty archive.
    async fn ensure_empty_input(&self) -> String {
        match self.storage.exists(EMPTY_INPUT_OBJECT).await {
            Ok(true) => {}
            Ok(false) => {
                if let Err(err) = self
                    .storage
                    .upload(
                        EMPTY_INPUT_OBJECT,
                        EMPTY_INPUT_CONTENT.as_bytes().to_vec(),
                        Some("text/plain"),
                    )
                    .await
                {
                    tracing::error!(error = %err, "Failed to create empty-input sentinel");
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to check empty-input sentinel");
            }
        }
        EMPTY_INPUT_DIR.to_string()
    }

    /// Copy `unextpath` inputs into the job's output location and
    /// register them as output files. Runs only after a successful
    /// submission, before the job is marked `started`. Listing and
    /// copy failures are logged and skipped per object; they never
    /// abort the loop or fail the submission.
    async fn copy_unextpath_inputs(
        &self,
        job: &JobInstance,
        args: &CommandArgs,
    ) -> Result<(), ManagerError> {
        let output_dir = job.output_path();
        let mut copied = Vec::new();
        for (flag, value) in &args.unextpath_params {
            for path in value.split(',') {
                let objects = match self.storage.list(path).await {
                    Ok(objects) => objects,
                    Err(err) => {
                        tracing::error!(flag = %flag, path = %path, error = %err, "Listing unextpath location failed, skipping");
                        continue;
                    }
                };
                for object in objects {
                    let mut dest = object.replacen(path.trim_end_matches('/'), &output_dir, 1);
                    if !dest.starts_with(&format!("{output_dir}/")) {
                        // Containment check: fall back to a flat copy
                        // when the prefix rewrite lands outside the
                        // output location.
                        let basename = object.rsplit('/').next().unwrap_or("");
                        dest = format!("{output_dir}/{basename}");
                    }
                    match self.storage.copy(&object, &dest).await {
                        Err(err) => {
                            tracing::error!(src = %object, dst = %dest, error = %err, "Copying unextpath object failed, skipping");
                        }
                        Ok(()) => copied.push(dest),
                    }
                }
            }
        }
        if !copied.is_empty() {
            tracing::info!(
                job_instance_id = job.id,
                count = copied.len(),
                "Registering output files copied from unextpath locations",
            );
        }
        self.register_output_files(job, &copied).await
    }

    /// Finalize a job whose remote status reports success.
    ///
    /// The finalization-lock insert is the at-most-once gate: a caller
    /// that loses the race returns immediately with no side effects.
    /// The sole owner marks the pull phase pending, makes the
    /// `registeringFiles` state visible, then fetches and unpacks the
    /// result archive and registers every resulting output path. Any
    /// fetch or unpack failure terminates the job as `cancelled`.
    async fn finalize_success(
        &self,
        job: &JobInstance,
        mut summary: JobStatusSummary,
    ) -> Result<JobStatus, ManagerError> {
        if !self.store.acquire_finalization_lock(job.id).await? {
            tracing::debug!(
                job_instance_id = job.id,
                "Finalization already claimed by a concurrent poller",
            );
            return Ok(JobStatus::Started);
        }

        summary.mark_pull_succeeded();
        self.store
            .mark_registering(job.id, &summary.to_json())
            .await?;

        let jid = job.job_id();
        let client = self.compute_client(job);
        let archive_bytes = match client.fetch_result(&jid).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(jid = %jid, error = %err, "Result archive fetch failed, giving up");
                self.store.finish(job.id, JobStatus::Cancelled).await?;
                return Ok(JobStatus::Cancelled);
            }
        };

        let paths =
            match archive::unpack(self.storage.as_ref(), &archive_bytes, &job.output_path()).await
            {
                Ok(paths) => paths,
                Err(err) => {
                    tracing::error!(jid = %jid, error = %err, "Received bad result archive, giving up");
                    self.store.finish(job.id, JobStatus::Cancelled).await?;
                    return Ok(JobStatus::Cancelled);
                }
            };

        self.register_output_files(job, &paths).await?;
        self.store
            .finish(job.id, JobStatus::FinishedSuccessfully)
            .await?;
        Ok(JobStatus::FinishedSuccessfully)
    }

    /// Register object-storage paths as output files of a job.
    /// Re-registering an already-registered path is expected under
    /// concurrent polling and is ignored.
    async fn register_output_files(
        &self,
        job: &JobInstance,
        paths: &[String],
    ) -> Result<(), ManagerError> {
        for path in paths {
            if self.store.register_output_file(job.id, path).await? {
                tracing::info!(job_instance_id = job.id, path = %path, "Registered output file");
            } else {
                tracing::info!(job_instance_id = job.id, path = %path, "Output file already registered");
            }
        }
        Ok(())
    }
}

/// Build the submission payload from a job row and its built args.
fn submit_request(job: &JobInstance, args: &CommandArgs) -> SubmitRequest {
    SubmitRequest {
        jid: job.job_id(),
        cmd_args: args.joined_argv(),
        cmd_path_flags: args.joined_path_flags(),
        auid: job.owner.clone(),
        number_of_workers: job.number_of_workers.clone(),
        cpu_limit: job.cpu_limit.clone(),
        memory_limit: job.memory_limit.clone(),
        gpu_limit: job.gpu_limit.clone(),
        image: job.image.clone(),
        selfexec: job.selfexec.clone(),
        selfpath: job.selfpath.clone(),
        execshell: job.execshell.clone(),
        app_type: job.plugin_type.clone(),
    }
}
