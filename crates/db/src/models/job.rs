//! Job instance entity model and DTOs.

use plinth_core::ident;
use plinth_core::params::JobParameter;
use plinth_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::{JobStatus, StatusId};

/// A row from the `job_instances` table.
///
/// The orchestration core only ever reads the parameter/resource
/// fields and writes `status_id`, `summary`, `raw` and `end_date`;
/// everything else is owned by the API layer that created the row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JobInstance {
    pub id: DbId,
    pub status_id: StatusId,
    /// Upstream job whose output is this job's input, if any.
    pub previous_id: Option<DbId>,
    /// Username of the submitting user (`auid` in the wire payload).
    pub owner: String,
    /// Base URL of the target remote compute service.
    pub compute_url: String,
    /// Ordered JSON array of typed parameters; array order is the
    /// declaration order the argument builder must preserve.
    pub parameters: serde_json::Value,
    pub number_of_workers: String,
    pub cpu_limit: String,
    pub memory_limit: String,
    pub gpu_limit: String,
    /// Container image of the application to run.
    pub image: String,
    pub selfexec: String,
    pub selfpath: String,
    pub execshell: String,
    /// Application type descriptor (`fs`, `ds`, ...).
    pub plugin_type: String,
    /// JSON status summary blob, refreshed on every successful poll.
    pub summary: Option<String>,
    /// Compressed copy of the last raw remote response.
    pub raw: Option<String>,
    pub end_date: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl JobInstance {
    /// Current lifecycle status. An unrecognized status ID maps to
    /// [`JobStatus::Cancelled`] so no further orchestration happens
    /// for a corrupt row.
    pub fn status(&self) -> JobStatus {
        JobStatus::from_id(self.status_id).unwrap_or(JobStatus::Cancelled)
    }

    /// Remote job identifier derived from the instance ID.
    pub fn job_id(&self) -> String {
        ident::job_id(self.id)
    }

    /// Object-storage prefix where this job's output is materialized.
    /// Also serves as the input location of a chained downstream job.
    pub fn output_path(&self) -> String {
        format!("{}/jobs/{}/data", self.owner, self.job_id())
    }

    /// Typed view of the `parameters` JSON array. Malformed entries
    /// yield an empty list rather than an error; the API layer
    /// validates parameters on creation.
    pub fn parameter_list(&self) -> Vec<JobParameter> {
        serde_json::from_value(self.parameters.clone()).unwrap_or_default()
    }
}

/// DTO for inserting a new job instance (done by the API layer; the
/// orchestration core never creates job rows itself).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewJobInstance {
    pub previous_id: Option<DbId>,
    pub owner: String,
    pub compute_url: String,
    pub parameters: Vec<JobParameter>,
    pub number_of_workers: String,
    pub cpu_limit: String,
    pub memory_limit: String,
    pub gpu_limit: String,
    pub image: String,
    pub selfexec: String,
    pub selfpath: String,
    pub execshell: String,
    pub plugin_type: String,
}
