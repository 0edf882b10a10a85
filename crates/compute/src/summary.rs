//! Status summary codec.
//!
//! Condenses remote responses into the fixed-shape JSON blob stored on
//! the job row and exposed read-only by the API layer: push/pull data
//! transfer phases plus the compute submit/return phases, with the
//! first log entry truncated to a bounded tail.

use serde::{Deserialize, Serialize};

use crate::response::RemoteStatus;

/// Maximum number of characters kept from the first log entry. The
/// tail is kept rather than the head: the end of a long log is what
/// diagnoses the failure.
const MAX_LOG_CHARS: usize = 3000;

/// Submission/transfer phase marker: just a boolean status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseStatus {
    pub status: bool,
}

/// Mirror of the remote response's compute-return block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReturnSummary {
    pub status: bool,
    pub l_status: Vec<String>,
    pub l_logs: Vec<String>,
}

/// The `compute` section of the summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComputeSummary {
    pub submit: PhaseStatus,
    #[serde(rename = "return")]
    pub ret: ReturnSummary,
}

/// Fixed-shape job status summary.
///
/// Shape (JSON): `pushPath.status`, `pullPath.status`,
/// `compute.submit.status`, `compute.return.{status,l_status,l_logs}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobStatusSummary {
    #[serde(rename = "pushPath")]
    pub push_path: PhaseStatus,
    #[serde(rename = "pullPath")]
    pub pull_path: PhaseStatus,
    pub compute: ComputeSummary,
}

impl JobStatusSummary {
    /// Initial summary right after a successful submission: input data
    /// pushed and submission accepted, nothing returned yet.
    pub fn after_submit() -> Self {
        Self {
            push_path: PhaseStatus { status: true },
            pull_path: PhaseStatus { status: false },
            compute: ComputeSummary {
                submit: PhaseStatus { status: true },
                ret: ReturnSummary::default(),
            },
        }
    }

    /// Rebuild the summary from a remote status response.
    ///
    /// The overall status, step-status list and log list are copied
    /// verbatim, then the first log entry is truncated to its last
    /// [`MAX_LOG_CHARS`] characters. An empty or missing log list is
    /// simply left alone; logs are best-effort.
    pub fn from_response(response: &RemoteStatus) -> Self {
        let mut summary = Self::after_submit();
        summary.compute.ret.status = response.compute.status;
        summary.compute.ret.l_status = response.compute.d_ret.l_status.clone();
        summary.compute.ret.l_logs = response.compute.d_ret.l_logs.clone();

        match summary.compute.ret.l_logs.first_mut() {
            Some(first) => *first = tail_chars(first, MAX_LOG_CHARS),
            None => tracing::info!("Compute logs not currently available"),
        }
        summary
    }

    /// Mark the pull phase (result archive retrieval) as succeeded.
    pub fn mark_pull_succeeded(&mut self) {
        self.pull_path.status = true;
    }

    /// Serialize to the JSON string persisted on the job row.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Parse a persisted summary string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Last `max` characters of a string (not bytes; the logs may carry
/// multi-byte characters).
fn tail_chars(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if count <= max {
        s.to_string()
    } else {
        s.chars().skip(count - max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{ComputeBlock, ComputeReturn};

    fn response_with_logs(logs: Vec<String>) -> RemoteStatus {
        RemoteStatus {
            compute: ComputeBlock {
                status: true,
                d_ret: ComputeReturn {
                    l_status: vec!["started".to_string()],
                    l_logs: logs,
                },
            },
        }
    }

    #[test]
    fn initial_summary_has_expected_shape() {
        let value: serde_json::Value =
            serde_json::from_str(&JobStatusSummary::after_submit().to_json()).unwrap();
        assert_eq!(value["pushPath"]["status"], true);
        assert_eq!(value["pullPath"]["status"], false);
        assert_eq!(value["compute"]["submit"]["status"], true);
        assert_eq!(value["compute"]["return"]["status"], false);
        assert_eq!(value["compute"]["return"]["l_status"], serde_json::json!([]));
        assert_eq!(value["compute"]["return"]["l_logs"], serde_json::json!([]));
    }

    #[test]
    fn copies_return_block_verbatim() {
        let summary =
            JobStatusSummary::from_response(&response_with_logs(vec!["hello".to_string()]));
        assert!(summary.compute.ret.status);
        assert_eq!(summary.compute.ret.l_status, vec!["started"]);
        assert_eq!(summary.compute.ret.l_logs, vec!["hello"]);
    }

    #[test]
    fn long_first_log_keeps_exactly_the_last_3000_chars() {
        let log = format!("{}{}", "h".repeat(500), "t".repeat(3000));
        let summary = JobStatusSummary::from_response(&response_with_logs(vec![log]));
        let first = &summary.compute.ret.l_logs[0];
        assert_eq!(first.chars().count(), 3000);
        assert_eq!(*first, "t".repeat(3000));
    }

    #[test]
    fn short_or_missing_logs_are_untouched() {
        let short = "short log".to_string();
        let summary = JobStatusSummary::from_response(&response_with_logs(vec![short.clone()]));
        assert_eq!(summary.compute.ret.l_logs, vec![short]);

        let summary = JobStatusSummary::from_response(&response_with_logs(vec![]));
        assert!(summary.compute.ret.l_logs.is_empty());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let log = "é".repeat(3001);
        let summary = JobStatusSummary::from_response(&response_with_logs(vec![log]));
        assert_eq!(summary.compute.ret.l_logs[0].chars().count(), 3000);
    }

    #[test]
    fn pull_success_round_trips_through_json() {
        let mut summary = JobStatusSummary::after_submit();
        summary.mark_pull_succeeded();
        let parsed = JobStatusSummary::from_json(&summary.to_json()).unwrap();
        assert!(parsed.pull_path.status);
    }
}
