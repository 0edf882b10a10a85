//! Wire schema of the remote compute service's status responses.
//!
//! Field names (`d_ret`, `l_status`, `l_logs`) are the service's own;
//! they are kept verbatim so serde maps them without rename noise.

use serde::{Deserialize, Serialize};

/// Per-step status token meaning the remote job completed without error.
pub const STATUS_FINISHED_SUCCESSFULLY: &str = "finishedSuccessfully";

/// Per-step status token meaning the remote job failed.
pub const STATUS_FINISHED_WITH_ERROR: &str = "finishedWithError";

/// Top-level response body of the submit and status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteStatus {
    pub compute: ComputeBlock,
}

/// The `compute` block: overall boolean status plus the nested return
/// object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeBlock {
    pub status: bool,
    pub d_ret: ComputeReturn,
}

/// Per-step status tokens and log strings reported by the remote.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComputeReturn {
    #[serde(default)]
    pub l_status: Vec<String>,
    #[serde(default)]
    pub l_logs: Vec<String>,
}

impl RemoteStatus {
    /// Whether the per-step status list contains the given token.
    pub fn has_step_status(&self, token: &str) -> bool {
        self.compute.d_ret.l_status.iter().any(|s| s == token)
    }

    /// Whether the remote reports the job finished without error.
    pub fn finished_successfully(&self) -> bool {
        self.has_step_status(STATUS_FINISHED_SUCCESSFULLY)
    }

    /// Whether the remote reports the job failed.
    pub fn finished_with_error(&self) -> bool {
        self.has_step_status(STATUS_FINISHED_WITH_ERROR)
    }

    /// The raw response as a JSON value, for the persisted diagnostic
    /// copy.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_status_body() {
        let body = r#"{
            "compute": {
                "status": true,
                "d_ret": {
                    "l_status": ["pushPath", "finishedSuccessfully"],
                    "l_logs": ["done"]
                }
            }
        }"#;
        let status: RemoteStatus = serde_json::from_str(body).unwrap();
        assert!(status.finished_successfully());
        assert!(!status.finished_with_error());
        assert_eq!(status.compute.d_ret.l_logs, vec!["done"]);
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let body = r#"{"compute": {"status": false, "d_ret": {}}}"#;
        let status: RemoteStatus = serde_json::from_str(body).unwrap();
        assert!(status.compute.d_ret.l_status.is_empty());
        assert!(status.compute.d_ret.l_logs.is_empty());
    }
}
