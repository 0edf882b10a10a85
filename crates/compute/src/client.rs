//! HTTP client for the remote compute service endpoints.
//!
//! Three synchronous-style operations, each one bounded-timeout HTTP
//! call: multipart job submission, status polling and result-archive
//! retrieval. The client is stateless; error classification (transient
//! vs. terminal) is the lifecycle manager's concern.

use std::time::Duration;

use reqwest::multipart::{Form, Part};

use crate::response::RemoteStatus;

/// Remote calls can legitimately take a long time (the service pushes
/// data synchronously), so the timeout is generous.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(1000);

/// Errors from the remote compute service layer.
#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("compute service error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// Submission payload fields, transmitted as multipart form text parts
/// alongside the archive bytes.
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    /// Remote job identifier.
    pub jid: String,
    /// Space-joined application argument string.
    pub cmd_args: String,
    /// Comma-joined list of path-like flag names.
    pub cmd_path_flags: String,
    /// Submitting user.
    pub auid: String,
    pub number_of_workers: String,
    pub cpu_limit: String,
    pub memory_limit: String,
    pub gpu_limit: String,
    /// Container image of the application.
    pub image: String,
    pub selfexec: String,
    pub selfpath: String,
    pub execshell: String,
    /// Application type descriptor.
    pub app_type: String,
}

/// HTTP client for a single remote compute endpoint.
pub struct ComputeClient {
    client: reqwest::Client,
    base_url: String,
}

impl ComputeClient {
    /// Create a client for a compute service base URL
    /// (e.g. `http://compute.host:5005`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self::with_client(client, base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`] (useful
    /// for connection pooling across compute resources).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    /// Submit a job: multipart POST with the payload fields plus a
    /// `data_file` part carrying the input archive bytes.
    ///
    /// Any transport failure or non-2xx response is a submission
    /// failure; the body of a 200 response is the initial status JSON.
    pub async fn submit(
        &self,
        request: &SubmitRequest,
        archive: Vec<u8>,
    ) -> Result<RemoteStatus, ComputeError> {
        let url = format!("{}/api/v1/", self.base_url);
        tracing::info!(url = %url, jid = %request.jid, "Submitting job to compute service");

        let form = Form::new()
            .text("jid", request.jid.clone())
            .text("cmd_args", request.cmd_args.clone())
            .text("cmd_path_flags", request.cmd_path_flags.clone())
            .text("auid", request.auid.clone())
            .text("number_of_workers", request.number_of_workers.clone())
            .text("cpu_limit", request.cpu_limit.clone())
            .text("memory_limit", request.memory_limit.clone())
            .text("gpu_limit", request.gpu_limit.clone())
            .text("image", request.image.clone())
            .text("selfexec", request.selfexec.clone())
            .text("selfpath", request.selfpath.clone())
            .text("execshell", request.execshell.clone())
            .text("type", request.app_type.clone())
            .part("data_file", Part::bytes(archive).file_name("data.zip"));

        let response = self.client.post(url).multipart(form).send().await?;
        Self::parse_response(response).await
    }

    /// Fetch the current remote status of a job.
    pub async fn poll_status(&self, jid: &str) -> Result<RemoteStatus, ComputeError> {
        let url = format!("{}/api/v1/{}/", self.base_url, jid);
        tracing::info!(url = %url, jid = %jid, "Polling job status");

        let response = self.client.get(url).send().await?;
        Self::parse_response(response).await
    }

    /// Fetch the result archive of a successfully completed job.
    pub async fn fetch_result(&self, jid: &str) -> Result<Vec<u8>, ComputeError> {
        let url = format!("{}/api/v1/{}/file/", self.base_url, jid);
        tracing::info!(url = %url, jid = %jid, "Fetching result archive");

        let response = self.client.get(url).send().await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ComputeError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ComputeError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComputeError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into a [`RemoteStatus`].
    async fn parse_response(response: reqwest::Response) -> Result<RemoteStatus, ComputeError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<RemoteStatus>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_normalized() {
        let client = ComputeClient::new("http://compute.local:5005///");
        assert_eq!(client.base_url, "http://compute.local:5005");
    }
}
