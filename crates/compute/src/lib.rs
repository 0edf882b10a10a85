//! Client for the remote compute service.
//!
//! Speaks the service's wire protocol: multipart job submission,
//! JSON status polling and result-archive retrieval. Also hosts the
//! status summary codec that condenses remote responses into the
//! fixed-shape JSON blob persisted on the job row.

pub mod client;
pub mod response;
pub mod summary;

pub use client::{ComputeClient, ComputeError, SubmitRequest};
pub use response::RemoteStatus;
pub use summary::JobStatusSummary;
