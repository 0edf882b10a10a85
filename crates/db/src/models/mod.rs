//! Database entity models.

pub mod job;
pub mod status;

pub use job::{JobInstance, NewJobInstance};
pub use status::{JobStatus, StatusId};
