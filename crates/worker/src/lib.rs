//! Job lifecycle orchestration.
//!
//! [`manager::JobManager`] drives a job instance through its state
//! machine: submit to the remote compute service, poll for completion,
//! and finalize by materializing and registering the output. The
//! binary in `main.rs` wraps it in a periodic poll loop.

pub mod config;
pub mod manager;
