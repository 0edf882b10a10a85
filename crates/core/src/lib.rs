//! Domain logic shared across the plugin job orchestration crates.
//!
//! Pure, I/O-free building blocks: shared ID/timestamp types, job
//! identifier derivation, the typed job parameter model with the
//! command-argument builder, and the compressed encoding used for the
//! persisted copy of raw remote responses.

pub mod encoding;
pub mod ident;
pub mod params;
pub mod types;
