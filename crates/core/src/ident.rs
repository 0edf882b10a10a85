//! Remote job identifier derivation.

use crate::types::DbId;

/// Width of the zero-padded numeric part of a remote job ID.
///
/// Some remote schedulers impose a minimum job ID string length, so
/// the decimal instance ID is padded rather than used bare.
const JOB_ID_WIDTH: usize = 9;

/// Derive the remote job identifier for a job instance.
///
/// Deterministic: `"job-"` followed by the instance ID zero-padded to
/// [`JOB_ID_WIDTH`] digits (IDs wider than that are kept in full).
///
/// # Examples
///
/// ```
/// use plinth_core::ident::job_id;
///
/// assert_eq!(job_id(42), "job-000000042");
/// assert_eq!(job_id(1234567890), "job-1234567890");
/// ```
pub fn job_id(instance_id: DbId) -> String {
    format!("job-{instance_id:0width$}", width = JOB_ID_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_to_minimum_length() {
        assert_eq!(job_id(1), "job-000000001");
        assert!(job_id(1).len() >= 12);
    }

    #[test]
    fn stable_for_same_instance() {
        assert_eq!(job_id(77), job_id(77));
    }
}
