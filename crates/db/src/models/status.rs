//! Job status enum mapping to the SMALLINT `job_statuses` lookup table.
//!
//! Variant discriminants match the seed data order (1-based) in the
//! database table. The string names are the wire form exposed by the
//! API layer and stored in status summaries.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

/// Lifecycle status of a job instance.
///
/// Transitions are monotonic along
/// `Scheduled -> Started -> RegisteringFiles -> FinishedSuccessfully`
/// with `FinishedWithError` reachable from `Started` and the absorbing
/// `Cancelled` state reachable from any non-terminal state.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Created by the API layer, not yet dispatched to the remote.
    Scheduled = 1,
    /// Submitted to the remote compute service, awaiting completion.
    Started = 2,
    /// Remote reported success; output is being materialized.
    RegisteringFiles = 3,
    /// Terminal: output registered.
    FinishedSuccessfully = 4,
    /// Terminal: remote reported failure.
    FinishedWithError = 5,
    /// Terminal: given up (submission/finalization failure) or
    /// cancelled before dispatch.
    Cancelled = 6,
}

impl JobStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Look up a status by its database ID.
    pub fn from_id(id: StatusId) -> Option<JobStatus> {
        match id {
            1 => Some(JobStatus::Scheduled),
            2 => Some(JobStatus::Started),
            3 => Some(JobStatus::RegisteringFiles),
            4 => Some(JobStatus::FinishedSuccessfully),
            5 => Some(JobStatus::FinishedWithError),
            6 => Some(JobStatus::Cancelled),
            _ => None,
        }
    }

    /// Wire name of the status, as seeded in `job_statuses` and
    /// exposed read-only by the API layer.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Scheduled => "scheduled",
            JobStatus::Started => "started",
            JobStatus::RegisteringFiles => "registeringFiles",
            JobStatus::FinishedSuccessfully => "finishedSuccessfully",
            JobStatus::FinishedWithError => "finishedWithError",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Whether no further transitions are possible from this status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::FinishedSuccessfully | JobStatus::FinishedWithError | JobStatus::Cancelled
        )
    }
}

impl From<JobStatus> for StatusId {
    fn from(value: JobStatus) -> Self {
        value as StatusId
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for status in [
            JobStatus::Scheduled,
            JobStatus::Started,
            JobStatus::RegisteringFiles,
            JobStatus::FinishedSuccessfully,
            JobStatus::FinishedWithError,
            JobStatus::Cancelled,
        ] {
            assert_eq!(JobStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(JobStatus::from_id(99), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Started.is_terminal());
        assert!(!JobStatus::RegisteringFiles.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(JobStatus::FinishedSuccessfully.is_terminal());
        assert!(JobStatus::FinishedWithError.is_terminal());
    }
}
