//! # Job Records and Registry Errors
//!
//! A [`Job`] tracks one dispute from submission to a signed result. Its
//! status only ever moves forward:
//!
//! ```text
//! pending ──▶ processing ──▶ completed
//!    │             │
//!    └─────────────┴───────▶ failed
//! ```
//!
//! Mutation goes through [`JobUpdate`], whose payloads make a completed job
//! without a result, or a failed job without a reason, unrepresentable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tribunal_council::{AggregatedResult, DisputeQuery};

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, not yet dispatched.
    Pending,
    /// Judges are being consulted.
    Processing,
    /// A signed result is available.
    Completed,
    /// The job ended without a result.
    Failed,
}

impl JobStatus {
    /// Returns true for `completed` and `failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Returns true if `next` is a legal successor of this status.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Machine-readable reason a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCode {
    /// The result could not be signed.
    SigningFailure,
    /// The job snapshot could not be written to the archive.
    StorageFailure,
    /// The pipeline itself broke (task panic, cancelled runtime).
    InternalFailure,
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureCode::SigningFailure => "signing_failure",
            FailureCode::StorageFailure => "storage_failure",
            FailureCode::InternalFailure => "internal_failure",
        };
        write!(f, "{}", s)
    }
}

/// Error detail attached to a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    /// Reason code.
    pub code: FailureCode,
    /// Human-readable detail.
    pub message: String,
}

impl JobFailure {
    /// Creates a failure.
    pub fn new(code: FailureCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A state change requested by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum JobUpdate {
    /// Dispatch has started.
    Processing,
    /// The signed result is ready.
    Completed(AggregatedResult),
    /// The job cannot complete.
    Failed(JobFailure),
}

impl JobUpdate {
    /// Status this update moves the job to.
    pub fn target(&self) -> JobStatus {
        match self {
            JobUpdate::Processing => JobStatus::Processing,
            JobUpdate::Completed(_) => JobStatus::Completed,
            JobUpdate::Failed(_) => JobStatus::Failed,
        }
    }
}

/// One dispute and everything known about its resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Opaque identifier (UUID v4).
    pub id: String,
    /// The dispute.
    pub query: DisputeQuery,
    /// Current status.
    pub status: JobStatus,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Time the job reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Signed result, once completed.
    pub result: Option<AggregatedResult>,
    /// Failure detail, once failed.
    pub error: Option<JobFailure>,
}

impl Job {
    /// Creates a pending job.
    pub fn new(id: impl Into<String>, query: DisputeQuery) -> Self {
        Self {
            id: id.into(),
            query,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            result: None,
            error: None,
        }
    }

    /// Applies an update, enforcing forward-only transitions.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidTransition`] and leaves the job
    /// untouched if the update would move it backwards or out of a
    /// terminal state.
    pub fn apply(&mut self, update: JobUpdate) -> Result<()> {
        let target = update.target();
        if !self.status.can_transition_to(target) {
            return Err(RegistryError::InvalidTransition {
                job_id: self.id.clone(),
                from: self.status,
                to: target,
            });
        }

        match update {
            JobUpdate::Processing => {}
            JobUpdate::Completed(result) => {
                self.result = Some(result);
                self.completed_at = Some(Utc::now());
            }
            JobUpdate::Failed(failure) => {
                self.error = Some(failure);
                self.completed_at = Some(Utc::now());
            }
        }
        self.status = target;
        Ok(())
    }
}

/// Errors that can occur in the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Failed to open or write the archive.
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Failed to serialize or deserialize data.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No job with this identifier.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// The requested status change is not allowed.
    #[error("Invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        /// The job.
        job_id: String,
        /// Its current status.
        from: JobStatus,
        /// The rejected target status.
        to: JobStatus,
    },

    /// Archive write rejected by the backend.
    #[error("Archive error: {0}")]
    Archive(String),

    /// Key material could not be loaded.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The signer could not produce a signature.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// A signature did not verify.
    #[error("Signature verification failed: {0}")]
    Verification(String),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tribunal_council::{ConsensusEngine, WeightConfig};

    fn job() -> Job {
        let query = DisputeQuery::new("Party A: Tenant\nParty B: Landlord\nDeposit dispute.").unwrap();
        Job::new("job-1", query)
    }

    fn result(job: &Job) -> AggregatedResult {
        ConsensusEngine::new(WeightConfig::default())
            .unwrap()
            .aggregate(&job.id, &job.query, vec![])
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = job();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.completed_at.is_none());
        assert!(job.result.is_none());
        assert!(job.error.is_none());
    }

    #[test]
    fn test_happy_path() {
        let mut job = job();
        job.apply(JobUpdate::Processing).unwrap();
        assert_eq!(job.status, JobStatus::Processing);

        let result = result(&job);
        job.apply(JobUpdate::Completed(result.clone())).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result, Some(result));
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_pending_may_fail_directly() {
        let mut job = job();
        job.apply(JobUpdate::Failed(JobFailure::new(FailureCode::InternalFailure, "boom")))
            .unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_ref().unwrap().code, FailureCode::InternalFailure);
    }

    #[test]
    fn test_pending_cannot_complete() {
        let mut job = job();
        let result = result(&job);
        let err = job.apply(JobUpdate::Completed(result)).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTransition { .. }));
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.result.is_none());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut job = job();
        job.apply(JobUpdate::Processing).unwrap();
        job.apply(JobUpdate::Failed(JobFailure::new(FailureCode::SigningFailure, "no key")))
            .unwrap();

        assert!(job.apply(JobUpdate::Processing).is_err());
        let err = job.apply(JobUpdate::Failed(JobFailure::new(FailureCode::StorageFailure, "x")))
            .unwrap_err();
        assert!(err.to_string().contains("failed -> failed"));
        assert_eq!(job.error.as_ref().unwrap().code, FailureCode::SigningFailure);
    }

    #[test]
    fn test_processing_cannot_repeat() {
        let mut job = job();
        job.apply(JobUpdate::Processing).unwrap();
        assert!(job.apply(JobUpdate::Processing).is_err());
    }

    #[test]
    fn test_status_serde_and_display() {
        assert_eq!(serde_json::to_string(&JobStatus::Processing).unwrap(), r#""processing""#);
        assert_eq!(JobStatus::Completed.to_string(), "completed");
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }

    #[test]
    fn test_failure_display() {
        let failure = JobFailure::new(FailureCode::StorageFailure, "disk full");
        assert_eq!(failure.to_string(), "storage_failure: disk full");
        assert_eq!(
            serde_json::to_string(&FailureCode::SigningFailure).unwrap(),
            r#""signing_failure""#
        );
    }
}
