//! Error types for Tribunal Core.

use thiserror::Error;

/// Core error type for tribunal operations.
#[derive(Debug, Error)]
pub enum TribunalError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No job with the given identifier.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// A job did not reach a terminal state in time.
    #[error("Job {job_id} still running after {waited_ms} ms")]
    Timeout {
        /// The job waited on.
        job_id: String,
        /// How long the caller waited.
        waited_ms: u64,
    },

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Council error passthrough.
    #[error("Council error: {0}")]
    Council(#[from] tribunal_council::CouncilError),

    /// Registry error passthrough.
    #[error("Registry error: {0}")]
    Registry(#[from] tribunal_registry::RegistryError),
}
