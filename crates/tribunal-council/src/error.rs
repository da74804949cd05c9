//! Error types for the council.
//!
//! Judge failures are not errors here: they are absorbed into abstaining
//! [`JudgeResponse`](crate::JudgeResponse)s. Only caller mistakes and
//! configuration problems surface as [`CouncilError`].

use thiserror::Error;

/// Errors that can occur during council operations.
#[derive(Debug, Error)]
pub enum CouncilError {
    /// The dispute text was rejected before any judge saw it.
    #[error("Invalid dispute query: {0}")]
    InvalidQuery(String),

    /// The weight table or voting thresholds are unusable.
    #[error("Invalid weight configuration: {0}")]
    InvalidWeights(String),

    /// Timeouts or retry settings are unusable.
    #[error("Invalid dispatch policy: {0}")]
    InvalidPolicy(String),
}
