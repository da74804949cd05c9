//! # Tribunal Core
//!
//! Dispute resolution facade. Submits a dispute between two parties to a
//! panel of independent AI judges, aggregates their verdicts and hands back
//! a signed, independently verifiable result.
//!
//! ## Failure Coverage
//!
//! | Failure | Component | Outcome |
//! |---------|-----------|---------|
//! | Judge timeout, error, garbage | Council | Abstain; remaining judges decide |
//! | Panel below quorum | Council | Completed job, `Draw` |
//! | Split panel below margin | Council | Completed job, `Draw` |
//! | Key unavailable | Registry | Failed job, `signing_failure` |
//! | Archive write rejected | Registry | Failed job, `storage_failure` |
//! | Bad configuration | Core | Rejected at start or on reload |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       TRIBUNAL CORE                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │                    ┌─────────────────┐                          │
//! │      submit ──────▶│    Tribunal     │──────▶ poll / wait       │
//! │                    │     Facade      │                          │
//! │                    └────────┬────────┘                          │
//! │                             │ spawned pipeline                  │
//! │         ┌───────────────────┼───────────────────┐               │
//! │         ▼                   ▼                   ▼               │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐          │
//! │  │ Dispatcher  │───▶│  Consensus  │───▶│   Signer    │          │
//! │  │  (judges)   │    │   Engine    │    │  + Store    │          │
//! │  └─────────────┘    └─────────────┘    └─────────────┘          │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tribunal_core::{Tribunal, TribunalConfig, JobStatus};
//!
//! let tribunal = Tribunal::new(TribunalConfig::from_file("tribunal.json")?)?;
//!
//! let job_id = tribunal.submit(dispute_text)?;
//! let job = tribunal.wait(&job_id, Duration::from_secs(60)).await?;
//! match job.status {
//!     JobStatus::Completed => publish(job.result.unwrap()),
//!     JobStatus::Failed => report(job.error.unwrap()),
//!     _ => unreachable!(),
//! }
//! ```
//!
//! ## Notes
//!
//! - Every job performs fresh provider calls; nothing is cached
//! - Configuration reloads apply to jobs submitted afterwards
//! - Results are signed over their RFC 8785 canonical form
//! - API keys and signing seeds are never logged

mod config;
mod error;
mod panel;
mod tribunal;

pub use config::{
    ArchiveConfig, JudgeConfig, JudgeKind, LimitsConfig, ScoringConfig, SigningConfig,
    TimeoutConfig, TribunalConfig, SIGNING_SEED_ENV,
};
pub use error::TribunalError;
pub use panel::{build_panel, mock_panel};
pub use tribunal::{Tribunal, RESOLVE_OVERHEAD};

// Re-export component types for convenience
pub use tribunal_council::{
    AggregatedResult, Decision, DecisionReason, JudgeResponse, ResponseStatus, Verdict,
};
pub use tribunal_registry::{
    verify_result, Ed25519Signer, FailureCode, Job, JobStatus, ResultSigner,
};

/// Result type for tribunal operations.
pub type Result<T> = std::result::Result<T, TribunalError>;

#[cfg(test)]
mod tests;
