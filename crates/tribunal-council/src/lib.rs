//! # Tribunal Council
//!
//! Multi-judge dispute resolution: concurrent fan-out to independent AI
//! judges, normalization of their replies, and weighted verdict aggregation.
//!
//! ## Overview
//!
//! A dispute between Party A and Party B is put to N judges at once. Each
//! judge answers with a verdict (A, B or Draw), a confidence, reasoning and
//! an assessment of whether the contract terms are specific enough to
//! decide on. The council reduces those answers to a single decision.
//!
//! ## Failure Model
//!
//! ### Unreliable Judges
//! Judges are remote services that time out, return garbage or fail
//! outright. None of that is an error for the council: every failure is
//! folded into an `Abstain` response with a status tag, so one broken
//! provider can never stall or poison a decision.
//!
//! ### Minority Judges
//! A single judge that is wrong (or manipulated through the dispute text)
//! is outvoted by the remaining judges. Quorum and winning-margin
//! thresholds turn a split panel into an explicit `Draw` instead of a
//! coin-flip winner.
//!
//! ### Formatting Drift
//! Providers wrap their JSON in prose, code fences or legacy line formats.
//! The normalizer accepts all of these and downgrades anything it cannot
//! read to `malformed`, keeping the raw text for audit.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  ┌──────────┐  ┌──────────┐
//! │ Judge A  │  │ Judge B  │  │ Judge C  │   (concurrent, per-call timeout)
//! └────┬─────┘  └────┬─────┘  └────┬─────┘
//!      │             │             │
//!      └─────────────┼─────────────┘
//!                    ▼
//!             ┌─────────────┐
//!             │ DISPATCHER  │  job deadline, invocation order
//!             └──────┬──────┘
//!                    ▼
//!             ┌─────────────┐
//!             │ CONSENSUS   │  weights, quorum, margin
//!             │  ENGINE     │
//!             └──────┬──────┘
//!                    ▼
//!             AggregatedResult (signed downstream)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tribunal_council::{ConsensusEngine, Dispatcher, DispatchPolicy, DisputeQuery, WeightConfig};
//!
//! let query = DisputeQuery::new("Party A: Freelancer\nParty B: Client\n...")?;
//! let responses = Dispatcher::new(DispatchPolicy::default())
//!     .dispatch(&query, &judges)
//!     .await;
//!
//! let engine = ConsensusEngine::new(WeightConfig::default())?;
//! let result = engine.aggregate("job-1", &query, responses);
//! println!("{} ({:.2})", result.final_decision, result.final_confidence);
//! ```

pub mod consensus;
pub mod dispatch;
pub mod error;
pub mod judge;
pub mod normalize;
pub mod query;

pub use consensus::{
    AggregatedResult, ConsensusEngine, Decision, DecisionReason, ResultSignature, VoteShares,
    VoteTally, WeightConfig, MAX_WEIGHT,
};
pub use dispatch::{DispatchPolicy, Dispatcher};
pub use error::CouncilError;
pub use judge::{
    Confidence, ContractValidity, HttpJudge, JudgeClient, JudgeInstruction, JudgeResponse,
    ResponseStatus, ScriptedJudge, ScriptedReply, Verdict, WireFormat,
};
pub use normalize::normalize;
pub use query::{DisputeQuery, QueryLimits};

/// Result type for council operations.
pub type Result<T> = std::result::Result<T, CouncilError>;
