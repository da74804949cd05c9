//! # Tribunal Registry - Jobs, Archive and Attestation
//!
//! The registry owns every dispute job from submission until its result is
//! frozen, and turns each result into a verifiable record.
//!
//! ## Purpose
//!
//! 1. **Job State Machine** - Forward-only `pending → processing →
//!    completed | failed` transitions, one lock per job.
//!
//! 2. **RFC 8785 Canonicalization** - A fixed byte encoding of every result,
//!    identical on any machine that re-serializes it.
//!
//! 3. **Ed25519 Signing** - A detached signature over the canonical bytes,
//!    verifiable with the published public key.
//!
//! 4. **Sled Archive** - Optional on-disk mirror of committed job
//!    snapshots for audit and restart.
//!
//! ## Threat Model
//!
//! | Threat | Description | Defense |
//! |--------|-------------|---------|
//! | Verdict Tampering | Result altered after the fact | Ed25519 signature |
//! | Replay | Old verdict presented for a new dispute | Query digest and job id are signed |
//! | Key Reordering | Same result, different bytes | RFC 8785 canonicalization |
//! | State Regression | Completed job reopened or rewritten | Monotonic transitions |
//! | Unsigned Completion | Result stored without a signature | Signing precedes `Completed` |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       REGISTRY                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐   transition   ┌──────────────────┐   │
//! │  │    JOB STORE    │───────────────▶│   SLED ARCHIVE   │   │
//! │  │  per-job locks  │  (write first) │   jobs tree      │   │
//! │  └────────┬────────┘                └──────────────────┘   │
//! │           │ Completed(result)                               │
//! │           ▲                                                 │
//! │  ┌────────┴────────┐   canonical    ┌──────────────────┐   │
//! │  │     SIGNER      │◀───bytes───────│  CANONICALIZER   │   │
//! │  │  Ed25519        │                │  RFC 8785        │   │
//! │  └─────────────────┘                └──────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use tribunal_council::{ConsensusEngine, DisputeQuery, WeightConfig};
//! use tribunal_registry::{sign_result, verify_result, Ed25519Signer, JobStore, JobUpdate, ResultSigner};
//!
//! let store = JobStore::new();
//! let query = DisputeQuery::new("Party A: Tenant\nParty B: Landlord\nDeposit withheld.").unwrap();
//! let id = store.create(query.clone()).unwrap();
//! store.transition(&id, JobUpdate::Processing).unwrap();
//!
//! let engine = ConsensusEngine::new(WeightConfig::default()).unwrap();
//! let mut result = engine.aggregate(&id, &query, vec![]);
//!
//! let signer = Ed25519Signer::generate();
//! sign_result(&signer, &mut result).unwrap();
//! store.transition(&id, JobUpdate::Completed(result.clone())).unwrap();
//!
//! verify_result(&result, &signer.public_key_hex()).unwrap();
//! ```
//!
//! ## References
//!
//! - **RFC 8785 (2020)** - "JSON Canonicalization Scheme (JCS)"
//!   <https://www.rfc-editor.org/rfc/rfc8785>
//! - **RFC 8032 (2017)** - "Edwards-Curve Digital Signature Algorithm (EdDSA)"
//!   <https://www.rfc-editor.org/rfc/rfc8032>
//! - **Sled Documentation** - <https://sled.rs/>

pub mod canonicalize;
pub mod models;
pub mod signing;
pub mod storage;
pub mod store;

pub use canonicalize::{canonical_bytes, canonical_digest};
pub use models::{FailureCode, Job, JobFailure, JobStatus, JobUpdate, RegistryError, Result};
pub use signing::{parse_public_key, sign_result, verify_result, Ed25519Signer, ResultSigner, ED25519};
pub use storage::{JobArchive, SledArchive};
pub use store::JobStore;
