//! Judge framework for dispute assessment.
//!
//! Defines the [`JudgeClient`] trait and the canonical [`JudgeResponse`]
//! every provider adapter must produce.

pub mod http;
pub mod instruction;
pub mod scripted;

pub use http::{HttpJudge, WireFormat};
pub use instruction::JudgeInstruction;
pub use scripted::{ScriptedJudge, ScriptedReply};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::query::DisputeQuery;

/// Confidence level attached to a judge's verdict.
///
/// Ranges from 0.0 (no confidence) to 1.0 (absolute certainty).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// Creates a new confidence value.
    ///
    /// # Panics
    /// Panics if value is outside the valid range.
    pub fn new(value: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&value),
            "Confidence must be between 0.0 and 1.0"
        );
        Self(value)
    }

    /// Creates a confidence value, clamping into `[0, 1]`.
    ///
    /// Non-finite input maps to zero.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Zero confidence, used by abstentions.
    pub fn zero() -> Self {
        Self(0.0)
    }

    /// Returns the confidence value.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::zero()
    }
}

impl TryFrom<f64> for Confidence {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!("confidence {} outside [0, 1]", value))
        }
    }
}

impl From<Confidence> for f64 {
    fn from(c: Confidence) -> Self {
        c.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0 * 100.0)
    }
}

/// Verdict cast by a single judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// Party A wins.
    A,
    /// Party B wins.
    B,
    /// Neither party clearly wins.
    Draw,
    /// The judge produced no usable vote.
    Abstain,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::A => write!(f, "A"),
            Verdict::B => write!(f, "B"),
            Verdict::Draw => write!(f, "DRAW"),
            Verdict::Abstain => write!(f, "ABSTAIN"),
        }
    }
}

/// Outcome of a single judge invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// A well-formed reply was received.
    Ok,
    /// No reply within the allotted time.
    Timeout,
    /// Transport or provider failure.
    Error,
    /// A reply arrived but could not be read.
    Malformed,
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStatus::Ok => write!(f, "ok"),
            ResponseStatus::Timeout => write!(f, "timeout"),
            ResponseStatus::Error => write!(f, "error"),
            ResponseStatus::Malformed => write!(f, "malformed"),
        }
    }
}

/// A judge's view on whether the contract is specific enough to decide on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractValidity {
    /// The contract sufficiently specifies the disputed terms.
    Sufficient,
    /// The contract is ambiguous or silent on the disputed terms.
    Insufficient,
    /// The judge did not say.
    #[default]
    Unknown,
}

/// The canonical response of one judge to one dispute.
///
/// Abstaining responses (timeout, error, malformed) are kept alongside
/// real votes so the per-judge breakdown is complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeResponse {
    /// Provider identifier, as configured.
    pub provider: String,
    /// Model the provider ran.
    pub model: String,
    /// The verdict.
    pub verdict: Verdict,
    /// Confidence in the verdict.
    pub confidence: Confidence,
    /// Reasoning text, or the raw reply when it could not be parsed.
    pub reasoning: String,
    /// Contract-validity assessment.
    pub contract_validity: ContractValidity,
    /// Wall-clock time of the call in milliseconds.
    pub latency_ms: u64,
    /// Status tag.
    pub status: ResponseStatus,
    /// Failure detail for non-ok responses.
    pub error: Option<String>,
}

impl JudgeResponse {
    /// Creates a successful vote.
    pub fn vote(
        provider: impl Into<String>,
        model: impl Into<String>,
        verdict: Verdict,
        confidence: Confidence,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            verdict,
            confidence,
            reasoning: reasoning.into(),
            contract_validity: ContractValidity::Unknown,
            latency_ms: 0,
            status: ResponseStatus::Ok,
            error: None,
        }
    }

    /// Creates an abstention with the given failure status.
    pub fn abstain(
        provider: impl Into<String>,
        model: impl Into<String>,
        status: ResponseStatus,
        detail: impl Into<String>,
    ) -> Self {
        let detail = detail.into();
        Self {
            provider: provider.into(),
            model: model.into(),
            verdict: Verdict::Abstain,
            confidence: Confidence::zero(),
            reasoning: detail.clone(),
            contract_validity: ContractValidity::Unknown,
            latency_ms: 0,
            status,
            error: Some(detail),
        }
    }

    /// Creates a timeout abstention.
    pub fn timed_out(provider: impl Into<String>, model: impl Into<String>, after: Duration) -> Self {
        Self::abstain(
            provider,
            model,
            ResponseStatus::Timeout,
            format!("no response within {} ms", after.as_millis()),
        )
    }

    /// Sets the contract-validity assessment.
    pub fn with_validity(mut self, validity: ContractValidity) -> Self {
        self.contract_validity = validity;
        self
    }

    /// Sets the measured latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns true if this response carries a vote.
    ///
    /// The aggregator may still exclude it (confidence floor).
    pub fn casts_vote(&self) -> bool {
        self.status == ResponseStatus::Ok && self.verdict != Verdict::Abstain
    }
}

/// A provider adapter that turns a dispute into one [`JudgeResponse`].
///
/// Implementations must never fail: transport errors, unreadable replies
/// and timeouts are reported as abstaining responses. Each invocation
/// makes at most one outbound call; retry policy belongs to the
/// [`Dispatcher`](crate::Dispatcher).
///
/// # Implementors
///
/// - [`HttpJudge`]: OpenAI-compatible, Anthropic and Gemini endpoints
/// - [`ScriptedJudge`]: canned in-process replies
#[async_trait]
pub trait JudgeClient: Send + Sync {
    /// Provider identifier, used as the weight-table key.
    fn provider(&self) -> &str;

    /// Model name reported in responses.
    fn model(&self) -> &str;

    /// Puts the dispute to the judge, giving up after `timeout`.
    async fn invoke(&self, query: &DisputeQuery, timeout: Duration) -> JudgeResponse;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_new_valid() {
        let c = Confidence::new(0.5);
        assert!((c.value() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    #[should_panic(expected = "Confidence must be between 0.0 and 1.0")]
    fn test_confidence_new_invalid_high() {
        Confidence::new(1.5);
    }

    #[test]
    fn test_confidence_clamped() {
        assert_eq!(Confidence::clamped(1.7).value(), 1.0);
        assert_eq!(Confidence::clamped(-0.2).value(), 0.0);
        assert_eq!(Confidence::clamped(f64::NAN).value(), 0.0);
        assert_eq!(Confidence::clamped(0.42).value(), 0.42);
    }

    #[test]
    fn test_confidence_display() {
        let c = Confidence::new(0.75);
        assert_eq!(c.to_string(), "75.0%");
    }

    #[test]
    fn test_confidence_serde_rejects_out_of_range() {
        assert!(serde_json::from_str::<Confidence>("0.3").is_ok());
        assert!(serde_json::from_str::<Confidence>("1.3").is_err());
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::A.to_string(), "A");
        assert_eq!(Verdict::B.to_string(), "B");
        assert_eq!(Verdict::Draw.to_string(), "DRAW");
        assert_eq!(Verdict::Abstain.to_string(), "ABSTAIN");
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ResponseStatus::Malformed).unwrap();
        assert_eq!(json, r#""malformed""#);
    }

    #[test]
    fn test_vote_casts_vote() {
        let vote = JudgeResponse::vote("claude", "m", Verdict::A, Confidence::new(0.9), "A delivered");
        assert!(vote.casts_vote());
        assert_eq!(vote.status, ResponseStatus::Ok);
        assert!(vote.error.is_none());
    }

    #[test]
    fn test_abstain_carries_no_vote() {
        let resp = JudgeResponse::abstain("gemini", "m", ResponseStatus::Error, "HTTP 500");
        assert!(!resp.casts_vote());
        assert_eq!(resp.verdict, Verdict::Abstain);
        assert_eq!(resp.confidence.value(), 0.0);
        assert_eq!(resp.error.as_deref(), Some("HTTP 500"));
    }

    #[test]
    fn test_timed_out_response() {
        let resp = JudgeResponse::timed_out("grok", "m", Duration::from_millis(1500));
        assert_eq!(resp.status, ResponseStatus::Timeout);
        assert!(resp.reasoning.contains("1500 ms"));
    }

    #[test]
    fn test_ok_abstain_does_not_vote() {
        let mut resp = JudgeResponse::vote("x", "m", Verdict::Abstain, Confidence::zero(), "none");
        resp.status = ResponseStatus::Ok;
        assert!(!resp.casts_vote());
    }

    #[test]
    fn test_with_latency() {
        let resp = JudgeResponse::vote("x", "m", Verdict::B, Confidence::new(0.6), "r")
            .with_latency(Duration::from_millis(420));
        assert_eq!(resp.latency_ms, 420);
    }
}
