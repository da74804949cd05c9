//! Weighted consensus over judge verdicts.
//!
//! Each effective voter adds `weight × confidence` to the tally of its
//! verdict. A party only wins when enough judges voted (quorum) and its
//! share of the weighted vote leads the other party's by at least the
//! winning margin. Every other outcome is an explicit `Draw` with a
//! reason code.
//!
//! ## Decision Rules
//!
//! 1. Effective voters: `status = ok`, verdict A/B/Draw, confidence at or
//!    above the floor. Everyone else abstains.
//! 2. Fewer effective voters than quorum: Draw.
//! 3. Zero or non-finite total tally: Draw, confidence 0.
//! 4. Equal A and B shares: Draw.
//! 5. Lead below the winning margin: Draw.
//!
//! The reported confidence is the weighted confidence backing the decision,
//! `tally(decision) / Σ weight of effective voters`. Every forced Draw
//! reports the support of explicit Draw votes, whatever rule forced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::error::CouncilError;
use crate::judge::{JudgeResponse, Verdict};
use crate::query::DisputeQuery;
use crate::Result;

/// Shares closer than this are treated as equal.
const SHARE_EPSILON: f64 = 1e-9;

/// Largest accepted judge weight. Keeps weighted sums finite.
pub const MAX_WEIGHT: f64 = 1e6;

fn default_weight() -> f64 {
    1.0
}

fn default_quorum() -> usize {
    1
}

/// Per-provider weights and the global voting thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightConfig {
    /// Provider identifier to weight.
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    /// Weight for providers missing from `weights`.
    #[serde(default = "default_weight")]
    pub default_weight: f64,
    /// Minimum number of effective voters for a binding decision.
    #[serde(default = "default_quorum")]
    pub quorum: usize,
    /// Minimum share lead required to declare a winner.
    #[serde(default)]
    pub winning_margin: f64,
    /// Votes below this confidence abstain.
    #[serde(default)]
    pub confidence_floor: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            weights: BTreeMap::new(),
            default_weight: default_weight(),
            quorum: default_quorum(),
            winning_margin: 0.0,
            confidence_floor: 0.0,
        }
    }
}

impl WeightConfig {
    /// Sets the weight of one provider.
    pub fn with_weight(mut self, provider: impl Into<String>, weight: f64) -> Self {
        self.weights.insert(provider.into(), weight);
        self
    }

    /// Sets the weight used for unlisted providers.
    pub fn with_default_weight(mut self, weight: f64) -> Self {
        self.default_weight = weight;
        self
    }

    /// Sets the quorum.
    pub fn with_quorum(mut self, quorum: usize) -> Self {
        self.quorum = quorum;
        self
    }

    /// Sets the winning margin.
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.winning_margin = margin;
        self
    }

    /// Sets the confidence floor.
    pub fn with_confidence_floor(mut self, floor: f64) -> Self {
        self.confidence_floor = floor;
        self
    }

    /// Weight of a provider.
    pub fn weight_for(&self, provider: &str) -> f64 {
        self.weights
            .get(provider)
            .copied()
            .unwrap_or(self.default_weight)
    }

    /// Checks that every weight and threshold is usable.
    ///
    /// # Errors
    ///
    /// Returns [`CouncilError::InvalidWeights`] for weights outside
    /// `[0, MAX_WEIGHT]`, a zero quorum, or thresholds outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        for (provider, weight) in &self.weights {
            check_weight(provider, *weight)?;
        }
        check_weight("default_weight", self.default_weight)?;

        if self.quorum == 0 {
            return Err(CouncilError::InvalidWeights(
                "quorum must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.winning_margin) {
            return Err(CouncilError::InvalidWeights(format!(
                "winning_margin {} outside [0, 1]",
                self.winning_margin
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_floor) {
            return Err(CouncilError::InvalidWeights(format!(
                "confidence_floor {} outside [0, 1]",
                self.confidence_floor
            )));
        }
        Ok(())
    }
}

fn check_weight(name: &str, weight: f64) -> Result<()> {
    if !(0.0..=MAX_WEIGHT).contains(&weight) {
        return Err(CouncilError::InvalidWeights(format!(
            "weight for {} must be between 0 and {}, got {}",
            name, MAX_WEIGHT, weight
        )));
    }
    Ok(())
}

/// Final decision of the council.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// Party A wins.
    A,
    /// Party B wins.
    B,
    /// No binding winner.
    Draw,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::A => write!(f, "A"),
            Decision::B => write!(f, "B"),
            Decision::Draw => write!(f, "DRAW"),
        }
    }
}

/// Why the council reached its decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// One party led by at least the winning margin.
    Winner,
    /// A and B shares were equal.
    Tie,
    /// The leader's margin was below the threshold.
    InsufficientMargin,
    /// Too few effective voters.
    InsufficientQuorum,
    /// Voters carried no weight or no confidence.
    NoSupport,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecisionReason::Winner => "winner",
            DecisionReason::Tie => "tie",
            DecisionReason::InsufficientMargin => "insufficient_margin",
            DecisionReason::InsufficientQuorum => "insufficient_quorum",
            DecisionReason::NoSupport => "no_support",
        };
        write!(f, "{}", s)
    }
}

/// Weighted tally of the effective votes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoteTally {
    /// Σ weight × confidence for A.
    pub a: f64,
    /// Σ weight × confidence for B.
    pub b: f64,
    /// Σ weight × confidence for Draw.
    pub draw: f64,
    /// Σ weight of effective voters.
    pub voter_weight: f64,
    /// Number of effective voters.
    pub effective_voters: usize,
    /// Number of responses that did not vote.
    pub abstentions: usize,
}

impl VoteTally {
    /// Tallies responses under a weight configuration.
    pub fn from_responses(responses: &[JudgeResponse], weights: &WeightConfig) -> Self {
        let mut tally = Self::default();

        for response in responses {
            let confidence = response.confidence.value();
            if !response.casts_vote() || confidence < weights.confidence_floor {
                tally.abstentions += 1;
                continue;
            }

            let weight = weights.weight_for(&response.provider);
            let contribution = weight * confidence;
            match response.verdict {
                Verdict::A => tally.a += contribution,
                Verdict::B => tally.b += contribution,
                Verdict::Draw => tally.draw += contribution,
                Verdict::Abstain => {
                    tally.abstentions += 1;
                    continue;
                }
            }
            tally.voter_weight += weight;
            tally.effective_voters += 1;
        }

        tally
    }

    /// Σ of all tallies.
    pub fn total(&self) -> f64 {
        self.a + self.b + self.draw
    }

    fn tally_of(&self, decision: Decision) -> f64 {
        match decision {
            Decision::A => self.a,
            Decision::B => self.b,
            Decision::Draw => self.draw,
        }
    }

    /// Fraction of the weighted vote behind a decision.
    pub fn share(&self, decision: Decision) -> f64 {
        let total = self.total();
        if !total.is_finite() || total <= 0.0 {
            0.0
        } else {
            self.tally_of(decision) / total
        }
    }

    /// Weighted confidence backing a decision.
    pub fn support(&self, decision: Decision) -> f64 {
        let tally = self.tally_of(decision);
        if !self.voter_weight.is_finite() || !tally.is_finite() || self.voter_weight <= 0.0 {
            0.0
        } else {
            (tally / self.voter_weight).clamp(0.0, 1.0)
        }
    }

    /// All three shares.
    pub fn shares(&self) -> VoteShares {
        VoteShares {
            a: self.share(Decision::A),
            b: self.share(Decision::B),
            draw: self.share(Decision::Draw),
        }
    }
}

/// Share of the weighted vote per verdict.
///
/// Sums to 1 whenever any weighted confidence was cast, else all zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VoteShares {
    pub a: f64,
    pub b: f64,
    pub draw: f64,
}

/// Detached signature over a result's canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSignature {
    /// Signature scheme, e.g. `ed25519`.
    pub algorithm: String,
    /// Hex-encoded public key.
    pub public_key: String,
    /// Hex-encoded signature.
    pub signature: String,
}

/// The council's final, auditable answer for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// Job this result belongs to.
    pub job_id: String,
    /// SHA-256 of the dispute text.
    pub query_digest: String,
    /// The decision.
    pub final_decision: Decision,
    /// Weighted confidence backing the decision.
    pub final_confidence: f64,
    /// Why this decision was reached.
    pub reason: DecisionReason,
    /// Weighted vote shares.
    pub shares: VoteShares,
    /// Number of judges whose vote counted.
    pub effective_voters: usize,
    /// Σ weight of effective voters.
    pub total_weight: f64,
    /// Human-readable summary.
    pub explanation: String,
    /// Every judge's response, in invocation order.
    pub judges: Vec<JudgeResponse>,
    /// When the decision was made.
    pub decided_at: DateTime<Utc>,
    /// Attached by the signer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<ResultSignature>,
}

impl AggregatedResult {
    /// Returns true once a signature is attached.
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

/// Weighted voting engine.
///
/// # Voting Rules
///
/// - Abstentions and below-floor votes carry no weight
/// - Draw votes dilute both parties but never win outright
/// - A split panel below the margin is a Draw, not a coin flip
#[derive(Debug, Clone)]
pub struct ConsensusEngine {
    weights: WeightConfig,
}

impl ConsensusEngine {
    /// Creates an engine after validating the configuration.
    pub fn new(weights: WeightConfig) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// The active configuration.
    pub fn weights(&self) -> &WeightConfig {
        &self.weights
    }

    /// Computes the decision and reason for a tally.
    pub fn decide(&self, tally: &VoteTally) -> (Decision, DecisionReason) {
        if tally.effective_voters < self.weights.quorum {
            return (Decision::Draw, DecisionReason::InsufficientQuorum);
        }
        let total = tally.total();
        if !total.is_finite() || total <= 0.0 {
            return (Decision::Draw, DecisionReason::NoSupport);
        }

        let share_a = tally.share(Decision::A);
        let share_b = tally.share(Decision::B);
        if (share_a - share_b).abs() <= SHARE_EPSILON {
            return (Decision::Draw, DecisionReason::Tie);
        }

        let (winner, lead) = if share_a > share_b {
            (Decision::A, share_a - share_b)
        } else {
            (Decision::B, share_b - share_a)
        };
        if lead + SHARE_EPSILON < self.weights.winning_margin {
            return (Decision::Draw, DecisionReason::InsufficientMargin);
        }
        (winner, DecisionReason::Winner)
    }

    /// Reduces the responses of one job to an unsigned result.
    pub fn aggregate(
        &self,
        job_id: impl Into<String>,
        query: &DisputeQuery,
        responses: Vec<JudgeResponse>,
    ) -> AggregatedResult {
        let tally = VoteTally::from_responses(&responses, &self.weights);
        let (decision, reason) = self.decide(&tally);
        let confidence = tally.support(decision);

        debug!(
            "Tally A={:.3} B={:.3} Draw={:.3} over {} voters: {} ({})",
            tally.a, tally.b, tally.draw, tally.effective_voters, decision, reason
        );

        let explanation = explain(query, &tally, decision, reason, confidence, &self.weights);

        AggregatedResult {
            job_id: job_id.into(),
            query_digest: query.digest(),
            final_decision: decision,
            final_confidence: confidence,
            reason,
            shares: tally.shares(),
            effective_voters: tally.effective_voters,
            total_weight: tally.voter_weight,
            explanation,
            judges: responses,
            decided_at: Utc::now(),
            signature: None,
        }
    }
}

fn party_name(query: &DisputeQuery, decision: Decision) -> String {
    let label = match decision {
        Decision::A => query.party_a.as_deref(),
        Decision::B => query.party_b.as_deref(),
        Decision::Draw => None,
    };
    match label {
        Some(label) => format!("Party {} ({})", decision, label),
        None => format!("Party {}", decision),
    }
}

fn explain(
    query: &DisputeQuery,
    tally: &VoteTally,
    decision: Decision,
    reason: DecisionReason,
    confidence: f64,
    weights: &WeightConfig,
) -> String {
    let voters = tally.effective_voters;
    let judges = voters + tally.abstentions;
    let shares = tally.shares();
    match reason {
        DecisionReason::Winner => format!(
            "{} wins with {:.1}% of the weighted vote ({} of {} judges voting, confidence {:.1}%).",
            party_name(query, decision),
            tally.share(decision) * 100.0,
            voters,
            judges,
            confidence * 100.0
        ),
        DecisionReason::Tie => format!(
            "Draw: Party A and Party B split the weighted vote evenly ({:.1}% each, {:.1}% for a draw).",
            shares.a * 100.0,
            shares.draw * 100.0
        ),
        DecisionReason::InsufficientMargin => format!(
            "Draw: the lead of {:.1} points (A {:.1}%, B {:.1}%) is below the required margin of {:.1} points.",
            (shares.a - shares.b).abs() * 100.0,
            shares.a * 100.0,
            shares.b * 100.0,
            weights.winning_margin * 100.0
        ),
        DecisionReason::InsufficientQuorum => format!(
            "Draw: only {} of {} judges returned a usable vote; at least {} are required.",
            voters, judges, weights.quorum
        ),
        DecisionReason::NoSupport => format!(
            "Draw: the {} voting judges carried no weighted confidence.",
            voters
        ),
    }
}
