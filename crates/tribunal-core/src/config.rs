//! Configuration types for Tribunal.
//!
//! Loaded from a JSON file; every section and most fields are optional and
//! fall back to their `Default`. Secrets can stay out of the file: API keys
//! are read from `<ID>_API_KEY` (or the judge's `api_key_env`) and the
//! signing seed from `TRIBUNAL_SIGNING_SEED`.
//!
//! ```json
//! {
//!   "judges": [
//!     { "id": "claude", "kind": "anthropic", "model": "claude-sonnet-4-5", "weight": 1.5 },
//!     { "id": "gemini", "kind": "gemini", "model": "gemini-2.5-flash" }
//!   ],
//!   "scoring": { "quorum": 2, "winning_margin": 0.1 },
//!   "timeouts": { "per_call_ms": 20000, "job_deadline_ms": 30000 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tribunal_council::{DispatchPolicy, QueryLimits, WeightConfig, WireFormat};

use crate::{error::TribunalError, Result};

/// Environment variable consulted for the signing seed by default.
pub const SIGNING_SEED_ENV: &str = "TRIBUNAL_SIGNING_SEED";

/// Configuration for the Tribunal facade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TribunalConfig {
    /// The judge panel, in invocation order.
    pub judges: Vec<JudgeConfig>,

    /// Voting thresholds.
    pub scoring: ScoringConfig,

    /// Call and job time bounds.
    pub timeouts: TimeoutConfig,

    /// Dispute text limits.
    pub limits: LimitsConfig,

    /// Result signing key.
    pub signing: SigningConfig,

    /// Optional on-disk job archive.
    pub archive: ArchiveConfig,
}

/// Provider family of a judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeKind {
    /// OpenAI chat completions or a compatible endpoint (xAI, Perplexity, ...).
    OpenAi,
    /// Anthropic messages API.
    Anthropic,
    /// Google Gemini.
    Gemini,
    /// In-process judge with a canned reply.
    Scripted,
}

impl JudgeKind {
    /// Wire format for HTTP kinds, `None` for scripted judges.
    pub fn wire_format(&self) -> Option<WireFormat> {
        match self {
            JudgeKind::OpenAi => Some(WireFormat::OpenAiChat),
            JudgeKind::Anthropic => Some(WireFormat::AnthropicMessages),
            JudgeKind::Gemini => Some(WireFormat::GeminiGenerate),
            JudgeKind::Scripted => None,
        }
    }
}

/// One judge on the panel.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeConfig {
    /// Unique identifier; also the provider name in results and weights.
    pub id: String,

    /// Provider family.
    pub kind: JudgeKind,

    /// Model name sent to the provider.
    #[serde(default)]
    pub model: String,

    /// Overrides the provider's public endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Inline API key. Prefer `api_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the API key; defaults to `<ID>_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Voting weight; `scoring.default_weight` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,

    /// Completion token bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Raw reply of a scripted judge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,

    /// Reply delay of a scripted judge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

impl JudgeConfig {
    /// Creates a judge entry with everything optional left unset.
    pub fn new(id: impl Into<String>, kind: JudgeKind, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            model: model.into(),
            base_url: None,
            api_key: None,
            api_key_env: None,
            weight: None,
            max_tokens: None,
            reply: None,
            delay_ms: None,
        }
    }

    /// A scripted judge replying with `reply`.
    pub fn scripted(id: impl Into<String>, reply: impl Into<String>) -> Self {
        let mut judge = Self::new(id, JudgeKind::Scripted, "scripted");
        judge.reply = Some(reply.into());
        judge
    }

    /// Sets the voting weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Sets the scripted reply delay.
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    /// Environment variable consulted for the API key.
    pub fn key_env(&self) -> String {
        match &self.api_key_env {
            Some(name) => name.clone(),
            None => format!("{}_API_KEY", self.id.to_uppercase().replace('-', "_")),
        }
    }

    /// The inline key, else the environment key.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(self.key_env()).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

impl std::fmt::Debug for JudgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JudgeConfig")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_env", &self.api_key_env)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

/// Voting thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of judges without an explicit weight.
    pub default_weight: f64,

    /// Minimum effective voters for a binding decision.
    pub quorum: usize,

    /// Minimum share lead to declare a winner.
    pub winning_margin: f64,

    /// Votes below this confidence abstain.
    pub confidence_floor: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            default_weight: 1.0,
            quorum: 1,
            winning_margin: 0.0,
            confidence_floor: 0.0,
        }
    }
}

/// Call and job time bounds, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Bound on one judge call.
    pub per_call_ms: u64,

    /// Bound on the whole fan-out.
    pub job_deadline_ms: u64,

    /// Retry a timed-out judge once when time allows.
    pub retry_on_timeout: bool,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            per_call_ms: 30_000,
            job_deadline_ms: 45_000,
            retry_on_timeout: false,
        }
    }
}

/// Dispute text limits, in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Shortest accepted dispute.
    pub min_query_chars: usize,

    /// Longest accepted dispute.
    pub max_query_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let limits = QueryLimits::default();
        Self {
            min_query_chars: limits.min_chars,
            max_query_chars: limits.max_chars,
        }
    }
}

/// Result signing key source.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Inline 32-byte hex seed. Prefer `seed_env`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_hex: Option<String>,

    /// Environment variable holding the seed.
    pub seed_env: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            seed_hex: None,
            seed_env: SIGNING_SEED_ENV.to_string(),
        }
    }
}

impl SigningConfig {
    /// The inline seed, else the environment seed. `None` means a fresh key
    /// is generated at startup.
    pub fn resolve_seed(&self) -> Option<String> {
        self.seed_hex
            .clone()
            .or_else(|| std::env::var(&self.seed_env).ok())
            .filter(|seed| !seed.trim().is_empty())
    }
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("seed_hex", &self.seed_hex.as_ref().map(|_| "<redacted>"))
            .field("seed_env", &self.seed_env)
            .finish()
    }
}

/// On-disk job archive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Sled database directory; jobs are kept in memory only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl TribunalConfig {
    /// Parses a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TribunalError::Config(format!("invalid JSON: {}", e)))
    }

    /// Reads a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| TribunalError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns [`TribunalError::Config`] naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for judge in &self.judges {
            if judge.id.trim().is_empty() {
                return Err(TribunalError::Config("judge id must not be empty".to_string()));
            }
            if !seen.insert(judge.id.as_str()) {
                return Err(TribunalError::Config(format!("duplicate judge id '{}'", judge.id)));
            }
            if judge.kind != JudgeKind::Scripted && judge.model.trim().is_empty() {
                return Err(TribunalError::Config(format!(
                    "judge '{}' needs a model",
                    judge.id
                )));
            }
        }

        if self.limits.min_query_chars > self.limits.max_query_chars {
            return Err(TribunalError::Config(format!(
                "min_query_chars ({}) exceeds max_query_chars ({})",
                self.limits.min_query_chars, self.limits.max_query_chars
            )));
        }

        self.weight_config()
            .validate()
            .map_err(|e| TribunalError::Config(e.to_string()))?;
        self.dispatch_policy()
            .validate()
            .map_err(|e| TribunalError::Config(e.to_string()))?;
        Ok(())
    }

    /// Weight table built from the panel and the scoring section.
    pub fn weight_config(&self) -> WeightConfig {
        let weights: BTreeMap<String, f64> = self
            .judges
            .iter()
            .filter_map(|judge| judge.weight.map(|w| (judge.id.clone(), w)))
            .collect();
        WeightConfig {
            weights,
            default_weight: self.scoring.default_weight,
            quorum: self.scoring.quorum,
            winning_margin: self.scoring.winning_margin,
            confidence_floor: self.scoring.confidence_floor,
        }
    }

    /// Dispatch policy built from the timeouts section.
    pub fn dispatch_policy(&self) -> DispatchPolicy {
        DispatchPolicy {
            per_call_timeout: Duration::from_millis(self.timeouts.per_call_ms),
            job_deadline: Duration::from_millis(self.timeouts.job_deadline_ms),
            retry_on_timeout: self.timeouts.retry_on_timeout,
        }
    }

    /// Query limits built from the limits section.
    pub fn query_limits(&self) -> QueryLimits {
        QueryLimits {
            min_chars: self.limits.min_query_chars,
            max_chars: self.limits.max_query_chars,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TribunalConfig::default();
        assert!(config.judges.is_empty());
        assert_eq!(config.scoring.quorum, 1);
        assert_eq!(config.timeouts.per_call_ms, 30_000);
        assert_eq!(config.timeouts.job_deadline_ms, 45_000);
        assert_eq!(config.limits.min_query_chars, 10);
        assert_eq!(config.signing.seed_env, "TRIBUNAL_SIGNING_SEED");
        assert!(config.archive.path.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_config_serialization() {
        let mut config = TribunalConfig::default();
        config.judges.push(JudgeConfig::new("claude", JudgeKind::Anthropic, "claude-sonnet-4-5").with_weight(2.0));
        let json = serde_json::to_string(&config).unwrap();
        let parsed = TribunalConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_document() {
        let config = TribunalConfig::from_json(
            r#"{
                "judges": [
                    { "id": "grok", "kind": "openai", "model": "grok-4", "base_url": "https://api.x.ai/v1" }
                ],
                "scoring": { "quorum": 2 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.judges[0].kind, JudgeKind::OpenAi);
        assert_eq!(config.scoring.quorum, 2);
        assert_eq!(config.scoring.default_weight, 1.0);
        assert_eq!(config.timeouts, TimeoutConfig::default());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = TribunalConfig::from_json(r#"{ "judges": [{ "id": "x", "kind": "llama" }] }"#)
            .unwrap_err();
        assert!(matches!(err, TribunalError::Config(_)));
    }

    #[test]
    fn test_weight_config_from_panel() {
        let mut config = TribunalConfig::default();
        config.judges = vec![
            JudgeConfig::new("claude", JudgeKind::Anthropic, "m").with_weight(2.0),
            JudgeConfig::new("gemini", JudgeKind::Gemini, "m"),
        ];
        config.scoring.default_weight = 0.5;
        let weights = config.weight_config();
        assert_eq!(weights.weight_for("claude"), 2.0);
        assert_eq!(weights.weight_for("gemini"), 0.5);
    }

    #[test]
    fn test_dispatch_policy_conversion() {
        let mut config = TribunalConfig::default();
        config.timeouts.per_call_ms = 1500;
        config.timeouts.retry_on_timeout = true;
        let policy = config.dispatch_policy();
        assert_eq!(policy.per_call_timeout, Duration::from_millis(1500));
        assert!(policy.retry_on_timeout);
    }

    #[test]
    fn test_duplicate_judge_rejected() {
        let mut config = TribunalConfig::default();
        config.judges = vec![
            JudgeConfig::scripted("same", "{}"),
            JudgeConfig::scripted("same", "{}"),
        ];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate judge id 'same'"));
    }

    #[test]
    fn test_http_judge_needs_model() {
        let mut config = TribunalConfig::default();
        config.judges = vec![JudgeConfig::new("openai", JudgeKind::OpenAi, "")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let mut config = TribunalConfig::default();
        config.scoring.quorum = 0;
        assert!(config.validate().is_err());

        let mut config = TribunalConfig::default();
        config.scoring.winning_margin = 1.5;
        assert!(config.validate().is_err());

        let mut config = TribunalConfig::default();
        config.judges = vec![JudgeConfig::scripted("neg", "{}").with_weight(-1.0)];
        assert!(config.validate().is_err());

        let mut config = TribunalConfig::default();
        config.scoring.default_weight = 1e308;
        assert!(config.validate().is_err());

        let mut config = TribunalConfig::default();
        config.timeouts.job_deadline_ms = 0;
        assert!(config.validate().is_err());

        let mut config = TribunalConfig::default();
        config.limits.min_query_chars = 100;
        config.limits.max_query_chars = 50;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_key_env_name() {
        let judge = JudgeConfig::new("open-ai", JudgeKind::OpenAi, "gpt-4o");
        assert_eq!(judge.key_env(), "OPEN_AI_API_KEY");

        let mut judge = judge;
        judge.api_key_env = Some("MY_KEY".to_string());
        assert_eq!(judge.key_env(), "MY_KEY");
    }

    #[test]
    fn test_inline_key_wins() {
        let mut judge = JudgeConfig::new("claude", JudgeKind::Anthropic, "m");
        judge.api_key = Some("sk-inline".to_string());
        judge.api_key_env = Some("TRIBUNAL_TEST_UNSET_VARIABLE".to_string());
        assert_eq!(judge.resolve_api_key().as_deref(), Some("sk-inline"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut judge = JudgeConfig::new("claude", JudgeKind::Anthropic, "m");
        judge.api_key = Some("sk-secret".to_string());
        assert!(!format!("{:?}", judge).contains("sk-secret"));

        let signing = SigningConfig {
            seed_hex: Some("00".repeat(32)),
            ..SigningConfig::default()
        };
        assert!(!format!("{:?}", signing).contains(&"00".repeat(32)));
    }
}
