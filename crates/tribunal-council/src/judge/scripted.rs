//! In-process judge with canned replies.
//!
//! Backs the CLI `--mock` mode and every test that needs a judge without
//! network access. Replies still pass through the normalizer, so a
//! scripted judge exercises the same parsing path as a real provider.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::{JudgeClient, JudgeResponse, ResponseStatus, Verdict};
use crate::normalize::normalize;
use crate::query::DisputeQuery;

/// What a [`ScriptedJudge`] answers with.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    /// Raw reply text, fed to the normalizer.
    Raw(String),
    /// Transport failure with the given detail.
    Fail(String),
    /// Panics inside `invoke`.
    Panic,
}

/// A judge that replies with a fixed script after a fixed delay.
#[derive(Debug)]
pub struct ScriptedJudge {
    provider: String,
    model: String,
    reply: ScriptedReply,
    delay: Duration,
    invocations: AtomicUsize,
}

impl ScriptedJudge {
    /// Creates a judge returning `reply` with no delay.
    pub fn new(provider: impl Into<String>, reply: ScriptedReply) -> Self {
        Self {
            provider: provider.into(),
            model: "scripted".to_string(),
            reply,
            delay: Duration::ZERO,
            invocations: AtomicUsize::new(0),
        }
    }

    /// Creates a judge that answers with a well-formed JSON verdict.
    pub fn verdict(provider: impl Into<String>, verdict: Verdict, confidence: f64) -> Self {
        let provider = provider.into();
        let token = match verdict {
            Verdict::A => "A",
            Verdict::B => "B",
            Verdict::Draw | Verdict::Abstain => "DRAW",
        };
        let raw = serde_json::json!({
            "verdict": token,
            "confidence": confidence,
            "reasoning": format!("{} weighed the contract terms and found for {}.", provider, token),
            "contract_validity": "sufficient",
        })
        .to_string();
        Self::new(provider, ScriptedReply::Raw(raw))
    }

    /// Sets the reply delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the reported model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Number of times `invoke` has been called.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JudgeClient for ScriptedJudge {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, _query: &DisputeQuery, timeout: Duration) -> JudgeResponse {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();

        if self.delay > timeout {
            tokio::time::sleep(timeout).await;
            return JudgeResponse::timed_out(&self.provider, &self.model, timeout)
                .with_latency(started.elapsed());
        }
        tokio::time::sleep(self.delay).await;

        match &self.reply {
            ScriptedReply::Raw(raw) => normalize(&self.provider, &self.model, raw, started.elapsed()),
            ScriptedReply::Fail(detail) => {
                JudgeResponse::abstain(&self.provider, &self.model, ResponseStatus::Error, detail.clone())
                    .with_latency(started.elapsed())
            }
            ScriptedReply::Panic => panic!("scripted judge {} panicked", self.provider),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> DisputeQuery {
        DisputeQuery::new("Party A: Seller\nParty B: Buyer\nThe goods arrived damaged.").unwrap()
    }

    #[tokio::test]
    async fn test_verdict_helper_parses() {
        let judge = ScriptedJudge::verdict("claude", Verdict::B, 0.8);
        let resp = judge.invoke(&query(), Duration::from_secs(1)).await;
        assert_eq!(resp.status, ResponseStatus::Ok);
        assert_eq!(resp.verdict, Verdict::B);
        assert!((resp.confidence.value() - 0.8).abs() < 1e-12);
        assert_eq!(resp.model, "scripted");
    }

    #[tokio::test]
    async fn test_fail_reply_is_error() {
        let judge = ScriptedJudge::new("gemini", ScriptedReply::Fail("HTTP 503".into()));
        let resp = judge.invoke(&query(), Duration::from_secs(1)).await;
        assert_eq!(resp.status, ResponseStatus::Error);
        assert_eq!(resp.error.as_deref(), Some("HTTP 503"));
    }

    #[tokio::test]
    async fn test_delay_beyond_timeout_times_out() {
        let judge = ScriptedJudge::verdict("grok", Verdict::A, 0.9).with_delay(Duration::from_secs(5));
        let started = Instant::now();
        let resp = judge.invoke(&query(), Duration::from_millis(50)).await;
        assert_eq!(resp.status, ResponseStatus::Timeout);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_every_invocation_is_counted() {
        let judge = ScriptedJudge::verdict("openai", Verdict::A, 0.7);
        judge.invoke(&query(), Duration::from_secs(1)).await;
        judge.invoke(&query(), Duration::from_secs(1)).await;
        assert_eq!(judge.invocations(), 2);
    }
}
