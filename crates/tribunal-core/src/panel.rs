//! Builds judge clients from configuration.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use tribunal_council::{HttpJudge, JudgeClient, ScriptedJudge, ScriptedReply, Verdict};

use crate::config::{JudgeConfig, JudgeKind};
use crate::{error::TribunalError, Result};

/// Confidence of the default scripted reply.
const MOCK_CONFIDENCE: f64 = 0.85;

/// Creates one client per configured judge, in configuration order.
///
/// HTTP judges share a single connection pool.
///
/// # Errors
///
/// Returns [`TribunalError::Config`] if an HTTP judge has no API key.
pub fn build_panel(judges: &[JudgeConfig]) -> Result<Vec<Arc<dyn JudgeClient>>> {
    let client = reqwest::Client::new();
    judges
        .iter()
        .map(|judge| build_judge(judge, &client))
        .collect()
}

/// Creates a scripted stand-in for every configured judge.
///
/// Judges without a scripted reply answer A at 85% confidence. An empty
/// panel becomes three scripted judges named after the public providers.
pub fn mock_panel(judges: &[JudgeConfig]) -> Vec<Arc<dyn JudgeClient>> {
    if judges.is_empty() {
        return ["openai", "anthropic", "gemini"]
            .into_iter()
            .map(|id| Arc::new(ScriptedJudge::verdict(id, Verdict::A, MOCK_CONFIDENCE)) as Arc<dyn JudgeClient>)
            .collect();
    }
    judges.iter().map(scripted).collect()
}

fn build_judge(judge: &JudgeConfig, client: &reqwest::Client) -> Result<Arc<dyn JudgeClient>> {
    let format = match judge.kind.wire_format() {
        Some(format) => format,
        None => return Ok(scripted(judge)),
    };

    let api_key = judge.resolve_api_key().ok_or_else(|| {
        TribunalError::Config(format!(
            "judge '{}' has no API key (set api_key or {})",
            judge.id,
            judge.key_env()
        ))
    })?;

    let mut http = HttpJudge::new(&judge.id, &judge.model, format, api_key).with_client(client.clone());
    if let Some(base_url) = &judge.base_url {
        http = http.with_base_url(base_url);
    }
    if let Some(max_tokens) = judge.max_tokens {
        http = http.with_max_tokens(max_tokens);
    }
    debug!("Judge '{}' -> {}", judge.id, http.endpoint());
    Ok(Arc::new(http))
}

fn scripted(judge: &JudgeConfig) -> Arc<dyn JudgeClient> {
    let scripted = match &judge.reply {
        Some(reply) => ScriptedJudge::new(&judge.id, ScriptedReply::Raw(reply.clone())),
        None => ScriptedJudge::verdict(&judge.id, Verdict::A, MOCK_CONFIDENCE),
    };
    let scripted = if judge.kind == JudgeKind::Scripted && !judge.model.is_empty() {
        scripted.with_model(&judge.model)
    } else {
        scripted
    };
    let delay = Duration::from_millis(judge.delay_ms.unwrap_or(0));
    Arc::new(scripted.with_delay(delay))
}
