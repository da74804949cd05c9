//! Raw judge reply normalization.
//!
//! Providers drift from the requested format in predictable ways: JSON
//! wrapped in a Markdown fence, JSON preceded by a sentence of prose,
//! alternative key names, percentages instead of fractions, or the older
//! `VERDICT: / CONFIDENCE: / REASONING:` line format. [`normalize`]
//! accepts all of these and turns everything else into a `malformed`
//! abstention that keeps the raw reply for audit.

use serde_json::{Map, Value};
use std::time::Duration;

use crate::judge::{Confidence, ContractValidity, JudgeResponse, ResponseStatus, Verdict};

const VERDICT_KEYS: [&str; 3] = ["verdict", "winning_party", "decision"];

/// Fields recovered from a raw reply.
#[derive(Debug)]
struct Parsed {
    verdict: Verdict,
    confidence: Confidence,
    reasoning: String,
    validity: ContractValidity,
}

/// Turns a raw provider reply into a canonical [`JudgeResponse`].
///
/// Never fails. A reply that cannot be read yields
/// `status = malformed`, `verdict = Abstain`, zero confidence and the raw
/// text as reasoning, with the parse problem in `error`.
pub fn normalize(provider: &str, model: &str, raw: &str, latency: Duration) -> JudgeResponse {
    match parse(raw) {
        Ok(parsed) => JudgeResponse::vote(
            provider,
            model,
            parsed.verdict,
            parsed.confidence,
            parsed.reasoning,
        )
        .with_validity(parsed.validity)
        .with_latency(latency),
        Err(reason) => {
            let mut response =
                JudgeResponse::abstain(provider, model, ResponseStatus::Malformed, reason);
            response.reasoning = raw.to_string();
            response.with_latency(latency)
        }
    }
}

fn parse(raw: &str) -> Result<Parsed, String> {
    if raw.trim().is_empty() {
        return Err("empty reply".to_string());
    }
    if let Some(object) = extract_json(raw) {
        return from_json(&object);
    }
    from_lines(raw)
}

/// Locates a JSON object: the whole reply, a fenced block, or the outermost braces.
fn extract_json(raw: &str) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();
    if let Some(object) = parse_object(trimmed) {
        return Some(object);
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        // Skip a language tag such as `json` on the opening fence line.
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            if let Some(object) = parse_object(body[..end].trim()) {
                return Some(object);
            }
        }
    }

    let open = trimmed.find('{')?;
    let close = trimmed.rfind('}')?;
    if close <= open {
        return None;
    }
    parse_object(&trimmed[open..=close])
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn from_json(object: &Map<String, Value>) -> Result<Parsed, String> {
    let token = VERDICT_KEYS
        .iter()
        .find_map(|key| object.get(*key))
        .ok_or_else(|| "missing verdict".to_string())?;
    let token = match token {
        Value::String(s) => s.as_str(),
        other => return Err(format!("verdict is not a string: {}", other)),
    };
    let verdict = parse_verdict(token).ok_or_else(|| format!("unrecognized verdict '{}'", token))?;

    let confidence = match object.get("confidence") {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| format!("confidence {} is not representable", n))?,
        Some(Value::String(s)) => parse_confidence(s)?,
        Some(other) => return Err(format!("confidence is not a number: {}", other)),
        None => return Err("missing confidence".to_string()),
    };
    let confidence = finite_confidence(confidence)?;

    let reasoning = match object.get("reasoning") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::String(_)) => return Err("empty reasoning".to_string()),
        Some(other) => return Err(format!("reasoning is not a string: {}", other)),
        None => return Err("missing reasoning".to_string()),
    };

    let validity = match object.get("contract_validity") {
        Some(Value::String(s)) => parse_validity(s),
        Some(Value::Bool(true)) => ContractValidity::Sufficient,
        Some(Value::Bool(false)) => ContractValidity::Insufficient,
        _ => ContractValidity::Unknown,
    };

    Ok(Parsed {
        verdict,
        confidence,
        reasoning,
        validity,
    })
}

/// Reads the `KEY: value` line format. `REASONING:` takes the rest of the reply.
fn from_lines(raw: &str) -> Result<Parsed, String> {
    let lines: Vec<&str> = raw.lines().collect();
    let mut verdict_token = None;
    let mut confidence_token = None;
    let mut validity_token = None;
    let mut reasoning = None;

    for (i, line) in lines.iter().enumerate() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().trim_matches('*').trim().to_ascii_uppercase();
        let value = value.trim();
        match key.as_str() {
            "VERDICT" | "DECISION" | "WINNER" => {
                verdict_token.get_or_insert(value);
            }
            "CONFIDENCE" => {
                confidence_token.get_or_insert(value);
            }
            "CONTRACT_VALIDITY" | "CONTRACT VALIDITY" => {
                validity_token.get_or_insert(value);
            }
            "REASONING" => {
                let mut text = value.to_string();
                for rest in &lines[i + 1..] {
                    text.push('\n');
                    text.push_str(rest);
                }
                reasoning = Some(text.trim().to_string());
                break;
            }
            _ => {}
        }
    }

    let token = verdict_token.ok_or_else(|| "no JSON object or VERDICT line found".to_string())?;
    let verdict = parse_verdict(token).ok_or_else(|| format!("unrecognized verdict '{}'", token))?;
    let confidence = confidence_token.ok_or_else(|| "missing confidence".to_string())?;
    let confidence = finite_confidence(parse_confidence(confidence)?)?;
    let reasoning = reasoning
        .filter(|r| !r.is_empty())
        .ok_or_else(|| "missing reasoning".to_string())?;
    let validity = validity_token
        .map(parse_validity)
        .unwrap_or(ContractValidity::Unknown);

    Ok(Parsed {
        verdict,
        confidence,
        reasoning,
        validity,
    })
}

fn parse_verdict(token: &str) -> Option<Verdict> {
    let lowered = token
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c == '*')
        .to_lowercase()
        .replace(['_', '-'], " ");
    let mut t = lowered.trim();
    t = t.strip_prefix("party ").unwrap_or(t);
    t = t.strip_suffix(" wins").unwrap_or(t);
    match t.trim() {
        "a" => Some(Verdict::A),
        "b" => Some(Verdict::B),
        "draw" | "tie" | "uncertain" | "undecided" | "neither" => Some(Verdict::Draw),
        _ => None,
    }
}

fn parse_confidence(token: &str) -> Result<f64, String> {
    let token = token.trim();
    let (number, scale) = match token.strip_suffix('%') {
        Some(n) => (n.trim(), 100.0),
        None => (token, 1.0),
    };
    number
        .parse::<f64>()
        .map(|v| v / scale)
        .map_err(|_| format!("confidence '{}' is not a number", token))
}

fn finite_confidence(value: f64) -> Result<Confidence, String> {
    if !value.is_finite() {
        return Err(format!("confidence {} is not finite", value));
    }
    Ok(Confidence::clamped(value))
}

fn parse_validity(token: &str) -> ContractValidity {
    match token.trim().to_ascii_lowercase().as_str() {
        "valid" | "sufficient" | "true" => ContractValidity::Sufficient,
        "invalid" | "ambiguous" | "insufficient" | "false" => ContractValidity::Insufficient,
        _ => ContractValidity::Unknown,
    }
}
