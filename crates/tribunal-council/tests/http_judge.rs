//! # HTTP Judge Tests
//!
//! Runs [`HttpJudge`] against wiremock servers to pin request construction
//! and the mapping of provider replies to judge responses.
//!
//! | Provider reply | Response | Test |
//! |----------------|----------|------|
//! | 200 with a verdict | `ok`, normalized vote | `test_*_success` |
//! | Non-2xx | `error` carrying the HTTP status | `test_http_error_status_abstains` |
//! | Stalled past the call timeout | `timeout` | `test_stalled_provider_times_out` |
//! | Empty completion | `malformed` | `test_empty_completion_is_malformed` |
//! | Non-JSON body | `malformed` | `test_non_json_body_is_malformed` |

use std::time::Duration;

use serde_json::{json, Value};
use tribunal_council::{DisputeQuery, HttpJudge, JudgeClient, ResponseStatus, Verdict, WireFormat};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CALL_TIMEOUT: Duration = Duration::from_secs(5);

fn query() -> DisputeQuery {
    DisputeQuery::new(
        "Party A: Tenant\nParty B: Landlord\nThe deposit was withheld for normal carpet wear.",
    )
    .unwrap()
}

fn verdict_text(verdict: &str, confidence: f64) -> String {
    json!({
        "verdict": verdict,
        "confidence": confidence,
        "reasoning": "The lease allows deductions for damage only.",
    })
    .to_string()
}

fn openai_reply(content: &str) -> Value {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
}

fn judge(server: &MockServer, format: WireFormat, model: &str) -> HttpJudge {
    HttpJudge::new("test-judge", model, format, "test-api-key").with_base_url(server.uri())
}

// =============================================================================
// SUCCESSFUL REPLIES
// =============================================================================

#[tokio::test]
async fn test_openai_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-api-key"))
        .and(body_partial_json(json!({"model": "gpt-test", "temperature": 0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply(&verdict_text("B", 0.8))))
        .expect(1)
        .mount(&server)
        .await;

    let resp = judge(&server, WireFormat::OpenAiChat, "gpt-test")
        .invoke(&query(), CALL_TIMEOUT)
        .await;

    assert_eq!(resp.status, ResponseStatus::Ok);
    assert_eq!(resp.verdict, Verdict::B);
    assert!((resp.confidence.value() - 0.8).abs() < 1e-9);
    assert_eq!(resp.provider, "test-judge");
    assert!(resp.error.is_none());
}

#[tokio::test]
async fn test_anthropic_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "test-api-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": verdict_text("A", 0.7)}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = judge(&server, WireFormat::AnthropicMessages, "claude-test")
        .invoke(&query(), CALL_TIMEOUT)
        .await;

    assert_eq!(resp.status, ResponseStatus::Ok);
    assert_eq!(resp.verdict, Verdict::A);
    assert!((resp.confidence.value() - 0.7).abs() < 1e-9);
}

#[tokio::test]
async fn test_gemini_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-test:generateContent"))
        .and(header("x-goog-api-key", "test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": verdict_text("DRAW", 0.6)}]}}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = judge(&server, WireFormat::GeminiGenerate, "gemini-test")
        .invoke(&query(), CALL_TIMEOUT)
        .await;

    assert_eq!(resp.status, ResponseStatus::Ok);
    assert_eq!(resp.verdict, Verdict::Draw);
}

// =============================================================================
// FAILURES
// =============================================================================

#[tokio::test]
async fn test_http_error_status_abstains() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    let resp = judge(&server, WireFormat::AnthropicMessages, "claude-test")
        .invoke(&query(), CALL_TIMEOUT)
        .await;

    assert_eq!(resp.status, ResponseStatus::Error);
    assert_eq!(resp.verdict, Verdict::Abstain);
    let error = resp.error.unwrap();
    assert!(error.contains("HTTP 500"), "unexpected error: {}", error);
    assert!(error.contains("upstream overloaded"));
}

#[tokio::test]
async fn test_stalled_provider_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(openai_reply(&verdict_text("A", 0.9)))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let resp = judge(&server, WireFormat::OpenAiChat, "gpt-test")
        .invoke(&query(), Duration::from_millis(300))
        .await;

    assert_eq!(resp.status, ResponseStatus::Timeout);
    assert_eq!(resp.verdict, Verdict::Abstain);
    assert!(resp.latency_ms < 3_000);
}

#[tokio::test]
async fn test_empty_completion_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-test:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let resp = judge(&server, WireFormat::GeminiGenerate, "gemini-test")
        .invoke(&query(), CALL_TIMEOUT)
        .await;

    assert_eq!(resp.status, ResponseStatus::Malformed);
    assert_eq!(resp.verdict, Verdict::Abstain);
    assert_eq!(resp.error.as_deref(), Some("empty completion"));
}

#[tokio::test]
async fn test_blank_openai_content_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply("   ")))
        .mount(&server)
        .await;

    let resp = judge(&server, WireFormat::OpenAiChat, "gpt-test")
        .invoke(&query(), CALL_TIMEOUT)
        .await;

    assert_eq!(resp.status, ResponseStatus::Malformed);
    assert_eq!(resp.error.as_deref(), Some("empty completion"));
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let resp = judge(&server, WireFormat::OpenAiChat, "gpt-test")
        .invoke(&query(), CALL_TIMEOUT)
        .await;

    assert_eq!(resp.status, ResponseStatus::Malformed);
    assert_eq!(resp.reasoning, "<html>gateway</html>");
}

#[tokio::test]
async fn test_garbled_completion_keeps_raw_text() {
    let server = MockServer::start().await;
    let garbled = "Both parties make fair points.";

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply(garbled)))
        .mount(&server)
        .await;

    let resp = judge(&server, WireFormat::OpenAiChat, "gpt-test")
        .invoke(&query(), CALL_TIMEOUT)
        .await;

    assert_eq!(resp.status, ResponseStatus::Malformed);
    assert_eq!(resp.reasoning, garbled);
}
