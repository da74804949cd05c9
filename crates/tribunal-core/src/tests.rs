//! Unit tests for tribunal-core.

use std::time::Duration;

use crate::{JudgeConfig, Tribunal, TribunalConfig, TribunalError};

fn scripted_config() -> TribunalConfig {
    let mut config = TribunalConfig::default();
    config.judges = vec![JudgeConfig::scripted(
        "solo",
        r#"{"verdict":"A","confidence":0.8,"reasoning":"Delivered as agreed."}"#,
    )];
    config
}

#[test]
fn test_crate_structure() {
    // Smoke test - verifies the module structure compiles
    use crate::{Decision, DecisionReason, FailureCode, JobStatus, ResponseStatus, Verdict};

    let _config = TribunalConfig::default();
    let _decision = Decision::Draw;
    let _reason = DecisionReason::InsufficientQuorum;
    let _code = FailureCode::SigningFailure;
    let _status = JobStatus::Pending;
    let _response = ResponseStatus::Timeout;
    let _verdict = Verdict::Abstain;
}

#[test]
fn test_submit_outside_runtime() {
    let tribunal = Tribunal::new(scripted_config()).unwrap();
    let err = tribunal
        .submit("Party A: Seller\nParty B: Buyer\nThe parcel never arrived.")
        .unwrap_err();
    assert!(matches!(err, TribunalError::Internal(_)));
    assert!(tribunal.job_ids().is_empty());
}

#[test]
fn test_invalid_config_rejected_at_construction() {
    let mut config = scripted_config();
    config.scoring.confidence_floor = -0.1;
    let err = Tribunal::new(config).unwrap_err();
    assert!(matches!(err, TribunalError::Config(_)));
}

#[test]
fn test_bad_signing_seed_rejected() {
    let mut config = scripted_config();
    config.signing.seed_hex = Some("not-hex".to_string());
    let err = Tribunal::new(config).unwrap_err();
    assert!(err.to_string().contains("signing seed"));
}

#[test]
fn test_configured_seed_sets_public_key() {
    let mut config = scripted_config();
    config.signing.seed_hex =
        Some("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60".to_string());
    let tribunal = Tribunal::new(config).unwrap();
    assert_eq!(
        tribunal.public_key(),
        "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
    );
}

#[tokio::test]
async fn test_poll_unknown_job() {
    let tribunal = Tribunal::new(scripted_config()).unwrap();
    assert!(matches!(tribunal.poll("missing"), Err(TribunalError::NotFound(_))));
    assert!(matches!(
        tribunal.wait("missing", Duration::from_millis(10)).await,
        Err(TribunalError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_short_dispute_rejected_before_job_exists() {
    let tribunal = Tribunal::new(scripted_config()).unwrap();
    let err = tribunal.submit("too short").unwrap_err();
    assert!(matches!(err, TribunalError::Council(_)));
    assert!(tribunal.job_ids().is_empty());
}

#[test]
fn test_wait_budget_millis_saturate() {
    use crate::tribunal::duration_ms;

    assert_eq!(duration_ms(Duration::from_millis(1_500)), 1_500);
    assert_eq!(duration_ms(Duration::MAX), u64::MAX);
}
