//! # Result Signing
//!
//! Every completed job carries a detached Ed25519 signature over the
//! canonical bytes of its result (see [`canonical_bytes`]). Anyone holding
//! the published public key can check that a verdict was produced by this
//! service and not altered afterwards.
//!
//! ## Envelope
//!
//! ```json
//! "signature": {
//!   "algorithm": "ed25519",
//!   "public_key": "<64 hex chars>",
//!   "signature": "<128 hex chars>"
//! }
//! ```
//!
//! Private keys are never serialized or logged; [`Ed25519Signer`] has a
//! redacting `Debug` and no `Serialize`.
//!
//! ## References
//!
//! - **RFC 8032** - "Edwards-Curve Digital Signature Algorithm (EdDSA)"
//!   <https://www.rfc-editor.org/rfc/rfc8032>

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use tracing::debug;
use tribunal_council::{AggregatedResult, ResultSignature};

use crate::canonicalize::canonical_bytes;
use crate::models::{RegistryError, Result};

/// Algorithm tag written into signature envelopes.
pub const ED25519: &str = "ed25519";

/// Produces signatures over canonical result bytes.
///
/// Implemented in-process by [`Ed25519Signer`]; an external key provider
/// (HSM, enclave) can stand in behind the same trait.
pub trait ResultSigner: Send + Sync {
    /// Algorithm tag for the envelope.
    fn algorithm(&self) -> &str;

    /// Hex-encoded public key for the envelope.
    fn public_key_hex(&self) -> String;

    /// Signs a message.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;
}

/// In-process Ed25519 signer.
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    /// Generates a fresh random key.
    pub fn generate() -> Self {
        let mut csprng = rand_core::OsRng;
        Self {
            signing_key: SigningKey::generate(&mut csprng),
        }
    }

    /// Creates a signer from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Creates a signer from a 64-character hex seed.
    pub fn from_hex(seed_hex: &str) -> Result<Self> {
        let bytes = hex::decode(seed_hex.trim())
            .map_err(|e| RegistryError::InvalidKey(format!("seed is not hex: {}", e)))?;
        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            RegistryError::InvalidKey(format!("seed must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self::from_seed(&seed))
    }

    /// The seed as hex, for key export.
    pub fn seed_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// The verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl ResultSigner for Ed25519Signer {
    fn algorithm(&self) -> &str {
        ED25519
    }

    fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key().as_bytes())
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(self.signing_key.sign(message).to_bytes().to_vec())
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// Signs a result in place, replacing any existing signature.
pub fn sign_result(signer: &dyn ResultSigner, result: &mut AggregatedResult) -> Result<()> {
    result.signature = None;
    let message = canonical_bytes(result)?;
    let signature = signer.sign(&message)?;

    result.signature = Some(ResultSignature {
        algorithm: signer.algorithm().to_string(),
        public_key: signer.public_key_hex(),
        signature: hex::encode(signature),
    });
    debug!("Signed result for job {} ({} bytes)", result.job_id, message.len());
    Ok(())
}

/// Verifies a result's signature against a trusted public key.
///
/// The key embedded in the envelope is only informational; verification
/// always uses `public_key_hex`, and a mismatch is rejected.
///
/// # Errors
///
/// Returns [`RegistryError::Verification`] if the result is unsigned, uses
/// another algorithm, names a different key, or the signature is invalid.
pub fn verify_result(result: &AggregatedResult, public_key_hex: &str) -> Result<()> {
    let envelope = result
        .signature
        .as_ref()
        .ok_or_else(|| RegistryError::Verification("result is unsigned".to_string()))?;

    if envelope.algorithm != ED25519 {
        return Err(RegistryError::Verification(format!(
            "unsupported algorithm '{}'",
            envelope.algorithm
        )));
    }

    let trusted = public_key_hex.trim().to_ascii_lowercase();
    if envelope.public_key.to_ascii_lowercase() != trusted {
        return Err(RegistryError::Verification(
            "result was signed by a different key".to_string(),
        ));
    }

    let key = parse_public_key(&trusted)?;
    let signature = parse_signature(&envelope.signature)?;
    let message = canonical_bytes(result)?;

    key.verify_strict(&message, &signature)
        .map_err(|e| RegistryError::Verification(e.to_string()))
}

/// Parses a 64-character hex Ed25519 public key.
pub fn parse_public_key(public_key_hex: &str) -> Result<VerifyingKey> {
    let bytes = hex::decode(public_key_hex.trim())
        .map_err(|e| RegistryError::InvalidKey(format!("public key is not hex: {}", e)))?;
    let bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        RegistryError::InvalidKey(format!("public key must be 32 bytes, got {}", bytes.len()))
    })?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| RegistryError::InvalidKey(format!("invalid public key: {}", e)))
}

fn parse_signature(signature_hex: &str) -> Result<Signature> {
    let bytes = hex::decode(signature_hex.trim())
        .map_err(|e| RegistryError::Verification(format!("signature is not hex: {}", e)))?;
    let bytes: [u8; 64] = bytes.as_slice().try_into().map_err(|_| {
        RegistryError::Verification(format!("signature must be 64 bytes, got {}", bytes.len()))
    })?;
    Ok(Signature::from_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribunal_council::{
        Confidence, ConsensusEngine, Decision, DisputeQuery, JudgeResponse, Verdict, WeightConfig,
    };

    const SEED: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

    fn result() -> AggregatedResult {
        let query = DisputeQuery::new("Party A: Artist\nParty B: Gallery\nCommission unpaid.").unwrap();
        ConsensusEngine::new(WeightConfig::default()).unwrap().aggregate(
            "job-42",
            &query,
            vec![
                JudgeResponse::vote("claude", "m", Verdict::A, Confidence::new(0.9), "Unpaid."),
                JudgeResponse::vote("gemini", "m", Verdict::A, Confidence::new(0.7), "Clear terms."),
            ],
        )
    }

    #[test]
    fn test_rfc8032_public_key() {
        // RFC 8032 section 7.1, test 1.
        let signer = Ed25519Signer::from_hex(SEED).unwrap();
        assert_eq!(
            signer.public_key_hex(),
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
        );
        assert_eq!(signer.seed_hex(), SEED);
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = Ed25519Signer::generate();
        let mut result = result();
        sign_result(&signer, &mut result).unwrap();

        let envelope = result.signature.as_ref().unwrap();
        assert_eq!(envelope.algorithm, "ed25519");
        assert_eq!(envelope.signature.len(), 128);
        verify_result(&result, &signer.public_key_hex()).unwrap();
    }

    #[test]
    fn test_verify_after_json_round_trip() {
        let signer = Ed25519Signer::from_hex(SEED).unwrap();
        let mut result = result();
        sign_result(&signer, &mut result).unwrap();

        let json = serde_json::to_string_pretty(&result).unwrap();
        let parsed: AggregatedResult = serde_json::from_str(&json).unwrap();
        verify_result(&parsed, &signer.public_key_hex()).unwrap();
    }

    #[test]
    fn test_tampered_result_rejected() {
        let signer = Ed25519Signer::generate();
        let mut result = result();
        sign_result(&signer, &mut result).unwrap();

        result.final_decision = Decision::B;
        let err = verify_result(&result, &signer.public_key_hex()).unwrap_err();
        assert!(matches!(err, RegistryError::Verification(_)));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let signer = Ed25519Signer::generate();
        let other = Ed25519Signer::generate();
        let mut result = result();
        sign_result(&signer, &mut result).unwrap();

        assert!(verify_result(&result, &other.public_key_hex()).is_err());
    }

    #[test]
    fn test_unsigned_rejected() {
        let signer = Ed25519Signer::generate();
        let err = verify_result(&result(), &signer.public_key_hex()).unwrap_err();
        assert!(err.to_string().contains("unsigned"));
    }

    #[test]
    fn test_resigning_replaces_signature() {
        let first = Ed25519Signer::generate();
        let second = Ed25519Signer::generate();
        let mut result = result();
        sign_result(&first, &mut result).unwrap();
        sign_result(&second, &mut result).unwrap();
        verify_result(&result, &second.public_key_hex()).unwrap();
    }

    #[test]
    fn test_bad_seed_rejected() {
        assert!(matches!(Ed25519Signer::from_hex("zz"), Err(RegistryError::InvalidKey(_))));
        assert!(matches!(Ed25519Signer::from_hex("abcd"), Err(RegistryError::InvalidKey(_))));
    }

    #[test]
    fn test_debug_hides_seed() {
        let signer = Ed25519Signer::from_hex(SEED).unwrap();
        let debug = format!("{:?}", signer);
        assert!(!debug.contains(SEED));
        assert!(debug.contains("d75a9801"));
    }
}
