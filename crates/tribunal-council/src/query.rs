//! The immutable dispute query submitted by a caller.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CouncilError;
use crate::Result;

/// Length limits applied to dispute text at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLimits {
    /// Minimum number of characters after trimming.
    pub min_chars: usize,
    /// Maximum number of characters after trimming.
    pub max_chars: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            min_chars: 10,
            max_chars: 8192,
        }
    }
}

/// A dispute between Party A and Party B.
///
/// Holds the raw natural-language text (contract terms plus the dispute
/// narrative). Party labels are picked up from lines of the form
/// `Party A: <name>` / `Party B: <name>` when the caller includes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeQuery {
    /// The dispute text, trimmed.
    pub text: String,
    /// Label for Party A, if the text names one.
    pub party_a: Option<String>,
    /// Label for Party B, if the text names one.
    pub party_b: Option<String>,
}

impl DisputeQuery {
    /// Validates dispute text against the default [`QueryLimits`].
    pub fn new(text: impl Into<String>) -> Result<Self> {
        Self::with_limits(text, &QueryLimits::default())
    }

    /// Validates dispute text against explicit limits.
    ///
    /// # Errors
    ///
    /// Returns [`CouncilError::InvalidQuery`] if the trimmed text is outside
    /// the length limits or contains control characters other than
    /// newline, carriage return and tab.
    pub fn with_limits(text: impl Into<String>, limits: &QueryLimits) -> Result<Self> {
        let text = text.into().trim().to_string();
        let chars = text.chars().count();

        if chars < limits.min_chars {
            return Err(CouncilError::InvalidQuery(format!(
                "dispute text has {} characters, minimum is {}",
                chars, limits.min_chars
            )));
        }
        if chars > limits.max_chars {
            return Err(CouncilError::InvalidQuery(format!(
                "dispute text has {} characters, maximum is {}",
                chars, limits.max_chars
            )));
        }
        if let Some(c) = text
            .chars()
            .find(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
        {
            return Err(CouncilError::InvalidQuery(format!(
                "dispute text contains control character U+{:04X}",
                c as u32
            )));
        }

        let party_a = party_label(&text, 'a');
        let party_b = party_label(&text, 'b');

        Ok(Self {
            text,
            party_a,
            party_b,
        })
    }

    /// Lowercase hex SHA-256 of the dispute text.
    ///
    /// Bound into every signed result so a verdict cannot be replayed
    /// against a different dispute.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Finds the first `Party X: label` line.
fn party_label(text: &str, party: char) -> Option<String> {
    let prefix = format!("party {}:", party);
    text.lines().find_map(|line| {
        let line = line.trim();
        let head = line.get(..prefix.len())?;
        if !head.eq_ignore_ascii_case(&prefix) {
            return None;
        }
        let label = line[prefix.len()..].trim();
        (!label.is_empty()).then(|| label.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISPUTE: &str = "Party A: Freelancer\nParty B: Client\n\
        Contract: deliver a landing page by March 1 for $500.\n\
        Dispute: the page was delivered March 3 and the client refuses to pay.";

    #[test]
    fn test_new_trims_text() {
        let query = DisputeQuery::new(format!("  {}  \n", DISPUTE)).unwrap();
        assert_eq!(query.text, DISPUTE);
    }

    #[test]
    fn test_party_labels_extracted() {
        let query = DisputeQuery::new(DISPUTE).unwrap();
        assert_eq!(query.party_a.as_deref(), Some("Freelancer"));
        assert_eq!(query.party_b.as_deref(), Some("Client"));
    }

    #[test]
    fn test_party_labels_case_insensitive() {
        let query = DisputeQuery::new("PARTY a: Alice\nparty B: Bob\nsome dispute text").unwrap();
        assert_eq!(query.party_a.as_deref(), Some("Alice"));
        assert_eq!(query.party_b.as_deref(), Some("Bob"));
    }

    #[test]
    fn test_party_labels_absent() {
        let query = DisputeQuery::new("Who should win this dispute about a late delivery?").unwrap();
        assert!(query.party_a.is_none());
        assert!(query.party_b.is_none());
    }

    #[test]
    fn test_too_short_rejected() {
        let err = DisputeQuery::new("   short ").unwrap_err();
        assert!(matches!(err, CouncilError::InvalidQuery(_)));
    }

    #[test]
    fn test_too_long_rejected() {
        let limits = QueryLimits {
            min_chars: 1,
            max_chars: 20,
        };
        let err = DisputeQuery::with_limits("x".repeat(21), &limits).unwrap_err();
        assert!(err.to_string().contains("maximum is 20"));
    }

    #[test]
    fn test_control_characters_rejected() {
        let err = DisputeQuery::new("a dispute with a \u{0007} bell in it").unwrap_err();
        assert!(err.to_string().contains("U+0007"));
    }

    #[test]
    fn test_tabs_and_newlines_allowed() {
        assert!(DisputeQuery::new("line one\n\tline two\r\nline three").is_ok());
    }

    #[test]
    fn test_digest_is_stable_hex() {
        let a = DisputeQuery::new(DISPUTE).unwrap();
        let b = DisputeQuery::new(DISPUTE).unwrap();
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);

        let c = DisputeQuery::new(format!("{} Extra.", DISPUTE)).unwrap();
        assert_ne!(a.digest(), c.digest());
    }
}
