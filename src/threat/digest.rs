//! Threat identifier → on-chain key derivation.

use alloy::primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TxError;

/// 32-byte on-chain key of a threat record.
///
/// Keccak-256 of the identifier's UTF-8 bytes, the same value Solidity's
/// `keccak256(bytes(id))` produces, so digests recomputed off-chain always
/// match the contract's keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreatDigest(pub B256);

impl ThreatDigest {
    pub fn as_b256(&self) -> B256 {
        self.0
    }
}

impl From<B256> for ThreatDigest {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl fmt::Display for ThreatDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // B256 displays as 0x-prefixed lowercase hex
        write!(f, "{}", self.0)
    }
}

impl FromStr for ThreatDigest {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<B256>()
            .map(Self)
            .map_err(|e| TxError::validation(format!("invalid digest '{}': {}", s, e)))
    }
}

/// Derive the digest of a threat identifier.
pub fn digest(threat_id: &str) -> Result<ThreatDigest, TxError> {
    if threat_id.is_empty() {
        return Err(TxError::validation("threat identifier must not be empty"));
    }
    Ok(ThreatDigest(keccak256(threat_id.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_known_vector() {
        let d = digest("hello").unwrap();
        assert_eq!(
            d.to_string(),
            "0x1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn test_deterministic() {
        let id = "http://example.com/login-verify";
        assert_eq!(digest(id).unwrap(), digest(id).unwrap());
    }

    #[test]
    fn test_empty_identifier_rejected() {
        let err = digest("").unwrap_err();
        assert!(matches!(err, TxError::Validation(_)));
    }

    #[test]
    fn test_no_collisions_in_sample() {
        let mut seen = HashSet::new();
        for i in 0..20_000 {
            let id = format!("http://host-{}.example/path?q={}", i % 137, i);
            assert!(seen.insert(digest(&id).unwrap()), "collision at {}", id);
        }
    }

    #[test]
    fn test_display_parse() {
        let d = digest("phish-001").unwrap();
        let parsed: ThreatDigest = d.to_string().parse().unwrap();
        assert_eq!(parsed, d);
        assert!("0x1234".parse::<ThreatDigest>().is_err());
    }
}
