//! Threat records, report inputs and operation outcomes.

use alloy::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TxError;
use crate::threat::digest::ThreatDigest;

/// Classifier label attached to a threat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatSignature {
    Benign,
    Defacement,
    Phishing,
    Malware,
}

impl ThreatSignature {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatSignature::Benign => "benign",
            ThreatSignature::Defacement => "defacement",
            ThreatSignature::Phishing => "phishing",
            ThreatSignature::Malware => "malware",
        }
    }
}

impl fmt::Display for ThreatSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreatSignature {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "benign" => Ok(ThreatSignature::Benign),
            "defacement" => Ok(ThreatSignature::Defacement),
            "phishing" => Ok(ThreatSignature::Phishing),
            "malware" => Ok(ThreatSignature::Malware),
            other => Err(TxError::validation(format!("unknown threat signature '{}'", other))),
        }
    }
}

/// A locally computed verdict to record on the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewThreat {
    /// Human-readable identifier; its digest is the on-chain key.
    pub threat_id: String,
    pub url: String,
    pub signature: ThreatSignature,
    /// Severity, 1..=10.
    pub level: u8,
    /// Classifier confidence, 0.0..=1.0.
    pub confidence: f64,
    pub is_malicious: bool,
}

impl NewThreat {
    /// Check every field before any network traffic.
    pub fn validate(&self) -> Result<(), TxError> {
        if self.threat_id.is_empty() {
            return Err(TxError::validation("threat identifier must not be empty"));
        }
        if self.url.trim().is_empty() {
            return Err(TxError::validation("url must not be empty"));
        }
        if !(1..=10).contains(&self.level) {
            return Err(TxError::validation(format!(
                "level must be within 1..=10, got {}",
                self.level
            )));
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(TxError::validation(format!(
                "confidence must be within 0.0..=1.0, got {}",
                self.confidence
            )));
        }
        Ok(())
    }

    /// Confidence as the contract stores it: a rounded integer percent.
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// A record as stored on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatRecord {
    pub digest: ThreatDigest,
    pub reporter: Address,
    pub url: String,
    /// Label as stored; see [`ThreatRecord::signature_kind`].
    pub signature: String,
    pub level: u8,
    /// Percent, 0..=100.
    pub confidence: u8,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    pub is_malicious: bool,
    pub verified: bool,
}

impl ThreatRecord {
    pub fn signature_kind(&self) -> Option<ThreatSignature> {
        self.signature.parse().ok()
    }
}

/// Result of a report that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReportOutcome {
    /// A new record was written.
    Recorded {
        digest: ThreatDigest,
        tx_hash: TxHash,
        block_number: u64,
    },
    /// A record for this digest already exists; nothing was written.
    Duplicate { digest: ThreatDigest },
}

impl ReportOutcome {
    pub fn digest(&self) -> ThreatDigest {
        match self {
            ReportOutcome::Recorded { digest, .. } | ReportOutcome::Duplicate { digest } => *digest,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, ReportOutcome::Duplicate { .. })
    }
}

/// Result of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyOutcome {
    pub digest: ThreatDigest,
    pub tx_hash: TxHash,
    pub block_number: u64,
}

/// Point-in-time view of the client and ledger. Fields that could not be
/// fetched are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub connected: bool,
    pub chain_id: Option<u64>,
    pub account: Address,
    pub contract_address: Address,
    pub network: String,
    pub latest_block: Option<u64>,
    pub threats_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewThreat {
        NewThreat {
            threat_id: "http://example.com/login-verify".to_string(),
            url: "http://example.com/login-verify".to_string(),
            signature: ThreatSignature::Phishing,
            level: 8,
            confidence: 0.95,
            is_malicious: true,
        }
    }

    #[test]
    fn test_valid_report() {
        let threat = sample();
        assert!(threat.validate().is_ok());
        assert_eq!(threat.confidence_percent(), 95);
    }

    #[test]
    fn test_range_checks() {
        for level in [0u8, 11, 255] {
            let mut threat = sample();
            threat.level = level;
            assert!(matches!(threat.validate(), Err(TxError::Validation(_))));
        }
        for confidence in [-0.01, 1.01, f64::NAN, f64::INFINITY] {
            let mut threat = sample();
            threat.confidence = confidence;
            assert!(matches!(threat.validate(), Err(TxError::Validation(_))));
        }
        let mut threat = sample();
        threat.threat_id.clear();
        assert!(threat.validate().is_err());
    }

    #[test]
    fn test_confidence_rounding() {
        let mut threat = sample();
        threat.confidence = 0.0;
        assert_eq!(threat.confidence_percent(), 0);
        threat.confidence = 1.0;
        assert_eq!(threat.confidence_percent(), 100);
        threat.confidence = 0.954;
        assert_eq!(threat.confidence_percent(), 95);
        threat.confidence = 0.956;
        assert_eq!(threat.confidence_percent(), 96);
    }

    #[test]
    fn test_signature_parsing() {
        assert_eq!("Phishing".parse::<ThreatSignature>().unwrap(), ThreatSignature::Phishing);
        assert_eq!(ThreatSignature::Malware.to_string(), "malware");
        assert!("ransomware".parse::<ThreatSignature>().is_err());
        assert_eq!(
            serde_json::to_string(&ThreatSignature::Defacement).unwrap(),
            "\"defacement\""
        );
    }

    #[test]
    fn test_report_outcome_serialization() {
        let digest = crate::threat::digest::digest("x").unwrap();
        let json = serde_json::to_value(ReportOutcome::Duplicate { digest }).unwrap();
        assert_eq!(json["outcome"], "duplicate");
        assert_eq!(json["digest"], digest.to_string());
    }
}
