//! Error taxonomy surfaced to callers of the threat ledger.
//!
//! `TxError` is what every report/verify/read operation returns; callers
//! match on it to pick a response. `InitError` is fatal and only produced
//! while constructing the client.

use alloy::primitives::TxHash;
use std::path::PathBuf;
use thiserror::Error;

use crate::blockchain::types::LedgerError;

/// Why the contract (or the node on its behalf) refused a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractFailure {
    /// The digest already has a record.
    Duplicate,
    /// The digest has no record.
    UnknownThreat,
    /// Any other revert.
    Reverted,
    /// The node refused the signed transaction (nonce, funds, gas).
    Rejected,
    /// The transaction was included but the expected state change is absent.
    PostCondition,
    /// The contract answered with data that does not decode.
    UnexpectedResponse,
}

impl ContractFailure {
    /// Classify a revert reason string.
    ///
    /// The contract reports business-rule violations only as revert strings,
    /// so this is substring matching.
    pub fn from_revert_reason(reason: &str) -> Self {
        let reason = reason.to_ascii_lowercase();
        if reason.contains("already reported") {
            ContractFailure::Duplicate
        } else if reason.contains("does not exist") || reason.contains("not found") {
            ContractFailure::UnknownThreat
        } else {
            ContractFailure::Reverted
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractFailure::Duplicate => "duplicate",
            ContractFailure::UnknownThreat => "unknown_threat",
            ContractFailure::Reverted => "reverted",
            ContractFailure::Rejected => "rejected",
            ContractFailure::PostCondition => "postcondition",
            ContractFailure::UnexpectedResponse => "unexpected_response",
        }
    }
}

impl std::fmt::Display for ContractFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a ledger operation.
#[derive(Debug, Clone, Error)]
pub enum TxError {
    /// Bad input, caught before any network traffic.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The ledger node could not be reached.
    #[error("ledger node unreachable: {0}")]
    Connectivity(String),

    /// The contract's own rules rejected the call.
    #[error("contract rejected call ({kind}): {message}")]
    ContractLogic {
        kind: ContractFailure,
        message: String,
    },

    /// Submitted but not seen in a block in time. The transaction may still
    /// land; re-query by digest before retrying.
    #[error("transaction {tx_hash} not included after {waited_secs}s")]
    ConfirmationTimeout { tx_hash: TxHash, waited_secs: u64 },
}

impl TxError {
    pub fn validation(message: impl Into<String>) -> Self {
        TxError::Validation(message.into())
    }

    pub fn contract(kind: ContractFailure, message: impl Into<String>) -> Self {
        TxError::ContractLogic {
            kind,
            message: message.into(),
        }
    }

    /// Whether retrying the same call later can help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TxError::Connectivity(_))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            TxError::ContractLogic {
                kind: ContractFailure::Duplicate,
                ..
            }
        )
    }

    /// A transaction that was included but failed during execution.
    pub fn is_reverted(&self) -> bool {
        matches!(
            self,
            TxError::ContractLogic {
                kind: ContractFailure::Reverted,
                ..
            }
        )
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TxError::Validation(_) => "validation",
            TxError::Connectivity(_) => "connectivity",
            TxError::ContractLogic { .. } => "contract_logic",
            TxError::ConfirmationTimeout { .. } => "confirmation_timeout",
        }
    }

    /// Prefix the message with the threat identifier it concerns.
    pub fn for_threat(self, threat_id: &str) -> Self {
        match self {
            TxError::Validation(m) => TxError::Validation(format!("{}: {}", threat_id, m)),
            TxError::Connectivity(m) => TxError::Connectivity(format!("{}: {}", threat_id, m)),
            TxError::ContractLogic { kind, message } => TxError::ContractLogic {
                kind,
                message: format!("{}: {}", threat_id, message),
            },
            timeout @ TxError::ConfirmationTimeout { .. } => timeout,
        }
    }
}

impl From<LedgerError> for TxError {
    fn from(err: LedgerError) -> Self {
        if err.is_connectivity() {
            return TxError::Connectivity(err.to_string());
        }
        match err {
            LedgerError::Reverted(reason) => {
                TxError::contract(ContractFailure::from_revert_reason(&reason), reason)
            }
            LedgerError::Rejected(message) => TxError::contract(ContractFailure::Rejected, message),
            LedgerError::Decode(message) => {
                TxError::contract(ContractFailure::UnexpectedResponse, message)
            }
            // Wallet and chain configuration problems
            other => TxError::Validation(other.to_string()),
        }
    }
}

/// Fatal failure while constructing the client.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("no signing account configured: {0}")]
    MissingAccount(String),

    #[error("contract source not found at {}", .0.display())]
    MissingSource(PathBuf),

    #[error("contract compilation failed: {0}")]
    Compile(String),

    #[error("contract deployment failed: {0}")]
    Deployment(String),

    #[error("failed to persist deployment descriptor {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ledger node error during startup: {0}")]
    Node(#[from] LedgerError),

    #[error("configuration error: {0}")]
    Config(String),
}
