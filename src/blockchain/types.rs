//! Chain-level types and error definitions.

use alloy::primitives::{Address, Bytes, Log, TxHash};
use thiserror::Error;

/// Errors reported by the ledger node or the signing wallet.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No provider answered (transport failure on every endpoint).
    #[error("Ledger node unreachable: {0}")]
    Unreachable(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// A read-only call or simulation reverted inside the contract.
    #[error("Execution reverted: {0}")]
    Reverted(String),

    /// The node answered but refused the request (bad nonce, underpriced, ...).
    #[error("Request rejected by node: {0}")]
    Rejected(String),

    /// Invalid private key format or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// The node returned data that does not decode as expected.
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl LedgerError {
    /// True when the failure means the node could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, LedgerError::Unreachable(_) | LedgerError::Timeout(_))
    }
}

/// Result type for ledger node operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// A read-only contract call (`eth_call`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
}

impl CallRequest {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            from: None,
            to,
            data: data.into(),
        }
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }
}

/// A signed transaction ready for broadcast.
///
/// Owned by exactly one pipeline invocation; the decoded fields mirror what
/// was signed into `raw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// EIP-2718 encoded envelope.
    pub raw: Bytes,
    pub hash: TxHash,
    pub nonce: u64,
    pub from: Address,
    /// `None` for contract creation.
    pub to: Option<Address>,
    pub input: Bytes,
    pub gas_limit: u64,
}

/// Inclusion record for a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// `true` when execution succeeded.
    pub status: bool,
    pub from: Address,
    pub contract_address: Option<Address>,
    pub gas_used: u64,
    pub logs: Vec<Log>,
}
