//! The ledger node seam.
//!
//! Everything above this trait (monitor, pipeline, resolver, façade) talks to
//! the chain only through these operations, so a production JSON-RPC client
//! and an in-memory test double are interchangeable.

use alloy::primitives::{Address, Bytes, TxHash};
use async_trait::async_trait;

use crate::blockchain::types::{CallRequest, LedgerResult, Receipt, SignedTransaction};

/// Operations the threat ledger needs from a ledger node.
#[async_trait]
pub trait LedgerNode: Send + Sync {
    /// `eth_chainId`.
    async fn chain_id(&self) -> LedgerResult<u64>;

    /// `eth_blockNumber`. Also serves as the liveness probe.
    async fn block_number(&self) -> LedgerResult<u64>;

    /// Next nonce for `address`, counting pending transactions.
    async fn transaction_count(&self, address: Address) -> LedgerResult<u64>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> LedgerResult<u128>;

    /// Deployed bytecode at `address` (empty if none).
    async fn code_at(&self, address: Address) -> LedgerResult<Bytes>;

    /// Execute a read-only call against the latest state.
    async fn call(&self, request: CallRequest) -> LedgerResult<Bytes>;

    /// Broadcast a signed transaction, returning its hash.
    ///
    /// Success means the node accepted it into its pool, not that it was
    /// included in a block.
    async fn send_raw_transaction(&self, tx: &SignedTransaction) -> LedgerResult<TxHash>;

    /// Receipt for `hash`, or `None` while still pending.
    async fn transaction_receipt(&self, hash: TxHash) -> LedgerResult<Option<Receipt>>;

    /// Whether the node answers at all.
    async fn is_reachable(&self) -> bool {
        self.block_number().await.is_ok()
    }
}
