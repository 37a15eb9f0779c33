//! JSON-RPC ledger node client with timeout and failover handling.
//!
//! # Responsibilities
//! - Connect to the primary JSON-RPC endpoint plus failovers
//! - Query chain state (chain id, block number, nonces, code, receipts)
//! - Broadcast signed transactions and run read-only calls
//! - Tell transport failures (try the next endpoint) apart from answers the
//!   node gave on purpose (reverts, rejections), which are surfaced as-is

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::sol_types::decode_revert_reason;
use alloy::transports::{RpcError, TransportError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::node::LedgerNode;
use crate::blockchain::types::{CallRequest, LedgerError, LedgerResult, Receipt, SignedTransaction};
use crate::config::NodeConfig;

/// Ledger node client over alloy HTTP providers with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<Arc<dyn Provider + Send + Sync>>,
    /// Configuration.
    config: NodeConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new client. No network traffic happens here.
    ///
    /// # Arguments
    /// * `config` - Node configuration
    ///
    /// # Returns
    /// A new client or error if the primary URL is invalid
    pub fn new(config: &NodeConfig) -> LedgerResult<Self> {
        let timeout_duration = config.rpc_timeout();
        let mut providers = Vec::new();

        // 1. Add primary provider
        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            LedgerError::Unreachable(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(
            Arc::new(ProviderBuilder::new().connect_http(primary_url)) as Arc<dyn Provider + Send + Sync>
        );

        // 2. Add failover providers
        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(
                    Arc::new(ProviderBuilder::new().connect_http(url)) as Arc<dyn Provider + Send + Sync>
                );
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        tracing::debug!(
            rpc_url = %config.rpc_url,
            failovers = providers.len() - 1,
            timeout_secs = config.rpc_timeout_secs,
            "Ledger node client created"
        );

        Ok(Self {
            providers,
            config: config.clone(),
            timeout_duration,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    fn attempts(&self, method: &'static str) -> Attempts {
        Attempts {
            method,
            timeout_secs: self.config.rpc_timeout_secs,
            last_error: None,
            timed_out: false,
        }
    }
}

/// Failure bookkeeping for one request across all providers.
struct Attempts {
    method: &'static str,
    timeout_secs: u64,
    last_error: Option<String>,
    timed_out: bool,
}

impl Attempts {
    /// Record an RPC error. Returns the error to surface immediately when the
    /// node answered deliberately; `None` means try the next provider.
    fn rpc_error(&mut self, provider_idx: usize, err: TransportError) -> Option<LedgerError> {
        if let Some(answer) = node_answer(&err) {
            return Some(answer);
        }
        tracing::warn!(
            provider_idx,
            method = self.method,
            error = %err,
            "RPC error, trying next provider"
        );
        self.last_error = Some(err.to_string());
        self.timed_out = false;
        None
    }

    fn timeout(&mut self, provider_idx: usize) {
        tracing::warn!(provider_idx, method = self.method, "RPC timeout, trying next provider");
        self.timed_out = true;
    }

    fn exhausted(self) -> LedgerError {
        if self.timed_out {
            return LedgerError::Timeout(self.timeout_secs);
        }
        LedgerError::Unreachable(format!(
            "All RPC providers failed for {}: {}",
            self.method,
            self.last_error.unwrap_or_else(|| "no providers".to_string())
        ))
    }
}

/// Errors the node returned as a JSON-RPC error object rather than a
/// transport failure.
fn node_answer(err: &TransportError) -> Option<LedgerError> {
    let RpcError::ErrorResp(payload) = err else {
        return None;
    };
    if let Some(reason) = payload
        .as_revert_data()
        .and_then(|data| decode_revert_reason(&data))
    {
        return Some(LedgerError::Reverted(reason));
    }
    let message = payload.message.to_string();
    if message.to_ascii_lowercase().contains("revert") {
        Some(LedgerError::Reverted(message))
    } else {
        Some(LedgerError::Rejected(message))
    }
}

fn to_receipt(receipt: TransactionReceipt) -> Receipt {
    Receipt {
        tx_hash: receipt.transaction_hash,
        block_number: receipt.block_number.unwrap_or_default(),
        status: receipt.status(),
        from: receipt.from,
        contract_address: receipt.contract_address,
        gas_used: receipt.gas_used,
        logs: receipt.inner.logs().iter().map(|log| log.inner.clone()).collect(),
    }
}

#[async_trait]
impl LedgerNode for BlockchainClient {
    async fn chain_id(&self) -> LedgerResult<u64> {
        let mut attempts = self.attempts("eth_chainId");
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.get_chain_id()).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    if let Some(err) = attempts.rpc_error(i, e) {
                        return Err(err);
                    }
                }
                Err(_) => attempts.timeout(i),
            }
        }
        Err(attempts.exhausted())
    }

    async fn block_number(&self) -> LedgerResult<u64> {
        let mut attempts = self.attempts("eth_blockNumber");
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.get_block_number()).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    if let Some(err) = attempts.rpc_error(i, e) {
                        return Err(err);
                    }
                }
                Err(_) => attempts.timeout(i),
            }
        }
        Err(attempts.exhausted())
    }

    async fn transaction_count(&self, address: Address) -> LedgerResult<u64> {
        let mut attempts = self.attempts("eth_getTransactionCount");
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.get_transaction_count(address).pending();
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    if let Some(err) = attempts.rpc_error(i, e) {
                        return Err(err);
                    }
                }
                Err(_) => attempts.timeout(i),
            }
        }
        Err(attempts.exhausted())
    }

    async fn gas_price(&self) -> LedgerResult<u128> {
        let mut attempts = self.attempts("eth_gasPrice");
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.get_gas_price()).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    if let Some(err) = attempts.rpc_error(i, e) {
                        return Err(err);
                    }
                }
                Err(_) => attempts.timeout(i),
            }
        }
        Err(attempts.exhausted())
    }

    async fn code_at(&self, address: Address) -> LedgerResult<Bytes> {
        let mut attempts = self.attempts("eth_getCode");
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.get_code_at(address)).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    if let Some(err) = attempts.rpc_error(i, e) {
                        return Err(err);
                    }
                }
                Err(_) => attempts.timeout(i),
            }
        }
        Err(attempts.exhausted())
    }

    async fn call(&self, request: CallRequest) -> LedgerResult<Bytes> {
        let mut tx = TransactionRequest::default()
            .with_to(request.to)
            .with_input(request.data);
        if let Some(from) = request.from {
            tx = tx.with_from(from);
        }

        let mut attempts = self.attempts("eth_call");
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.call(tx.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    if let Some(err) = attempts.rpc_error(i, e) {
                        return Err(err);
                    }
                }
                Err(_) => attempts.timeout(i),
            }
        }
        Err(attempts.exhausted())
    }

    async fn send_raw_transaction(&self, tx: &SignedTransaction) -> LedgerResult<TxHash> {
        let mut attempts = self.attempts("eth_sendRawTransaction");
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.send_raw_transaction(&tx.raw)).await {
                Ok(Ok(pending)) => {
                    let hash = *pending.tx_hash();
                    if hash != tx.hash {
                        tracing::warn!(
                            local = %tx.hash,
                            remote = %hash,
                            "Node reported a different transaction hash"
                        );
                    }
                    return Ok(hash);
                }
                Ok(Err(e)) => {
                    if let Some(err) = attempts.rpc_error(i, e) {
                        return Err(err);
                    }
                }
                Err(_) => attempts.timeout(i),
            }
        }
        Err(attempts.exhausted())
    }

    async fn transaction_receipt(&self, hash: TxHash) -> LedgerResult<Option<Receipt>> {
        let mut attempts = self.attempts("eth_getTransactionReceipt");
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.get_transaction_receipt(hash)).await {
                Ok(Ok(result)) => return Ok(result.map(to_receipt)),
                Ok(Err(e)) => {
                    if let Some(err) = attempts.rpc_error(i, e) {
                        return Err(err);
                    }
                }
                Err(_) => attempts.timeout(i),
            }
        }
        Err(attempts.exhausted())
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("failovers", &self.config.failover_urls.len())
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
