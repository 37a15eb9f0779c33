//! Transaction building, signing, submission and confirmation.
//!
//! # Responsibilities
//! - Simulate contract calls first so reverts surface before gas is spent
//! - Serialize nonce acquisition → send per signing account
//! - Sign and broadcast with a fixed gas budget
//! - Poll for inclusion within a bounded window
//!
//! Nothing here retries; that decision belongs to the caller.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::rpc::types::TransactionRequest;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{interval, timeout, Instant};

use crate::blockchain::node::LedgerNode;
use crate::blockchain::types::{CallRequest, Receipt, SignedTransaction};
use crate::blockchain::wallet::Wallet;
use crate::config::TransactionConfig;
use crate::error::{ContractFailure, TxError};
use crate::observability::metrics;

/// Where a transaction goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    /// Invoke a deployed contract.
    Contract(Address),
    /// Create a new contract from the call data.
    Create,
}

/// One state-changing call to drive through the pipeline.
#[derive(Debug, Clone)]
pub struct ContractCall {
    /// Operation name used in logs and metrics.
    pub label: &'static str,
    pub target: CallTarget,
    pub data: Bytes,
    pub gas_limit: u64,
}

impl ContractCall {
    pub fn invoke(label: &'static str, to: Address, data: impl Into<Bytes>, gas_limit: u64) -> Self {
        Self {
            label,
            target: CallTarget::Contract(to),
            data: data.into(),
            gas_limit,
        }
    }

    pub fn deploy(bytecode: impl Into<Bytes>, gas_limit: u64) -> Self {
        Self {
            label: "deploy",
            target: CallTarget::Create,
            data: bytecode.into(),
            gas_limit,
        }
    }
}

/// A confirmed transaction plus the caller's post-condition verdict.
#[derive(Debug, Clone)]
pub struct Submission {
    pub receipt: Receipt,
    pub postcondition_held: bool,
}

/// Drives single transactions from build to inclusion.
///
/// Clones share the wallet and the submission lock, so every clone counts
/// as the same signing account.
#[derive(Clone)]
pub struct TxPipeline {
    node: Arc<dyn LedgerNode>,
    wallet: Wallet,
    config: TransactionConfig,
    /// One in-flight nonce → send sequence per signing account.
    submit_lock: Arc<Mutex<()>>,
}

impl TxPipeline {
    pub fn new(node: Arc<dyn LedgerNode>, wallet: Wallet, config: TransactionConfig) -> Self {
        Self {
            node,
            wallet,
            config,
            submit_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Signing account address.
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    /// Submit `call` and wait for a successful receipt.
    pub async fn submit(&self, call: ContractCall) -> Result<Receipt, TxError> {
        let started = Instant::now();
        let result = self.run(&call).await;

        match &result {
            Ok(receipt) => {
                metrics::record_submission(call.label, "confirmed");
                metrics::record_confirmation_latency(call.label, started.elapsed().as_secs_f64());
                tracing::info!(
                    operation = call.label,
                    tx_hash = %receipt.tx_hash,
                    block_number = receipt.block_number,
                    gas_used = receipt.gas_used,
                    "Transaction confirmed"
                );
            }
            Err(e) => {
                metrics::record_submission(call.label, e.kind());
                tracing::warn!(operation = call.label, error = %e, "Transaction failed");
            }
        }
        result
    }

    /// Submit `call`, then run `postcondition` against the receipt and the
    /// new state.
    ///
    /// A failed post-condition is not an error here; the caller decides what
    /// it means.
    pub async fn submit_and_check<F, Fut>(
        &self,
        call: ContractCall,
        postcondition: F,
    ) -> Result<Submission, TxError>
    where
        F: FnOnce(&Receipt) -> Fut,
        Fut: Future<Output = Result<bool, TxError>>,
    {
        let label = call.label;
        let receipt = self.submit(call).await?;
        let postcondition_held = postcondition(&receipt).await?;
        if !postcondition_held {
            tracing::error!(
                operation = label,
                tx_hash = %receipt.tx_hash,
                "Transaction included but expected state change is missing"
            );
        }
        Ok(Submission {
            receipt,
            postcondition_held,
        })
    }

    async fn run(&self, call: &ContractCall) -> Result<Receipt, TxError> {
        self.simulate(call).await?;
        let signed = self.sign_and_send(call).await?;
        let receipt = self.wait_for_receipt(signed.hash).await?;

        if !receipt.status {
            return Err(TxError::contract(
                ContractFailure::Reverted,
                format!(
                    "transaction {} reverted in block {}",
                    receipt.tx_hash, receipt.block_number
                ),
            ));
        }
        Ok(receipt)
    }

    /// Dry-run a contract call from the signing account.
    async fn simulate(&self, call: &ContractCall) -> Result<(), TxError> {
        let CallTarget::Contract(to) = call.target else {
            return Ok(());
        };
        let request = CallRequest::new(to, call.data.clone()).from(self.wallet.address());
        self.node.call(request).await.map(|_| ()).map_err(|e| {
            tracing::debug!(operation = call.label, error = %e, "Pre-flight simulation failed");
            TxError::from(e)
        })
    }

    async fn sign_and_send(&self, call: &ContractCall) -> Result<SignedTransaction, TxError> {
        let _guard = self.submit_lock.lock().await;

        let address = self.wallet.address();
        let chain_nonce = self.node.transaction_count(address).await?;
        let nonce = self.wallet.reconcile_nonce(chain_nonce);

        let gas_price = self.node.gas_price().await?;
        let adjusted_gas_price = (gas_price as f64 * self.config.gas_price_multiplier) as u128;

        let request = TransactionRequest::default()
            .with_from(address)
            .with_nonce(nonce)
            .with_gas_limit(call.gas_limit)
            .with_gas_price(adjusted_gas_price);
        let request = match call.target {
            CallTarget::Contract(to) => request.with_to(to).with_input(call.data.clone()),
            CallTarget::Create => request.with_deploy_code(call.data.clone()),
        };

        let mut signed = self.wallet.sign_transaction(request).await?;

        // The local counter only advances on accepted sends and never moves back.
        let hash = self.node.send_raw_transaction(&signed).await?;
        self.wallet.mark_nonce_used(nonce);
        signed.hash = hash;
        tracing::debug!(
            operation = call.label,
            tx_hash = %hash,
            nonce,
            gas_limit = call.gas_limit,
            "Transaction submitted"
        );
        Ok(signed)
    }

    /// Poll until `tx_hash` is included or the confirmation window closes.
    ///
    /// Poll errors are logged and polling continues: the transaction is
    /// already out, so only the timeout ends the wait.
    pub async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Receipt, TxError> {
        let window = self.config.confirmation_timeout();
        let poll_interval = self.config.receipt_poll_interval();

        let result = timeout(window, async {
            let mut ticker = interval(poll_interval);

            loop {
                ticker.tick().await;

                match self.node.transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => tracing::debug!(tx_hash = %tx_hash, "Transaction pending"),
                    Err(e) => tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt poll failed"),
                }
            }
        })
        .await;

        result.map_err(|_| TxError::ConfirmationTimeout {
            tx_hash,
            waited_secs: window.as_secs(),
        })
    }
}

impl std::fmt::Debug for TxPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxPipeline")
            .field("wallet", &self.wallet)
            .field("call_gas_limit", &self.config.call_gas_limit)
            .finish()
    }
}
