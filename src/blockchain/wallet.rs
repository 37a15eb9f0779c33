//! Signing account and local nonce tracking.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables (or passed in
//!   directly by an embedding process)
//! - Keys are never logged or serialized

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{Ethereum, EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::blockchain::types::{LedgerError, LedgerResult, SignedTransaction};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "THREAT_LEDGER_PRIVATE_KEY";

/// Signing account with a locally tracked next nonce.
///
/// The local nonce is a hint reconciled against the node on every
/// submission; the node stays the source of truth.
pub struct Wallet {
    /// The underlying signer (private key).
    signer: PrivateKeySigner,
    /// Network wallet used to sign transaction envelopes.
    network_wallet: EthereumWallet,
    /// Next nonce this process expects to use.
    nonce: Arc<AtomicU64>,
    /// Chain ID for EIP-155 replay protection.
    chain_id: u64,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `chain_id` - Chain ID for transaction signing
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> LedgerResult<Self> {
        let key_hex = private_key_hex
            .trim()
            .strip_prefix("0x")
            .unwrap_or(private_key_hex.trim());

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| LedgerError::Wallet(format!("Invalid private key format: {}", e)))?;

        tracing::info!(
            address = %signer.address(),
            chain_id = chain_id,
            "Wallet initialized"
        );

        Ok(Self {
            network_wallet: EthereumWallet::from(signer.clone()),
            signer,
            nonce: Arc::new(AtomicU64::new(0)),
            chain_id,
        })
    }

    /// Load wallet from environment variable.
    ///
    /// Reads `THREAT_LEDGER_PRIVATE_KEY` from environment.
    pub fn from_env(chain_id: u64) -> LedgerResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            LedgerError::Wallet(format!(
                "Environment variable {} not set",
                PRIVATE_KEY_ENV_VAR
            ))
        })?;

        Self::from_private_key(&private_key, chain_id)
    }

    /// Same key bound to a different chain. The nonce counter starts over.
    pub fn with_chain_id(&self, chain_id: u64) -> Self {
        Self {
            signer: self.signer.clone(),
            network_wallet: self.network_wallet.clone(),
            nonce: Arc::new(AtomicU64::new(0)),
            chain_id,
        }
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Get the chain ID this wallet is configured for.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Pick the nonce for the next transaction.
    ///
    /// Takes the larger of the node's count and the local counter, so a node
    /// that lags behind our own just-sent transactions cannot hand out a
    /// nonce twice. Must be called under the submission lock.
    pub fn reconcile_nonce(&self, chain_nonce: u64) -> u64 {
        let local = self.nonce.load(Ordering::SeqCst);
        if chain_nonce > local && local != 0 {
            tracing::debug!(local, chain = chain_nonce, "Local nonce behind node, resyncing");
        }
        chain_nonce.max(local)
    }

    /// Record that `nonce` was accepted by the node.
    pub fn mark_nonce_used(&self, nonce: u64) {
        self.nonce.fetch_max(nonce + 1, Ordering::SeqCst);
    }

    /// Get current nonce without incrementing.
    pub fn current_nonce(&self) -> u64 {
        self.nonce.load(Ordering::SeqCst)
    }

    /// Sign a fully populated transaction request.
    ///
    /// The request must carry nonce, gas limit, gas price and either a
    /// destination or deploy code.
    pub async fn sign_transaction(
        &self,
        request: TransactionRequest,
    ) -> LedgerResult<SignedTransaction> {
        let nonce = request.nonce.unwrap_or_default();
        let gas_limit = request.gas.unwrap_or_default();
        let to = request.to.and_then(|kind| kind.to().copied());
        let input = request.input.input().cloned().unwrap_or_default();

        let envelope = <TransactionRequest as TransactionBuilder<Ethereum>>::build(
            request.with_chain_id(self.chain_id),
            &self.network_wallet,
        )
        .await
        .map_err(|e| LedgerError::Wallet(format!("Signing failed: {}", e)))?;

        Ok(SignedTransaction {
            raw: Bytes::from(envelope.encoded_2718()),
            hash: *envelope.tx_hash(),
            nonce,
            from: self.address(),
            to,
            input,
            gas_limit,
        })
    }
}

impl Clone for Wallet {
    fn clone(&self) -> Self {
        Self {
            signer: self.signer.clone(),
            network_wallet: self.network_wallet.clone(),
            nonce: self.nonce.clone(),
            chain_id: self.chain_id,
        }
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .field("nonce", &self.current_nonce())
            .finish()
    }
}
