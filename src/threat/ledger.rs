//! The threat ledger client.
//!
//! # Operations
//! - `report_threat`: validate → digest → liveness → pipeline, post-condition
//!   `ThreatReported` in the receipt (else `threatExists`); duplicates come
//!   back as an outcome, not an error, including reports that lose a race
//! - `verify_threat`: existence read → pipeline, post-condition
//!   `ThreatVerified` in the receipt (else `verified`)
//! - `get_threat_info`, `get_all_threat_ids`, `get_threats_count`: reads
//! - `status`: best-effort snapshot
//!
//! One instance per process, constructed at startup and shared by `Arc`.

use alloy::primitives::Address;
use alloy::sol_types::SolCall;
use std::sync::Arc;

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::monitor::ConnectionMonitor;
use crate::blockchain::node::LedgerNode;
use crate::blockchain::transaction::{ContractCall, TxPipeline};
use crate::blockchain::types::{CallRequest, LedgerError};
use crate::blockchain::wallet::Wallet;
use crate::config::ThreatLedgerConfig;
use crate::error::{ContractFailure, InitError, TxError};
use crate::observability::metrics;
use crate::threat::contract::find_event;
use crate::threat::contract::IThreatIntelligence::{
    getAllThreatsCall, getThreatInfoCall, getThreatsCountCall, reportThreatCall, threatExistsCall,
    verifyThreatCall, ThreatReported, ThreatVerified,
};
use crate::threat::deployment::{ContractBinding, ContractCompiler, ContractResolver, SolcCompiler};
use crate::threat::digest::{digest, ThreatDigest};
use crate::threat::types::{NewThreat, ReportOutcome, StatusSnapshot, ThreatRecord, VerifyOutcome};

/// Client for the on-chain threat registry.
pub struct ThreatLedger {
    node: Arc<dyn LedgerNode>,
    monitor: ConnectionMonitor,
    pipeline: TxPipeline,
    binding: ContractBinding,
    call_gas_limit: u64,
}

impl ThreatLedger {
    /// Build the production client: JSON-RPC node, signing key from the
    /// environment, `solc` for first-time deployment.
    pub async fn connect(config: &ThreatLedgerConfig) -> Result<Self, InitError> {
        let node: Arc<dyn LedgerNode> = Arc::new(BlockchainClient::new(&config.node)?);
        let wallet = Wallet::from_env(config.node.chain_id.unwrap_or_default())
            .map_err(|e| InitError::MissingAccount(e.to_string()))?;
        let compiler = SolcCompiler::new(config.deployment.solc_path.clone());

        Self::with_parts(node, wallet, &compiler, config).await
    }

    /// Build a client from explicit parts.
    ///
    /// Probes the node once, checks the chain id, then resolves the contract
    /// binding (deploying if needed).
    pub async fn with_parts(
        node: Arc<dyn LedgerNode>,
        wallet: Wallet,
        compiler: &dyn ContractCompiler,
        config: &ThreatLedgerConfig,
    ) -> Result<Self, InitError> {
        let monitor = ConnectionMonitor::new(node.clone(), config.node.connection_check_interval());
        monitor.check_now().await?;

        let chain_id = node.chain_id().await?;
        if let Some(expected) = config.node.chain_id {
            if expected != chain_id {
                return Err(LedgerError::ChainMismatch {
                    expected,
                    actual: chain_id,
                }
                .into());
            }
        }
        let wallet = if wallet.chain_id() == chain_id {
            wallet
        } else {
            wallet.with_chain_id(chain_id)
        };

        let pipeline = TxPipeline::new(node.clone(), wallet, config.transactions.clone());
        let binding =
            ContractResolver::new(node.as_ref(), &pipeline, &config.deployment, compiler)
                .resolve()
                .await?;

        tracing::info!(
            chain_id,
            account = %pipeline.address(),
            contract = %binding.address,
            network = %binding.network,
            "Threat ledger client ready"
        );

        Ok(Self {
            node,
            monitor,
            pipeline,
            binding,
            call_gas_limit: config.transactions.call_gas_limit,
        })
    }

    pub fn contract_address(&self) -> Address {
        self.binding.address
    }

    pub fn account(&self) -> Address {
        self.pipeline.address()
    }

    pub fn binding(&self) -> &ContractBinding {
        &self.binding
    }

    pub fn monitor(&self) -> &ConnectionMonitor {
        &self.monitor
    }

    /// Record a threat verdict.
    pub async fn report_threat(&self, threat: &NewThreat) -> Result<ReportOutcome, TxError> {
        threat.validate()?;
        let digest = digest(&threat.threat_id)?;

        match self.submit_report(threat, digest).await {
            Ok(outcome) => {
                metrics::record_report("recorded");
                tracing::info!(
                    threat_id = %threat.threat_id,
                    digest = %digest,
                    "Threat recorded on ledger"
                );
                Ok(outcome)
            }
            Err(e) if e.is_duplicate() => {
                metrics::record_report("duplicate");
                tracing::info!(
                    threat_id = %threat.threat_id,
                    digest = %digest,
                    "Threat already on ledger"
                );
                Ok(ReportOutcome::Duplicate { digest })
            }
            Err(e) => {
                metrics::record_report("failed");
                tracing::warn!(threat_id = %threat.threat_id, error = %e, "Threat report failed");
                Err(e.for_threat(&threat.threat_id))
            }
        }
    }

    async fn submit_report(
        &self,
        threat: &NewThreat,
        digest: ThreatDigest,
    ) -> Result<ReportOutcome, TxError> {
        self.ensure_connected().await?;

        let data = reportThreatCall {
            threatId: digest.as_b256(),
            url: threat.url.clone(),
            signature: threat.signature.as_str().to_string(),
            level: threat.level,
            confidence: threat.confidence_percent(),
            isMalicious: threat.is_malicious,
        }
        .abi_encode();
        let contract = self.binding.address;
        let call = ContractCall::invoke("reportThreat", contract, data, self.call_gas_limit);
        let result = self
            .pipeline
            .submit_and_check(call, |receipt| {
                let logged = find_event::<ThreatReported>(&receipt.logs, contract)
                    .is_some_and(|event| event.threatId == digest.as_b256());
                async move { Ok::<_, TxError>(logged || self.threat_exists(digest).await?) }
            })
            .await;
        let submission = match result {
            Ok(submission) => submission,
            Err(e) if e.is_reverted() => return Err(self.classify_failed_report(digest, e).await),
            Err(e) => return Err(e),
        };
        if !submission.postcondition_held {
            return Err(TxError::contract(
                ContractFailure::PostCondition,
                format!(
                    "transaction {} included but no record exists for {}",
                    submission.receipt.tx_hash, digest
                ),
            ));
        }

        Ok(ReportOutcome::Recorded {
            digest,
            tx_hash: submission.receipt.tx_hash,
            block_number: submission.receipt.block_number,
        })
    }

    /// A report that passed simulation but reverted once mined most likely
    /// lost a race with another report of the same identifier.
    async fn classify_failed_report(&self, digest: ThreatDigest, err: TxError) -> TxError {
        match self.threat_exists(digest).await {
            Ok(true) => TxError::contract(
                ContractFailure::Duplicate,
                format!("{} was recorded by a concurrent report", digest),
            ),
            Ok(false) => err,
            Err(read_err) => {
                tracing::debug!(digest = %digest, error = %read_err, "Existence re-check failed");
                err
            }
        }
    }

    /// Mark an existing threat record as verified.
    pub async fn verify_threat(&self, threat_id: &str) -> Result<VerifyOutcome, TxError> {
        let digest = digest(threat_id)?;
        self.submit_verify(digest)
            .await
            .map_err(|e| e.for_threat(threat_id))
    }

    async fn submit_verify(&self, digest: ThreatDigest) -> Result<VerifyOutcome, TxError> {
        if !self.threat_exists(digest).await? {
            return Err(TxError::validation(format!("no threat recorded under {}", digest)));
        }
        self.ensure_connected().await?;

        let data = verifyThreatCall {
            threatId: digest.as_b256(),
        }
        .abi_encode();
        let contract = self.binding.address;
        let call = ContractCall::invoke("verifyThreat", contract, data, self.call_gas_limit);
        let submission = self
            .pipeline
            .submit_and_check(call, |receipt| {
                let logged = find_event::<ThreatVerified>(&receipt.logs, contract)
                    .is_some_and(|event| event.threatId == digest.as_b256());
                async move {
                    if logged {
                        return Ok(true);
                    }
                    Ok::<_, TxError>(self
                        .fetch_record(digest)
                        .await?
                        .is_some_and(|record| record.verified))
                }
            })
            .await?;
        if !submission.postcondition_held {
            return Err(TxError::contract(
                ContractFailure::PostCondition,
                format!(
                    "transaction {} included but {} is not verified",
                    submission.receipt.tx_hash, digest
                ),
            ));
        }

        tracing::info!(digest = %digest, tx_hash = %submission.receipt.tx_hash, "Threat verified");
        Ok(VerifyOutcome {
            digest,
            tx_hash: submission.receipt.tx_hash,
            block_number: submission.receipt.block_number,
        })
    }

    /// Look up a record. `Ok(None)` if the identifier was never reported.
    pub async fn get_threat_info(&self, threat_id: &str) -> Result<Option<ThreatRecord>, TxError> {
        let digest = digest(threat_id)?;
        self.fetch_record(digest)
            .await
            .map_err(|e| e.for_threat(threat_id))
    }

    /// Digests of every record, hex encoded. Empty if the node cannot answer.
    pub async fn get_all_threat_ids(&self) -> Vec<String> {
        match self.read(getAllThreatsCall {}).await {
            Ok(ids) => ids
                .into_iter()
                .map(|id| ThreatDigest(id).to_string())
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list threats");
                Vec::new()
            }
        }
    }

    /// Number of records. Zero if the node cannot answer.
    pub async fn get_threats_count(&self) -> u64 {
        self.try_threats_count().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to count threats");
            0
        })
    }

    /// Snapshot of client and ledger state. Fields the node could not
    /// provide are `None`.
    pub async fn status(&self) -> StatusSnapshot {
        let connected = self.monitor.is_connected().await;
        let chain_id = self.node.chain_id().await.ok();
        let latest_block = self.node.block_number().await.ok();
        let threats_count = self.try_threats_count().await.ok();

        StatusSnapshot {
            connected,
            chain_id,
            account: self.pipeline.address(),
            contract_address: self.binding.address,
            network: self.binding.network.clone(),
            latest_block,
            threats_count,
        }
    }

    async fn try_threats_count(&self) -> Result<u64, TxError> {
        let count = self.read(getThreatsCountCall {}).await?;
        Ok(count.saturating_to::<u64>())
    }

    async fn ensure_connected(&self) -> Result<(), TxError> {
        if self.monitor.is_connected().await {
            Ok(())
        } else {
            Err(TxError::Connectivity(
                "ledger node failed its last liveness probe".to_string(),
            ))
        }
    }

    async fn threat_exists(&self, digest: ThreatDigest) -> Result<bool, TxError> {
        self.read(threatExistsCall {
            threatId: digest.as_b256(),
        })
        .await
    }

    async fn fetch_record(&self, digest: ThreatDigest) -> Result<Option<ThreatRecord>, TxError> {
        let info = match self
            .read(getThreatInfoCall {
                threatId: digest.as_b256(),
            })
            .await
        {
            Ok(info) => info,
            Err(TxError::ContractLogic {
                kind: ContractFailure::UnknownThreat | ContractFailure::Reverted,
                ..
            }) => return Ok(None),
            Err(e) => return Err(e),
        };

        // Unset mapping slots read back as zeroes.
        if info.reporter == Address::ZERO {
            return Ok(None);
        }

        Ok(Some(ThreatRecord {
            digest,
            reporter: info.reporter,
            url: info.url,
            signature: info.signature,
            level: info.level,
            confidence: info.confidence,
            timestamp: info.timestamp.saturating_to::<u64>(),
            is_malicious: info.isMalicious,
            verified: info.verified,
        }))
    }

    /// Read-only contract call.
    async fn read<C: SolCall>(&self, call: C) -> Result<C::Return, TxError> {
        let request = CallRequest::new(self.binding.address, call.abi_encode());
        let data = self.node.call(request).await?;
        C::abi_decode_returns(&data).map_err(|e| {
            TxError::contract(
                ContractFailure::UnexpectedResponse,
                format!("{} returned undecodable data: {}", C::SIGNATURE, e),
            )
        })
    }
}

impl std::fmt::Debug for ThreatLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreatLedger")
            .field("pipeline", &self.pipeline)
            .field("contract", &self.binding.address)
            .field("network", &self.binding.network)
            .finish()
    }
}
