//! Shared utilities for integration tests.
//!
//! `MockLedger` is an in-memory ledger node that runs the ThreatIntelligence
//! contract rules directly on decoded call data, and counts the calls it
//! receives so tests can assert on network traffic.

#![allow(dead_code)]

use alloy::json_abi::JsonAbi;
use alloy::primitives::{keccak256, Address, Bytes, Log, LogData, TxHash, B256, U256};
use alloy::sol_types::{SolCall, SolEvent, SolValue};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use threat_ledger::blockchain::{CallRequest, LedgerError, LedgerNode, LedgerResult, Receipt, SignedTransaction, Wallet};
use threat_ledger::config::ThreatLedgerConfig;
use threat_ledger::error::InitError;
use threat_ledger::threat::contract::IThreatIntelligence::{
    getAllThreatsCall, getThreatInfoCall, getThreatsCountCall, reportThreatCall, threatExistsCall,
    verifyThreatCall, ThreatReported, ThreatVerified,
};
use threat_ledger::threat::{CompiledContract, ContractCompiler, ThreatLedger};

/// Anvil's first well-known development key.
pub const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
/// Anvil's second well-known development key.
pub const OTHER_PRIVATE_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const CHAIN_ID: u64 = 1337;

#[derive(Debug, Clone)]
struct StoredThreat {
    reporter: Address,
    url: String,
    signature: String,
    level: u8,
    confidence: u8,
    timestamp: u64,
    is_malicious: bool,
    verified: bool,
}

#[derive(Debug, Default)]
struct ChainState {
    block: u64,
    timestamp: u64,
    nonces: HashMap<Address, u64>,
    code: HashMap<Address, Bytes>,
    receipts: HashMap<TxHash, Receipt>,
    threats: HashMap<B256, StoredThreat>,
    order: Vec<B256>,
}

/// Call counters, one per node operation tests care about.
#[derive(Debug, Default)]
pub struct Counters {
    pub probes: AtomicUsize,
    pub nonce_queries: AtomicUsize,
    pub sends: AtomicUsize,
    pub calls: AtomicUsize,
}

impl Counters {
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn nonce_queries(&self) -> usize {
        self.nonce_queries.load(Ordering::SeqCst)
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// In-memory ledger node running the threat registry contract.
#[derive(Debug, Default)]
pub struct MockLedger {
    state: Mutex<ChainState>,
    unreachable: AtomicBool,
    never_confirm: AtomicBool,
    ignore_writes: AtomicBool,
    fail_next_send: AtomicBool,
    /// How far the reported transaction count trails the real one.
    nonce_lag: AtomicU64,
    pub counters: Counters,
    /// Nonces of every accepted transaction, in arrival order.
    accepted_nonces: Mutex<Vec<u64>>,
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ChainState {
                timestamp: 1_700_000_000,
                ..ChainState::default()
            }),
            ..Self::default()
        })
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Accept transactions but never mine them.
    pub fn set_never_confirm(&self, never: bool) {
        self.never_confirm.store(never, Ordering::SeqCst);
    }

    /// Mine contract calls as successful without changing state.
    pub fn set_ignore_writes(&self, ignore: bool) {
        self.ignore_writes.store(ignore, Ordering::SeqCst);
    }

    /// Reject the next raw transaction before it touches any state.
    pub fn fail_next_send(&self) {
        self.fail_next_send.store(true, Ordering::SeqCst);
    }

    /// Report transaction counts `lag` behind the accepted ones, like a node
    /// whose pending pool has not caught up.
    pub fn set_nonce_lag(&self, lag: u64) {
        self.nonce_lag.store(lag, Ordering::SeqCst);
    }

    pub fn accepted_nonces(&self) -> Vec<u64> {
        self.accepted_nonces.lock().unwrap().clone()
    }

    pub fn has_code(&self, address: Address) -> bool {
        self.state.lock().unwrap().code.contains_key(&address)
    }

    pub fn threat_count(&self) -> usize {
        self.state.lock().unwrap().order.len()
    }

    /// Deploy contract code from `deployer` outside the client, returning
    /// the new address and the creating transaction hash.
    pub fn deploy_from(&self, deployer: Address) -> (Address, TxHash) {
        let mut state = self.state.lock().unwrap();
        let nonce = state.nonces.entry(deployer).or_default();
        let address = deployer.create(*nonce);
        *nonce += 1;
        state.block += 1;
        let tx_hash = keccak256(state.block.to_be_bytes());
        state.code.insert(address, Bytes::from_static(&[0x60, 0x80, 0x60, 0x40]));
        let block_number = state.block;
        state.receipts.insert(
            tx_hash,
            Receipt {
                tx_hash,
                block_number,
                status: true,
                from: deployer,
                contract_address: Some(address),
                gas_used: 1_000_000,
                logs: Vec::new(),
            },
        );
        (address, tx_hash)
    }

    fn check_reachable(&self) -> LedgerResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(LedgerError::Unreachable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    /// Run a state-changing contract call. `commit == false` only checks.
    /// Returns the event a committed call emits.
    fn execute(
        state: &mut ChainState,
        from: Address,
        data: &[u8],
        commit: bool,
    ) -> Result<Option<LogData>, String> {
        let selector = selector(data)?;
        if selector == reportThreatCall::SELECTOR {
            let call = reportThreatCall::abi_decode(data).map_err(|e| e.to_string())?;
            if state.threats.contains_key(&call.threatId) {
                return Err("Threat already reported".to_string());
            }
            if !(1..=10).contains(&call.level) {
                return Err("Level must be 1-10".to_string());
            }
            if call.confidence > 100 {
                return Err("Confidence must be 0-100".to_string());
            }
            if !commit {
                return Ok(None);
            }
            let event = ThreatReported {
                threatId: call.threatId,
                reporter: from,
                url: call.url.clone(),
                level: call.level,
            };
            let timestamp = state.timestamp;
            state.threats.insert(
                call.threatId,
                StoredThreat {
                    reporter: from,
                    url: call.url,
                    signature: call.signature,
                    level: call.level,
                    confidence: call.confidence,
                    timestamp,
                    is_malicious: call.isMalicious,
                    verified: false,
                },
            );
            state.order.push(call.threatId);
            Ok(Some(event.encode_log_data()))
        } else if selector == verifyThreatCall::SELECTOR {
            let call = verifyThreatCall::abi_decode(data).map_err(|e| e.to_string())?;
            let Some(threat) = state.threats.get_mut(&call.threatId) else {
                return Err("Threat does not exist".to_string());
            };
            if !commit {
                return Ok(None);
            }
            threat.verified = true;
            Ok(Some(
                ThreatVerified {
                    threatId: call.threatId,
                    verifier: from,
                }
                .encode_log_data(),
            ))
        } else {
            Err("unknown function".to_string())
        }
    }

    /// Answer a view call.
    fn view(state: &ChainState, data: &[u8]) -> Result<Vec<u8>, String> {
        let selector = selector(data)?;
        if selector == threatExistsCall::SELECTOR {
            let call = threatExistsCall::abi_decode(data).map_err(|e| e.to_string())?;
            Ok((state.threats.contains_key(&call.threatId),).abi_encode_params())
        } else if selector == getThreatInfoCall::SELECTOR {
            let call = getThreatInfoCall::abi_decode(data).map_err(|e| e.to_string())?;
            let threat = state
                .threats
                .get(&call.threatId)
                .ok_or_else(|| "Threat does not exist".to_string())?;
            Ok((
                threat.reporter,
                threat.url.clone(),
                threat.signature.clone(),
                U256::from(threat.level),
                U256::from(threat.confidence),
                U256::from(threat.timestamp),
                threat.is_malicious,
                threat.verified,
            )
                .abi_encode_params())
        } else if selector == getAllThreatsCall::SELECTOR {
            Ok((state.order.clone(),).abi_encode_params())
        } else if selector == getThreatsCountCall::SELECTOR {
            Ok((U256::from(state.order.len()),).abi_encode_params())
        } else {
            Err("unknown function".to_string())
        }
    }
}

fn selector(data: &[u8]) -> Result<[u8; 4], String> {
    data.get(..4)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| "call data shorter than a selector".to_string())
}

#[async_trait]
impl LedgerNode for MockLedger {
    async fn chain_id(&self) -> LedgerResult<u64> {
        self.check_reachable()?;
        Ok(CHAIN_ID)
    }

    async fn block_number(&self) -> LedgerResult<u64> {
        self.counters.probes.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        Ok(self.state.lock().unwrap().block)
    }

    async fn transaction_count(&self, address: Address) -> LedgerResult<u64> {
        self.counters.nonce_queries.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        // Let concurrent submitters interleave here if the client allows it.
        tokio::task::yield_now().await;
        let count = self
            .state
            .lock()
            .unwrap()
            .nonces
            .get(&address)
            .copied()
            .unwrap_or_default();
        Ok(count.saturating_sub(self.nonce_lag.load(Ordering::SeqCst)))
    }

    async fn gas_price(&self) -> LedgerResult<u128> {
        self.check_reachable()?;
        Ok(20_000_000_000)
    }

    async fn code_at(&self, address: Address) -> LedgerResult<Bytes> {
        self.check_reachable()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .code
            .get(&address)
            .cloned()
            .unwrap_or_default())
    }

    async fn call(&self, request: CallRequest) -> LedgerResult<Bytes> {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        if !state.code.contains_key(&request.to) {
            return Ok(Bytes::new());
        }

        match selector(&request.data) {
            Ok(s) if s == reportThreatCall::SELECTOR || s == verifyThreatCall::SELECTOR => {
                let from = request.from.unwrap_or_default();
                Self::execute(&mut state, from, &request.data, false)
                    .map(|_| Bytes::new())
                    .map_err(LedgerError::Reverted)
            }
            _ => Self::view(&state, &request.data)
                .map(Bytes::from)
                .map_err(LedgerError::Reverted),
        }
    }

    async fn send_raw_transaction(&self, tx: &SignedTransaction) -> LedgerResult<TxHash> {
        self.counters.sends.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        if self.fail_next_send.swap(false, Ordering::SeqCst) {
            return Err(LedgerError::Rejected("insufficient funds for gas * price + value".to_string()));
        }
        let mut state = self.state.lock().unwrap();

        let expected = state.nonces.get(&tx.from).copied().unwrap_or_default();
        if tx.nonce < expected {
            return Err(LedgerError::Rejected(format!(
                "nonce too low: next nonce {}, tx nonce {}",
                expected, tx.nonce
            )));
        }
        if tx.nonce > expected {
            return Err(LedgerError::Rejected(format!(
                "nonce too high: next nonce {}, tx nonce {}",
                expected, tx.nonce
            )));
        }
        state.nonces.insert(tx.from, expected + 1);
        self.accepted_nonces.lock().unwrap().push(tx.nonce);

        state.block += 1;
        state.timestamp += 12;

        let (status, contract_address, logs) = match tx.to {
            None => {
                let address = tx.from.create(tx.nonce);
                state.code.insert(address, tx.input.clone());
                (true, Some(address), Vec::new())
            }
            Some(_) if self.ignore_writes.load(Ordering::SeqCst) => (true, None, Vec::new()),
            Some(to) => match Self::execute(&mut state, tx.from, &tx.input, true) {
                Ok(event) => {
                    let logs = event.map(|data| Log { address: to, data }).into_iter().collect();
                    (true, None, logs)
                }
                Err(_) => (false, None, Vec::new()),
            },
        };

        if !self.never_confirm.load(Ordering::SeqCst) {
            let block_number = state.block;
            state.receipts.insert(
                tx.hash,
                Receipt {
                    tx_hash: tx.hash,
                    block_number,
                    status,
                    from: tx.from,
                    contract_address,
                    gas_used: 50_000,
                    logs,
                },
            );
        }
        Ok(tx.hash)
    }

    async fn transaction_receipt(&self, hash: TxHash) -> LedgerResult<Option<Receipt>> {
        self.check_reachable()?;
        Ok(self.state.lock().unwrap().receipts.get(&hash).cloned())
    }
}

/// Compiler double returning fixed bytecode and the contract's ABI, or
/// `abi` when set.
#[derive(Debug, Default)]
pub struct StaticCompiler {
    pub compiles: AtomicUsize,
    pub abi: Option<JsonAbi>,
}

#[async_trait]
impl ContractCompiler for StaticCompiler {
    async fn compile(&self, _source: &Path, _contract_name: &str) -> Result<CompiledContract, InitError> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        Ok(CompiledContract {
            abi: self.abi.clone().unwrap_or_else(contract_abi),
            bytecode: Bytes::from_static(&[0x60, 0x80, 0x60, 0x40, 0x52]),
        })
    }
}

/// ABI of the shipped contract.
pub fn contract_abi() -> JsonAbi {
    JsonAbi::parse([
        "function reportThreat(bytes32 threatId, string url, string signature, uint8 level, uint8 confidence, bool isMalicious)",
        "function verifyThreat(bytes32 threatId)",
        "function threatExists(bytes32 threatId) view returns (bool exists)",
        "function getThreatInfo(bytes32 threatId) view returns (address reporter, string url, string signature, uint8 level, uint8 confidence, uint256 timestamp, bool isMalicious, bool verified)",
        "function getAllThreats() view returns (bytes32[] ids)",
        "function getThreatsCount() view returns (uint256 count)",
        "event ThreatReported(bytes32 indexed threatId, address indexed reporter, string url, uint8 level)",
        "event ThreatVerified(bytes32 indexed threatId, address indexed verifier)",
    ])
    .expect("valid human-readable ABI")
}

pub fn contract_source() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("contracts/ThreatIntelligence.sol")
}

/// Config pointing the descriptor into `dir` and the source at the shipped
/// contract.
pub fn test_config(dir: &Path) -> ThreatLedgerConfig {
    let mut config = ThreatLedgerConfig::default();
    config.deployment.descriptor_path = dir.join("deployments/ThreatIntelligence.json");
    config.deployment.contract_source = contract_source();
    config.transactions.receipt_poll_interval_ms = 10;
    config.transactions.confirmation_timeout_secs = 5;
    config
}

pub fn test_wallet() -> Wallet {
    Wallet::from_private_key(TEST_PRIVATE_KEY, CHAIN_ID).unwrap()
}

/// Client over `node` with a fresh deployment.
pub async fn connect(node: &Arc<MockLedger>, config: &ThreatLedgerConfig) -> ThreatLedger {
    ThreatLedger::with_parts(node.clone(), test_wallet(), &StaticCompiler::default(), config)
        .await
        .unwrap()
}
