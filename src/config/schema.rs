//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the threat
//! ledger client. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the threat ledger client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ThreatLedgerConfig {
    /// Ledger node connection settings.
    pub node: NodeConfig,

    /// Transaction building and confirmation settings.
    pub transactions: TransactionConfig,

    /// Contract deployment and descriptor settings.
    pub deployment: DeploymentConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Caller-side retry policy used by the CLI.
    pub retry: RetryConfig,
}

/// Ledger node connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Expected chain ID. When unset, whatever the node reports is used.
    pub chain_id: Option<u64>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// How long a liveness probe result stays fresh, in milliseconds.
    pub connection_check_interval_ms: u64,
}

impl NodeConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn connection_check_interval(&self) -> Duration {
        Duration::from_millis(self.connection_check_interval_ms)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Ganache GUI default
            rpc_url: "http://127.0.0.1:7545".to_string(),
            failover_urls: Vec::new(),
            chain_id: None,
            rpc_timeout_secs: 10,
            connection_check_interval_ms: 5_000,
        }
    }
}

/// Transaction pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Gas budget for `reportThreat` / `verifyThreat`.
    pub call_gas_limit: u64,

    /// Gas budget for contract deployment.
    pub deploy_gas_limit: u64,

    /// Gas price multiplier (1.0 = node price, 1.2 = 20% buffer).
    pub gas_price_multiplier: f64,

    /// Maximum time to wait for a submitted transaction to be included.
    pub confirmation_timeout_secs: u64,

    /// Receipt polling interval in milliseconds.
    pub receipt_poll_interval_ms: u64,
}

impl TransactionConfig {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            call_gas_limit: 200_000,
            deploy_gas_limit: 3_000_000,
            gas_price_multiplier: 1.0,
            confirmation_timeout_secs: 120,
            receipt_poll_interval_ms: 1_000,
        }
    }
}

/// Contract deployment configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Network label recorded in the descriptor (e.g. "ganache", "sepolia").
    pub network: String,

    /// Where the deployment descriptor is persisted.
    pub descriptor_path: PathBuf,

    /// Solidity source compiled when no usable descriptor exists.
    pub contract_source: PathBuf,

    /// Contract name inside the source file.
    pub contract_name: String,

    /// `solc` binary used for compilation.
    pub solc_path: String,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            network: "ganache".to_string(),
            descriptor_path: PathBuf::from("deployments/ThreatIntelligence.json"),
            contract_source: PathBuf::from("contracts/ThreatIntelligence.sol"),
            contract_name: "ThreatIntelligence".to_string(),
            solc_path: "solc".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// Retry configuration for callers of the client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts (1 = no retry).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 5_000,
        }
    }
}
