//! Contract binding resolution: reuse a recorded deployment or deploy anew.
//!
//! # Flow
//! ```text
//! descriptor file exists?
//!     yes → parse → network matches? → ABI complete? → code at address?
//!           → deployment tx sent by us and created this address?
//!           → binding                      (any "no" falls through ↓)
//!     no  → compile source → deploy via pipeline → wait for inclusion
//!           → persist new descriptor (temp file + rename) → binding
//! ```

use alloy::json_abi::JsonAbi;
use alloy::primitives::{hex, Address, Bytes, TxHash};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::blockchain::node::LedgerNode;
use crate::blockchain::transaction::{ContractCall, TxPipeline};
use crate::blockchain::types::LedgerError;
use crate::config::DeploymentConfig;
use crate::error::InitError;
use crate::threat::contract::REQUIRED_FUNCTIONS;

/// Locally persisted record of a deployed contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentDescriptor {
    pub contract_address: String,
    pub abi: JsonAbi,
    pub deployer_address: String,
    pub network: String,
    /// Hash of the creating transaction, used to check provenance on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_tx: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_at_block: Option<u64>,
}

impl DeploymentDescriptor {
    /// Read a descriptor. `Ok(None)` if the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, DescriptorError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DescriptorError::Read(e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(DescriptorError::Parse)
    }

    /// Write the descriptor, replacing any previous file atomically.
    pub fn persist(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp, path)
    }
}

/// Why a descriptor could not be used.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("cannot read descriptor: {0}")]
    Read(std::io::Error),

    #[error("cannot parse descriptor: {0}")]
    Parse(serde_json::Error),

    #[error("descriptor is for network '{found}', expected '{expected}'")]
    NetworkMismatch { expected: String, found: String },

    #[error("invalid contract address '{0}'")]
    InvalidAddress(String),

    #[error("ABI lacks function '{0}'")]
    MissingFunction(&'static str),

    #[error("no contract code at {0}")]
    NoCode(Address),

    #[error("provenance check failed: {0}")]
    Provenance(String),

    #[error("ledger node error: {0}")]
    Node(#[from] LedgerError),
}

/// The contract all calls go to.
#[derive(Debug, Clone)]
pub struct ContractBinding {
    pub address: Address,
    pub network: String,
}

/// First function the client relies on that `abi` does not declare.
pub fn missing_function(abi: &JsonAbi) -> Option<&'static str> {
    REQUIRED_FUNCTIONS
        .iter()
        .copied()
        .find(|name| abi.function(name).is_none())
}

/// Compiler output needed for deployment.
#[derive(Debug, Clone)]
pub struct CompiledContract {
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

/// Turns the contract source into deployable bytecode.
#[async_trait]
pub trait ContractCompiler: Send + Sync {
    async fn compile(&self, source: &Path, contract_name: &str) -> Result<CompiledContract, InitError>;
}

/// Compiles with the `solc` command line compiler.
#[derive(Debug, Clone)]
pub struct SolcCompiler {
    solc_path: String,
}

impl SolcCompiler {
    pub fn new(solc_path: impl Into<String>) -> Self {
        Self {
            solc_path: solc_path.into(),
        }
    }
}

#[async_trait]
impl ContractCompiler for SolcCompiler {
    async fn compile(&self, source: &Path, contract_name: &str) -> Result<CompiledContract, InitError> {
        tracing::info!(source = %source.display(), solc = %self.solc_path, "Compiling contract");

        let output = tokio::process::Command::new(&self.solc_path)
            .arg("--combined-json")
            .arg("abi,bin")
            .arg(source)
            .output()
            .await
            .map_err(|e| InitError::Compile(format!("failed to run {}: {}", self.solc_path, e)))?;

        if !output.status.success() {
            return Err(InitError::Compile(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        parse_combined_json(&output.stdout, contract_name)
    }
}

/// Extract one contract from `solc --combined-json abi,bin` output.
///
/// Older compilers emit the ABI as a JSON-encoded string, newer ones as an
/// array; both are accepted.
pub fn parse_combined_json(output: &[u8], contract_name: &str) -> Result<CompiledContract, InitError> {
    let root: serde_json::Value = serde_json::from_slice(output)
        .map_err(|e| InitError::Compile(format!("unreadable solc output: {}", e)))?;

    let suffix = format!(":{}", contract_name);
    let entry = root
        .get("contracts")
        .and_then(|contracts| contracts.as_object())
        .and_then(|contracts| {
            contracts
                .iter()
                .find(|(key, _)| key.ends_with(&suffix) || key.as_str() == contract_name)
                .map(|(_, value)| value)
        })
        .ok_or_else(|| InitError::Compile(format!("contract '{}' not in solc output", contract_name)))?;

    let abi_value = entry
        .get("abi")
        .ok_or_else(|| InitError::Compile("solc output has no abi".to_string()))?;
    let abi: JsonAbi = match abi_value {
        serde_json::Value::String(text) => serde_json::from_str(text),
        other => serde_json::from_value(other.clone()),
    }
    .map_err(|e| InitError::Compile(format!("invalid ABI: {}", e)))?;

    let bin = entry
        .get("bin")
        .and_then(|bin| bin.as_str())
        .ok_or_else(|| InitError::Compile("solc output has no bytecode".to_string()))?;
    let bytecode = hex::decode(bin)
        .map(Bytes::from)
        .map_err(|e| InitError::Compile(format!("invalid bytecode hex: {}", e)))?;
    if bytecode.is_empty() {
        return Err(InitError::Compile(format!(
            "'{}' compiled to empty bytecode (abstract contract or interface?)",
            contract_name
        )));
    }

    Ok(CompiledContract { abi, bytecode })
}

/// Finds or creates the contract binding at startup.
pub struct ContractResolver<'a> {
    node: &'a dyn LedgerNode,
    pipeline: &'a TxPipeline,
    config: &'a DeploymentConfig,
    compiler: &'a dyn ContractCompiler,
}

impl<'a> ContractResolver<'a> {
    pub fn new(
        node: &'a dyn LedgerNode,
        pipeline: &'a TxPipeline,
        config: &'a DeploymentConfig,
        compiler: &'a dyn ContractCompiler,
    ) -> Self {
        Self {
            node,
            pipeline,
            config,
            compiler,
        }
    }

    pub async fn resolve(&self) -> Result<ContractBinding, InitError> {
        let path = &self.config.descriptor_path;
        match self.load_existing().await {
            Ok(Some(binding)) => {
                tracing::info!(
                    address = %binding.address,
                    network = %binding.network,
                    descriptor = %path.display(),
                    "Reusing deployed contract"
                );
                return Ok(binding);
            }
            Ok(None) => {
                tracing::info!(descriptor = %path.display(), "No deployment descriptor found");
            }
            Err(e) => {
                tracing::warn!(
                    descriptor = %path.display(),
                    error = %e,
                    "Deployment descriptor unusable, deploying a fresh contract"
                );
            }
        }
        self.deploy().await
    }

    async fn load_existing(&self) -> Result<Option<ContractBinding>, DescriptorError> {
        let Some(descriptor) = DeploymentDescriptor::load(&self.config.descriptor_path)? else {
            return Ok(None);
        };

        if descriptor.network != self.config.network {
            return Err(DescriptorError::NetworkMismatch {
                expected: self.config.network.clone(),
                found: descriptor.network,
            });
        }

        let address: Address = descriptor
            .contract_address
            .parse()
            .map_err(|_| DescriptorError::InvalidAddress(descriptor.contract_address.clone()))?;

        if let Some(missing) = missing_function(&descriptor.abi) {
            return Err(DescriptorError::MissingFunction(missing));
        }

        let code = self.node.code_at(address).await?;
        if code.is_empty() {
            return Err(DescriptorError::NoCode(address));
        }

        self.check_provenance(&descriptor, address).await?;

        Ok(Some(ContractBinding {
            address,
            network: descriptor.network,
        }))
    }

    /// The creating transaction must come from our signing account and must
    /// have created exactly this address.
    async fn check_provenance(
        &self,
        descriptor: &DeploymentDescriptor,
        address: Address,
    ) -> Result<(), DescriptorError> {
        let Some(tx) = &descriptor.deployment_tx else {
            tracing::warn!(
                address = %address,
                "Descriptor has no deployment transaction; provenance not verified"
            );
            return Ok(());
        };

        let tx_hash: TxHash = tx
            .parse()
            .map_err(|_| DescriptorError::Provenance(format!("invalid transaction hash '{}'", tx)))?;
        let receipt = self
            .node
            .transaction_receipt(tx_hash)
            .await?
            .ok_or_else(|| DescriptorError::Provenance(format!("transaction {} not found", tx_hash)))?;

        if receipt.from != self.pipeline.address() {
            return Err(DescriptorError::Provenance(format!(
                "deployed by {}, signing account is {}",
                receipt.from,
                self.pipeline.address()
            )));
        }
        if receipt.contract_address != Some(address) {
            return Err(DescriptorError::Provenance(format!(
                "transaction {} did not create {}",
                tx_hash, address
            )));
        }
        Ok(())
    }

    async fn deploy(&self) -> Result<ContractBinding, InitError> {
        let source = &self.config.contract_source;
        if !source.is_file() {
            return Err(InitError::MissingSource(source.clone()));
        }

        let compiled = self
            .compiler
            .compile(source, &self.config.contract_name)
            .await?;
        if let Some(missing) = missing_function(&compiled.abi) {
            return Err(InitError::Compile(format!(
                "{} does not declare '{}'",
                self.config.contract_name, missing
            )));
        }

        let call = ContractCall::deploy(
            compiled.bytecode,
            self.pipeline.config().deploy_gas_limit,
        );
        let receipt = self
            .pipeline
            .submit(call)
            .await
            .map_err(|e| InitError::Deployment(e.to_string()))?;
        let address = receipt.contract_address.ok_or_else(|| {
            InitError::Deployment(format!(
                "receipt for {} carries no contract address",
                receipt.tx_hash
            ))
        })?;

        let descriptor = DeploymentDescriptor {
            contract_address: address.to_string(),
            abi: compiled.abi,
            deployer_address: self.pipeline.address().to_string(),
            network: self.config.network.clone(),
            deployment_tx: Some(receipt.tx_hash.to_string()),
            deployed_at_block: Some(receipt.block_number),
        };
        let path = &self.config.descriptor_path;
        descriptor.persist(path).map_err(|source| InitError::Persist {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            address = %address,
            tx_hash = %receipt.tx_hash,
            block_number = receipt.block_number,
            descriptor = %path.display(),
            "Contract deployed"
        );

        Ok(ContractBinding {
            address,
            network: self.config.network.clone(),
        })
    }
}
