//! Threat records on the ledger.
//!
//! # Data Flow
//! ```text
//! NewThreat
//!     → digest.rs (identifier → bytes32 key)
//!     → ledger.rs (validation, liveness, pipeline, post-conditions)
//!     → contract.rs (ABI encoding against ThreatIntelligence)
//! deployment.rs resolves which contract address all of this targets.
//! ```

pub mod contract;
pub mod deployment;
pub mod digest;
pub mod ledger;
pub mod types;

pub use deployment::{
    CompiledContract, ContractBinding, ContractCompiler, ContractResolver, DeploymentDescriptor,
    SolcCompiler,
};
pub use digest::{digest, ThreatDigest};
pub use ledger::ThreatLedger;
pub use types::{NewThreat, ReportOutcome, StatusSnapshot, ThreatRecord, ThreatSignature, VerifyOutcome};
