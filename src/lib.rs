//! Threat Ledger Client Library
//!
//! Records threat verdicts on an EVM ledger through the `ThreatIntelligence`
//! contract: one record per identifier digest, reported once, optionally
//! verified, readable by anyone.

pub mod blockchain;
pub mod config;
pub mod error;
pub mod observability;
pub mod resilience;
pub mod threat;

pub use config::ThreatLedgerConfig;
pub use error::{ContractFailure, InitError, TxError};
pub use threat::{NewThreat, ReportOutcome, ThreatLedger, ThreatRecord, ThreatSignature, VerifyOutcome};
