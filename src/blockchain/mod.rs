//! Ledger node integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key, RPC URL)
//!     → wallet.rs (key loading, signing, local nonce)
//!     → client.rs (JSON-RPC with timeouts and failover, implements node.rs)
//!     → monitor.rs (cached liveness)
//!     → transaction.rs (simulate, sign, broadcast, confirm)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod monitor;
pub mod node;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use monitor::ConnectionMonitor;
pub use node::LedgerNode;
pub use transaction::{CallTarget, ContractCall, Submission, TxPipeline};
pub use types::{CallRequest, LedgerError, LedgerResult, Receipt, SignedTransaction};
pub use wallet::Wallet;
