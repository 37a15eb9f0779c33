//! Caller-side resilience.
//!
//! # Data Flow
//! ```text
//! Ledger operation fails:
//!     → retries.rs (retryable? attempts left?)
//!     → backoff.rs (exponential delay + jitter)
//!     → run the operation again
//! ```
//!
//! # Design Decisions
//! - The ledger client itself never retries; hosts opt in here
//! - Only connectivity failures are retried
//! - Reports are safe to retry: a repeated digest comes back as a duplicate

pub mod backoff;
pub mod retries;

pub use backoff::calculate_backoff;
pub use retries::retry_with_backoff;
