//! Cached ledger node liveness.
//!
//! Probes are network round trips, so the result is cached for a fixed
//! window. Reads inside the window are free; the first read after it probes
//! inline. The state lock is held across the probe, so concurrent readers of
//! a stale cache wait for one probe instead of racing several.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::blockchain::node::LedgerNode;
use crate::blockchain::types::LedgerResult;
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, Default)]
struct ConnectionState {
    connected: bool,
    last_checked_at: Option<Instant>,
}

/// Tracks whether the ledger node is reachable.
pub struct ConnectionMonitor {
    node: Arc<dyn LedgerNode>,
    interval: Duration,
    state: Mutex<ConnectionState>,
}

impl ConnectionMonitor {
    pub fn new(node: Arc<dyn LedgerNode>, interval: Duration) -> Self {
        Self {
            node,
            interval,
            state: Mutex::new(ConnectionState::default()),
        }
    }

    /// Cached liveness. Never fails; probe errors read as `false`.
    pub async fn is_connected(&self) -> bool {
        let mut state = self.state.lock().await;
        if let Some(checked) = state.last_checked_at {
            if checked.elapsed() < self.interval {
                return state.connected;
            }
        }

        tracing::debug!("Connection cache stale, probing ledger node");
        if let Err(e) = self.probe(&mut state).await {
            tracing::warn!(error = %e, "Ledger node liveness probe failed");
        }
        state.connected
    }

    /// Probe the node now, regardless of cache age.
    pub async fn check_now(&self) -> LedgerResult<()> {
        let mut state = self.state.lock().await;
        self.probe(&mut state).await
    }

    /// When the cached value was last refreshed.
    pub async fn last_checked_at(&self) -> Option<Instant> {
        self.state.lock().await.last_checked_at
    }

    async fn probe(&self, state: &mut ConnectionState) -> LedgerResult<()> {
        let result = self.node.block_number().await;
        let connected = result.is_ok();
        if connected != state.connected {
            tracing::info!(connected, "Ledger node connectivity changed");
        }
        state.connected = connected;
        state.last_checked_at = Some(Instant::now());
        metrics::record_node_connected(connected);

        result.map(|block| {
            tracing::trace!(block, "Ledger node reachable");
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl std::fmt::Debug for ConnectionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionMonitor")
            .field("interval", &self.interval)
            .finish()
    }
}
