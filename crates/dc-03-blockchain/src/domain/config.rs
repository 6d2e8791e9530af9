//! Configuration for the blockchain state machine.

use serde::Deserialize;
use std::time::Duration;

use super::rollback::RollbackPolicy;

/// Queued blocks above which downloading pauses.
pub const DEFAULT_MAX_QUEUE_DEPTH: usize = 100_000;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// Skip per-block wallet application when far behind, and rebuild the
    /// wallets once at the end instead.
    pub fast_rebuild: bool,

    /// Treat the node as the network's first: consider it synced as soon as
    /// the first download round completes.
    pub network_start: bool,

    pub max_queue_depth: usize,

    /// Delay between idle wake-ups, in seconds.
    pub check_later_interval: u64,

    pub rollback: RollbackPolicy,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            fast_rebuild: false,
            network_start: false,
            max_queue_depth: DEFAULT_MAX_QUEUE_DEPTH,
            check_later_interval: 60,
            rollback: RollbackPolicy::default(),
        }
    }
}

impl BlockchainConfig {
    /// Deterministic rollback and a short idle interval.
    pub fn for_testing() -> Self {
        Self {
            check_later_interval: 1,
            rollback: RollbackPolicy::Fixed(1),
            ..Default::default()
        }
    }

    pub fn check_later(&self) -> Duration {
        Duration::from_secs(self.check_later_interval)
    }
}
