//! Network constants and slot arithmetic.
//!
//! Time on the ledger is counted in seconds since the network epoch. Each
//! slot lasts `blocktime` seconds and slots are assigned to the active
//! delegates round-robin.

use serde::{Deserialize, Serialize};

use crate::amount::BigAmount;
use crate::entities::Timestamp;

/// Network version byte used when nothing else is configured.
pub const DEFAULT_NETWORK_VERSION: u8 = 0x1e;

/// Static parameters of one network.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub name: String,
    /// Payload hash of the genesis block.
    pub nethash: String,
    /// Network epoch in milliseconds since the Unix epoch.
    pub epoch_ms: Timestamp,
    pub active_delegates: u32,
    /// Seconds per slot.
    pub blocktime: u32,
    pub reward: BigAmount,
    pub network_version: u8,
    pub max_transactions_per_block: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "devnet".to_string(),
            nethash: String::new(),
            // 2017-03-21T13:00:00Z
            epoch_ms: 1_490_101_200_000,
            active_delegates: 51,
            blocktime: 8,
            reward: BigAmount::from(200_000_000u64),
            network_version: DEFAULT_NETWORK_VERSION,
            max_transactions_per_block: 50,
        }
    }
}

impl NetworkConfig {
    /// Small network for tests: 3 delegates, epoch at zero.
    pub fn for_testing() -> Self {
        Self {
            name: "testnet".to_string(),
            epoch_ms: 0,
            active_delegates: 3,
            reward: BigAmount::from(2u64),
            ..Default::default()
        }
    }

    /// Number of seconds in one full round of active delegates.
    pub fn round_duration_secs(&self) -> u64 {
        u64::from(self.active_delegates) * u64::from(self.blocktime)
    }

    pub fn slots(&self) -> Slots {
        Slots {
            epoch_ms: self.epoch_ms,
            blocktime: self.blocktime,
            active_delegates: self.active_delegates,
        }
    }
}

/// Slot calculator bound to one network.
#[derive(Debug, Clone, Copy)]
pub struct Slots {
    epoch_ms: Timestamp,
    blocktime: u32,
    active_delegates: u32,
}

impl Slots {
    /// Epoch seconds for a wall-clock instant.
    pub fn epoch_time(&self, now_ms: Timestamp) -> u32 {
        (now_ms.saturating_sub(self.epoch_ms) / 1000) as u32
    }

    /// Wall-clock milliseconds for an epoch time.
    pub fn real_time(&self, epoch_secs: u32) -> Timestamp {
        self.epoch_ms + u64::from(epoch_secs) * 1000
    }

    pub fn slot_number(&self, epoch_secs: u32) -> u32 {
        epoch_secs / self.blocktime.max(1)
    }

    /// Epoch seconds at which a slot begins.
    pub fn slot_time(&self, slot: u32) -> u32 {
        slot * self.blocktime
    }

    /// Index into the round's delegate list for the slot containing `epoch_secs`.
    pub fn forger_index(&self, epoch_secs: u32) -> usize {
        (self.slot_number(epoch_secs) % self.active_delegates.max(1)) as usize
    }
}
