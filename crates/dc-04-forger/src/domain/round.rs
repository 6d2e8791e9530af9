//! What the node reports to the forger each iteration.

use dc_01_wallets::DelegateEntry;
use serde::{Deserialize, Serialize};
use shared_types::{BigAmount, BlockData};

/// The node's view of the current slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundInfo {
    pub round: u64,
    /// Height of the block to forge.
    pub height: u64,
    pub slot: u32,
    /// Epoch seconds at which the slot begins.
    pub timestamp: u32,
    pub reward: BigAmount,
    pub last_block: BlockData,
    /// Delegate scheduled for the slot.
    pub delegate: Option<DelegateEntry>,
    /// The node is synced and the slot has no block yet.
    pub can_forge: bool,
}

/// Pool contents offered for the next block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgingTransactions {
    /// Hex-encoded canonical bytes, in forging order.
    pub transactions: Vec<String>,
    pub pool_size: usize,
}
