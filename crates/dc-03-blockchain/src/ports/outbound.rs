//! Driven ports: durable block storage and the peer network.

use async_trait::async_trait;
use dc_01_wallets::Round;
use shared_types::{Block, Id};

use crate::domain::Result;

/// Durable blocks, wallet snapshots and rounds.
#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn get_last_block(&self) -> Result<Option<Block>>;

    /// Persist `block` immediately.
    async fn save_block(&self, block: &Block) -> Result<()>;

    /// Stage `block` for the next [`BlockStore::save_block_commit`].
    async fn save_block_async(&self, block: &Block) -> Result<()>;

    /// Flush staged blocks.
    async fn save_block_commit(&self) -> Result<()>;

    /// Rebuild the chain wallet index from stored blocks up to `height`.
    async fn build_wallets(&self, height: u64) -> Result<()>;

    /// Persist changed wallets, or every wallet when `force` is set.
    /// Returns the number written.
    async fn save_wallets(&self, force: bool) -> Result<usize>;

    /// Compute and save the round following `height` when `height` is a
    /// round boundary, or when the current round has no saved schedule.
    async fn apply_round(&self, height: u64) -> Result<Option<Round>>;

    async fn delete_round(&self, round: u64) -> Result<()>;

    async fn get_round(&self, round: u64) -> Result<Option<Round>>;

    /// Remove up to `count` blocks from the top of the chain, never the
    /// genesis block. Returned highest first.
    async fn remove_blocks(&self, count: u64) -> Result<Vec<Block>>;

    /// The subset of `ids` contained in stored blocks.
    async fn get_forged_transaction_ids(&self, ids: &[Id]) -> Result<Vec<Id>>;
}

/// Block source.
#[async_trait]
pub trait NetworkInterface: Send + Sync {
    /// Blocks above `from_height`, in ascending order.
    async fn download_blocks(&self, from_height: u64) -> Result<Vec<Block>>;

    async fn get_network_height(&self) -> Result<u64>;
}
