//! Driven port: the node the forger works against.

use async_trait::async_trait;
use shared_types::Block;

use crate::domain::{ForgingTransactions, RoundInfo};
use crate::error::Result;

#[async_trait]
pub trait ForgerClient: Send + Sync {
    /// Current slot, its scheduled delegate and the block to build on.
    async fn get_round(&self) -> Result<RoundInfo>;

    /// Pool transactions for the next block.
    async fn get_transactions(&self) -> Result<ForgingTransactions>;

    /// Hand a forged block to the node.
    async fn broadcast(&self, block: Block) -> Result<()>;
}
