//! Scripted peer network for tests and single-node runs.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::Block;
use std::collections::BTreeMap;

use crate::domain::{BlockchainError, Result};
use crate::ports::NetworkInterface;

/// Blocks served per download request.
pub const DEFAULT_DOWNLOAD_BATCH: usize = 400;

#[derive(Debug, Default)]
struct NetworkInner {
    blocks: BTreeMap<u64, Block>,
    unreachable: bool,
}

/// A single simulated peer holding a chain of blocks.
#[derive(Debug)]
pub struct InMemoryNetwork {
    inner: Mutex<NetworkInner>,
    batch_size: usize,
}

impl Default for InMemoryNetwork {
    fn default() -> Self {
        Self::new(DEFAULT_DOWNLOAD_BATCH)
    }
}

impl InMemoryNetwork {
    pub fn new(batch_size: usize) -> Self {
        Self {
            inner: Mutex::new(NetworkInner::default()),
            batch_size: batch_size.max(1),
        }
    }

    /// Add or replace the peer's block at that height.
    pub fn push_block(&self, block: Block) {
        self.inner.lock().blocks.insert(block.height(), block);
    }

    pub fn extend(&self, blocks: impl IntoIterator<Item = Block>) {
        let mut inner = self.inner.lock();
        for block in blocks {
            inner.blocks.insert(block.height(), block);
        }
    }

    /// Drop every block above `height`.
    pub fn truncate(&self, height: u64) {
        self.inner.lock().blocks.split_off(&(height + 1));
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner.lock().unreachable = unreachable;
    }
}

#[async_trait]
impl NetworkInterface for InMemoryNetwork {
    async fn download_blocks(&self, from_height: u64) -> Result<Vec<Block>> {
        let inner = self.inner.lock();
        if inner.unreachable {
            return Err(BlockchainError::Network("peer unreachable".to_string()));
        }
        Ok(inner
            .blocks
            .range(from_height + 1..)
            .take(self.batch_size)
            .map(|(_, block)| block.clone())
            .collect())
    }

    async fn get_network_height(&self) -> Result<u64> {
        let inner = self.inner.lock();
        if inner.unreachable {
            return Err(BlockchainError::Network("peer unreachable".to_string()));
        }
        Ok(inner.blocks.last_key_value().map_or(0, |(height, _)| *height))
    }
}
