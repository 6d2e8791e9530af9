//! In-memory block store.
//!
//! Keeps blocks, rounds and the last wallet snapshot in process memory and
//! drives the shared chain [`WalletIndex`](dc_01_wallets::WalletIndex) for
//! wallet rebuilds and round computation.

use async_trait::async_trait;
use dc_01_wallets::{needs_round_save, round_of_height, Round, SharedWalletIndex, Wallet};
use dc_02_transaction_pool::{ForgedTransactionLookup, PoolError};
use parking_lot::Mutex;
use shared_types::{Block, Id};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::domain::Result;
use crate::ports::BlockStore;

#[derive(Debug, Default)]
struct StoreInner {
    blocks: BTreeMap<u64, Block>,
    staged: Vec<Block>,
    /// Transaction id → height of the containing block.
    transactions: HashMap<Id, u64>,
    rounds: BTreeMap<u64, Round>,
    wallets: HashMap<String, Wallet>,
}

impl StoreInner {
    fn insert(&mut self, block: Block) {
        let height = block.height();
        if let Some(replaced) = self.blocks.remove(&height) {
            for tx in &replaced.transactions {
                self.transactions.remove(tx.id());
            }
        }
        for tx in &block.transactions {
            self.transactions.insert(tx.id().to_string(), height);
        }
        self.blocks.insert(height, block);
    }
}

pub struct InMemoryBlockStore {
    chain: SharedWalletIndex,
    active_delegates: u64,
    inner: Mutex<StoreInner>,
}

impl InMemoryBlockStore {
    pub fn new(chain: SharedWalletIndex, active_delegates: u32) -> Self {
        Self {
            chain,
            active_delegates: u64::from(active_delegates),
            inner: Mutex::new(StoreInner::default()),
        }
    }

    /// Store preloaded with `blocks`, as left by a previous run.
    pub fn with_blocks(
        chain: SharedWalletIndex,
        active_delegates: u32,
        blocks: impl IntoIterator<Item = Block>,
    ) -> Self {
        let store = Self::new(chain, active_delegates);
        {
            let mut inner = store.inner.lock();
            for block in blocks {
                inner.insert(block);
            }
        }
        store
    }

    pub fn height(&self) -> u64 {
        self.inner
            .lock()
            .blocks
            .last_key_value()
            .map_or(0, |(height, _)| *height)
    }

    pub fn get_block_at(&self, height: u64) -> Option<Block> {
        self.inner.lock().blocks.get(&height).cloned()
    }

    pub fn staged_len(&self) -> usize {
        self.inner.lock().staged.len()
    }

    pub fn saved_wallet(&self, address: &str) -> Option<Wallet> {
        self.inner.lock().wallets.get(address).cloned()
    }
}

#[async_trait]
impl BlockStore for InMemoryBlockStore {
    async fn get_last_block(&self) -> Result<Option<Block>> {
        Ok(self
            .inner
            .lock()
            .blocks
            .last_key_value()
            .map(|(_, block)| block.clone()))
    }

    async fn save_block(&self, block: &Block) -> Result<()> {
        self.inner.lock().insert(block.clone());
        Ok(())
    }

    async fn save_block_async(&self, block: &Block) -> Result<()> {
        self.inner.lock().staged.push(block.clone());
        Ok(())
    }

    async fn save_block_commit(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let staged = std::mem::take(&mut inner.staged);
        let count = staged.len();
        for block in staged {
            inner.insert(block);
        }
        if count > 0 {
            debug!(count, "[dc-03] Committed staged blocks");
        }
        Ok(())
    }

    async fn build_wallets(&self, height: u64) -> Result<()> {
        let blocks: Vec<Block> = self
            .inner
            .lock()
            .blocks
            .range(..=height)
            .map(|(_, block)| block.clone())
            .collect();

        let mut chain = self.chain.write();
        chain.reset();
        for block in &blocks {
            chain.apply_block(block)?;
        }
        chain.clear_dirty();
        info!(height, wallets = chain.len(), "[dc-03] Rebuilt wallets from stored blocks");
        Ok(())
    }

    async fn save_wallets(&self, force: bool) -> Result<usize> {
        let changed: Vec<Wallet> = {
            let mut chain = self.chain.write();
            let changed = if force {
                chain.get_local_wallets().cloned().collect()
            } else {
                chain.dirty_wallets().cloned().collect::<Vec<_>>()
            };
            chain.clear_dirty();
            changed
        };

        let mut inner = self.inner.lock();
        if force {
            inner.wallets.clear();
        }
        let count = changed.len();
        for wallet in changed {
            inner.wallets.insert(wallet.address.clone(), wallet);
        }
        debug!(count, force, "[dc-03] Saved wallets");
        Ok(count)
    }

    async fn apply_round(&self, height: u64) -> Result<Option<Round>> {
        let next_height = if height == 1 { 1 } else { height + 1 };
        let number = round_of_height(next_height, self.active_delegates);
        // Mid-round heights only fill in a missing schedule (after a rebuild).
        if !needs_round_save(height, self.active_delegates)
            && self.inner.lock().rounds.contains_key(&number)
        {
            return Ok(None);
        }
        let round = self
            .chain
            .write()
            .build_round(number, height, self.active_delegates as usize);
        self.inner.lock().rounds.insert(number, round.clone());
        Ok(Some(round))
    }

    async fn delete_round(&self, round: u64) -> Result<()> {
        self.inner.lock().rounds.remove(&round);
        Ok(())
    }

    async fn get_round(&self, round: u64) -> Result<Option<Round>> {
        Ok(self.inner.lock().rounds.get(&round).cloned())
    }

    async fn remove_blocks(&self, count: u64) -> Result<Vec<Block>> {
        let mut inner = self.inner.lock();
        let mut removed = Vec::new();
        for _ in 0..count {
            let Some((&height, _)) = inner.blocks.last_key_value() else {
                break;
            };
            if height <= 1 {
                break;
            }
            if let Some(block) = inner.blocks.remove(&height) {
                for tx in &block.transactions {
                    inner.transactions.remove(tx.id());
                }
                removed.push(block);
            }
        }
        Ok(removed)
    }

    async fn get_forged_transaction_ids(&self, ids: &[Id]) -> Result<Vec<Id>> {
        let inner = self.inner.lock();
        Ok(ids
            .iter()
            .filter(|id| inner.transactions.contains_key(*id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ForgedTransactionLookup for InMemoryBlockStore {
    async fn get_forged_transaction_ids(
        &self,
        ids: &[Id],
    ) -> dc_02_transaction_pool::Result<Vec<Id>> {
        BlockStore::get_forged_transaction_ids(self, ids)
            .await
            .map_err(|e| PoolError::ForgedLookup(e.to_string()))
    }
}
