//! # Block Processor
//!
//! Applies queued blocks to the chain. Shared by the process and rebuild
//! queue workers and by fork recovery.
//!
//! ## Acceptance
//!
//! ```text
//! block
//!   ├─ height <= last                     → Skipped (already in chain)
//!   ├─ height > last + 1                  → Rejected (gap, download tip reset)
//!   ├─ previous_block != last.id          → Fork
//!   ├─ verification errors                → Rejected (invalid senders purged)
//!   ├─ wallet application fails           → Rejected
//!   └─ apply, save, round, pool           → Applied
//! ```

use dc_01_wallets::{is_round_end, round_of_height, SharedWalletIndex};
use dc_02_transaction_pool::SharedTransactionPool;
use dc_telemetry::metrics::{BLOCKS_APPLIED, BLOCKS_REVERTED, CHAIN_HEIGHT};
use parking_lot::Mutex;
use shared_bus::{EventPublisher, LedgerEvent};
use shared_types::Block;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::errors::Result;
use super::state::BlockchainState;
use crate::ports::BlockStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockOutcome {
    Applied,
    Skipped,
    Rejected,
    Fork,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Link {
    Next,
    Known,
    Gap,
    Fork,
}

pub struct BlockProcessor {
    store: Arc<dyn BlockStore>,
    chain: SharedWalletIndex,
    pool: SharedTransactionPool,
    events: Arc<dyn EventPublisher>,
    state: Arc<Mutex<BlockchainState>>,
    active_delegates: u64,
}

impl BlockProcessor {
    pub fn new(
        store: Arc<dyn BlockStore>,
        chain: SharedWalletIndex,
        pool: SharedTransactionPool,
        events: Arc<dyn EventPublisher>,
        state: Arc<Mutex<BlockchainState>>,
        active_delegates: u32,
    ) -> Self {
        Self {
            store,
            chain,
            pool,
            events,
            state,
            active_delegates: u64::from(active_delegates),
        }
    }

    pub fn state(&self) -> &Arc<Mutex<BlockchainState>> {
        &self.state
    }

    fn link(&self, block: &Block) -> Link {
        let state = self.state.lock();
        let Some(last) = state.last_block.as_ref() else {
            return Link::Gap;
        };
        if block.height() <= last.height {
            Link::Known
        } else if block.height() > last.height + 1 {
            Link::Gap
        } else if block.data.previous_block.as_deref() != Some(last.id.as_str()) {
            Link::Fork
        } else {
            Link::Next
        }
    }

    /// Position check shared by both workers.
    fn check_link(&self, block: &Block) -> Option<BlockOutcome> {
        match self.link(block) {
            Link::Next => None,
            Link::Known => {
                debug!(height = block.height(), id = %block.id(), "[dc-03] Block already in chain");
                Some(BlockOutcome::Skipped)
            }
            Link::Gap => {
                warn!(
                    height = block.height(),
                    last = self.state.lock().last_height(),
                    "[dc-03] Block disregarded: not the next height"
                );
                self.state.lock().reset_download_tip();
                Some(BlockOutcome::Rejected)
            }
            Link::Fork => {
                warn!(
                    height = block.height(),
                    id = %block.id(),
                    previous = ?block.data.previous_block,
                    "[dc-03] Block does not chain from the last block"
                );
                Some(BlockOutcome::Fork)
            }
        }
    }

    fn reject_unverified(&self, block: &Block) -> Option<BlockOutcome> {
        let errors = block.verification_errors();
        if errors.is_empty() {
            return None;
        }
        warn!(height = block.height(), id = %block.id(), ?errors, "[dc-03] Block failed verification");
        self.pool.lock().purge_senders_with_invalid_transactions(block);
        self.state.lock().reset_download_tip();
        Some(BlockOutcome::Rejected)
    }

    /// Apply `block` to the chain wallets, store it and reconcile the pool.
    pub async fn process_block(&self, block: Block) -> BlockOutcome {
        if let Some(outcome) = self.check_link(&block) {
            return outcome;
        }
        if let Some(outcome) = self.reject_unverified(&block) {
            return outcome;
        }

        let applied = self.chain.write().apply_block(&block);
        if let Err(e) = applied {
            warn!(height = block.height(), id = %block.id(), error = %e, "[dc-03] Block rejected by the ledger");
            self.state.lock().reset_download_tip();
            return BlockOutcome::Rejected;
        }

        if let Err(e) = self.store.save_block(&block).await {
            error!(height = block.height(), error = %e, "[dc-03] Failed to save block");
            let undone = self.chain.write().undo_block(&block);
            if let Err(e) = undone {
                error!(height = block.height(), error = %e, "[dc-03] Failed to undo unsaved block");
            }
            self.state.lock().reset_download_tip();
            return BlockOutcome::Rejected;
        }

        self.state.lock().last_block = Some(block.data.clone());
        self.apply_round(block.height()).await;
        self.pool.lock().accept_chained_block(&block);

        BLOCKS_APPLIED.inc();
        CHAIN_HEIGHT.set(block.height() as f64);
        debug!(height = block.height(), txs = block.transactions.len(), "[dc-03] Block applied");
        self.events.publish(LedgerEvent::BlockApplied(block.data));
        BlockOutcome::Applied
    }

    /// Stage `block` without touching the wallets. The wallets are rebuilt
    /// from storage once the rebuild finishes.
    pub async fn rebuild_block(&self, block: Block) -> BlockOutcome {
        if let Some(outcome) = self.check_link(&block) {
            return outcome;
        }
        if let Some(outcome) = self.reject_unverified(&block) {
            return outcome;
        }
        if let Err(e) = self.store.save_block_async(&block).await {
            error!(height = block.height(), error = %e, "[dc-03] Failed to stage block");
            self.state.lock().reset_download_tip();
            return BlockOutcome::Rejected;
        }
        self.state.lock().last_block = Some(block.data.clone());
        CHAIN_HEIGHT.set(block.height() as f64);
        BlockOutcome::Applied
    }

    /// Save the next round's schedule when `height` closes a round.
    pub async fn apply_round(&self, height: u64) {
        match self.store.apply_round(height).await {
            Ok(Some(round)) => {
                info!(round = round.round, height, delegates = round.delegates.len(), "[dc-03] Round applied");
                self.events.publish(LedgerEvent::RoundApplied {
                    round: round.round,
                    height,
                });
            }
            Ok(None) => {}
            Err(e) => error!(height, error = %e, "[dc-03] Failed to apply round"),
        }
    }

    /// Remove the top `count` blocks.
    ///
    /// Each removed block is undone in the chain wallets (or the wallets are
    /// rebuilt if a fast rebuild left them stale) and its transactions are
    /// offered back to the pool.
    pub async fn remove_blocks(&self, count: u64) -> Result<Vec<Block>> {
        self.store.save_block_commit().await?;
        let removed = self.store.remove_blocks(count).await?;
        let last = self.store.get_last_block().await?;
        let new_height = last.as_ref().map_or(0, Block::height);
        let wallets_stale = self.state.lock().fast_rebuild;

        if wallets_stale {
            self.store.build_wallets(new_height).await?;
            self.state.lock().fast_rebuild = false;
        } else {
            // Undo on a copy so a failure part-way leaves nothing half undone.
            let undone = {
                let mut scratch = self.chain.read().clone();
                removed
                    .iter()
                    .try_for_each(|block| scratch.undo_block(block))
                    .map(|()| scratch)
            };
            match undone {
                Ok(index) => *self.chain.write() = index,
                Err(e) => {
                    warn!(height = new_height, error = %e, "[dc-03] Undo failed, rebuilding wallets from stored blocks");
                    self.store.build_wallets(new_height).await?;
                }
            }
        }

        for block in &removed {
            if is_round_end(block.height(), self.active_delegates) {
                let round = round_of_height(block.height() + 1, self.active_delegates);
                self.store.delete_round(round).await?;
            }
            BLOCKS_REVERTED.inc();
            info!(height = block.height(), id = %block.id(), "[dc-03] Block reverted");
            self.events.publish(LedgerEvent::BlockReverted(block.data.clone()));
        }

        {
            let mut state = self.state.lock();
            state.last_block = last.map(|b| b.data);
            state.reset_download_tip();
        }
        CHAIN_HEIGHT.set(new_height as f64);

        let mut pool = self.pool.lock();
        pool.wallet_manager_mut().reset();
        for block in &removed {
            for tx in &block.transactions {
                if let Err(e) = pool.add_transaction(tx.clone()) {
                    debug!(id = %tx.id(), code = e.code(), "[dc-03] Reverted transaction not re-pooled");
                }
            }
        }
        pool.build_wallets();

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::*;
    use shared_bus::EventFilter;

    // =========================================================================
    // Acceptance
    // =========================================================================

    #[tokio::test]
    async fn test_next_block_is_applied_saved_and_published() {
        let harness = Harness::new();
        let processor = harness.processor().await;
        let mut events = harness.bus.subscribe(EventFilter::names(vec!["block.applied"]));

        let block = next_block(&harness.genesis, vec![transfer("alice", "bob", 100, 10, 2)]);
        assert_eq!(processor.process_block(block.clone()).await, BlockOutcome::Applied);

        assert_eq!(harness.balance("alice"), FUNDING - 110);
        assert_eq!(harness.balance("bob"), FUNDING + 100);
        assert_eq!(harness.store.height(), 2);
        assert_eq!(processor.state().lock().last_height(), 2);
        assert!(matches!(
            events.try_recv().unwrap(),
            Some(LedgerEvent::BlockApplied(data)) if data.id == block.data.id
        ));
    }

    #[tokio::test]
    async fn test_known_block_is_skipped() {
        let harness = Harness::new();
        let processor = harness.processor().await;

        let outcome = processor.process_block(harness.genesis.clone()).await;
        assert_eq!(outcome, BlockOutcome::Skipped);
        assert_eq!(harness.balance("alice"), FUNDING);
    }

    #[tokio::test]
    async fn test_gap_resets_download_tip() {
        let harness = Harness::new();
        let processor = harness.processor().await;
        let blocks = branch(&harness.genesis, 3, 8);
        processor.state().lock().last_downloaded_block = Some(blocks[2].data.clone());

        let outcome = processor.process_block(blocks[2].clone()).await;
        assert_eq!(outcome, BlockOutcome::Rejected);
        assert_eq!(processor.state().lock().download_tip().unwrap().height, 1);
        assert_eq!(harness.store.height(), 1);
    }

    #[tokio::test]
    async fn test_unlinked_block_is_a_fork() {
        let harness = Harness::new();
        let processor = harness.processor().await;
        let ours = branch(&harness.genesis, 1, 8);
        let theirs = branch(&harness.genesis, 2, 9);
        assert_eq!(processor.process_block(ours[0].clone()).await, BlockOutcome::Applied);

        let outcome = processor.process_block(theirs[1].clone()).await;
        assert_eq!(outcome, BlockOutcome::Fork);
        assert_eq!(harness.store.height(), 2);
    }

    #[tokio::test]
    async fn test_unverified_transaction_purges_sender_from_pool() {
        let harness = Harness::new();
        let processor = harness.processor().await;
        harness
            .pool
            .lock()
            .add_transaction(transfer("alice", "bob", 10, 1, 3))
            .unwrap();

        let mut block = next_block(&harness.genesis, vec![transfer("alice", "bob", 100, 10, 2)]);
        block.transactions[0].verified = false;

        let outcome = processor.process_block(block).await;
        assert_eq!(outcome, BlockOutcome::Rejected);
        assert_eq!(harness.pool.lock().get_pool_size(), 0);
        assert_eq!(harness.balance("alice"), FUNDING);
        assert_eq!(harness.store.height(), 1);
    }

    #[tokio::test]
    async fn test_overspending_block_leaves_ledger_untouched() {
        let harness = Harness::new();
        let processor = harness.processor().await;

        let block = next_block(&harness.genesis, vec![transfer("alice", "bob", FUNDING * 2, 0, 2)]);
        let outcome = processor.process_block(block).await;

        assert_eq!(outcome, BlockOutcome::Rejected);
        assert_eq!(harness.balance("alice"), FUNDING);
        assert_eq!(harness.balance("bob"), FUNDING);
    }

    #[tokio::test]
    async fn test_chained_block_removes_its_transactions_from_pool() {
        let harness = Harness::new();
        let processor = harness.processor().await;
        let tx = transfer("alice", "bob", 100, 10, 2);
        harness.pool.lock().add_transaction(tx.clone()).unwrap();

        let block = next_block(&harness.genesis, vec![tx.clone()]);
        assert_eq!(processor.process_block(block).await, BlockOutcome::Applied);
        assert!(!harness.pool.lock().transaction_exists(tx.id()));
    }

    // =========================================================================
    // Rebuild
    // =========================================================================

    #[tokio::test]
    async fn test_rebuild_block_stages_without_wallets() {
        let harness = Harness::new();
        let processor = harness.processor().await;

        let block = next_block(&harness.genesis, vec![transfer("alice", "bob", 100, 10, 2)]);
        assert_eq!(processor.rebuild_block(block).await, BlockOutcome::Applied);

        assert_eq!(harness.store.staged_len(), 1);
        assert_eq!(harness.balance("alice"), FUNDING);
        assert_eq!(processor.state().lock().last_height(), 2);
    }

    // =========================================================================
    // Rounds and rollback
    // =========================================================================

    #[tokio::test]
    async fn test_round_end_publishes_round_applied() {
        let harness = Harness::new();
        let processor = harness.processor().await;
        let mut events = harness.bus.subscribe(EventFilter::names(vec!["round.applied"]));

        for block in branch(&harness.genesis, 2, 8) {
            assert_eq!(processor.process_block(block).await, BlockOutcome::Applied);
        }

        let mut rounds = Vec::new();
        while let Ok(Some(LedgerEvent::RoundApplied { round, .. })) = events.try_recv() {
            rounds.push(round);
        }
        assert!(rounds.contains(&2));
        assert!(harness.store.get_round(2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_blocks_reverts_wallets_and_repools_transactions() {
        let harness = Harness::new();
        let processor = harness.processor().await;
        let tx = transfer("alice", "bob", 100, 10, 2);
        let block = next_block(&harness.genesis, vec![tx.clone()]);
        processor.process_block(block).await;

        let removed = processor.remove_blocks(5).await.unwrap();

        assert_eq!(removed.len(), 1);
        assert_eq!(harness.store.height(), 1);
        assert_eq!(harness.balance("alice"), FUNDING);
        assert_eq!(harness.balance("bob"), FUNDING);
        assert_eq!(processor.state().lock().last_height(), 1);
        assert!(harness.pool.lock().transaction_exists(tx.id()));
    }

    #[tokio::test]
    async fn test_remove_blocks_rebuilds_wallets_when_undo_fails() {
        let harness = Harness::new();
        let processor = harness.processor().await;
        let first = next_block(&harness.genesis, vec![transfer("alice", "bob", 100, 10, 2)]);
        let second = next_block(&first, vec![transfer("bob", "alice", 50, 5, 3)]);
        processor.process_block(first).await;
        processor.process_block(second.clone()).await;

        // Without the generator wallet no block can be undone.
        let generator = address_of(GENESIS);
        harness.chain.write().delete_wallet(&generator);

        let removed = processor.remove_blocks(1).await.unwrap();

        assert_eq!(removed.len(), 1);
        assert_eq!(harness.store.height(), 2);
        assert_eq!(processor.state().lock().last_height(), 2);
        assert_eq!(harness.balance("alice"), FUNDING - 110);
        assert_eq!(harness.balance("bob"), FUNDING + 100);
        assert!(harness.chain.read().get_by_address(&generator).is_some());
        assert!(harness.pool.lock().transaction_exists(second.transactions[0].id()));
    }

    #[tokio::test]
    async fn test_remove_blocks_deletes_rounds_opened_by_removed_blocks() {
        let harness = Harness::new();
        let processor = harness.processor().await;
        for block in branch(&harness.genesis, 3, 8) {
            processor.process_block(block).await;
        }
        assert!(harness.store.get_round(2).await.unwrap().is_some());

        processor.remove_blocks(2).await.unwrap();

        assert_eq!(harness.store.height(), 2);
        assert!(harness.store.get_round(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_blocks_after_fast_rebuild_rebuilds_wallets() {
        let harness = Harness::new();
        let processor = harness.processor().await;
        let block = next_block(&harness.genesis, vec![transfer("alice", "bob", 100, 10, 2)]);
        processor.process_block(block).await;
        processor.state().lock().fast_rebuild = true;

        processor.remove_blocks(1).await.unwrap();

        assert_eq!(harness.balance("alice"), FUNDING);
        assert!(!processor.state().lock().fast_rebuild);
    }
}
