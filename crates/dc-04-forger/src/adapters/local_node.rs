//! In-process node: answers the forger from the local state machine, block
//! store and pool.

use async_trait::async_trait;
use dc_01_wallets::round_of_height;
use dc_02_transaction_pool::SharedTransactionPool;
use dc_03_blockchain::{BlockStore, BlockchainApi, ChainState};
use shared_types::{Block, NetworkConfig, TimeSource};
use std::sync::Arc;

use crate::domain::{ForgingTransactions, RoundInfo};
use crate::error::{ForgerError, Result};
use crate::ports::ForgerClient;

pub struct LocalNode {
    blockchain: Arc<dyn BlockchainApi>,
    store: Arc<dyn BlockStore>,
    pool: SharedTransactionPool,
    network: NetworkConfig,
    time: Arc<dyn TimeSource>,
}

impl LocalNode {
    pub fn new(
        blockchain: Arc<dyn BlockchainApi>,
        store: Arc<dyn BlockStore>,
        pool: SharedTransactionPool,
        network: NetworkConfig,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            blockchain,
            store,
            pool,
            network,
            time,
        }
    }
}

#[async_trait]
impl ForgerClient for LocalNode {
    async fn get_round(&self) -> Result<RoundInfo> {
        let last_block = self.blockchain.last_block().ok_or(ForgerError::NoLastBlock)?;
        let slots = self.network.slots();
        let now = slots.epoch_time(self.time.now());
        let slot = slots.slot_number(now);
        let timestamp = slots.slot_time(slot);

        let height = last_block.height + 1;
        let round = round_of_height(height, u64::from(self.network.active_delegates));
        let schedule = self
            .store
            .get_round(round)
            .await
            .map_err(|e| ForgerError::Node(e.to_string()))?
            .ok_or(ForgerError::NoRound { round })?;

        let can_forge =
            self.blockchain.state() == ChainState::Idle && last_block.timestamp < timestamp;

        Ok(RoundInfo {
            round,
            height,
            slot,
            timestamp,
            reward: self.network.reward.clone(),
            delegate: schedule.forger_for_slot(u64::from(slot)).cloned(),
            last_block,
            can_forge,
        })
    }

    async fn get_transactions(&self) -> Result<ForgingTransactions> {
        let mut pool = self.pool.lock();
        Ok(ForgingTransactions {
            transactions: pool.get_transactions_for_forging(self.network.max_transactions_per_block),
            pool_size: pool.get_pool_size(),
        })
    }

    async fn broadcast(&self, block: Block) -> Result<()> {
        let id = block.id().to_string();
        if self.blockchain.queue_block(block) {
            Ok(())
        } else {
            Err(ForgerError::BroadcastRefused { id })
        }
    }
}
