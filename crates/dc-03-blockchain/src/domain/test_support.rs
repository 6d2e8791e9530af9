//! Shared fixtures for the blockchain tests.

use dc_01_wallets::{SharedWalletIndex, WalletIndex};
use dc_02_transaction_pool::{InMemoryPoolStorage, PoolConfig, SharedTransactionPool, TransactionPool};
use parking_lot::{Mutex, RwLock};
use shared_bus::InMemoryEventBus;
use shared_crypto::{address_from_public_key, Ed25519KeyPair};
use shared_types::{
    Block, BlockBuilder, MockTimeSource, NetworkConfig, Transaction, TransactionBuilder,
    DEFAULT_NETWORK_VERSION,
};
use std::sync::Arc;

use super::{BlockProcessor, BlockchainConfig, BlockchainPorts, BlockchainState, BlockchainStateMachine};
use crate::adapters::{InMemoryBlockStore, InMemoryNetwork};
use crate::ports::BlockStore;

pub const GENESIS: &str = "genesis";
pub const FUNDING: u64 = 1_000;

pub fn keys(name: &str) -> Ed25519KeyPair {
    Ed25519KeyPair::from_passphrase(name)
}

pub fn address_of(name: &str) -> String {
    address_from_public_key(&keys(name).public_key().to_hex(), DEFAULT_NETWORK_VERSION).unwrap()
}

pub fn transfer(from: &str, to: &str, amount: u64, fee: u64, nonce: u32) -> Transaction {
    TransactionBuilder::transfer(address_of(to), amount)
        .fee(fee)
        .timestamp(nonce)
        .sign(&keys(from))
        .build()
        .unwrap()
}

/// Genesis funding alice and bob.
pub fn genesis_block() -> Block {
    BlockBuilder::new(1, None)
        .transactions(vec![
            transfer(GENESIS, "alice", FUNDING, 0, 0),
            transfer(GENESIS, "bob", FUNDING, 0, 1),
        ])
        .sign(&keys(GENESIS))
        .unwrap()
}

/// Block forged by the genesis wallet on top of `parent`.
pub fn next_block(parent: &Block, transactions: Vec<Transaction>) -> Block {
    BlockBuilder::on_top_of(&parent.data)
        .timestamp(parent.data.timestamp + 8)
        .transactions(transactions)
        .sign(&keys(GENESIS))
        .unwrap()
}

/// `length` empty blocks on top of `parent`, `spacing` seconds apart.
/// Branches with different spacing have different ids.
pub fn branch(parent: &Block, length: usize, spacing: u32) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::with_capacity(length);
    for _ in 0..length {
        let tip = blocks.last().unwrap_or(parent);
        let block = BlockBuilder::on_top_of(&tip.data)
            .timestamp(tip.data.timestamp + spacing)
            .sign(&keys(GENESIS))
            .unwrap();
        blocks.push(block);
    }
    blocks
}

pub struct Harness {
    pub genesis: Block,
    pub network_config: NetworkConfig,
    pub chain: SharedWalletIndex,
    pub pool: SharedTransactionPool,
    pub store: Arc<InMemoryBlockStore>,
    pub network: Arc<InMemoryNetwork>,
    pub bus: Arc<InMemoryEventBus>,
    pub clock: Arc<MockTimeSource>,
}

impl Harness {
    pub fn new() -> Self {
        let genesis = genesis_block();
        let network_config = NetworkConfig {
            nethash: genesis.data.payload_hash.clone(),
            ..NetworkConfig::for_testing()
        };
        let chain: SharedWalletIndex = Arc::new(RwLock::new(WalletIndex::default()));
        let clock = Arc::new(MockTimeSource::new(0));
        let bus = Arc::new(InMemoryEventBus::new());
        let pool = Arc::new(Mutex::new(TransactionPool::new(
            PoolConfig::for_testing(),
            Box::new(InMemoryPoolStorage::new()),
            Arc::clone(&chain),
            clock.clone(),
            bus.clone(),
        )));
        let store = Arc::new(InMemoryBlockStore::new(
            Arc::clone(&chain),
            network_config.active_delegates,
        ));
        let network = Arc::new(InMemoryNetwork::default());
        network.push_block(genesis.clone());

        Self {
            genesis,
            network_config,
            chain,
            pool,
            store,
            network,
            bus,
            clock,
        }
    }

    pub fn ports(&self) -> BlockchainPorts {
        BlockchainPorts {
            store: self.store.clone(),
            network: self.network.clone(),
            chain: Arc::clone(&self.chain),
            pool: Arc::clone(&self.pool),
            events: self.bus.clone(),
        }
    }

    pub fn machine(&self, config: BlockchainConfig) -> BlockchainStateMachine {
        BlockchainStateMachine::new(
            config,
            self.network_config.clone(),
            self.genesis.clone(),
            self.ports(),
        )
        .with_time_source(self.clock.clone())
    }

    /// Processor whose chain and store already hold the genesis block.
    pub async fn processor(&self) -> BlockProcessor {
        self.store.save_block(&self.genesis).await.unwrap();
        self.chain.write().apply_block(&self.genesis).unwrap();
        let mut state = BlockchainState::new(false);
        state.last_block = Some(self.genesis.data.clone());
        state.last_downloaded_block = Some(self.genesis.data.clone());
        state.fast_rebuild = false;

        BlockProcessor::new(
            self.store.clone(),
            Arc::clone(&self.chain),
            Arc::clone(&self.pool),
            self.bus.clone(),
            Arc::new(Mutex::new(state)),
            self.network_config.active_delegates,
        )
    }

    pub fn balance(&self, name: &str) -> u64 {
        self.chain
            .read()
            .get_by_address(&address_of(name))
            .and_then(|w| w.balance.to_u64())
            .unwrap_or_default()
    }
}
