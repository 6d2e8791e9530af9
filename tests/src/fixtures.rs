//! Shared fixtures: deterministic keys and a single node assembled from the
//! subsystem crates without the state machine.

use std::sync::Arc;

use dc_01_wallets::{SharedWalletIndex, WalletIndex};
use dc_02_transaction_pool::{
    PersistentPoolStorage, PoolConfig, SharedTransactionPool, TransactionPool,
};
use dc_03_blockchain::{BlockProcessor, BlockStore, BlockchainState, InMemoryBlockStore};
use parking_lot::{Mutex, RwLock};
use shared_bus::InMemoryEventBus;
use shared_crypto::{address_from_public_key, Ed25519KeyPair};
use shared_types::{
    Block, BlockBuilder, MockTimeSource, NetworkConfig, Transaction, TransactionBuilder,
    DEFAULT_NETWORK_VERSION,
};

/// Passphrase of the wallet that signs every fixture block.
pub const GENESIS: &str = "genesis";

pub fn keys(name: &str) -> Ed25519KeyPair {
    Ed25519KeyPair::from_passphrase(name)
}

pub fn public_key_of(name: &str) -> String {
    keys(name).public_key().to_hex()
}

pub fn address_of(name: &str) -> String {
    address_from_public_key(&public_key_of(name), DEFAULT_NETWORK_VERSION)
        .expect("fixture public keys are valid")
}

/// Signed transfer; `nonce` lands in the timestamp so equal transfers differ.
pub fn transfer(from: &str, to: &str, amount: u64, fee: u64, nonce: u32) -> Transaction {
    TransactionBuilder::transfer(address_of(to), amount)
        .fee(fee)
        .timestamp(nonce)
        .sign(&keys(from))
        .build()
        .expect("fixture transfer encodes")
}

/// Genesis block paying each `(name, amount)` from the genesis wallet.
pub fn genesis_block(funded: &[(&str, u64)]) -> Block {
    let transactions = funded
        .iter()
        .zip(0u32..)
        .map(|((name, amount), nonce)| transfer(GENESIS, name, *amount, 0, nonce))
        .collect();
    BlockBuilder::new(1, None)
        .transactions(transactions)
        .sign(&keys(GENESIS))
        .expect("fixture genesis encodes")
}

/// A node whose chain, store and pool already hold the genesis block.
pub struct Node {
    pub genesis: Block,
    pub network: NetworkConfig,
    pub chain: SharedWalletIndex,
    pub pool: SharedTransactionPool,
    pub store: Arc<InMemoryBlockStore>,
    pub bus: Arc<InMemoryEventBus>,
    pub clock: Arc<MockTimeSource>,
    pub processor: BlockProcessor,
}

impl Node {
    pub async fn start(
        funded: &[(&str, u64)],
        pool_config: PoolConfig,
        storage: Box<dyn PersistentPoolStorage>,
    ) -> Self {
        let genesis = genesis_block(funded);
        let network = NetworkConfig {
            nethash: genesis.data.payload_hash.clone(),
            ..NetworkConfig::for_testing()
        };
        let chain: SharedWalletIndex = Arc::new(RwLock::new(WalletIndex::default()));
        let clock = Arc::new(MockTimeSource::new(0));
        let bus = Arc::new(InMemoryEventBus::new());
        let store = Arc::new(InMemoryBlockStore::new(
            Arc::clone(&chain),
            network.active_delegates,
        ));
        store.save_block(&genesis).await.expect("genesis saved");
        chain.write().apply_block(&genesis).expect("genesis applies");

        let mut pool = TransactionPool::new(
            pool_config,
            storage,
            Arc::clone(&chain),
            clock.clone(),
            bus.clone(),
        );
        pool.make(&*store).await.expect("pool restored");
        pool.build_wallets();
        let pool = Arc::new(Mutex::new(pool));

        let mut state = BlockchainState::new(false);
        state.last_block = Some(genesis.data.clone());
        state.last_downloaded_block = Some(genesis.data.clone());
        state.fast_rebuild = false;
        let processor = BlockProcessor::new(
            store.clone(),
            Arc::clone(&chain),
            Arc::clone(&pool),
            bus.clone(),
            Arc::new(Mutex::new(state)),
            network.active_delegates,
        );

        Self {
            genesis,
            network,
            chain,
            pool,
            store,
            bus,
            clock,
            processor,
        }
    }

    /// Confirmed balance of `name`'s wallet, zero when unknown.
    pub fn balance(&self, name: &str) -> u64 {
        self.chain
            .read()
            .get_by_address(&address_of(name))
            .and_then(|w| w.balance.to_u64())
            .unwrap_or_default()
    }

    /// Block on top of the applied tip, forged by the genesis wallet.
    pub fn next_block(&self, transactions: Vec<Transaction>) -> Block {
        let tip = self
            .processor
            .state()
            .lock()
            .last_block
            .clone()
            .unwrap_or_else(|| self.genesis.data.clone());
        BlockBuilder::on_top_of(&tip)
            .timestamp(tip.timestamp + self.network.blocktime)
            .transactions(transactions)
            .sign(&keys(GENESIS))
            .expect("fixture block encodes")
    }

    /// Block carrying whatever the pool offers for forging.
    pub fn forge_from_pool(&self) -> Block {
        let offered = self
            .pool
            .lock()
            .get_transactions_for_forging(self.network.max_transactions_per_block);
        let transactions = offered
            .iter()
            .map(|serialized| {
                let bytes = hex::decode(serialized).expect("pool serializes hex");
                Transaction::from_bytes(&bytes).expect("pool serializes transactions")
            })
            .collect();
        self.next_block(transactions)
    }
}
