//! # Subsystem Container
//!
//! Holds all subsystem instances and wires them together.
//!
//! ## Initialization Order
//!
//! ```text
//! genesis block (nethash adopted when unset)
//!   → wallet index → block store
//!   → pool (loaded from its storage, forged transactions dropped)
//!   → blockchain state machine → forger
//! ```
//!
//! ## Thread Safety
//!
//! - The wallet index is shared behind `RwLock`, the pool behind `Mutex`
//! - Subsystems publish to one in-memory event bus

use std::sync::Arc;

use dc_01_wallets::{SharedWalletIndex, WalletIndex};
use dc_02_transaction_pool::{
    FilePoolStorage, InMemoryPoolStorage, PersistentPoolStorage, PoolError,
    SharedTransactionPool, TransactionPool,
};
use dc_03_blockchain::{
    BlockchainApi, BlockchainPorts, BlockchainStateMachine, InMemoryBlockStore, InMemoryNetwork,
};
use dc_04_forger::{ForgerError, ForgerManager, LocalNode};
use parking_lot::{Mutex, RwLock};
use shared_bus::InMemoryEventBus;
use shared_types::{Block, SystemTimeSource, TimeSource};
use thiserror::Error;
use tracing::{info, warn};

use crate::container::config::NodeConfig;
use crate::genesis::{GenesisBuilder, GenesisError};

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error(transparent)]
    Genesis(#[from] GenesisError),

    #[error("transaction pool: {0}")]
    Pool(#[from] PoolError),

    #[error("forger: {0}")]
    Forger(#[from] ForgerError),
}

/// Central container holding all subsystem instances.
pub struct SubsystemContainer {
    pub config: NodeConfig,
    pub genesis: Block,

    /// Wallets (Subsystem 1)
    pub wallets: SharedWalletIndex,

    /// Transaction pool (Subsystem 2)
    pub pool: SharedTransactionPool,

    /// Block storage backing the blockchain (Subsystem 3)
    pub store: Arc<InMemoryBlockStore>,

    /// Peer view used for synchronisation
    pub network: Arc<InMemoryNetwork>,

    pub event_bus: Arc<InMemoryEventBus>,
    pub time: Arc<dyn TimeSource>,
}

impl SubsystemContainer {
    pub async fn new(config: NodeConfig) -> Result<Self, ContainerError> {
        Self::with_time_source(config, Arc::new(SystemTimeSource)).await
    }

    pub async fn with_time_source(
        mut config: NodeConfig,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, ContainerError> {
        let genesis =
            GenesisBuilder::new(config.genesis.clone(), config.network.network_version).build()?;
        if config.network.nethash.is_empty() {
            config.network.nethash = genesis.data.payload_hash.clone();
            info!(nethash = %config.network.nethash, "Adopted nethash from the genesis block");
        }

        let wallets: SharedWalletIndex = Arc::new(RwLock::new(WalletIndex::default()));
        let event_bus = Arc::new(InMemoryEventBus::new());
        let store = Arc::new(InMemoryBlockStore::new(
            Arc::clone(&wallets),
            config.network.active_delegates,
        ));

        let storage: Box<dyn PersistentPoolStorage> = match &config.storage.pool_dir {
            Some(dir) => {
                info!(dir = %dir.display(), "[dc-02] Using file pool storage");
                Box::new(FilePoolStorage::open(dir)?)
            }
            None => Box::new(InMemoryPoolStorage::new()),
        };
        let mut pool = TransactionPool::new(
            config.pool.clone(),
            storage,
            Arc::clone(&wallets),
            Arc::clone(&time),
            event_bus.clone(),
        );
        pool.make(&*store).await?;

        Ok(Self {
            config,
            genesis,
            wallets,
            pool: Arc::new(Mutex::new(pool)),
            store,
            network: Arc::new(InMemoryNetwork::default()),
            event_bus,
            time,
        })
    }

    pub fn blockchain(&self) -> BlockchainStateMachine {
        let ports = BlockchainPorts {
            store: self.store.clone(),
            network: self.network.clone(),
            chain: Arc::clone(&self.wallets),
            pool: Arc::clone(&self.pool),
            events: self.event_bus.clone(),
        };
        BlockchainStateMachine::new(
            self.config.blockchain.clone(),
            self.config.network.clone(),
            self.genesis.clone(),
            ports,
        )
        .with_time_source(Arc::clone(&self.time))
    }

    /// The forger, if this node holds delegate secrets.
    pub fn forger(
        &self,
        blockchain: Arc<dyn BlockchainApi>,
    ) -> Result<Option<Arc<ForgerManager>>, ContainerError> {
        if self.config.forger.secrets.is_empty() {
            warn!("[dc-04] No delegate secrets configured, forging disabled");
            return Ok(None);
        }

        let client = Arc::new(LocalNode::new(
            blockchain,
            self.store.clone(),
            Arc::clone(&self.pool),
            self.config.network.clone(),
            Arc::clone(&self.time),
        ));
        let forger = ForgerManager::new(
            self.config.forger.clone(),
            self.config.network.network_version,
            client,
            self.event_bus.clone(),
        )?;
        Ok(Some(Arc::new(forger)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::GenesisConfig;
    use shared_types::{BigAmount, DEFAULT_NETWORK_VERSION};

    // =========================================================================
    // Wiring
    // =========================================================================

    #[tokio::test]
    async fn test_unset_nethash_adopts_genesis_payload_hash() {
        let container = SubsystemContainer::new(NodeConfig::default()).await.unwrap();
        assert_eq!(container.config.network.nethash, container.genesis.data.payload_hash);
    }

    #[tokio::test]
    async fn test_configured_nethash_is_kept() {
        let mut config = NodeConfig::default();
        config.network.nethash = "elsewhere".into();
        let container = SubsystemContainer::new(config).await.unwrap();
        assert_eq!(container.config.network.nethash, "elsewhere");
    }

    #[tokio::test]
    async fn test_forger_needs_secrets() {
        let container = SubsystemContainer::new(NodeConfig::default()).await.unwrap();
        let machine = container.blockchain();
        assert!(container.forger(Arc::new(machine.handle())).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_forger_loads_configured_delegates() {
        let mut config = NodeConfig::default();
        config.genesis =
            GenesisConfig::devnet(2, BigAmount::from(10u64), DEFAULT_NETWORK_VERSION).unwrap();
        config.forger.secrets = config.genesis.delegate_secrets();

        let container = SubsystemContainer::new(config).await.unwrap();
        let machine = container.blockchain();
        let forger = container.forger(Arc::new(machine.handle())).unwrap().unwrap();
        assert_eq!(forger.delegates().len(), 2);
    }

    #[tokio::test]
    async fn test_file_pool_storage_is_opened() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = NodeConfig::default();
        config.storage.pool_dir = Some(dir.path().join("pool"));

        SubsystemContainer::new(config).await.unwrap();
        assert!(dir.path().join("pool").is_dir());
    }
}
