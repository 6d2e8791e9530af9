//! # Forger Manager
//!
//! One monitor iteration:
//!
//! ```text
//! get_round ──→ !can_forge ─────────────→ wait can_forge_poll
//!     │
//!     ├──→ slot owned elsewhere ────────→ wait no_delegate_delay
//!     │
//!     └──→ forging.started ─→ pool ─→ sign ─→ block.forged
//!                                               transaction.forged × n
//!                                               broadcast ─→ wait after_forge_delay
//!
//! any error ─→ forging.failed ─→ wait error_backoff
//! ```

use dc_telemetry::metrics::{BLOCKS_FORGED, FORGING_FAILURES};
use shared_bus::{EventPublisher, LedgerEvent};
use shared_types::{Block, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::delegate::{load_delegates, Delegate};
use super::round::RoundInfo;
use crate::config::ForgerConfig;
use crate::error::{ForgerError, Result};
use crate::ports::ForgerClient;

/// Outcome of one monitor iteration.
#[derive(Debug)]
pub enum Tick {
    /// The slot already has a block or the node is busy.
    NotReady,
    /// No local delegate owns the slot.
    NotScheduled,
    Forged(Box<Block>),
}

pub struct ForgerManager {
    config: ForgerConfig,
    delegates: Vec<Delegate>,
    client: Arc<dyn ForgerClient>,
    events: Arc<dyn EventPublisher>,
}

impl ForgerManager {
    pub fn new(
        config: ForgerConfig,
        network_version: u8,
        client: Arc<dyn ForgerClient>,
        events: Arc<dyn EventPublisher>,
    ) -> Result<Self> {
        let delegates = load_delegates(&config.secrets, network_version)?;
        info!(delegates = delegates.len(), "[dc-04] Forger delegates loaded");
        Ok(Self {
            config,
            delegates,
            client,
            events,
        })
    }

    pub fn delegates(&self) -> &[Delegate] {
        &self.delegates
    }

    fn pick_forging_delegate(&self, round: &RoundInfo) -> Option<&Delegate> {
        let scheduled = round.delegate.as_ref()?;
        self.delegates
            .iter()
            .find(|d| d.public_key() == scheduled.public_key)
    }

    /// Run one iteration of the monitor.
    pub async fn monitor_once(&self) -> Result<Tick> {
        let round = self.client.get_round().await?;
        if !round.can_forge {
            return Ok(Tick::NotReady);
        }

        let Some(delegate) = self.pick_forging_delegate(&round) else {
            debug!(
                slot = round.slot,
                scheduled = ?round.delegate.as_ref().map(|d| &d.public_key),
                "[dc-04] Slot delegate not configured on this node"
            );
            return Ok(Tick::NotScheduled);
        };

        self.events.publish(LedgerEvent::ForgingStarted {
            generator_public_key: delegate.public_key().to_string(),
        });

        let offered = self.client.get_transactions().await?;
        let transactions = offered
            .transactions
            .iter()
            .map(|serialized| decode_transaction(serialized))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            received = transactions.len(),
            pool_size = offered.pool_size,
            "[dc-04] Received transactions from the pool"
        );

        let block = delegate.forge(transactions, &round)?;
        info!(
            height = block.height(),
            id = %block.id(),
            txs = block.transactions.len(),
            generator = %delegate.public_key(),
            "[dc-04] Block forged"
        );
        BLOCKS_FORGED.inc();
        self.events.publish(LedgerEvent::BlockForged(block.data.clone()));
        for tx in &block.transactions {
            self.events
                .publish(LedgerEvent::TransactionForged(tx.data.clone()));
        }

        self.client.broadcast(block.clone()).await?;
        Ok(Tick::Forged(Box::new(block)))
    }

    /// Wait before the next iteration.
    pub fn delay_after(&self, outcome: &Result<Tick>) -> Duration {
        match outcome {
            Ok(Tick::NotReady) => self.config.can_forge_poll(),
            Ok(Tick::NotScheduled) => self.config.no_delegate_delay(),
            Ok(Tick::Forged(_)) => self.config.after_forge_delay(),
            Err(_) => self.config.error_backoff(),
        }
    }

    /// Monitor until `shutdown` turns true or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("[dc-04] Forger started");
        while !*shutdown.borrow() {
            let outcome = self.monitor_once().await;
            if let Err(e) = &outcome {
                debug!(error = %e, "[dc-04] Not able to forge");
                FORGING_FAILURES.inc();
                self.events.publish(LedgerEvent::ForgingFailed {
                    error: e.to_string(),
                });
            }

            let delay = self.delay_after(&outcome);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("[dc-04] Forger stopped");
    }

    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}

fn decode_transaction(serialized: &str) -> Result<Transaction> {
    let bytes = hex::decode(serialized).map_err(|e| {
        warn!(error = %e, "[dc-04] Pool returned malformed hex");
        ForgerError::InvalidTransaction(e.to_string())
    })?;
    Ok(Transaction::from_bytes(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ForgingTransactions;
    use async_trait::async_trait;
    use dc_01_wallets::DelegateEntry;
    use parking_lot::Mutex;
    use shared_bus::{EventFilter, InMemoryEventBus};
    use shared_crypto::Ed25519KeyPair;
    use shared_types::{BigAmount, BlockBuilder, TransactionBuilder, DEFAULT_NETWORK_VERSION};

    fn public_key(name: &str) -> String {
        Ed25519KeyPair::from_passphrase(name).public_key().to_hex()
    }

    struct ScriptedNode {
        round: Mutex<Option<RoundInfo>>,
        transactions: Vec<String>,
        broadcast: Mutex<Vec<Block>>,
    }

    impl ScriptedNode {
        fn scheduled(delegate: &str, can_forge: bool) -> Self {
            let genesis = BlockBuilder::new(1, None)
                .sign(&Ed25519KeyPair::from_passphrase("genesis"))
                .unwrap();
            let round = RoundInfo {
                round: 1,
                height: 2,
                slot: 1,
                timestamp: 8,
                reward: BigAmount::from(2u64),
                last_block: genesis.data,
                delegate: Some(DelegateEntry {
                    public_key: public_key(delegate),
                    username: delegate.to_string(),
                    vote_balance: BigAmount::zero(),
                }),
                can_forge,
            };
            Self {
                round: Mutex::new(Some(round)),
                transactions: Vec::new(),
                broadcast: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ForgerClient for ScriptedNode {
        async fn get_round(&self) -> Result<RoundInfo> {
            self.round.lock().clone().ok_or(ForgerError::NoLastBlock)
        }

        async fn get_transactions(&self) -> Result<ForgingTransactions> {
            Ok(ForgingTransactions {
                transactions: self.transactions.clone(),
                pool_size: self.transactions.len(),
            })
        }

        async fn broadcast(&self, block: Block) -> Result<()> {
            self.broadcast.lock().push(block);
            Ok(())
        }
    }

    fn manager(node: Arc<ScriptedNode>, bus: Arc<InMemoryEventBus>) -> ForgerManager {
        ForgerManager::new(
            ForgerConfig::with_secrets(["forger"]),
            DEFAULT_NETWORK_VERSION,
            node,
            bus,
        )
        .unwrap()
    }

    // =========================================================================
    // Single iterations
    // =========================================================================

    #[tokio::test]
    async fn test_not_ready_when_slot_cannot_be_forged() {
        let node = Arc::new(ScriptedNode::scheduled("forger", false));
        let forger = manager(node.clone(), Arc::new(InMemoryEventBus::new()));

        let outcome = forger.monitor_once().await;
        assert!(matches!(outcome, Ok(Tick::NotReady)));
        assert_eq!(forger.delay_after(&outcome), Duration::from_millis(100));
        assert!(node.broadcast.lock().is_empty());
    }

    #[tokio::test]
    async fn test_not_scheduled_when_slot_belongs_to_another_delegate() {
        let node = Arc::new(ScriptedNode::scheduled("someone-else", true));
        let forger = manager(node.clone(), Arc::new(InMemoryEventBus::new()));

        let outcome = forger.monitor_once().await;
        assert!(matches!(outcome, Ok(Tick::NotScheduled)));
        assert_eq!(forger.delay_after(&outcome), Duration::from_millis(7_900));
    }

    #[tokio::test]
    async fn test_forges_broadcasts_and_emits_events() {
        let tx = TransactionBuilder::transfer("recipient", 10u64)
            .fee(1u64)
            .sign(&Ed25519KeyPair::from_passphrase("alice"))
            .build()
            .unwrap();
        let mut node = ScriptedNode::scheduled("forger", true);
        node.transactions = vec![tx.to_hex()];
        let node = Arc::new(node);
        let bus = Arc::new(InMemoryEventBus::new());
        let mut events = bus.subscribe(EventFilter::all());
        let forger = manager(node.clone(), bus);

        let outcome = forger.monitor_once().await;
        let Ok(Tick::Forged(block)) = &outcome else {
            panic!("expected a forged block, got {outcome:?}");
        };
        assert_eq!(block.height(), 2);
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(node.broadcast.lock()[0].id(), block.id());
        assert_eq!(forger.delay_after(&outcome), Duration::from_millis(7_800));

        let mut names = Vec::new();
        while let Ok(Some(event)) = events.try_recv() {
            names.push(event.name());
        }
        assert_eq!(names, vec!["forging.started", "block.forged", "transaction.forged"]);
    }

    #[tokio::test]
    async fn test_malformed_pool_entry_fails_the_iteration() {
        let mut node = ScriptedNode::scheduled("forger", true);
        node.transactions = vec!["zz".to_string()];
        let node = Arc::new(node);
        let forger = manager(node.clone(), Arc::new(InMemoryEventBus::new()));

        let outcome = forger.monitor_once().await;
        assert!(matches!(outcome, Err(ForgerError::InvalidTransaction(_))));
        assert_eq!(forger.delay_after(&outcome), Duration::from_secs(2));
        assert!(node.broadcast.lock().is_empty());
    }

    #[test]
    fn test_manager_requires_a_delegate() {
        let node = Arc::new(ScriptedNode::scheduled("forger", true));
        let result = ForgerManager::new(
            ForgerConfig::default(),
            DEFAULT_NETWORK_VERSION,
            node,
            Arc::new(InMemoryEventBus::new()),
        );
        assert!(matches!(result, Err(ForgerError::NoDelegate)));
    }

    // =========================================================================
    // Loop
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_loop_reports_failures_and_stops_on_shutdown() {
        let node = Arc::new(ScriptedNode::scheduled("forger", true));
        *node.round.lock() = None;
        let bus = Arc::new(InMemoryEventBus::new());
        let mut failures = bus.subscribe(EventFilter::names(vec!["forging.failed"]));
        let forger = Arc::new(manager(node, bus));
        let (stop, shutdown) = watch::channel(false);

        let task = forger.spawn(shutdown);
        tokio::time::sleep(Duration::from_millis(4_500)).await;
        stop.send(true).unwrap();
        task.await.unwrap();

        let mut count = 0;
        while let Ok(Some(_)) = failures.try_recv() {
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_forges_once_per_slot_window() {
        let node = Arc::new(ScriptedNode::scheduled("forger", true));
        let forger = Arc::new(manager(node.clone(), Arc::new(InMemoryEventBus::new())));
        let (stop, shutdown) = watch::channel(false);

        let task = forger.spawn(shutdown);
        tokio::time::sleep(Duration::from_millis(7_000)).await;
        stop.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(node.broadcast.lock().len(), 1);
    }
}
