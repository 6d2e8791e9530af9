//! # Blockchain State Machine
//!
//! Owns the current [`ChainState`] and runs the entry actions of every state
//! it enters. Events are processed one at a time: an action runs to
//! completion, and the events it produces are handled before anything
//! arriving from outside (queue workers, timers, the API).
//!
//! ## Startup
//!
//! | Condition at `init`                          | Next           |
//! |----------------------------------------------|----------------|
//! | genesis payload hash != nethash              | `exit`         |
//! | gap > 10 rounds and `fast_rebuild` enabled   | `rebuild`      |
//! | otherwise (wallets built from storage)       | `syncWithNetwork` |

use dc_01_wallets::{round_of_height, SharedWalletIndex};
use dc_02_transaction_pool::SharedTransactionPool;
use dc_telemetry::metrics::{CHAIN_HEIGHT, FORK_RECOVERIES};
use parking_lot::{Mutex, RwLock};
use shared_bus::{EventPublisher, LedgerEvent};
use shared_types::{Block, BlockData, NetworkConfig, SystemTimeSource, TimeSource};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::BlockchainConfig;
use super::errors::{BlockchainError, Result, EXIT_FAILURE_CODE};
use super::processor::BlockProcessor;
use super::queue::{BlockQueue, QueueKind};
use super::state::{entry_actions, transition, Action, BlockchainEvent, BlockchainState, ChainState};
use crate::ports::{BlockStore, BlockchainApi, NetworkInterface};

/// Collaborators of the state machine.
#[derive(Clone)]
pub struct BlockchainPorts {
    pub store: Arc<dyn BlockStore>,
    pub network: Arc<dyn NetworkInterface>,
    pub chain: SharedWalletIndex,
    pub pool: SharedTransactionPool,
    pub events: Arc<dyn EventPublisher>,
}

pub struct BlockchainStateMachine {
    config: BlockchainConfig,
    network_config: NetworkConfig,
    genesis: Block,
    ports: BlockchainPorts,
    time: Arc<dyn TimeSource>,
    current: Arc<RwLock<ChainState>>,
    state: Arc<Mutex<BlockchainState>>,
    processor: Arc<BlockProcessor>,
    process_queue: Arc<BlockQueue>,
    rebuild_queue: Arc<BlockQueue>,
    events_tx: mpsc::UnboundedSender<BlockchainEvent>,
    events_rx: mpsc::UnboundedReceiver<BlockchainEvent>,
    workers: Vec<JoinHandle<()>>,
    wake_timer: Option<JoinHandle<()>>,
}

impl BlockchainStateMachine {
    pub fn new(
        config: BlockchainConfig,
        network_config: NetworkConfig,
        genesis: Block,
        ports: BlockchainPorts,
    ) -> Self {
        let state = Arc::new(Mutex::new(BlockchainState::new(config.network_start)));
        let processor = Arc::new(BlockProcessor::new(
            Arc::clone(&ports.store),
            Arc::clone(&ports.chain),
            Arc::clone(&ports.pool),
            Arc::clone(&ports.events),
            Arc::clone(&state),
            network_config.active_delegates,
        ));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            config,
            network_config,
            genesis,
            ports,
            time: Arc::new(SystemTimeSource),
            current: Arc::new(RwLock::new(ChainState::Uninitialised)),
            state,
            processor,
            process_queue: Arc::new(BlockQueue::new(QueueKind::Process)),
            rebuild_queue: Arc::new(BlockQueue::new(QueueKind::Rebuild)),
            events_tx,
            events_rx,
            workers: Vec::new(),
            wake_timer: None,
        }
    }

    /// Set custom time source (for testing)
    pub fn with_time_source(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.time = time;
        self
    }

    pub fn handle(&self) -> BlockchainHandle {
        BlockchainHandle {
            current: Arc::clone(&self.current),
            state: Arc::clone(&self.state),
            events: self.events_tx.clone(),
            process_queue: Arc::clone(&self.process_queue),
        }
    }

    pub fn state(&self) -> ChainState {
        *self.current.read()
    }

    /// Snapshot of the machine's flags.
    pub fn context(&self) -> BlockchainState {
        self.state.lock().clone()
    }

    /// Run until `exit` or `stopped`.
    pub async fn run(&mut self) -> ChainState {
        self.run_until(ChainState::is_terminal).await
    }

    /// Run until `done` holds after an event has been handled, or the
    /// machine reaches a terminal state.
    pub async fn run_until(&mut self, done: impl Fn(&ChainState) -> bool) -> ChainState {
        self.start_workers();
        if self.state() == ChainState::Uninitialised {
            let _ = self.events_tx.send(BlockchainEvent::Start);
        }

        while let Some(event) = self.events_rx.recv().await {
            self.handle_event(event).await;
            let state = self.state();
            if state.is_terminal() {
                self.shutdown();
                return state;
            }
            if done(&state) {
                return state;
            }
        }
        self.state()
    }

    /// Process exit status for a terminal state.
    pub fn exit_code(state: ChainState) -> i32 {
        match state {
            ChainState::Exit => EXIT_FAILURE_CODE,
            _ => 0,
        }
    }

    fn start_workers(&mut self) {
        for queue in [&self.process_queue, &self.rebuild_queue] {
            if let Some(worker) = queue.spawn(Arc::clone(&self.processor), self.events_tx.clone()) {
                self.workers.push(worker);
            }
        }
    }

    fn shutdown(&mut self) {
        if let Some(timer) = self.wake_timer.take() {
            timer.abort();
        }
        for worker in self.workers.drain(..) {
            worker.abort();
        }
    }

    /// Handle `event` and every event produced by the entry actions it
    /// triggers.
    pub async fn handle_event(&mut self, event: BlockchainEvent) {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            let from = self.state();
            let Some(to) = transition(from, event) else {
                debug!(state = %from, %event, "[dc-03] Event ignored");
                continue;
            };
            info!(%from, %to, %event, "[dc-03] State transition");
            *self.current.write() = to;
            self.ports.events.publish(LedgerEvent::StateChanged {
                state: to.to_string(),
            });

            for action in entry_actions(to) {
                if let Some(next) = self.run_action(*action).await {
                    pending.push_back(next);
                }
            }
        }
    }

    async fn run_action(&mut self, action: Action) -> Option<BlockchainEvent> {
        match action {
            Action::Init => Some(self.init().await.unwrap_or_else(|e| {
                error!(error = %e, "[dc-03] Startup failed");
                BlockchainEvent::Failure
            })),
            Action::CheckLastDownloadedBlockSynced => Some(self.check_last_downloaded_block_synced().await),
            Action::RebuildBlocks => Some(self.download(QueueKind::Rebuild).await),
            Action::DownloadBlocks => Some(self.download(QueueKind::Process).await),
            Action::CheckRebuildQueue => self
                .rebuild_queue
                .is_idle()
                .then_some(BlockchainEvent::RebuildFinished),
            Action::CheckProcessQueue => self
                .process_queue
                .is_idle()
                .then_some(BlockchainEvent::ProcessFinished),
            Action::RebuildFinished => Some(match self.rebuild_finished().await {
                Ok(()) => BlockchainEvent::ProcessFinished,
                Err(e) => {
                    error!(error = %e, "[dc-03] Rebuild failed");
                    BlockchainEvent::Failure
                }
            }),
            Action::CheckRebuildBlockSynced => {
                let height = self.state.lock().last_height();
                let window = u64::from(self.network_config.active_delegates);
                Some(self.synced_event(height + window).await)
            }
            Action::CheckLastBlockSynced => {
                let height = self.state.lock().last_height();
                Some(self.synced_event(height).await)
            }
            Action::DownloadFinished => self.download_finished(),
            Action::DownloadPaused => {
                info!(queued = self.process_queue.len() + self.rebuild_queue.len(), "[dc-03] Blockchain download paused");
                None
            }
            Action::RebuildingComplete => {
                info!(height = self.state.lock().last_height(), "[dc-03] Blockchain rebuild completed");
                Some(BlockchainEvent::RebuildComplete)
            }
            Action::SyncingComplete => {
                info!(height = self.state.lock().last_height(), "[dc-03] Blockchain sync completed");
                Some(BlockchainEvent::SyncFinished)
            }
            Action::CheckLater => {
                self.check_later();
                None
            }
            Action::BlockchainReady => {
                let mut state = self.state.lock();
                if !state.started {
                    info!(height = state.last_height(), "[dc-03] Blockchain ready");
                }
                state.started = true;
                None
            }
            Action::StartForkRecovery => Some(self.start_fork_recovery().await),
            Action::ExitApp => {
                error!("[dc-03] Failed to start up blockchain, exiting");
                None
            }
        }
    }

    // =========================================================================
    // ACTIONS
    // =========================================================================

    async fn init(&mut self) -> Result<BlockchainEvent> {
        let store = Arc::clone(&self.ports.store);
        let block = match store.get_last_block().await? {
            Some(block) => block,
            None => {
                warn!("[dc-03] No block found in storage");
                let genesis = self.genesis.clone();
                if genesis.data.payload_hash != self.network_config.nethash {
                    let mismatch = BlockchainError::GenesisMismatch {
                        expected: self.network_config.nethash.clone(),
                        actual: genesis.data.payload_hash.clone(),
                    };
                    error!(error = %mismatch, "[dc-03] FATAL: genesis block does not match the network");
                    return Ok(BlockchainEvent::Failure);
                }
                store.save_block(&genesis).await?;
                genesis
            }
        };

        let height = block.height();
        let timestamp = block.data.timestamp;
        {
            let mut state = self.state.lock();
            state.last_block = Some(block.data.clone());
            state.last_downloaded_block = Some(block.data);
        }

        let slots = self.network_config.slots();
        let gap = u64::from(slots.epoch_time(self.time.now()).saturating_sub(timestamp));
        let round_secs = (u64::from(self.network_config.active_delegates) + 1)
            * u64::from(self.network_config.blocktime);
        let rebuild = gap > round_secs;
        let fast_rebuild = gap > 10 * round_secs && self.config.fast_rebuild;
        {
            let mut state = self.state.lock();
            state.rebuild = rebuild;
            state.fast_rebuild = fast_rebuild;
        }
        info!(fast_rebuild, rebuild, gap, "[dc-03] Fast rebuild decided");
        info!(height, "[dc-03] Last block in storage");
        CHAIN_HEIGHT.set(height as f64);

        if fast_rebuild {
            return Ok(BlockchainEvent::Rebuild);
        }

        store.build_wallets(height).await?;
        store.save_wallets(true).await?;
        if height == 1 {
            // A round saved by an earlier run is recomputed.
            let active = u64::from(self.network_config.active_delegates);
            store.delete_round(round_of_height(height, active)).await?;
        }
        self.processor.apply_round(height).await;
        self.ports.pool.lock().build_wallets();

        Ok(BlockchainEvent::Started)
    }

    /// Whether the network is no higher than `height`. An unreachable
    /// network counts as synced.
    async fn is_synced(&self, height: u64) -> bool {
        match self.ports.network.get_network_height().await {
            Ok(network_height) => height >= network_height,
            Err(e) => {
                warn!(error = %e, "[dc-03] Network height unavailable");
                true
            }
        }
    }

    async fn synced_event(&self, height: u64) -> BlockchainEvent {
        // An empty download only ends the sync once the queue has drained.
        let exhausted = self.state.lock().no_new_blocks && self.active_queue().is_idle();
        if exhausted || self.is_synced(height).await {
            BlockchainEvent::Synced
        } else {
            BlockchainEvent::NotSynced
        }
    }

    fn active_queue(&self) -> &BlockQueue {
        match self.state() {
            ChainState::Rebuild(_) => &self.rebuild_queue,
            _ => &self.process_queue,
        }
    }

    async fn check_last_downloaded_block_synced(&self) -> BlockchainEvent {
        let queued = self.active_queue().len();
        debug!(queued, "[dc-03] Blocks in queue");

        let mut event = BlockchainEvent::NotSynced;
        if queued > self.config.max_queue_depth {
            event = BlockchainEvent::Paused;
        }
        let (tip, network_start) = {
            let state = self.state.lock();
            (state.download_tip().map_or(0, |b| b.height), state.network_start)
        };
        if self.is_synced(tip).await || network_start {
            event = BlockchainEvent::Synced;
        }
        event
    }

    async fn download(&self, kind: QueueKind) -> BlockchainEvent {
        let Some(tip) = self.state.lock().download_tip().cloned() else {
            error!("[dc-03] No block to download from");
            return BlockchainEvent::Failure;
        };
        info!(height = tip.height, "[dc-03] Downloading blocks");

        let blocks = match self.ports.network.download_blocks(tip.height).await {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!(error = %e, "[dc-03] Block download failed");
                Vec::new()
            }
        };

        if blocks.is_empty() {
            info!("[dc-03] No new block found on this peer");
            self.state.lock().no_new_blocks = true;
            return BlockchainEvent::NoBlock;
        }
        self.state.lock().no_new_blocks = false;

        let transactions: u32 = blocks.iter().map(|b| b.data.number_of_transactions).sum();
        info!(blocks = blocks.len(), transactions, "[dc-03] Downloaded new blocks");

        if blocks[0].data.previous_block.as_deref() != Some(tip.id.as_str()) {
            warn!(
                height = blocks[0].height(),
                previous = ?blocks[0].data.previous_block,
                expected = %tip.id,
                "[dc-03] Downloaded blocks not accepted"
            );
            return BlockchainEvent::Fork;
        }

        let last = blocks.last().map(|b| b.data.clone());
        self.state.lock().last_downloaded_block = last;
        let queue = match kind {
            QueueKind::Process => &self.process_queue,
            QueueKind::Rebuild => &self.rebuild_queue,
        };
        queue.push(blocks);
        BlockchainEvent::Downloaded
    }

    fn download_finished(&self) -> Option<BlockchainEvent> {
        info!("[dc-03] Blockchain download completed");
        let mut state = self.state.lock();
        if state.network_start {
            state.network_start = false;
            return Some(BlockchainEvent::SyncFinished);
        }
        self.process_queue
            .is_idle()
            .then_some(BlockchainEvent::ProcessFinished)
    }

    async fn rebuild_finished(&self) -> Result<()> {
        let height = {
            let mut state = self.state.lock();
            state.rebuild = false;
            state.fast_rebuild = false;
            state.last_height()
        };
        let store = &self.ports.store;
        store.save_block_commit().await?;
        store.build_wallets(height).await?;
        store.save_wallets(true).await?;
        self.processor.apply_round(height).await;
        self.ports.pool.lock().build_wallets();
        info!(height, "[dc-03] Wallets rebuilt after fast rebuild");
        Ok(())
    }

    fn check_later(&mut self) {
        if let Some(timer) = self.wake_timer.take() {
            timer.abort();
        }
        let events = self.events_tx.clone();
        let delay = self.config.check_later();
        self.wake_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(BlockchainEvent::WakeUp);
        }));
    }

    async fn start_fork_recovery(&self) -> BlockchainEvent {
        info!("[dc-03] Starting fork recovery");
        FORK_RECOVERIES.inc();
        self.process_queue.clear();
        self.rebuild_queue.clear();

        let depth = self.config.rollback.depth();
        match self.processor.remove_blocks(depth).await {
            Ok(removed) => {
                info!(
                    requested = depth,
                    removed = removed.len(),
                    height = self.state.lock().last_height(),
                    "[dc-03] Fork recovery rolled back blocks"
                );
                BlockchainEvent::Success
            }
            Err(e) => {
                error!(error = %e, "[dc-03] Fork recovery failed");
                BlockchainEvent::Failure
            }
        }
    }
}

impl Drop for BlockchainStateMachine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Cloneable handle to a running machine.
#[derive(Clone)]
pub struct BlockchainHandle {
    current: Arc<RwLock<ChainState>>,
    state: Arc<Mutex<BlockchainState>>,
    events: mpsc::UnboundedSender<BlockchainEvent>,
    process_queue: Arc<BlockQueue>,
}

impl BlockchainApi for BlockchainHandle {
    fn state(&self) -> ChainState {
        *self.current.read()
    }

    fn last_block(&self) -> Option<BlockData> {
        self.state.lock().last_block.clone()
    }

    fn dispatch(&self, event: BlockchainEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Refused while fork recovery runs. The state lock is held across the
    /// push so a block is either queued before the rollback clears the queue
    /// or not at all.
    fn queue_block(&self, block: Block) -> bool {
        let current = self.current.read();
        if *current == ChainState::Fork {
            debug!(height = block.height(), id = %block.id(), "[dc-03] Block refused during fork recovery");
            return false;
        }
        debug!(height = block.height(), id = %block.id(), "[dc-03] Block queued");
        let queued = self.process_queue.push(vec![block]);
        drop(current);
        queued && self.dispatch(BlockchainEvent::NewBlock)
    }
}
