//! # Block Queues
//!
//! Downloaded blocks are handed to a worker task so that downloading and
//! application proceed concurrently. The machine only reads the queue depth
//! (for backpressure) and receives a finished event when the queue drains.
//!
//! Clearing bumps a generation counter; batches queued under an older
//! generation are drained without being applied.

use parking_lot::Mutex;
use shared_types::Block;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::processor::{BlockOutcome, BlockProcessor};
use super::state::BlockchainEvent;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueKind {
    /// Full application: wallets, storage, rounds, pool.
    Process,
    /// Storage only, during a fast rebuild.
    Rebuild,
}

impl QueueKind {
    /// Event sent when the queue drains.
    pub fn finished_event(self) -> BlockchainEvent {
        match self {
            Self::Process => BlockchainEvent::ProcessFinished,
            Self::Rebuild => BlockchainEvent::RebuildFinished,
        }
    }
}

struct Batch {
    generation: u64,
    blocks: Vec<Block>,
}

pub struct BlockQueue {
    kind: QueueKind,
    sender: mpsc::UnboundedSender<Batch>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Batch>>>,
    pending: Arc<AtomicUsize>,
    generation: Arc<AtomicU64>,
}

impl BlockQueue {
    pub fn new(kind: QueueKind) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            kind,
            sender,
            receiver: Mutex::new(Some(receiver)),
            pending: Arc::new(AtomicUsize::new(0)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    /// Blocks queued or in flight.
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_idle(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&self, blocks: Vec<Block>) -> bool {
        if blocks.is_empty() {
            return true;
        }
        let count = blocks.len();
        self.pending.fetch_add(count, Ordering::SeqCst);
        let batch = Batch {
            generation: self.generation.load(Ordering::SeqCst),
            blocks,
        };
        if self.sender.send(batch).is_err() {
            self.pending.fetch_sub(count, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Discard everything queued so far.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Start the worker. Only the first call spawns; later calls return
    /// `None`.
    pub fn spawn(
        &self,
        processor: Arc<BlockProcessor>,
        events: mpsc::UnboundedSender<BlockchainEvent>,
    ) -> Option<JoinHandle<()>> {
        let mut receiver = self.receiver.lock().take()?;
        let kind = self.kind;
        let pending = Arc::clone(&self.pending);
        let generation = Arc::clone(&self.generation);

        Some(tokio::spawn(async move {
            while let Some(batch) = receiver.recv().await {
                for block in batch.blocks {
                    if batch.generation != generation.load(Ordering::SeqCst) {
                        debug!(height = block.height(), "[dc-03] Dropping cleared block");
                        pending.fetch_sub(1, Ordering::SeqCst);
                        continue;
                    }
                    let outcome = match kind {
                        QueueKind::Process => processor.process_block(block).await,
                        QueueKind::Rebuild => processor.rebuild_block(block).await,
                    };
                    pending.fetch_sub(1, Ordering::SeqCst);
                    match outcome {
                        BlockOutcome::Applied | BlockOutcome::Skipped => {}
                        BlockOutcome::Rejected => {
                            generation.fetch_add(1, Ordering::SeqCst);
                        }
                        BlockOutcome::Fork => {
                            generation.fetch_add(1, Ordering::SeqCst);
                            let _ = events.send(BlockchainEvent::Fork);
                        }
                    }
                }
                if pending.load(Ordering::SeqCst) == 0 {
                    let _ = events.send(kind.finished_event());
                }
            }
        }))
    }
}
