//! Driving port: how other components talk to a running state machine.

use shared_types::{Block, BlockData};

use crate::domain::{BlockchainEvent, ChainState};

pub trait BlockchainApi: Send + Sync {
    /// Current state of the machine.
    fn state(&self) -> ChainState;

    fn last_block(&self) -> Option<BlockData>;

    /// Queue an event for the machine. Returns false once it has shut down.
    fn dispatch(&self, event: BlockchainEvent) -> bool;

    /// Hand a block received from a peer or the forger to the process queue.
    fn queue_block(&self, block: Block) -> bool;
}
