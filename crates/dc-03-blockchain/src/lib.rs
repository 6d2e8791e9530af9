//! # Blockchain Subsystem
//!
//! **Subsystem ID:** 3
//!
//! ## Purpose
//!
//! Drives the node from startup to a synced chain and keeps it there:
//! validates or installs the genesis block, replays or rebuilds the wallets,
//! downloads and applies peer blocks, and rolls back on forks.
//!
//! ## State Machine
//!
//! ```text
//! uninitialised ──START──→ init ──STARTED──→ syncWithNetwork ──SYNCFINISHED──→ idle
//!                            │                  ▲        │                    │  │
//!                            │ REBUILD          │        │ FORK     WAKEUP ───┘  │ NEWBLOCK
//!                            ▼                  │        ▼                       ▼
//!                         rebuild ─REBUILDCOMPLETE┘     fork ─SUCCESS─→ sync   processingBlock
//!                            │                           │
//!                            └──FAILURE──→ exit ←─FAILURE┘
//! ```
//!
//! Every non-terminal state moves to `stopped` on `STOP`.
//!
//! ## Pipelines
//!
//! | Queue | Worker | Effect per block |
//! |-------|--------|------------------|
//! | process | `BlockProcessor::process_block` | wallets, storage, round, pool |
//! | rebuild | `BlockProcessor::rebuild_block` | staged storage only |
//!
//! Downloading and application run concurrently. The machine pauses
//! downloading once the active queue holds more than `max_queue_depth`
//! blocks.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/ - InMemoryBlockStore, InMemoryNetwork                │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - BlockchainApi                              │
//! │  ports/outbound.rs - BlockStore, NetworkInterface               │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/ - state tables, machine, processor, queues, rollback   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
