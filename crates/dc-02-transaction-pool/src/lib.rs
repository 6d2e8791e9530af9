//! # Transaction Pool Subsystem
//!
//! **Subsystem ID:** 2
//!
//! ## Purpose
//!
//! Holds verified, unconfirmed transactions until a delegate forges them.
//! Admission is checked against speculative pool wallets so a sender can
//! never have more pending spends than their confirmed balance covers.
//!
//! ## Lifecycle
//!
//! ```text
//! TransactionGuard::validate ──→ TransactionPool::add_transaction ──→ MemPool
//!                                        │                              │
//!                                        ▼                              ▼ every sync_interval
//!                               PoolWalletManager              PersistentPoolStorage
//!                                        ▲
//!                                        │ accept_chained_block / build_wallets
//!                                 confirmed chain
//! ```
//!
//! | Stage | Method | Effect |
//! |-------|--------|--------|
//! | Restore | `make()` | Load storage, drop expired and already-forged entries |
//! | Admit | `add_transaction()` | Evict on overflow, apply to pool wallet |
//! | Forge | `get_transactions_for_forging()` | Highest fee first, FIFO among equals |
//! | Confirm | `accept_chained_block()` | Drop forged entries, purge double spenders |
//! | Shutdown | `disconnect()` | Sync and close storage |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/ - InMemoryPoolStorage, FilePoolStorage               │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - TransactionPoolApi                         │
//! │  ports/outbound.rs - PersistentPoolStorage, ForgedTransactionLookup │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/ - MemPool, TransactionPool, TransactionGuard, fees     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
