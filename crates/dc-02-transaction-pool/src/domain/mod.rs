//! # Domain Layer - Transaction Pool
//!
//! ## Components
//!
//! - `entities`: MemPoolTransaction, PersistedTransaction, PoolConfig
//! - `mem_pool`: fee-ordered in-memory index with dirty tracking
//! - `wallet_manager`: speculative pool wallets forked from the chain
//! - `pool`: TransactionPool admission and chain reconciliation
//! - `guard`: request-time validation pipeline
//! - `dynamic_fee`: size-based fee policy
//! - `value_objects`: FeeOrderedKey, FeeMatch
//! - `errors`: PoolError

pub mod dynamic_fee;
pub mod entities;
pub mod errors;
pub mod guard;
pub mod mem_pool;
pub mod pool;
pub mod value_objects;
pub mod wallet_manager;

pub use dynamic_fee::*;
pub use entities::*;
pub use errors::*;
pub use guard::*;
pub use mem_pool::*;
pub use pool::*;
pub use value_objects::*;
pub use wallet_manager::*;
