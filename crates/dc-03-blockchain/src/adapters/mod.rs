//! Adapters layer for the blockchain subsystem.
//!
//! In-memory implementations of [`crate::ports::BlockStore`] and
//! [`crate::ports::NetworkInterface`].

pub mod memory_network;
pub mod memory_store;

pub use memory_network::InMemoryNetwork;
pub use memory_store::InMemoryBlockStore;
