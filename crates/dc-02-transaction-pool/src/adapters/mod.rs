//! Adapters layer for the transaction pool.
//!
//! Implementations of [`crate::ports::PersistentPoolStorage`].

pub mod file_storage;
pub mod memory_storage;

pub use file_storage::FilePoolStorage;
pub use memory_storage::InMemoryPoolStorage;
