//! # Inbound Port - TransactionPoolApi
//!
//! Read access to the pool for the forger and the API layer.

use dc_01_wallets::PendingTransactions;
use shared_types::{Id, Transaction};

/// Pool queries served to collaborators.
///
/// Every call purges expired transactions first, so it takes `&mut self`.
pub trait TransactionPoolApi: PendingTransactions {
    fn get_pool_size(&mut self) -> usize;

    fn get_sender_size(&mut self, sender_public_key: &str) -> usize;

    fn get_transaction(&mut self, id: &str) -> Option<Transaction>;

    /// Hex-serialized transactions for a block of at most `block_size`.
    fn get_transactions_for_forging(&mut self, block_size: usize) -> Vec<String>;

    /// Ids in `[start, start + size)` of the fee order.
    fn get_transaction_ids_for_forging(&mut self, start: usize, size: usize) -> Vec<Id>;
}
