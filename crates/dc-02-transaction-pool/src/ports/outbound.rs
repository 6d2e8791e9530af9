//! Outbound (Driven) ports for the transaction pool.

use async_trait::async_trait;
use shared_types::Id;

use crate::domain::{PersistedTransaction, Result};

/// Durable copy of the pool, synced every `sync_interval` changes and on
/// disconnect.
pub trait PersistentPoolStorage: Send {
    fn load_all(&mut self) -> Result<Vec<PersistedTransaction>>;

    fn bulk_add(&mut self, records: Vec<PersistedTransaction>) -> Result<()>;

    fn bulk_remove_by_id(&mut self, ids: &[Id]) -> Result<()>;

    fn delete_all(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

/// Lookup of transactions already confirmed on chain.
///
/// Used on startup to drop pooled transactions that were forged while the
/// node was down.
#[async_trait]
pub trait ForgedTransactionLookup: Send + Sync {
    /// The subset of `ids` present in stored blocks.
    async fn get_forged_transaction_ids(&self, ids: &[Id]) -> Result<Vec<Id>>;
}

/// No transaction has been forged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NothingForged;

#[async_trait]
impl ForgedTransactionLookup for NothingForged {
    async fn get_forged_transaction_ids(&self, _ids: &[Id]) -> Result<Vec<Id>> {
        Ok(Vec::new())
    }
}
