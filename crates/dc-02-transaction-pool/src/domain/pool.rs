//! # Transaction Pool - Admission, Persistence and Block Reconciliation
//!
//! Hybrid storage: every read is served from the [`MemPool`]; mutations are
//! mirrored to [`PersistentPoolStorage`] in batches once `sync_interval`
//! changes have accumulated, and unconditionally on disconnect.
//!
//! ## Admission
//!
//! ```text
//! add_transaction(tx)
//!   ├─ already pooled            → ERR_ALREADY_IN_POOL
//!   ├─ sender blocked            → ERR_SENDER_BLOCKED
//!   ├─ pool full
//!   │    ├─ fee > lowest fee     → revert + evict lowest
//!   │    └─ otherwise            → ERR_POOL_FULL
//!   ├─ pool wallet can't afford  → ERR_APPLY (insertion rolled back)
//!   └─ apply to sender's pool wallet, sync if necessary
//! ```
//!
//! The pool wallets are speculative. Any infeasibility found while
//! reconciling with the chain purges and blocks the sender instead of
//! failing the pool.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use dc_01_wallets::{PendingTransactions, SharedWalletIndex};
use dc_telemetry::metrics::{POOL_SIZE, SENDERS_BLOCKED, TRANSACTIONS_ACCEPTED, TRANSACTIONS_REJECTED};
use parking_lot::Mutex;
use shared_bus::{EventPublisher, LedgerEvent};
use shared_types::{
    AdmissionError, Block, Id, PublicKey, TimeSource, Timestamp, Transaction, TransactionType,
};
use tracing::{debug, error, info, warn};

use super::entities::{MemPoolTransaction, PersistedTransaction, PoolConfig};
use super::errors::Result;
use super::mem_pool::MemPool;
use super::wallet_manager::PoolWalletManager;
use crate::ports::{ForgedTransactionLookup, PersistentPoolStorage, TransactionPoolApi};

/// Pool handle shared between the guard, the forger and the block pipeline.
pub type SharedTransactionPool = Arc<Mutex<TransactionPool>>;

/// Outcome of [`TransactionPool::determine_excess_transactions`].
#[derive(Debug, Default)]
pub struct ExcessResult {
    /// Admitted to the pool.
    pub accept: Vec<Transaction>,
    /// Refused only because the sender is over the per-sender limit.
    pub excess: Vec<Transaction>,
    /// Refused by the pool for any other reason.
    pub invalid: Vec<(Transaction, AdmissionError)>,
}

pub struct TransactionPool {
    config: PoolConfig,
    mem: MemPool,
    storage: Box<dyn PersistentPoolStorage>,
    wallet_manager: PoolWalletManager,
    /// Sender → block release time (ms).
    blocked_by_public_key: HashMap<PublicKey, Timestamp>,
    logged_allowed_senders: HashSet<PublicKey>,
    time: Arc<dyn TimeSource>,
    events: Arc<dyn EventPublisher>,
}

impl TransactionPool {
    pub fn new(
        config: PoolConfig,
        storage: Box<dyn PersistentPoolStorage>,
        chain: SharedWalletIndex,
        time: Arc<dyn TimeSource>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            config,
            mem: MemPool::new(),
            storage,
            wallet_manager: PoolWalletManager::new(chain),
            blocked_by_public_key: HashMap::new(),
            logged_allowed_senders: HashSet::new(),
            time,
            events,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn wallet_manager(&self) -> &PoolWalletManager {
        &self.wallet_manager
    }

    pub fn wallet_manager_mut(&mut self) -> &mut PoolWalletManager {
        &mut self.wallet_manager
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Restore the pool from persistent storage.
    ///
    /// Expired entries are dropped, then every entry already forged on chain
    /// (the node went down before syncing the removal) is removed. Pool
    /// wallets are left empty; call [`TransactionPool::build_wallets`] once
    /// the chain ledger is ready.
    pub async fn make(&mut self, forged: &dyn ForgedTransactionLookup) -> Result<()> {
        self.mem.flush();
        self.logged_allowed_senders.clear();

        let max_age = self.config.max_transaction_age_ms();
        let mut undecodable = Vec::new();
        let mut loaded = Vec::new();
        for record in self.storage.load_all()? {
            match Transaction::from_bytes(&record.serialized) {
                Ok(tx) => {
                    let mut entry = MemPoolTransaction::new(tx, record.added_at);
                    entry.sequence = record.sequence;
                    entry.expires_at = Some(record.expires_at);
                    loaded.push(record.id);
                    self.mem.add(entry, max_age, true);
                }
                Err(e) => {
                    warn!(id = %record.id, error = %e, "[dc-02] Dropping undecodable pooled transaction");
                    undecodable.push(record.id);
                }
            }
        }
        if !undecodable.is_empty() {
            self.storage.bulk_remove_by_id(&undecodable)?;
        }

        self.purge_expired();

        let forged_ids = forged.get_forged_transaction_ids(&loaded).await?;
        for id in &forged_ids {
            self.remove_transaction_by_id(id);
        }

        // Expiry reverts above ran against wallets that were never applied.
        self.wallet_manager.reset();
        POOL_SIZE.set(self.mem.size() as i64);

        info!(
            loaded = loaded.len(),
            forged = forged_ids.len(),
            size = self.mem.size(),
            "[dc-02] Transaction pool restored"
        );
        Ok(())
    }

    /// Sync everything outstanding and close storage.
    pub fn disconnect(&mut self) -> Result<()> {
        self.sync_to_persistent_storage()?;
        self.storage.close()
    }

    /// Delete every transaction, in memory and in storage.
    pub fn flush(&mut self) -> Result<()> {
        self.mem.flush();
        POOL_SIZE.set(0);
        self.storage.delete_all()
    }

    // =========================================================================
    // ADMISSION
    // =========================================================================

    /// Admit a verified transaction.
    pub fn add_transaction(&mut self, tx: Transaction) -> std::result::Result<(), AdmissionError> {
        let id = tx.id().to_string();
        let outcome = self.try_add_transaction(tx);
        match &outcome {
            Ok(()) => {
                TRANSACTIONS_ACCEPTED.inc();
                debug!(id = %id, "[dc-02] Transaction accepted");
            }
            Err(e) => {
                TRANSACTIONS_REJECTED.with_label_values(&[e.code()]).inc();
                debug!(id = %id, code = e.code(), reason = %e, "[dc-02] Transaction rejected");
            }
        }
        POOL_SIZE.set(self.mem.size() as i64);
        outcome
    }

    fn try_add_transaction(&mut self, tx: Transaction) -> std::result::Result<(), AdmissionError> {
        if self.transaction_exists(tx.id()) {
            return Err(AdmissionError::AlreadyInPool {
                id: tx.id().to_string(),
            });
        }

        if self.is_sender_blocked(tx.sender_public_key()) {
            return Err(AdmissionError::SenderBlocked {
                sender: tx.sender_public_key().to_string(),
                until: self.blocked_until(tx.sender_public_key()).unwrap_or_default(),
            });
        }

        if self.mem.size() >= self.config.max_transactions_in_pool {
            self.make_room_for(&tx)?;
        }

        let mut errors = Vec::new();
        let feasible = self.wallet_manager.can_apply(&tx.data, &mut errors);
        if !feasible {
            return Err(AdmissionError::Apply { reasons: errors });
        }
        if let Err(e) = self.wallet_manager.apply_transaction_to_sender(&tx.data) {
            return Err(AdmissionError::Apply {
                reasons: vec![e.to_string()],
            });
        }

        let entry = MemPoolTransaction::new(tx, self.time.now());
        self.mem
            .add(entry, self.config.max_transaction_age_ms(), false);
        self.sync_if_necessary();
        Ok(())
    }

    /// Evict the lowest-fee transaction if `tx` pays strictly more.
    fn make_room_for(&mut self, tx: &Transaction) -> std::result::Result<(), AdmissionError> {
        let lowest = match self.mem.lowest_fee() {
            Some(lowest) if tx.fee() > lowest.fee() => lowest.clone(),
            _ => {
                return Err(AdmissionError::PoolFull {
                    limit: self.config.max_transactions_in_pool,
                    fee: tx.fee().clone(),
                })
            }
        };

        debug!(
            evicted = %lowest.id(),
            fee = %lowest.fee(),
            newcomer_fee = %tx.fee(),
            "[dc-02] Pool full, evicting lowest fee transaction"
        );
        if let Err(e) = self
            .wallet_manager
            .revert_transaction_for_sender(&lowest.transaction.data)
        {
            warn!(id = %lowest.id(), error = %e, "[dc-02] Failed to revert evicted transaction");
        }
        self.mem.remove(lowest.id());
        Ok(())
    }

    /// Split `transactions` into admitted, rate-limited and refused.
    pub fn determine_excess_transactions(&mut self, transactions: Vec<Transaction>) -> ExcessResult {
        let mut result = ExcessResult::default();
        for tx in transactions {
            if self.has_exceeded_max_transactions(&tx) {
                result.excess.push(tx);
                continue;
            }
            match self.add_transaction(tx.clone()) {
                Ok(()) => result.accept.push(tx),
                Err(e) => result.invalid.push((tx, e)),
            }
        }
        result
    }

    /// Whether the sender already holds `max_transactions_per_sender`
    /// transactions, so a sender never has more than that many pooled.
    /// Allowed senders are never throttled.
    pub fn has_exceeded_max_transactions(&mut self, tx: &Transaction) -> bool {
        self.purge_expired();

        let sender = tx.sender_public_key();
        if self.config.allowed_senders.iter().any(|pk| pk == sender) {
            if self.logged_allowed_senders.insert(sender.to_string()) {
                debug!(sender = %sender, "[dc-02] Allowed sender, skipping throttling");
            }
            return false;
        }

        self.mem.get_size_by_sender(sender) >= self.config.max_transactions_per_sender
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Only purges when the id is present: a missing id stays missing.
    pub fn transaction_exists(&mut self, id: &str) -> bool {
        if !self.mem.has(id) {
            return false;
        }
        self.purge_expired();
        self.mem.has(id)
    }

    pub fn get_pool_size(&mut self) -> usize {
        self.purge_expired();
        self.mem.size()
    }

    pub fn get_sender_size(&mut self, sender_public_key: &str) -> usize {
        self.purge_expired();
        self.mem.get_size_by_sender(sender_public_key)
    }

    pub fn get_transaction(&mut self, id: &str) -> Option<Transaction> {
        self.purge_expired();
        self.mem.get_by_id(id).map(|entry| entry.transaction.clone())
    }

    /// Serialized transactions in `[start, start + size)` of the fee order.
    pub fn get_transactions(&mut self, start: usize, size: usize) -> Vec<Vec<u8>> {
        self.purge_expired();
        self.mem
            .get_transactions_ordered_by_fee()
            .skip(start)
            .take(size)
            .map(|entry| entry.transaction.serialized.clone())
            .collect()
    }

    pub fn get_transactions_for_forging(&mut self, block_size: usize) -> Vec<String> {
        self.purge_expired();
        self.mem
            .get_transactions_ordered_by_fee()
            .take(block_size)
            .map(|entry| entry.transaction.to_hex())
            .collect()
    }

    pub fn get_transaction_ids_for_forging(&mut self, start: usize, size: usize) -> Vec<Id> {
        self.purge_expired();
        self.mem
            .get_transactions_ordered_by_fee()
            .skip(start)
            .take(size)
            .map(|entry| entry.id().to_string())
            .collect()
    }

    // =========================================================================
    // REMOVAL
    // =========================================================================

    pub fn remove_transaction(&mut self, tx: &Transaction) {
        self.remove_transaction_by_id(tx.id());
    }

    pub fn remove_transaction_by_id(&mut self, id: &str) {
        self.mem.remove(id);
        self.sync_if_necessary();
        POOL_SIZE.set(self.mem.size() as i64);
    }

    pub fn remove_transactions_for_sender(&mut self, sender_public_key: &str) {
        let ids: Vec<Id> = self
            .mem
            .get_by_sender(sender_public_key)
            .into_iter()
            .map(|entry| entry.id().to_string())
            .collect();
        for id in ids {
            self.remove_transaction_by_id(&id);
        }
    }

    /// Drop every transaction of a sender together with its pool wallet.
    pub fn purge_by_public_key(&mut self, sender_public_key: &str) {
        debug!(sender = %sender_public_key, "[dc-02] Purging sender from pool");
        self.remove_transactions_for_sender(sender_public_key);
        self.wallet_manager.delete_wallet(sender_public_key);
    }

    /// Purge every sender with at least one unverified transaction in `block`.
    pub fn purge_senders_with_invalid_transactions(&mut self, block: &Block) {
        let senders: BTreeSet<&str> = block
            .transactions
            .iter()
            .filter(|tx| !tx.verified)
            .map(Transaction::sender_public_key)
            .collect();
        for sender in senders {
            self.purge_by_public_key(sender);
        }
    }

    /// Remove the pooled transactions of `block`, undoing their pool effect.
    pub fn purge_block(&mut self, block: &Block) {
        for tx in &block.transactions {
            if self.transaction_exists(tx.id()) {
                self.remove_transaction(tx);
                if let Err(e) = self.wallet_manager.revert_transaction_for_sender(&tx.data) {
                    warn!(id = %tx.id(), error = %e, "[dc-02] Failed to revert purged transaction");
                }
            }
        }
    }

    fn purge_expired(&mut self) {
        let expired = self.mem.get_expired(self.time.now());
        if expired.is_empty() {
            return;
        }
        for entry in expired {
            debug!(id = %entry.id(), "[dc-02] Transaction expired");
            self.events
                .publish(LedgerEvent::TransactionExpired(entry.transaction.data.clone()));
            if let Err(e) = self
                .wallet_manager
                .revert_transaction_for_sender(&entry.transaction.data)
            {
                warn!(id = %entry.id(), error = %e, "[dc-02] Failed to revert expired transaction");
            }
            self.mem.remove(entry.id());
            self.sync_if_necessary();
        }
        POOL_SIZE.set(self.mem.size() as i64);
    }

    // =========================================================================
    // SENDER BLOCKING
    // =========================================================================

    /// A block past its release time is lifted on the spot.
    pub fn is_sender_blocked(&mut self, sender_public_key: &str) -> bool {
        let Some(&until) = self.blocked_by_public_key.get(sender_public_key) else {
            return false;
        };
        if until < self.time.now() {
            self.blocked_by_public_key.remove(sender_public_key);
            return false;
        }
        true
    }

    pub fn blocked_until(&self, sender_public_key: &str) -> Option<Timestamp> {
        self.blocked_by_public_key.get(sender_public_key).copied()
    }

    /// Block a sender for `block_duration`. Returns the release time.
    pub fn block_sender(&mut self, sender_public_key: &str) -> Timestamp {
        let until = self
            .time
            .now()
            .saturating_add(self.config.block_duration_ms());
        self.blocked_by_public_key
            .insert(sender_public_key.to_string(), until);

        warn!(sender = %sender_public_key, until, "[dc-02] Sender blocked");
        SENDERS_BLOCKED.inc();
        self.events.publish(LedgerEvent::SenderBlocked {
            sender: sender_public_key.to_string(),
            until,
        });
        until
    }

    // =========================================================================
    // CHAIN RECONCILIATION
    // =========================================================================

    /// Reconcile the pool with a block the chain has just accepted.
    ///
    /// Pooled transactions are dropped (their sender effect already stands).
    /// Transactions the pool never saw are re-applied to tracked senders; a
    /// sender that cannot afford one is purged and blocked.
    pub fn accept_chained_block(&mut self, block: &Block) {
        for tx in &block.transactions {
            let data = &tx.data;
            let sender = data.sender_public_key.as_str();
            let exists = self.transaction_exists(tx.id());
            let sender_tracked = self.wallet_manager.exists(sender);

            self.wallet_manager.apply_transaction_to_recipients(data);

            if exists {
                self.remove_transaction(tx);
            } else if sender_tracked {
                let mut errors = Vec::new();
                let applied = self.wallet_manager.can_apply_to_sender(data, &mut errors)
                    && self
                        .wallet_manager
                        .apply_transaction_to_sender(data)
                        .map_err(|e| errors.push(e.to_string()))
                        .is_ok();
                if !applied {
                    self.purge_by_public_key(sender);
                    self.block_sender(sender);
                    error!(
                        id = %data.id,
                        sender = %sender,
                        errors = ?errors,
                        "[dc-02] Chained transaction cannot be applied to pool wallet, possible double spend"
                    );
                }
            }

            if sender_tracked
                && self.wallet_manager.can_be_purged(sender)
                && self.get_sender_size(sender) == 0
            {
                self.wallet_manager.delete_wallet(sender);
            }
        }

        self.wallet_manager.credit_generator(&block.data);
    }

    /// Rebuild the pool wallets from scratch by replaying every pooled
    /// transaction in fee order. Senders that no longer afford their
    /// transactions are purged.
    pub fn build_wallets(&mut self) {
        // Expired entries must be reverted while their effects are still on
        // the pool wallets, not after the reset.
        self.purge_expired();
        self.wallet_manager.reset();
        let ids: Vec<Id> = self
            .mem
            .get_transactions_ordered_by_fee()
            .map(|entry| entry.id().to_string())
            .collect();

        for id in ids {
            let Some(tx) = self.get_transaction(&id) else {
                continue;
            };
            let mut errors = Vec::new();
            let applied = self.wallet_manager.can_apply_to_sender(&tx.data, &mut errors)
                && self
                    .wallet_manager
                    .apply_transaction_to_sender(&tx.data)
                    .map_err(|e| errors.push(e.to_string()))
                    .is_ok();
            if !applied {
                error!(id = %id, errors = ?errors, "[dc-02] Pooled transaction no longer applies");
                self.purge_by_public_key(tx.sender_public_key());
            }
        }
        info!(size = self.mem.size(), "[dc-02] Pool wallets rebuilt");
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    fn sync_if_necessary(&mut self) {
        if self.mem.get_number_of_dirty() >= self.config.sync_interval {
            if let Err(e) = self.sync_to_persistent_storage() {
                warn!(error = %e, "[dc-02] Pool storage sync failed");
            }
        }
    }

    /// Write pending additions and removals to storage.
    pub fn sync_to_persistent_storage(&mut self) -> Result<()> {
        let added: Vec<PersistedTransaction> = self
            .mem
            .get_dirty_added_and_forget()
            .iter()
            .map(PersistedTransaction::from)
            .collect();
        if !added.is_empty() {
            self.storage.bulk_add(added)?;
        }

        let removed = self.mem.get_dirty_removed_and_forget();
        if !removed.is_empty() {
            self.storage.bulk_remove_by_id(&removed)?;
        }
        Ok(())
    }
}

/// Answers from memory; expired entries are dropped by the next mutating call.
impl PendingTransactions for TransactionPool {
    fn sender_has_transactions_of_type(
        &self,
        sender_public_key: &str,
        transaction_type: TransactionType,
    ) -> bool {
        let now = self.time.now();
        self.mem
            .get_by_sender(sender_public_key)
            .iter()
            .any(|entry| entry.transaction_type() == transaction_type && !entry.is_expired(now))
    }
}

impl TransactionPoolApi for TransactionPool {
    fn get_pool_size(&mut self) -> usize {
        TransactionPool::get_pool_size(self)
    }

    fn get_sender_size(&mut self, sender_public_key: &str) -> usize {
        TransactionPool::get_sender_size(self, sender_public_key)
    }

    fn get_transaction(&mut self, id: &str) -> Option<Transaction> {
        TransactionPool::get_transaction(self, id)
    }

    fn get_transactions_for_forging(&mut self, block_size: usize) -> Vec<String> {
        TransactionPool::get_transactions_for_forging(self, block_size)
    }

    fn get_transaction_ids_for_forging(&mut self, start: usize, size: usize) -> Vec<Id> {
        TransactionPool::get_transaction_ids_for_forging(self, start, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryPoolStorage;
    use async_trait::async_trait;
    use dc_01_wallets::WalletIndex;
    use parking_lot::RwLock;
    use shared_bus::{EventFilter, InMemoryEventBus, NullPublisher};
    use shared_crypto::{address_from_public_key, Ed25519KeyPair};
    use shared_types::{BigAmount, BlockBuilder, MockTimeSource, TransactionBuilder, DEFAULT_NETWORK_VERSION};

    const HOUR_MS: u64 = 3_600_000;

    fn keys(name: &str) -> Ed25519KeyPair {
        Ed25519KeyPair::from_passphrase(name)
    }

    fn public_key(name: &str) -> String {
        keys(name).public_key().to_hex()
    }

    fn address_of(name: &str) -> String {
        address_from_public_key(&public_key(name), DEFAULT_NETWORK_VERSION).unwrap()
    }

    fn chain(funded: &[(&str, u64)]) -> SharedWalletIndex {
        let mut index = WalletIndex::default();
        for (name, balance) in funded {
            index.find_by_public_key(&public_key(name)).unwrap().balance = BigAmount::from(*balance);
        }
        Arc::new(RwLock::new(index))
    }

    fn transfer(from: &str, amount: u64, fee: u64, nonce: u32) -> Transaction {
        TransactionBuilder::transfer(address_of("recipient"), amount)
            .fee(fee)
            .timestamp(nonce)
            .sign(&keys(from))
            .build()
            .unwrap()
    }

    struct Fixture {
        pool: TransactionPool,
        clock: Arc<MockTimeSource>,
    }

    fn fixture_with(config: PoolConfig, funded: &[(&str, u64)]) -> Fixture {
        let clock = Arc::new(MockTimeSource::new(1_000));
        let pool = TransactionPool::new(
            config,
            Box::new(InMemoryPoolStorage::new()),
            chain(funded),
            clock.clone(),
            Arc::new(NullPublisher::default()),
        );
        Fixture { pool, clock }
    }

    fn fixture(funded: &[(&str, u64)]) -> Fixture {
        fixture_with(PoolConfig::for_testing(), funded)
    }

    struct Forged(Vec<Id>);

    #[async_trait]
    impl ForgedTransactionLookup for Forged {
        async fn get_forged_transaction_ids(&self, ids: &[Id]) -> Result<Vec<Id>> {
            Ok(ids.iter().filter(|id| self.0.contains(id)).cloned().collect())
        }
    }

    // =========================================================================
    // ADMISSION
    // =========================================================================

    #[test]
    fn test_add_applies_to_pool_wallet() {
        let mut f = fixture(&[("alice", 100)]);
        f.pool.add_transaction(transfer("alice", 50, 1, 0)).unwrap();

        assert_eq!(f.pool.get_pool_size(), 1);
        let wallet = f.pool.wallet_manager().index().get_by_address(&address_of("alice")).unwrap();
        assert_eq!(wallet.balance, BigAmount::from(49u64));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut f = fixture(&[("alice", 100)]);
        let tx = transfer("alice", 1, 1, 0);
        f.pool.add_transaction(tx.clone()).unwrap();
        let err = f.pool.add_transaction(tx).unwrap_err();
        assert_eq!(err.code(), "ERR_ALREADY_IN_POOL");
    }

    #[test]
    fn test_unaffordable_rejected_and_rolled_back() {
        let mut f = fixture(&[("alice", 100)]);
        f.pool.add_transaction(transfer("alice", 60, 1, 0)).unwrap();
        let err = f.pool.add_transaction(transfer("alice", 60, 1, 1)).unwrap_err();

        assert_eq!(err.code(), "ERR_APPLY");
        assert_eq!(f.pool.get_pool_size(), 1);
        let wallet = f.pool.wallet_manager().index().get_by_address(&address_of("alice")).unwrap();
        assert_eq!(wallet.balance, BigAmount::from(39u64));
    }

    #[test]
    fn test_cold_wallet_rejected() {
        let mut f = fixture(&[]);
        let err = f.pool.add_transaction(transfer("ghost", 1, 1, 0)).unwrap_err();
        assert_eq!(err.code(), "ERR_APPLY");
    }

    // =========================================================================
    // CAPACITY
    // =========================================================================

    fn single_slot() -> PoolConfig {
        PoolConfig {
            max_transactions_in_pool: 1,
            ..PoolConfig::for_testing()
        }
    }

    #[test]
    fn test_full_pool_evicts_lower_fee() {
        let mut f = fixture_with(single_slot(), &[("alice", 100), ("bob", 100)]);
        let low = transfer("alice", 10, 5, 0);
        let high = transfer("bob", 10, 10, 0);
        f.pool.add_transaction(low.clone()).unwrap();
        f.pool.add_transaction(high.clone()).unwrap();

        assert_eq!(f.pool.get_pool_size(), 1);
        assert!(!f.pool.transaction_exists(low.id()));
        assert!(f.pool.transaction_exists(high.id()));
        // Evicted spend is refunded to the pool wallet
        let alice = f.pool.wallet_manager().index().get_by_address(&address_of("alice")).unwrap();
        assert_eq!(alice.balance, BigAmount::from(100u64));
    }

    #[test]
    fn test_full_pool_rejects_lower_or_equal_fee() {
        let mut f = fixture_with(single_slot(), &[("alice", 100), ("bob", 100)]);
        let kept = transfer("alice", 10, 5, 0);
        f.pool.add_transaction(kept.clone()).unwrap();

        for (fee, nonce) in [(3, 0), (5, 1)] {
            let err = f.pool.add_transaction(transfer("bob", 10, fee, nonce)).unwrap_err();
            assert_eq!(err.code(), "ERR_POOL_FULL");
        }
        assert_eq!(f.pool.get_transaction_ids_for_forging(0, 10), vec![kept.id().to_string()]);
    }

    // =========================================================================
    // RATE LIMIT
    // =========================================================================

    #[test]
    fn test_excess_transactions_split() {
        let config = PoolConfig {
            max_transactions_per_sender: 2,
            ..PoolConfig::for_testing()
        };
        let mut f = fixture_with(config, &[("alice", 1_000)]);
        let batch: Vec<Transaction> = (0..3).map(|n| transfer("alice", 1, 1, n)).collect();

        let result = f.pool.determine_excess_transactions(batch);
        assert_eq!(result.accept.len(), 2);
        assert_eq!(result.excess.len(), 1);
        assert!(result.invalid.is_empty());
    }

    #[test]
    fn test_allowed_sender_not_throttled() {
        let config = PoolConfig {
            max_transactions_per_sender: 1,
            allowed_senders: vec![public_key("alice")],
            ..PoolConfig::for_testing()
        };
        let mut f = fixture_with(config, &[("alice", 1_000)]);
        let batch: Vec<Transaction> = (0..3).map(|n| transfer("alice", 1, 1, n)).collect();

        let result = f.pool.determine_excess_transactions(batch);
        assert_eq!(result.accept.len(), 3);
        assert!(result.excess.is_empty());
    }

    // =========================================================================
    // EXPIRY
    // =========================================================================

    #[test]
    fn test_expired_transactions_purged_with_event() {
        let bus = Arc::new(InMemoryEventBus::new());
        let mut subscription = bus.subscribe(EventFilter::names(vec!["transaction.expired"]));
        let clock = Arc::new(MockTimeSource::new(0));
        let config = PoolConfig::for_testing();
        let max_age = config.max_transaction_age_ms();
        let mut pool = TransactionPool::new(
            config,
            Box::new(InMemoryPoolStorage::new()),
            chain(&[("alice", 100)]),
            clock.clone(),
            bus,
        );
        pool.add_transaction(transfer("alice", 50, 1, 0)).unwrap();

        clock.advance(max_age + 1);
        assert_eq!(pool.get_pool_size(), 0);
        assert!(matches!(
            subscription.try_recv(),
            Ok(Some(LedgerEvent::TransactionExpired(_)))
        ));
        let wallet = pool.wallet_manager().index().get_by_address(&address_of("alice")).unwrap();
        assert_eq!(wallet.balance, BigAmount::from(100u64));
    }

    // =========================================================================
    // CHAIN RECONCILIATION
    // =========================================================================

    fn block_with(transactions: Vec<Transaction>) -> Block {
        BlockBuilder::new(2, Some("parent".into()))
            .transactions(transactions)
            .sign(&keys("delegate"))
            .unwrap()
    }

    #[test]
    fn test_chained_block_removes_pooled_transaction() {
        let mut f = fixture(&[("alice", 100)]);
        let tx = transfer("alice", 50, 1, 0);
        f.pool.add_transaction(tx.clone()).unwrap();

        f.pool.accept_chained_block(&block_with(vec![tx.clone()]));
        assert!(!f.pool.transaction_exists(tx.id()));
        // Sender effect already reflected, not applied twice
        let wallet = f.pool.wallet_manager().index().get_by_address(&address_of("alice")).unwrap();
        assert_eq!(wallet.balance, BigAmount::from(49u64));
    }

    #[test]
    fn test_double_spend_purges_and_blocks_sender() {
        let mut f = fixture(&[("alice", 100)]);
        let pooled = transfer("alice", 60, 1, 0);
        f.pool.add_transaction(pooled.clone()).unwrap();

        let foreign = transfer("alice", 50, 1, 1);
        f.pool.accept_chained_block(&block_with(vec![foreign]));

        assert_eq!(f.pool.get_pool_size(), 0);
        assert!(f.pool.is_sender_blocked(&public_key("alice")));
        let err = f.pool.add_transaction(pooled.clone()).unwrap_err();
        assert_eq!(err.code(), "ERR_SENDER_BLOCKED");

        f.clock.advance(HOUR_MS + 1);
        assert!(!f.pool.is_sender_blocked(&public_key("alice")));
    }

    #[test]
    fn test_generator_credited_when_tracked() {
        let mut f = fixture(&[("delegate", 10)]);
        f.pool.wallet_manager_mut().find_by_public_key(&public_key("delegate")).unwrap();

        let block = BlockBuilder::new(2, Some("parent".into()))
            .reward(5u64)
            .sign(&keys("delegate"))
            .unwrap();
        f.pool.accept_chained_block(&block);

        let wallet = f.pool.wallet_manager().index().get_by_address(&address_of("delegate")).unwrap();
        assert_eq!(wallet.balance, BigAmount::from(15u64));
    }

    #[test]
    fn test_purge_block_reverts_pool_effect() {
        let mut f = fixture(&[("alice", 100)]);
        let tx = transfer("alice", 50, 1, 0);
        f.pool.add_transaction(tx.clone()).unwrap();

        f.pool.purge_block(&block_with(vec![tx]));
        assert_eq!(f.pool.get_pool_size(), 0);
        let wallet = f.pool.wallet_manager().index().get_by_address(&address_of("alice")).unwrap();
        assert_eq!(wallet.balance, BigAmount::from(100u64));
    }

    #[test]
    fn test_build_wallets_replays_pool() {
        let mut f = fixture(&[("alice", 100)]);
        f.pool.add_transaction(transfer("alice", 10, 1, 0)).unwrap();
        f.pool.add_transaction(transfer("alice", 20, 1, 1)).unwrap();

        f.pool.build_wallets();
        let wallet = f.pool.wallet_manager().index().get_by_address(&address_of("alice")).unwrap();
        assert_eq!(wallet.balance, BigAmount::from(68u64));
        assert_eq!(f.pool.get_pool_size(), 2);
    }

    #[test]
    fn test_build_wallets_after_expiry_keeps_chain_balance() {
        let mut f = fixture(&[("alice", 100)]);
        let max_age = f.pool.config().max_transaction_age_ms();
        f.pool.add_transaction(transfer("alice", 50, 1, 0)).unwrap();

        f.clock.advance(max_age + 1);
        f.pool.build_wallets();

        assert_eq!(f.pool.get_pool_size(), 0);
        let err = f.pool.add_transaction(transfer("alice", 140, 1, 1)).unwrap_err();
        assert_eq!(err.code(), "ERR_APPLY");
        f.pool.add_transaction(transfer("alice", 98, 1, 2)).unwrap();
        let wallet = f.pool.wallet_manager().index().get_by_address(&address_of("alice")).unwrap();
        assert_eq!(wallet.balance, BigAmount::from(1u64));
    }

    #[test]
    fn test_singleton_type_pending_lookup() {
        let mut f = fixture(&[("alice", 100)]);
        f.pool.add_transaction(transfer("alice", 1, 1, 0)).unwrap();
        assert!(f
            .pool
            .sender_has_transactions_of_type(&public_key("alice"), TransactionType::Transfer));
        assert!(!f
            .pool
            .sender_has_transactions_of_type(&public_key("alice"), TransactionType::Vote));
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    #[tokio::test]
    async fn test_make_restores_and_drops_forged() {
        let txs: Vec<Transaction> = (0..3).map(|n| transfer("alice", 1, 1, n)).collect();
        let records: Vec<PersistedTransaction> = txs
            .iter()
            .zip(0u64..)
            .map(|(tx, sequence)| {
                let mut entry = MemPoolTransaction::new(tx.clone(), 1_000);
                entry.sequence = sequence;
                entry.expires_at = Some(u64::MAX);
                PersistedTransaction::from(&entry)
            })
            .collect();

        let mut restored = TransactionPool::new(
            PoolConfig::for_testing(),
            Box::new(InMemoryPoolStorage::with_records(records)),
            chain(&[("alice", 1_000)]),
            Arc::new(MockTimeSource::new(1_000)),
            Arc::new(NullPublisher::default()),
        );
        restored
            .make(&Forged(vec![txs[1].id().to_string()]))
            .await
            .unwrap();

        assert_eq!(restored.get_pool_size(), 2);
        assert!(!restored.transaction_exists(txs[1].id()));
    }

    #[test]
    fn test_flush_empties_pool() {
        let mut f = fixture(&[("alice", 100)]);
        f.pool.add_transaction(transfer("alice", 1, 1, 0)).unwrap();
        f.pool.flush().unwrap();
        assert_eq!(f.pool.get_pool_size(), 0);
    }

    #[test]
    fn test_forging_order_and_hex() {
        let mut f = fixture(&[("alice", 100), ("bob", 100)]);
        let cheap = transfer("alice", 1, 1, 0);
        let rich = transfer("bob", 1, 9, 0);
        f.pool.add_transaction(cheap.clone()).unwrap();
        f.pool.add_transaction(rich.clone()).unwrap();

        assert_eq!(
            f.pool.get_transactions_for_forging(10),
            vec![rich.to_hex(), cheap.to_hex()]
        );
        assert_eq!(
            f.pool.get_transaction_ids_for_forging(1, 5),
            vec![cheap.id().to_string()]
        );
    }
}
