//! # MemPool - In-Memory Transaction Index
//!
//! ## Data Structures
//!
//! - `by_id`: O(1) lookup by transaction id
//! - `by_fee`: O(log n) fee-ordered set (highest fee first, then arrival)
//! - `by_sender`: per-sender transactions in arrival order
//! - `by_expiration`: O(log n) expiry scan
//!
//! Every insertion and removal is tracked as dirty until the pool drains it
//! into persistent storage. A transaction added and removed between two syncs
//! never reaches storage.

use super::entities::MemPoolTransaction;
use super::value_objects::FeeOrderedKey;
use shared_types::{Id, PublicKey, Timestamp};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

#[derive(Debug, Default)]
pub struct MemPool {
    by_id: HashMap<Id, MemPoolTransaction>,
    by_fee: BTreeSet<FeeOrderedKey>,
    by_sender: HashMap<PublicKey, BTreeMap<u64, Id>>,
    by_expiration: BTreeSet<(Timestamp, u64, Id)>,
    dirty_added: HashSet<Id>,
    dirty_removed: HashSet<Id>,
    next_sequence: u64,
}

impl MemPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a transaction.
    ///
    /// Fresh arrivals get the next sequence number and an expiry of
    /// `added_at + max_age_ms`; restored entries keep their own. Only fresh
    /// arrivals are marked dirty.
    pub fn add(&mut self, mut entry: MemPoolTransaction, max_age_ms: u64, from_persisted: bool) {
        let id = entry.id().to_string();
        if self.by_id.contains_key(&id) {
            return;
        }

        if from_persisted {
            self.next_sequence = self.next_sequence.max(entry.sequence + 1);
        } else {
            entry.sequence = self.next_sequence;
            self.next_sequence += 1;
        }
        let expires_at = *entry
            .expires_at
            .get_or_insert(entry.added_at.saturating_add(max_age_ms));

        self.by_fee.insert(FeeOrderedKey::new(
            entry.fee().clone(),
            entry.sequence,
            id.clone(),
        ));
        self.by_sender
            .entry(entry.sender_public_key().to_string())
            .or_default()
            .insert(entry.sequence, id.clone());
        self.by_expiration
            .insert((expires_at, entry.sequence, id.clone()));

        if !from_persisted {
            self.dirty_added.insert(id.clone());
        }
        self.by_id.insert(id, entry);
    }

    /// Remove a transaction from every index.
    pub fn remove(&mut self, id: &str) -> Option<MemPoolTransaction> {
        let entry = self.by_id.remove(id)?;

        self.by_fee.remove(&FeeOrderedKey::new(
            entry.fee().clone(),
            entry.sequence,
            id.to_string(),
        ));
        if let Some(sender_txs) = self.by_sender.get_mut(entry.sender_public_key()) {
            sender_txs.remove(&entry.sequence);
            if sender_txs.is_empty() {
                self.by_sender.remove(entry.sender_public_key());
            }
        }
        if let Some(expires_at) = entry.expires_at {
            self.by_expiration
                .remove(&(expires_at, entry.sequence, id.to_string()));
        }

        // Never persisted: nothing to delete from storage.
        if !self.dirty_added.remove(id) {
            self.dirty_removed.insert(id.to_string());
        }
        Some(entry)
    }

    /// Transactions by descending fee, earlier arrival first among equals.
    pub fn get_transactions_ordered_by_fee(&self) -> impl Iterator<Item = &MemPoolTransaction> {
        self.by_fee.iter().filter_map(|key| self.by_id.get(&key.id))
    }

    /// The transaction an overflow would evict.
    pub fn lowest_fee(&self) -> Option<&MemPoolTransaction> {
        self.by_fee
            .iter()
            .next_back()
            .and_then(|key| self.by_id.get(&key.id))
    }

    /// Transactions whose expiry lies strictly before `now`, soonest first.
    pub fn get_expired(&self, now: Timestamp) -> Vec<MemPoolTransaction> {
        self.by_expiration
            .iter()
            .take_while(|(expires_at, _, _)| *expires_at < now)
            .filter_map(|(_, _, id)| self.by_id.get(id).cloned())
            .collect()
    }

    /// A sender's transactions in arrival order.
    pub fn get_by_sender(&self, sender_public_key: &str) -> Vec<&MemPoolTransaction> {
        self.by_sender
            .get(sender_public_key)
            .map(|txs| txs.values().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn get_size_by_sender(&self, sender_public_key: &str) -> usize {
        self.by_sender
            .get(sender_public_key)
            .map_or(0, BTreeMap::len)
    }

    pub fn has(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get_by_id(&self, id: &str) -> Option<&MemPoolTransaction> {
        self.by_id.get(id)
    }

    pub fn size(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Drop everything, including pending dirty state.
    pub fn flush(&mut self) {
        *self = Self {
            next_sequence: self.next_sequence,
            ..Self::default()
        };
    }

    pub fn get_number_of_dirty(&self) -> usize {
        self.dirty_added.len() + self.dirty_removed.len()
    }

    /// Added entries not yet persisted. Clears the set.
    pub fn get_dirty_added_and_forget(&mut self) -> Vec<MemPoolTransaction> {
        let mut added: Vec<MemPoolTransaction> = self
            .dirty_added
            .drain()
            .filter_map(|id| self.by_id.get(&id).cloned())
            .collect();
        added.sort_by_key(|entry| entry.sequence);
        added
    }

    /// Ids removed since the last sync. Clears the set.
    pub fn get_dirty_removed_and_forget(&mut self) -> Vec<Id> {
        let mut removed: Vec<Id> = self.dirty_removed.drain().collect();
        removed.sort();
        removed
    }
}
