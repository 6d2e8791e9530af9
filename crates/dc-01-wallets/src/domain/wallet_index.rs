//! # Wallet Index
//!
//! All wallets known to one ledger, reachable by address, public key and
//! username. The address map owns the wallets; the other two maps are
//! back-references into it, so a wallet reachable by public key is always
//! reachable by its derived address.
//!
//! The chain holds one index behind a lock (see [`crate::SharedWalletIndex`]);
//! the transaction pool holds its own, seeded from copies of chain wallets.

use std::collections::{BTreeSet, HashMap};

use shared_crypto::address_from_public_key;
use shared_types::{Address, BigAmount, Block, PublicKey, TransactionData, DEFAULT_NETWORK_VERSION};
use tracing::{debug, warn};

use super::errors::{LedgerError, Result};
use super::handlers;
use super::round::{DelegateEntry, Round};
use super::wallet::{AttributeValue, Wallet, ATTR_DELEGATE_ROUND, ATTR_VOTE_BALANCE};

/// Wallets touched by a block, as they were before it was applied.
type Journal = HashMap<Address, Option<Wallet>>;

#[derive(Debug, Clone, PartialEq)]
pub struct WalletIndex {
    network_version: u8,
    by_address: HashMap<Address, Wallet>,
    by_public_key: HashMap<PublicKey, Address>,
    by_username: HashMap<String, Address>,
}

impl Default for WalletIndex {
    fn default() -> Self {
        Self::new(DEFAULT_NETWORK_VERSION)
    }
}

impl WalletIndex {
    pub fn new(network_version: u8) -> Self {
        Self {
            network_version,
            by_address: HashMap::new(),
            by_public_key: HashMap::new(),
            by_username: HashMap::new(),
        }
    }

    pub fn network_version(&self) -> u8 {
        self.network_version
    }

    /// Address derived from `public_key` under this index's network version.
    pub fn address_of(&self, public_key: &str) -> Result<Address> {
        address_from_public_key(public_key, self.network_version)
            .map_err(|e| LedgerError::Codec(e.into()))
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// Existing wallet for `address`, or a fresh zero-balance one.
    pub fn find_by_address(&mut self, address: &str) -> &mut Wallet {
        self.by_address
            .entry(address.to_string())
            .or_insert_with(|| Wallet::new(address))
    }

    /// Existing wallet for `public_key`, or the wallet at its derived address
    /// with the key attached and indexed.
    pub fn find_by_public_key(&mut self, public_key: &str) -> Result<&mut Wallet> {
        let address = match self.by_public_key.get(public_key) {
            Some(address) => address.clone(),
            None => {
                let address = self.address_of(public_key)?;
                self.by_public_key
                    .insert(public_key.to_string(), address.clone());
                address
            }
        };
        let wallet = self
            .by_address
            .entry(address.clone())
            .or_insert_with(|| Wallet::new(address));
        if wallet.public_key.is_none() {
            wallet.public_key = Some(public_key.to_string());
        }
        Ok(wallet)
    }

    pub fn find_by_username(&mut self, username: &str) -> Option<&mut Wallet> {
        let address = self.by_username.get(username)?;
        self.by_address.get_mut(address)
    }

    pub fn get_by_address(&self, address: &str) -> Option<&Wallet> {
        self.by_address.get(address)
    }

    pub fn get_by_public_key(&self, public_key: &str) -> Option<&Wallet> {
        self.by_public_key
            .get(public_key)
            .and_then(|address| self.by_address.get(address))
    }

    pub fn get_by_username(&self, username: &str) -> Option<&Wallet> {
        self.by_username
            .get(username)
            .and_then(|address| self.by_address.get(address))
    }

    /// True if the key is a known address or an indexed public key.
    pub fn exists(&self, key: &str) -> bool {
        self.by_address.contains_key(key) || self.by_public_key.contains_key(key)
    }

    pub fn has_public_key(&self, public_key: &str) -> bool {
        self.by_public_key.contains_key(public_key)
    }

    pub fn is_delegate(&self, public_key: &str) -> bool {
        self.get_by_public_key(public_key)
            .is_some_and(Wallet::is_delegate)
    }

    /// Every wallet, in no particular order.
    pub fn get_local_wallets(&self) -> impl Iterator<Item = &Wallet> {
        self.by_address.values()
    }

    pub fn get_delegates(&self) -> impl Iterator<Item = &Wallet> {
        self.by_username
            .values()
            .filter_map(|address| self.by_address.get(address))
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }

    // =========================================================================
    // INDEX MAINTENANCE
    // =========================================================================

    /// Insert or replace `wallet` under every key it carries. Idempotent.
    pub fn reindex(&mut self, wallet: Wallet) {
        let stale_username = self
            .by_address
            .get(&wallet.address)
            .and_then(|previous| previous.username.clone())
            .filter(|old| wallet.username.as_ref() != Some(old));
        if let Some(old) = stale_username {
            if self.by_username.get(&old) == Some(&wallet.address) {
                self.by_username.remove(&old);
            }
        }
        if let Some(public_key) = &wallet.public_key {
            self.by_public_key
                .insert(public_key.clone(), wallet.address.clone());
        }
        if let Some(username) = &wallet.username {
            self.by_username
                .insert(username.clone(), wallet.address.clone());
        }
        self.by_address.insert(wallet.address.clone(), wallet);
    }

    pub fn forget_by_address(&mut self, address: &str) -> Option<Wallet> {
        self.by_address.remove(address)
    }

    pub fn forget_by_public_key(&mut self, public_key: &str) -> Option<Address> {
        self.by_public_key.remove(public_key)
    }

    pub fn forget_by_username(&mut self, username: &str) -> Option<Address> {
        self.by_username.remove(username)
    }

    /// Remove the wallet at `address` from all three maps.
    pub fn delete_wallet(&mut self, address: &str) -> Option<Wallet> {
        let wallet = self.by_address.remove(address)?;
        if let Some(public_key) = &wallet.public_key {
            self.by_public_key.remove(public_key);
        }
        if let Some(username) = &wallet.username {
            self.by_username.remove(username);
        }
        Some(wallet)
    }

    pub fn reset(&mut self) {
        self.by_address.clear();
        self.by_public_key.clear();
        self.by_username.clear();
    }

    /// Replace the contents with `wallets`, e.g. when loading from storage.
    pub fn load_from(&mut self, wallets: impl IntoIterator<Item = Wallet>) {
        self.reset();
        for wallet in wallets {
            self.reindex(wallet);
        }
    }

    /// Owned copy of a wallet, for seeding another index.
    pub fn clone_wallet(&self, address: &str) -> Option<Wallet> {
        self.by_address.get(address).cloned()
    }

    pub fn can_be_purged(wallet: &Wallet) -> bool {
        wallet.can_be_purged()
    }

    /// Drop every wallet satisfying the purge predicate. Returns how many.
    pub fn purge_empty_non_delegates(&mut self) -> usize {
        let purgeable: Vec<Address> = self
            .by_address
            .values()
            .filter(|w| w.can_be_purged())
            .map(|w| w.address.clone())
            .collect();
        for address in &purgeable {
            self.delete_wallet(address);
        }
        purgeable.len()
    }

    /// Mark every wallet clean, e.g. after a save.
    pub fn clear_dirty(&mut self) {
        for wallet in self.by_address.values_mut() {
            wallet.dirty = false;
        }
    }

    pub fn dirty_wallets(&self) -> impl Iterator<Item = &Wallet> {
        self.by_address.values().filter(|w| w.dirty)
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    /// Snapshot of the sender wallet as it would be found, without indexing it.
    fn sender_snapshot(&self, public_key: &str) -> Result<Wallet> {
        if let Some(wallet) = self.get_by_public_key(public_key) {
            return Ok(wallet.clone());
        }
        let address = self.address_of(public_key)?;
        let mut wallet = self
            .by_address
            .get(&address)
            .cloned()
            .unwrap_or_else(|| Wallet::new(address));
        wallet.public_key.get_or_insert_with(|| public_key.to_string());
        Ok(wallet)
    }

    /// Run `effect` on the sender wallet and keep the username map in step.
    fn update_sender(
        &mut self,
        public_key: &str,
        effect: fn(&TransactionData, &mut Wallet) -> Result<()>,
        tx: &TransactionData,
    ) -> Result<()> {
        let wallet = self.find_by_public_key(public_key)?;
        let previous = wallet.username.clone();
        effect(tx, wallet)?;
        let current = wallet.username.clone();
        let address = wallet.address.clone();

        if previous != current {
            if let Some(old) = previous {
                self.by_username.remove(&old);
            }
            if let Some(new) = current {
                self.by_username.insert(new, address);
            }
        }
        Ok(())
    }

    fn recipient_addresses(tx: &TransactionData) -> BTreeSet<Address> {
        tx.recipients().into_iter().map(|(address, _)| address).collect()
    }

    /// Check feasibility, debit the sender and credit every recipient.
    pub fn apply_transaction(&mut self, tx: &TransactionData) -> Result<()> {
        let sender = self.sender_snapshot(&tx.sender_public_key)?;
        handlers::can_be_applied(tx, &sender, self)?;

        self.apply_unchecked(tx)
    }

    fn apply_unchecked(&mut self, tx: &TransactionData) -> Result<()> {
        self.update_sender(&tx.sender_public_key, handlers::apply_to_sender, tx)?;
        for address in Self::recipient_addresses(tx) {
            handlers::apply_to_recipient(tx, self.find_by_address(&address));
        }
        Ok(())
    }

    /// Exact inverse of [`WalletIndex::apply_transaction`].
    pub fn revert_transaction(&mut self, tx: &TransactionData) -> Result<()> {
        for address in Self::recipient_addresses(tx) {
            handlers::revert_for_recipient(tx, self.find_by_address(&address));
        }
        self.update_sender(&tx.sender_public_key, handlers::revert_for_sender, tx)
    }

    /// Sender-side half of [`WalletIndex::apply_transaction`], used by the pool.
    pub fn apply_transaction_to_sender(&mut self, tx: &TransactionData) -> Result<()> {
        self.update_sender(&tx.sender_public_key, handlers::apply_to_sender, tx)
    }

    pub fn revert_transaction_for_sender(&mut self, tx: &TransactionData) -> Result<()> {
        self.update_sender(&tx.sender_public_key, handlers::revert_for_sender, tx)
    }

    /// Read-only feasibility check. Reasons for refusal are appended to
    /// `errors`.
    pub fn can_apply(&self, tx: &TransactionData, errors: &mut Vec<String>) -> bool {
        if !self.has_public_key(&tx.sender_public_key) {
            let cold = match self.address_of(&tx.sender_public_key) {
                Ok(address) => self
                    .get_by_address(&address)
                    .map_or(true, |w| w.balance.is_zero()),
                Err(e) => {
                    errors.push(e.to_string());
                    return false;
                }
            };
            if cold {
                errors.push(LedgerError::ColdWallet.to_string());
                return false;
            }
        }

        let outcome = self
            .sender_snapshot(&tx.sender_public_key)
            .and_then(|sender| handlers::can_be_applied(tx, &sender, self));
        match outcome {
            Ok(()) => true,
            Err(e) => {
                errors.push(e.to_string());
                false
            }
        }
    }

    // =========================================================================
    // BLOCKS
    // =========================================================================

    fn journal(&self, block: &Block) -> Result<Journal> {
        let mut addresses = BTreeSet::new();
        addresses.insert(self.address_of(&block.data.generator_public_key)?);
        for tx in &block.transactions {
            addresses.insert(self.address_of(&tx.data.sender_public_key)?);
            addresses.extend(Self::recipient_addresses(&tx.data));
        }
        Ok(addresses
            .into_iter()
            .map(|address| {
                let prior = self.by_address.get(&address).cloned();
                (address, prior)
            })
            .collect())
    }

    fn restore(&mut self, journal: Journal) {
        for (address, prior) in journal {
            self.delete_wallet(&address);
            if let Some(wallet) = prior {
                self.reindex(wallet);
            }
        }
    }

    /// Apply every transaction of `block` in order, then credit the
    /// generator. All or nothing: on failure the index is left exactly as it
    /// was and the failing transaction's position is reported.
    pub fn apply_block(&mut self, block: &Block) -> Result<()> {
        let generator = &block.data.generator_public_key;
        if !self.has_public_key(generator) && block.height() > 1 {
            return Err(LedgerError::UnknownGenerator(generator.clone()));
        }

        let journal = self.journal(block)?;
        for (index, tx) in block.transactions.iter().enumerate() {
            // Genesis distributes supply from a wallet that starts empty.
            let outcome = if block.is_genesis() {
                self.apply_unchecked(&tx.data)
            } else {
                self.apply_transaction(&tx.data)
            };
            if let Err(source) = outcome {
                warn!(
                    block = %block.id(),
                    height = block.height(),
                    index,
                    error = %source,
                    "Rolling back partially applied block"
                );
                for applied in block.transactions[..index].iter().rev() {
                    if let Err(e) = self.revert_transaction(&applied.data) {
                        warn!(tx = %applied.id(), error = %e, "Revert during rollback failed");
                    }
                }
                self.restore(journal);
                return Err(LedgerError::BlockApply {
                    index,
                    source: Box::new(source),
                });
            }
        }

        self.find_by_public_key(generator)?.apply_block(&block.data);
        debug!(height = block.height(), txs = block.transactions.len(), "Applied block to wallets");
        Ok(())
    }

    /// Exact inverse of [`WalletIndex::apply_block`].
    pub fn undo_block(&mut self, block: &Block) -> Result<()> {
        let generator = &block.data.generator_public_key;
        if !self.has_public_key(generator) {
            return Err(LedgerError::UnknownGenerator(generator.clone()));
        }
        self.find_by_public_key(generator)?.revert_block(&block.data);
        for tx in block.transactions.iter().rev() {
            self.revert_transaction(&tx.data)?;
        }
        debug!(height = block.height(), "Reverted block from wallets");
        Ok(())
    }

    // =========================================================================
    // ROUNDS
    // =========================================================================

    /// Recompute delegate vote balances and pick the `active` heaviest
    /// delegates for the round starting after `height`.
    pub fn build_round(&mut self, round: u64, height: u64, active: usize) -> Round {
        let mut weights: HashMap<PublicKey, BigAmount> = self
            .get_delegates()
            .filter_map(|d| d.public_key.clone())
            .map(|pk| (pk, BigAmount::zero()))
            .collect();
        for wallet in self.by_address.values() {
            if let Some(weight) = wallet.vote.as_ref().and_then(|pk| weights.get_mut(pk)) {
                *weight += &wallet.balance;
            }
        }

        let mut delegates: Vec<DelegateEntry> = Vec::with_capacity(weights.len());
        for (public_key, vote_balance) in weights {
            let Some(address) = self.by_public_key.get(&public_key) else {
                continue;
            };
            let Some(wallet) = self.by_address.get_mut(address) else {
                continue;
            };
            wallet.attributes.insert(
                ATTR_VOTE_BALANCE.to_string(),
                AttributeValue::Amount(vote_balance.clone()),
            );
            delegates.push(DelegateEntry {
                username: wallet.username.clone().unwrap_or_default(),
                public_key,
                vote_balance,
            });
        }

        delegates.sort_by(|a, b| {
            b.vote_balance
                .cmp(&a.vote_balance)
                .then_with(|| a.public_key.cmp(&b.public_key))
        });
        delegates.truncate(active);

        for delegate in &delegates {
            if let Some(wallet) = self
                .by_public_key
                .get(&delegate.public_key)
                .and_then(|address| self.by_address.get_mut(address))
            {
                wallet
                    .attributes
                    .insert(ATTR_DELEGATE_ROUND.to_string(), AttributeValue::Number(round));
            }
        }

        Round {
            round,
            height,
            delegates,
        }
    }
}
