//! # Pool Wallet Manager
//!
//! Speculative wallets for pending transactions. A pool wallet is forked from
//! the confirmed-chain wallet the first time the pool touches its address and
//! evolves independently from then on. Data only flows chain → pool, except
//! through confirmed blocks handed to the pool.

use dc_01_wallets::domain::handlers;
use dc_01_wallets::{LedgerError, SharedWalletIndex, Wallet, WalletIndex};
use shared_types::{Address, BlockData, TransactionAsset, TransactionData, TransactionType};
use std::collections::BTreeSet;
use tracing::error;

pub struct PoolWalletManager {
    chain: SharedWalletIndex,
    index: WalletIndex,
}

impl PoolWalletManager {
    pub fn new(chain: SharedWalletIndex) -> Self {
        let network_version = chain.read().network_version();
        Self {
            chain,
            index: WalletIndex::new(network_version),
        }
    }

    /// The pool-local index.
    pub fn index(&self) -> &WalletIndex {
        &self.index
    }

    pub fn exists(&self, key: &str) -> bool {
        self.index.exists(key)
    }

    /// Fork the chain wallet at `address` into the pool if not already there.
    fn seed_address(&mut self, address: &str) {
        if self.index.exists(address) {
            return;
        }
        if let Some(wallet) = self.chain.read().clone_wallet(address) {
            self.index.reindex(wallet);
        }
    }

    fn seed_public_key(&mut self, public_key: &str) -> Result<(), LedgerError> {
        if !self.index.has_public_key(public_key) {
            let address = self.index.address_of(public_key)?;
            self.seed_address(&address);
        }
        Ok(())
    }

    pub fn find_by_address(&mut self, address: &str) -> &mut Wallet {
        self.seed_address(address);
        self.index.find_by_address(address)
    }

    pub fn find_by_public_key(&mut self, public_key: &str) -> Result<&mut Wallet, LedgerError> {
        self.seed_public_key(public_key)?;
        self.index.find_by_public_key(public_key)
    }

    /// Full admission check against pool state, with the lookups that must
    /// see confirmed state (cold wallets, delegate names, vote targets) made
    /// against the chain.
    pub fn can_apply(&mut self, tx: &TransactionData, errors: &mut Vec<String>) -> bool {
        {
            let chain = self.chain.read();
            if !chain.has_public_key(&tx.sender_public_key) {
                let funded = chain
                    .address_of(&tx.sender_public_key)
                    .ok()
                    .and_then(|address| chain.get_by_address(&address).map(|w| !w.balance.is_zero()))
                    .unwrap_or(false);
                if !funded {
                    errors.push(LedgerError::ColdWallet.to_string());
                    return false;
                }
            }

            match (&tx.transaction_type, &tx.asset) {
                (TransactionType::DelegateRegistration, TransactionAsset::Delegate { username })
                    if chain.get_by_username(&username.to_lowercase()).is_some() =>
                {
                    error!(id = %tx.id, username = %username, "[dc-02] Delegate name already taken");
                    errors.push(format!(
                        "Can't apply transaction {}: delegate name already taken.",
                        tx.id
                    ));
                    return false;
                }
                (TransactionType::Vote, TransactionAsset::Votes(votes)) => {
                    let target = votes.first().map(|v| v.get(1..).unwrap_or_default());
                    if let Some(target) = target.filter(|pk| !chain.is_delegate(pk)) {
                        error!(id = %tx.id, delegate = %target, "[dc-02] Vote for unknown delegate");
                        errors.push(format!(
                            "Can't apply transaction {}: delegate {} does not exist.",
                            tx.id, votes[0]
                        ));
                        return false;
                    }
                }
                _ => {}
            }
        }

        self.can_apply_to_sender(tx, errors)
    }

    /// Feasibility of `tx` against the sender's pool wallet only.
    pub fn can_apply_to_sender(&mut self, tx: &TransactionData, errors: &mut Vec<String>) -> bool {
        let sender = match self.find_by_public_key(&tx.sender_public_key) {
            Ok(wallet) => wallet.clone(),
            Err(e) => {
                errors.push(e.to_string());
                return false;
            }
        };
        match handlers::can_be_applied(tx, &sender, &self.index) {
            Ok(()) => true,
            Err(e) => {
                errors.push(format!(
                    "Can't apply transaction id:{} from sender:{}",
                    tx.id, sender.address
                ));
                errors.push(e.to_string());
                false
            }
        }
    }

    pub fn apply_transaction_to_sender(&mut self, tx: &TransactionData) -> Result<(), LedgerError> {
        self.seed_public_key(&tx.sender_public_key)?;
        self.index.apply_transaction_to_sender(tx)
    }

    pub fn revert_transaction_for_sender(&mut self, tx: &TransactionData) -> Result<(), LedgerError> {
        self.seed_public_key(&tx.sender_public_key)?;
        self.index.revert_transaction_for_sender(tx)
    }

    /// Credit recipients of a confirmed transaction that the pool already
    /// tracks. Untracked recipients are picked up from the chain on first use.
    pub fn apply_transaction_to_recipients(&mut self, tx: &TransactionData) {
        // One call credits every leg addressed to the wallet.
        let addresses: BTreeSet<Address> =
            tx.recipients().into_iter().map(|(address, _)| address).collect();
        for address in addresses {
            if let Some(wallet) = self.index.get_by_address(&address) {
                let mut wallet = wallet.clone();
                handlers::apply_to_recipient(tx, &mut wallet);
                self.index.reindex(wallet);
            }
        }
    }

    /// Credit a tracked generator with reward and fees.
    pub fn credit_generator(&mut self, block: &BlockData) {
        if !self.index.has_public_key(&block.generator_public_key) {
            return;
        }
        if let Ok(wallet) = self.index.find_by_public_key(&block.generator_public_key) {
            wallet.balance += &block.reward;
            wallet.balance += &block.total_fee;
        }
    }

    /// Drop the wallet of `public_key` from the pool.
    pub fn delete_wallet(&mut self, public_key: &str) {
        match self.index.address_of(public_key) {
            Ok(address) => {
                self.index.forget_by_public_key(public_key);
                self.index.delete_wallet(&address);
            }
            Err(_) => {
                self.index.forget_by_public_key(public_key);
            }
        }
    }

    pub fn can_be_purged(&self, public_key: &str) -> bool {
        self.index
            .get_by_public_key(public_key)
            .is_some_and(WalletIndex::can_be_purged)
    }

    pub fn reset(&mut self) {
        self.index.reset();
    }
}
