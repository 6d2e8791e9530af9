//! # Transaction Guard
//!
//! Request-time validation of an incoming batch. Stages run strictly in
//! order, each narrowing the candidate set left by the previous one:
//!
//! 1. Transform: decode and verify payloads, drop duplicates, pooled ids,
//!    blocked senders and types the pool refuses.
//! 2. Feasibility against the pool wallets.
//! 3. Dynamic fee match.
//! 4. Admission, splitting rate-limited senders into `excess`.

use std::collections::{BTreeMap, HashSet};

use dc_01_wallets::domain::handlers;
use shared_types::{AdmissionError, Id, Transaction, TransactionData};
use tracing::debug;

use super::dynamic_fee::{dynamic_fee_match, minimum_pool_fee};
use super::pool::TransactionPool;

/// Result buckets of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardCategory {
    /// Candidates that survived stages 1–3.
    Transactions,
    Accept,
    Excess,
    Invalid,
}

/// One refusal reason for a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardError {
    pub code: &'static str,
    pub message: String,
}

impl From<&AdmissionError> for GuardError {
    fn from(err: &AdmissionError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// The four buckets at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardCategories<T> {
    pub transactions: T,
    pub accept: T,
    pub excess: T,
    pub invalid: T,
}

pub struct TransactionGuard<'a> {
    pool: &'a mut TransactionPool,
    transactions: Vec<Transaction>,
    accept: Vec<Transaction>,
    excess: Vec<Transaction>,
    invalid: Vec<Transaction>,
    broadcast: HashSet<Id>,
    errors: BTreeMap<Id, Vec<GuardError>>,
}

impl<'a> TransactionGuard<'a> {
    pub fn new(pool: &'a mut TransactionPool) -> Self {
        Self {
            pool,
            transactions: Vec::new(),
            accept: Vec::new(),
            excess: Vec::new(),
            invalid: Vec::new(),
            broadcast: HashSet::new(),
            errors: BTreeMap::new(),
        }
    }

    /// Run the full pipeline over `batch`. Results replace any earlier run.
    pub fn validate(&mut self, batch: Vec<TransactionData>) {
        self.reset();

        let limit = self.pool.config().max_transactions_per_request;
        if batch.len() > limit {
            let err = AdmissionError::BadData(format!(
                "Received {} transactions, at most {} are accepted per request",
                batch.len(),
                limit
            ));
            for data in batch {
                self.push_error(&data.id, &err);
            }
            return;
        }

        self.transform_transactions(batch);
        self.determine_invalid_transactions();
        self.determine_fee_matching_transactions();
        self.determine_excess_transactions();

        debug!(
            accept = self.accept.len(),
            excess = self.excess.len(),
            invalid = self.invalid.len(),
            "[dc-02] Guard validation complete"
        );
    }

    fn transform_transactions(&mut self, batch: Vec<TransactionData>) {
        let mut seen = HashSet::new();
        for data in batch {
            if !seen.insert(data.id.clone()) {
                self.push_error(
                    &data.id,
                    &AdmissionError::BadData(format!("Duplicate transaction {} in request", data.id)),
                );
                continue;
            }

            let claimed_id = data.id.clone();
            let tx = match Transaction::from_data(data) {
                Ok(tx) => tx,
                Err(e) => {
                    self.push_error(&claimed_id, &AdmissionError::BadData(e.to_string()));
                    continue;
                }
            };

            if let Err(e) = self.check_transformed(&tx) {
                self.reject(tx, &e);
                continue;
            }
            self.transactions.push(tx);
        }
    }

    fn check_transformed(&mut self, tx: &Transaction) -> Result<(), AdmissionError> {
        if !tx.verified {
            return Err(AdmissionError::BadData(format!(
                "Transaction {} failed signature verification",
                tx.id()
            )));
        }
        if self.pool.transaction_exists(tx.id()) {
            return Err(AdmissionError::AlreadyInPool {
                id: tx.id().to_string(),
            });
        }
        if self.pool.is_sender_blocked(tx.sender_public_key()) {
            return Err(AdmissionError::SenderBlocked {
                sender: tx.sender_public_key().to_string(),
                until: self
                    .pool
                    .blocked_until(tx.sender_public_key())
                    .unwrap_or_default(),
            });
        }
        handlers::can_enter_pool(&tx.data, &*self.pool)
    }

    fn determine_invalid_transactions(&mut self) {
        let candidates = std::mem::take(&mut self.transactions);
        for tx in candidates {
            let mut reasons = Vec::new();
            if self
                .pool
                .wallet_manager_mut()
                .can_apply(&tx.data, &mut reasons)
            {
                self.transactions.push(tx);
            } else {
                self.reject(tx, &AdmissionError::Apply { reasons });
            }
        }
    }

    fn determine_fee_matching_transactions(&mut self) {
        let config = self.pool.config().dynamic_fees.clone();
        let candidates = std::mem::take(&mut self.transactions);
        for tx in candidates {
            let matched = dynamic_fee_match(&config, &tx);
            if !matched.enter_pool {
                let err = AdmissionError::LowFee {
                    fee: tx.fee().clone(),
                    minimum: minimum_pool_fee(&config, &tx),
                };
                self.reject(tx, &err);
                continue;
            }
            if matched.broadcast {
                self.broadcast.insert(tx.id().to_string());
            }
            self.transactions.push(tx);
        }
    }

    fn determine_excess_transactions(&mut self) {
        let result = self
            .pool
            .determine_excess_transactions(self.transactions.clone());
        self.accept = result.accept;
        self.excess = result.excess;
        for (tx, err) in result.invalid {
            self.reject(tx, &err);
        }
    }

    fn reject(&mut self, tx: Transaction, err: &AdmissionError) {
        self.push_error(tx.id(), err);
        self.invalid.push(tx);
    }

    fn push_error(&mut self, id: &str, err: &AdmissionError) {
        self.errors
            .entry(id.to_string())
            .or_default()
            .push(GuardError::from(err));
    }

    fn reset(&mut self) {
        self.transactions.clear();
        self.accept.clear();
        self.excess.clear();
        self.invalid.clear();
        self.broadcast.clear();
        self.errors.clear();
    }

    // =========================================================================
    // RESULTS
    // =========================================================================

    pub fn get_transactions(&self, category: GuardCategory) -> &[Transaction] {
        match category {
            GuardCategory::Transactions => &self.transactions,
            GuardCategory::Accept => &self.accept,
            GuardCategory::Excess => &self.excess,
            GuardCategory::Invalid => &self.invalid,
        }
    }

    pub fn get_ids(&self, category: GuardCategory) -> Vec<Id> {
        self.get_transactions(category)
            .iter()
            .map(|tx| tx.id().to_string())
            .collect()
    }

    pub fn get_all_transactions(&self) -> GuardCategories<&[Transaction]> {
        GuardCategories {
            transactions: &self.transactions,
            accept: &self.accept,
            excess: &self.excess,
            invalid: &self.invalid,
        }
    }

    pub fn get_all_ids(&self) -> GuardCategories<Vec<Id>> {
        GuardCategories {
            transactions: self.get_ids(GuardCategory::Transactions),
            accept: self.get_ids(GuardCategory::Accept),
            excess: self.get_ids(GuardCategory::Excess),
            invalid: self.get_ids(GuardCategory::Invalid),
        }
    }

    /// Accepted transactions whose fee also clears the relay threshold.
    pub fn get_broadcast(&self) -> Vec<&Transaction> {
        self.accept
            .iter()
            .filter(|tx| self.broadcast.contains(tx.id()))
            .collect()
    }

    /// Exactly `count` transactions in `category`.
    pub fn has(&self, category: GuardCategory, count: usize) -> bool {
        self.has_any(category) == count
    }

    pub fn has_at_least(&self, category: GuardCategory, count: usize) -> bool {
        self.has_any(category) >= count
    }

    /// Number of transactions in `category`.
    pub fn has_any(&self, category: GuardCategory) -> usize {
        self.get_transactions(category).len()
    }

    /// Refusal reasons by transaction id. Rejections before decoding are
    /// keyed by the claimed id.
    pub fn errors(&self) -> &BTreeMap<Id, Vec<GuardError>> {
        &self.errors
    }
}
