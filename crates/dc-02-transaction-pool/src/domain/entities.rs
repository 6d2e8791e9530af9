//! Core domain entities for the transaction pool.

use serde::{Deserialize, Serialize};
use shared_types::{BigAmount, Id, PublicKey, Timestamp, Transaction, TransactionType};

/// A pooled transaction with its arrival bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemPoolTransaction {
    pub transaction: Transaction,
    /// Arrival order; ties between equal fees go to the earlier arrival.
    pub sequence: u64,
    /// Timestamp when added to the pool (ms).
    pub added_at: Timestamp,
    /// Timestamp after which the transaction is dropped (ms). Assigned by
    /// the pool on insertion unless restored from storage.
    pub expires_at: Option<Timestamp>,
}

impl MemPoolTransaction {
    pub fn new(transaction: Transaction, added_at: Timestamp) -> Self {
        Self {
            transaction,
            sequence: 0,
            added_at,
            expires_at: None,
        }
    }

    pub fn id(&self) -> &str {
        self.transaction.id()
    }

    pub fn fee(&self) -> &BigAmount {
        self.transaction.fee()
    }

    pub fn sender_public_key(&self) -> &str {
        self.transaction.sender_public_key()
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction.transaction_type()
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }
}

/// Row written to persistent pool storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedTransaction {
    pub id: Id,
    pub sender_public_key: PublicKey,
    /// Canonical transaction bytes.
    pub serialized: Vec<u8>,
    pub sequence: u64,
    pub added_at: Timestamp,
    pub expires_at: Timestamp,
}

impl From<&MemPoolTransaction> for PersistedTransaction {
    fn from(entry: &MemPoolTransaction) -> Self {
        Self {
            id: entry.id().to_string(),
            sender_public_key: entry.sender_public_key().to_string(),
            serialized: entry.transaction.serialized.clone(),
            sequence: entry.sequence,
            added_at: entry.added_at,
            expires_at: entry.expires_at.unwrap_or(Timestamp::MAX),
        }
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// One value per transaction type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTable<T> {
    pub transfer: T,
    pub second_signature: T,
    pub delegate_registration: T,
    pub vote: T,
    pub multi_signature: T,
    pub ipfs: T,
    pub timelock_transfer: T,
    pub multi_payment: T,
}

impl<T> TypeTable<T> {
    pub fn get(&self, transaction_type: TransactionType) -> &T {
        match transaction_type {
            TransactionType::Transfer => &self.transfer,
            TransactionType::SecondSignature => &self.second_signature,
            TransactionType::DelegateRegistration => &self.delegate_registration,
            TransactionType::Vote => &self.vote,
            TransactionType::MultiSignature => &self.multi_signature,
            TransactionType::Ipfs => &self.ipfs,
            TransactionType::TimelockTransfer => &self.timelock_transfer,
            TransactionType::MultiPayment => &self.multi_payment,
        }
    }
}

/// Fee policy for pool entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicFeeConfig {
    pub enabled: bool,
    /// Fee per byte required to enter the local pool.
    pub min_fee_pool: u64,
    /// Fee per byte required to be relayed to peers.
    pub min_fee_broadcast: u64,
    /// Virtual extra bytes charged per type.
    pub addon_bytes: TypeTable<u64>,
    /// Fixed fees required when dynamic fees are disabled.
    pub fees: TypeTable<u64>,
}

impl Default for DynamicFeeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_fee_pool: 3_000,
            min_fee_broadcast: 3_000,
            addon_bytes: TypeTable {
                transfer: 100,
                second_signature: 250,
                delegate_registration: 400_000,
                vote: 100,
                multi_signature: 500,
                ipfs: 250,
                timelock_transfer: 500,
                multi_payment: 500,
            },
            fees: TypeTable {
                transfer: 10_000_000,
                second_signature: 500_000_000,
                delegate_registration: 2_500_000_000,
                vote: 100_000_000,
                multi_signature: 500_000_000,
                ipfs: 0,
                timelock_transfer: 0,
                multi_payment: 0,
            },
        }
    }
}

/// Transaction pool configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_transactions_in_pool: usize,
    pub max_transactions_per_sender: usize,
    /// Senders exempt from the per-sender limit.
    pub allowed_senders: Vec<PublicKey>,
    /// Seconds a transaction may wait in the pool.
    pub max_transaction_age: u64,
    /// Number of unsynced changes that triggers a storage sync.
    pub sync_interval: usize,
    /// Seconds a sender stays blocked after a failed re-application.
    pub block_duration: u64,
    pub max_transactions_per_request: usize,
    pub dynamic_fees: DynamicFeeConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_transactions_in_pool: 100_000,
            max_transactions_per_sender: 300,
            allowed_senders: Vec::new(),
            max_transaction_age: 21_600,
            sync_interval: 512,
            block_duration: 3_600,
            max_transactions_per_request: 40,
            dynamic_fees: DynamicFeeConfig::default(),
        }
    }
}

impl PoolConfig {
    /// Small limits and a zero per-byte fee.
    pub fn for_testing() -> Self {
        Self {
            max_transactions_in_pool: 10,
            max_transactions_per_sender: 5,
            sync_interval: 1,
            dynamic_fees: DynamicFeeConfig {
                min_fee_pool: 0,
                min_fee_broadcast: 0,
                ..DynamicFeeConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn max_transaction_age_ms(&self) -> u64 {
        self.max_transaction_age.saturating_mul(1000)
    }

    pub fn block_duration_ms(&self) -> u64 {
        self.block_duration.saturating_mul(1000)
    }
}
