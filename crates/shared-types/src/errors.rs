//! # Error Types
//!
//! Errors shared by the pool, the ledger and the block pipeline.

use shared_crypto::CryptoError;
use thiserror::Error;

use crate::amount::BigAmount;
use crate::entities::TransactionType;

/// Encoding and decoding failures for transactions and blocks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Transaction id mismatch: claimed {claimed}, computed {computed}")]
    IdMismatch { claimed: String, computed: String },

    #[error("Unknown transaction type {0}")]
    UnknownType(u8),

    #[error("Invalid key: {0}")]
    Key(#[from] CryptoError),
}

impl From<bincode::Error> for CodecError {
    fn from(err: bincode::Error) -> Self {
        CodecError::Serialization(err.to_string())
    }
}

/// Reasons a transaction is refused entry to the pool.
///
/// Returned to the submitter; never escalated past the pool boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("Duplicate transaction {id}")]
    AlreadyInPool { id: String },

    #[error("Pool is full ({limit} transactions) and fee {fee} does not beat the lowest pooled fee")]
    PoolFull { limit: usize, fee: BigAmount },

    #[error("{}", .reasons.join(", "))]
    Apply { reasons: Vec<String> },

    #[error("Transaction type {0} is not supported by the pool")]
    Unsupported(TransactionType),

    #[error("Sender {sender} already has a transaction of type {transaction_type} in the pool")]
    Pending {
        sender: String,
        transaction_type: TransactionType,
    },

    #[error("Sender {sender} is blocked until {until}")]
    SenderBlocked { sender: String, until: u64 },

    #[error("Sender {sender} exceeded the limit of {limit} pooled transactions")]
    ExceedsMaxCount { sender: String, limit: usize },

    #[error("Fee {fee} is below the minimum {minimum}")]
    LowFee { fee: BigAmount, minimum: BigAmount },

    #[error("Malformed transaction: {0}")]
    BadData(String),
}

impl AdmissionError {
    /// Stable error code reported to submitters.
    pub fn code(&self) -> &'static str {
        match self {
            AdmissionError::AlreadyInPool { .. } => "ERR_ALREADY_IN_POOL",
            AdmissionError::PoolFull { .. } => "ERR_POOL_FULL",
            AdmissionError::Apply { .. } => "ERR_APPLY",
            AdmissionError::Unsupported(_) => "ERR_UNSUPPORTED",
            AdmissionError::Pending { .. } => "ERR_PENDING",
            AdmissionError::SenderBlocked { .. } => "ERR_SENDER_BLOCKED",
            AdmissionError::ExceedsMaxCount { .. } => "ERR_EXCEEDS_MAX_COUNT",
            AdmissionError::LowFee { .. } => "ERR_LOW_FEE",
            AdmissionError::BadData(_) => "ERR_BAD_DATA",
        }
    }
}
