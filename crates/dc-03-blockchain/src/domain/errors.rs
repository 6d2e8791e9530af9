//! Error types for the blockchain subsystem.

use dc_01_wallets::LedgerError;
use dc_02_transaction_pool::PoolError;
use shared_types::{CodecError, Id};
use thiserror::Error;

/// Process exit status after the machine reaches `exit`.
pub const EXIT_FAILURE_CODE: i32 = 1;

#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Block storage failed: {0}")]
    Storage(String),

    #[error("Network request failed: {0}")]
    Network(String),

    #[error("Genesis payload hash {actual} does not match nethash {expected}")]
    GenesisMismatch { expected: String, actual: String },

    #[error("Block {id} at height {height} does not chain from {last_id} at height {last_height}")]
    ChainLink {
        id: Id,
        height: u64,
        last_id: Id,
        last_height: u64,
    },

    #[error("Block {id} failed verification: {reasons:?}")]
    Verification { id: Id, reasons: Vec<String> },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type Result<T> = std::result::Result<T, BlockchainError>;
