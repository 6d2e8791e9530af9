//! Transaction pool error types.

use dc_01_wallets::LedgerError;
use shared_types::CodecError;
use thiserror::Error;

/// Failures of the pool's storage and lifecycle paths. Admission refusals
/// are reported as [`shared_types::AdmissionError`] instead.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Pool storage I/O failed: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Pool storage is corrupt: {0}")]
    Corrupt(String),

    #[error("Pool storage is closed")]
    Closed,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Forged transaction lookup failed: {0}")]
    ForgedLookup(String),
}

pub type Result<T> = std::result::Result<T, PoolError>;
