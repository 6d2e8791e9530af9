//! # Domain Layer - Wallet Ledger
//!
//! - `wallet`: one account's ledger record
//! - `wallet_index`: all wallets of one ledger, with apply/revert
//! - `handlers`: per-transaction-type semantics
//! - `round`: delegate round arithmetic and schedules
//! - `errors`: `LedgerError`

pub mod errors;
pub mod handlers;
pub mod round;
pub mod wallet;
pub mod wallet_index;

pub use errors::*;
pub use round::*;
pub use wallet::*;
pub use wallet_index::*;
