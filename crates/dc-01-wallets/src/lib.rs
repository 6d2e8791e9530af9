//! # Wallet Ledger
//!
//! Account balances, keys and delegate/vote state for Delegate-Chain, plus
//! the per-type transaction semantics that move them.
//!
//! ## Apply/Revert Symmetry
//!
//! Every mutation has an exact inverse. Applying a transaction and then
//! reverting it leaves every touched wallet equal to its prior value; block
//! application is all or nothing.
//!
//! ```text
//! apply_block ──► apply_transaction × N ──► generator.apply_block
//!      │                  │ fails at k
//!      │                  ▼
//!      │          revert 0..k (reverse) ──► restore journal ──► BlockApply { index: k }
//!      ▼
//! undo_block ──► generator.revert_block ──► revert_transaction × N (reverse)
//! ```
//!
//! ## Module Structure
//!
//! ```text
//! domain/wallet.rs        - Wallet, attributes, purge predicate
//! domain/wallet_index.rs  - WalletIndex (address / public key / username)
//! domain/handlers/        - per-type TransactionHandler registry
//! domain/round.rs         - delegate rounds
//! ports/inbound.rs        - WalletReader
//! ports/outbound.rs       - PendingTransactions
//! ```

pub mod domain;
pub mod ports;

pub use domain::*;
pub use ports::*;

use parking_lot::RwLock;
use std::sync::Arc;

/// The confirmed-chain index: written by block apply/undo only, read
/// everywhere else.
pub type SharedWalletIndex = Arc<RwLock<WalletIndex>>;
