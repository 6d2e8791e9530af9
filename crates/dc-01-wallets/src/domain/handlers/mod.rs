//! # Transaction Handler Registry
//!
//! Per-type ledger semantics as a table of capability records, one per
//! [`TransactionType`]. A record bundles the type's feasibility check, its
//! wallet-attribute apply/revert pair and its pool-entry policy.
//!
//! The balance movement shared by every type (debit `amount + fee` from the
//! sender, credit each recipient) lives here, in
//! [`apply_to_sender`]/[`apply_to_recipient`] and their inverses. Handlers only
//! touch type-specific wallet state.
//!
//! Adding a type means extending [`TransactionType`] and [`HANDLERS`].

mod delegate_registration;
mod ipfs;
mod multi_payment;
mod multi_signature;
mod second_signature;
mod timelock_transfer;
mod transfer;
mod vote;

pub use delegate_registration::is_valid_username;

use shared_types::{AdmissionError, BigAmount, TransactionData, TransactionType};

use super::errors::LedgerError;
use super::wallet::Wallet;
use super::wallet_index::WalletIndex;
use crate::ports::PendingTransactions;

/// Type-specific precondition. The index is the authoritative ledger used for
/// cross-wallet lookups (delegate existence, username uniqueness).
pub type CanBeAppliedFn = fn(&TransactionData, &Wallet, &WalletIndex) -> Result<(), LedgerError>;

/// Type-specific mutation of the sender wallet.
pub type WalletEffectFn = fn(&TransactionData, &mut Wallet);

/// Pool admission policy, independent of ledger feasibility.
pub type CanEnterPoolFn =
    fn(&TransactionData, &dyn PendingTransactions) -> Result<(), AdmissionError>;

/// Capability record for one transaction type.
#[derive(Clone, Copy)]
pub struct TransactionHandler {
    pub transaction_type: TransactionType,
    pub can_be_applied: CanBeAppliedFn,
    pub apply: WalletEffectFn,
    pub revert: WalletEffectFn,
    pub can_enter_pool: CanEnterPoolFn,
}

/// Registry indexed by type id.
pub static HANDLERS: [TransactionHandler; 8] = [
    transfer::HANDLER,
    second_signature::HANDLER,
    delegate_registration::HANDLER,
    vote::HANDLER,
    multi_signature::HANDLER,
    ipfs::HANDLER,
    timelock_transfer::HANDLER,
    multi_payment::HANDLER,
];

pub fn handler_for(transaction_type: TransactionType) -> &'static TransactionHandler {
    &HANDLERS[transaction_type.id() as usize]
}

// =============================================================================
// SHARED SEMANTICS
// =============================================================================

/// Full feasibility check of `tx` against `wallet`: the checks common to every
/// type followed by the type's own precondition.
pub fn can_be_applied(
    tx: &TransactionData,
    wallet: &Wallet,
    ledger: &WalletIndex,
) -> Result<(), LedgerError> {
    if wallet.multisignature.is_some() {
        return Err(LedgerError::UnexpectedMultiSignature);
    }

    let required = &tx.amount + &tx.fee;
    if (&wallet.balance - &required).is_negative() {
        return Err(LedgerError::InsufficientBalance {
            balance: wallet.balance.clone(),
            required,
        });
    }

    if let Some(public_key) = wallet.public_key.as_deref() {
        if public_key != tx.sender_public_key {
            return Err(LedgerError::SenderWalletMismatch {
                sender: tx.sender_public_key.clone(),
                address: wallet.address.clone(),
            });
        }
    }

    match (wallet.second_public_key.as_deref(), tx.second_signature.is_some()) {
        (Some(_), false) => return Err(LedgerError::MissingSecondSignature),
        (Some(second), true) if !tx.verify_second_signature(second) => {
            return Err(LedgerError::InvalidSecondSignature)
        }
        (None, true) => return Err(LedgerError::UnexpectedSecondSignature),
        _ => {}
    }

    (handler_for(tx.transaction_type).can_be_applied)(tx, wallet, ledger)
}

fn is_sender(tx: &TransactionData, wallet: &Wallet) -> bool {
    if wallet.public_key.as_deref() == Some(tx.sender_public_key.as_str()) {
        return true;
    }
    matches!(tx.sender_address(), Ok(address) if address == wallet.address)
}

/// Debit `amount + fee` and apply the type's sender-side effect.
pub fn apply_to_sender(tx: &TransactionData, wallet: &mut Wallet) -> Result<(), LedgerError> {
    if !is_sender(tx, wallet) {
        return Err(LedgerError::SenderWalletMismatch {
            sender: tx.sender_public_key.clone(),
            address: wallet.address.clone(),
        });
    }
    wallet.balance -= &tx.amount;
    wallet.balance -= &tx.fee;
    (handler_for(tx.transaction_type).apply)(tx, wallet);
    wallet.dirty = true;
    Ok(())
}

/// Exact inverse of [`apply_to_sender`].
pub fn revert_for_sender(tx: &TransactionData, wallet: &mut Wallet) -> Result<(), LedgerError> {
    if !is_sender(tx, wallet) {
        return Err(LedgerError::SenderWalletMismatch {
            sender: tx.sender_public_key.clone(),
            address: wallet.address.clone(),
        });
    }
    wallet.balance += &tx.amount;
    wallet.balance += &tx.fee;
    (handler_for(tx.transaction_type).revert)(tx, wallet);
    wallet.dirty = true;
    Ok(())
}

/// Credit every leg of `tx` addressed to `wallet`. Returns the total credited.
pub fn apply_to_recipient(tx: &TransactionData, wallet: &mut Wallet) -> BigAmount {
    let credited: BigAmount = tx
        .recipients()
        .into_iter()
        .filter(|(address, _)| *address == wallet.address)
        .map(|(_, amount)| amount)
        .sum();
    if !credited.is_zero() {
        wallet.balance += &credited;
        wallet.dirty = true;
    }
    credited
}

/// Exact inverse of [`apply_to_recipient`].
pub fn revert_for_recipient(tx: &TransactionData, wallet: &mut Wallet) -> BigAmount {
    let debited: BigAmount = tx
        .recipients()
        .into_iter()
        .filter(|(address, _)| *address == wallet.address)
        .map(|(_, amount)| amount)
        .sum();
    if !debited.is_zero() {
        wallet.balance -= &debited;
        wallet.dirty = true;
    }
    debited
}

/// Pool admission for `tx`.
pub fn can_enter_pool(
    tx: &TransactionData,
    pool: &dyn PendingTransactions,
) -> Result<(), AdmissionError> {
    (handler_for(tx.transaction_type).can_enter_pool)(tx, pool)
}

// =============================================================================
// SHARED POLICY HELPERS
// =============================================================================

/// Admission policy for types the pool does not carry.
fn unsupported_in_pool(
    tx: &TransactionData,
    _pool: &dyn PendingTransactions,
) -> Result<(), AdmissionError> {
    Err(AdmissionError::Unsupported(tx.transaction_type))
}

/// Admission policy for types allowed at most once per sender in the pool.
fn singleton_per_sender(
    tx: &TransactionData,
    pool: &dyn PendingTransactions,
) -> Result<(), AdmissionError> {
    if pool.sender_has_transactions_of_type(&tx.sender_public_key, tx.transaction_type) {
        return Err(AdmissionError::Pending {
            sender: tx.sender_public_key.clone(),
            transaction_type: tx.transaction_type,
        });
    }
    Ok(())
}

fn always_enter_pool(
    _tx: &TransactionData,
    _pool: &dyn PendingTransactions,
) -> Result<(), AdmissionError> {
    Ok(())
}

fn no_wallet_effect(_tx: &TransactionData, _wallet: &mut Wallet) {}

fn invalid_asset(tx: &TransactionData, reason: impl Into<String>) -> LedgerError {
    LedgerError::InvalidAsset {
        transaction_type: tx.transaction_type,
        reason: reason.into(),
    }
}
