use shared_types::{TransactionData, TransactionType};

use super::{always_enter_pool, invalid_asset, no_wallet_effect, TransactionHandler};
use crate::domain::{LedgerError, Wallet, WalletIndex};

pub(super) const HANDLER: TransactionHandler = TransactionHandler {
    transaction_type: TransactionType::Transfer,
    can_be_applied,
    apply: no_wallet_effect,
    revert: no_wallet_effect,
    can_enter_pool: always_enter_pool,
};

fn can_be_applied(
    tx: &TransactionData,
    _wallet: &Wallet,
    _ledger: &WalletIndex,
) -> Result<(), LedgerError> {
    if tx.recipient_id.is_none() {
        return Err(invalid_asset(tx, "missing recipient"));
    }
    if tx.amount.is_negative() {
        return Err(invalid_asset(tx, "negative amount"));
    }
    Ok(())
}
