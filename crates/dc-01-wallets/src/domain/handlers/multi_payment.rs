use shared_types::{BigAmount, TransactionAsset, TransactionData, TransactionType};

use super::{always_enter_pool, invalid_asset, no_wallet_effect, TransactionHandler};
use crate::domain::{LedgerError, Wallet, WalletIndex};

pub(super) const HANDLER: TransactionHandler = TransactionHandler {
    transaction_type: TransactionType::MultiPayment,
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
    let TransactionAsset::Payments(payments) = &tx.asset else {
        return Err(invalid_asset(tx, "missing payments"));
    };
    if payments.is_empty() {
        return Err(invalid_asset(tx, "empty payment list"));
    }
    if payments.iter().any(|p| !p.amount.is_positive()) {
        return Err(invalid_asset(tx, "payment amounts must be positive"));
    }
    let sum: BigAmount = payments.iter().map(|p| &p.amount).sum();
    if sum != tx.amount {
        return Err(LedgerError::MultiPaymentAmountMismatch {
            sum,
            declared: tx.amount.clone(),
        });
    }
    Ok(())
}
