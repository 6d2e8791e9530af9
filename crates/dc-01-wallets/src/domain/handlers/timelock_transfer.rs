use shared_types::{TransactionAsset, TransactionData, TransactionType};

use super::{invalid_asset, no_wallet_effect, unsupported_in_pool, TransactionHandler};
use crate::domain::{LedgerError, Wallet, WalletIndex};

pub(super) const HANDLER: TransactionHandler = TransactionHandler {
    transaction_type: TransactionType::TimelockTransfer,
    can_be_applied,
    apply: no_wallet_effect,
    revert: no_wallet_effect,
    can_enter_pool: unsupported_in_pool,
};

fn can_be_applied(
    tx: &TransactionData,
    _wallet: &Wallet,
    _ledger: &WalletIndex,
) -> Result<(), LedgerError> {
    if tx.recipient_id.is_none() {
        return Err(invalid_asset(tx, "missing recipient"));
    }
    match tx.asset {
        TransactionAsset::Timelock { value, .. } if value > 0 => Ok(()),
        _ => Err(invalid_asset(tx, "timelock must be positive")),
    }
}
