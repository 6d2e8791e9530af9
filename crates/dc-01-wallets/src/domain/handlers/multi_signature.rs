use shared_types::{MultiSignatureAsset, TransactionAsset, TransactionData, TransactionType};

use super::{invalid_asset, unsupported_in_pool, TransactionHandler};
use crate::domain::{LedgerError, Wallet, WalletIndex};

pub(super) const HANDLER: TransactionHandler = TransactionHandler {
    transaction_type: TransactionType::MultiSignature,
    can_be_applied,
    apply,
    revert,
    can_enter_pool: unsupported_in_pool,
};

/// Lifetime bounds in hours.
const LIFETIME: std::ops::RangeInclusive<u8> = 1..=72;

fn asset(tx: &TransactionData) -> Option<&MultiSignatureAsset> {
    match &tx.asset {
        TransactionAsset::MultiSignature(asset) => Some(asset),
        _ => None,
    }
}

fn can_be_applied(
    tx: &TransactionData,
    _wallet: &Wallet,
    _ledger: &WalletIndex,
) -> Result<(), LedgerError> {
    let Some(asset) = asset(tx) else {
        return Err(invalid_asset(tx, "missing multisignature asset"));
    };
    if asset.keysgroup.is_empty() || asset.keysgroup.iter().any(|k| !k.starts_with('+')) {
        return Err(invalid_asset(tx, "keysgroup entries must be +pk"));
    }
    if asset.min == 0 || usize::from(asset.min) > asset.keysgroup.len() {
        return Err(invalid_asset(tx, "min out of range"));
    }
    if !LIFETIME.contains(&asset.lifetime) {
        return Err(invalid_asset(tx, "lifetime out of range"));
    }
    Ok(())
}

fn apply(tx: &TransactionData, wallet: &mut Wallet) {
    wallet.multisignature = asset(tx).cloned();
}

fn revert(_tx: &TransactionData, wallet: &mut Wallet) {
    wallet.multisignature = None;
}
