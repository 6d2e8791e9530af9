use shared_types::{TransactionAsset, TransactionData, TransactionType};

use super::{invalid_asset, singleton_per_sender, TransactionHandler};
use crate::domain::{LedgerError, Wallet, WalletIndex};

pub(super) const HANDLER: TransactionHandler = TransactionHandler {
    transaction_type: TransactionType::SecondSignature,
    can_be_applied,
    apply,
    revert,
    can_enter_pool: singleton_per_sender,
};

fn second_key(tx: &TransactionData) -> Option<&str> {
    match &tx.asset {
        TransactionAsset::Signature { public_key } => Some(public_key),
        _ => None,
    }
}

fn can_be_applied(
    tx: &TransactionData,
    wallet: &Wallet,
    _ledger: &WalletIndex,
) -> Result<(), LedgerError> {
    if wallet.second_public_key.is_some() {
        return Err(LedgerError::SecondSignatureAlreadyRegistered);
    }
    match second_key(tx) {
        Some(key) if shared_crypto::Ed25519PublicKey::from_hex(key).is_ok() => Ok(()),
        _ => Err(invalid_asset(tx, "missing or malformed second public key")),
    }
}

fn apply(tx: &TransactionData, wallet: &mut Wallet) {
    wallet.second_public_key = second_key(tx).map(str::to_string);
}

fn revert(_tx: &TransactionData, wallet: &mut Wallet) {
    wallet.second_public_key = None;
}
