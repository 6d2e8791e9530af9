use shared_types::{BigAmount, TransactionAsset, TransactionData, TransactionType};

use super::{invalid_asset, singleton_per_sender, TransactionHandler};
use crate::domain::wallet::{AttributeValue, ATTR_DELEGATE_ROUND, ATTR_VOTE_BALANCE};
use crate::domain::{LedgerError, Wallet, WalletIndex};

pub(super) const HANDLER: TransactionHandler = TransactionHandler {
    transaction_type: TransactionType::DelegateRegistration,
    can_be_applied,
    apply,
    revert,
    can_enter_pool: singleton_per_sender,
};

const MAX_USERNAME_LEN: usize = 20;

fn username(tx: &TransactionData) -> Option<&str> {
    match &tx.asset {
        TransactionAsset::Delegate { username } => Some(username),
        _ => None,
    }
}

/// Lowercase alphanumerics plus `!@$&_.`, at most 20 characters.
pub fn is_valid_username(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_USERNAME_LEN
        && name.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || "!@$&_.".contains(c)
        })
}

fn can_be_applied(
    tx: &TransactionData,
    wallet: &Wallet,
    ledger: &WalletIndex,
) -> Result<(), LedgerError> {
    let Some(name) = username(tx) else {
        return Err(invalid_asset(tx, "missing username"));
    };
    if !is_valid_username(name) {
        return Err(invalid_asset(tx, format!("invalid username {name}")));
    }
    if wallet.username.is_some() {
        return Err(LedgerError::WalletAlreadyDelegate);
    }
    if ledger.get_by_username(name).is_some() {
        return Err(LedgerError::UsernameAlreadyRegistered(name.to_string()));
    }
    Ok(())
}

fn apply(tx: &TransactionData, wallet: &mut Wallet) {
    wallet.username = username(tx).map(str::to_string);
    wallet.attributes.insert(
        ATTR_VOTE_BALANCE.to_string(),
        AttributeValue::Amount(BigAmount::zero()),
    );
}

fn revert(_tx: &TransactionData, wallet: &mut Wallet) {
    wallet.username = None;
    wallet.attributes.remove(ATTR_VOTE_BALANCE);
    wallet.attributes.remove(ATTR_DELEGATE_ROUND);
}
