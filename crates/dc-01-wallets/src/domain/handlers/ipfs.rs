use shared_types::{TransactionAsset, TransactionData, TransactionType};

use super::{invalid_asset, unsupported_in_pool, TransactionHandler};
use crate::domain::wallet::{AttributeValue, ATTR_IPFS_HASHES};
use crate::domain::{LedgerError, Wallet, WalletIndex};

pub(super) const HANDLER: TransactionHandler = TransactionHandler {
    transaction_type: TransactionType::Ipfs,
    can_be_applied,
    apply,
    revert,
    can_enter_pool: unsupported_in_pool,
};

const MAX_HASH_LEN: usize = 90;

fn hash(tx: &TransactionData) -> Option<&str> {
    match &tx.asset {
        TransactionAsset::Ipfs(hash) => Some(hash),
        _ => None,
    }
}

fn registered(wallet: &Wallet) -> &[String] {
    match wallet.attributes.get(ATTR_IPFS_HASHES) {
        Some(AttributeValue::List(hashes)) => hashes,
        _ => &[],
    }
}

fn can_be_applied(
    tx: &TransactionData,
    wallet: &Wallet,
    _ledger: &WalletIndex,
) -> Result<(), LedgerError> {
    match hash(tx) {
        Some(h) if !h.is_empty() && h.len() <= MAX_HASH_LEN => {
            if registered(wallet).iter().any(|known| known == h) {
                Err(invalid_asset(tx, format!("hash {h} already registered")))
            } else {
                Ok(())
            }
        }
        _ => Err(invalid_asset(tx, "missing or oversized hash")),
    }
}

fn apply(tx: &TransactionData, wallet: &mut Wallet) {
    let Some(h) = hash(tx) else { return };
    let mut hashes = registered(wallet).to_vec();
    hashes.push(h.to_string());
    wallet
        .attributes
        .insert(ATTR_IPFS_HASHES.to_string(), AttributeValue::List(hashes));
}

fn revert(tx: &TransactionData, wallet: &mut Wallet) {
    let Some(h) = hash(tx) else { return };
    let mut hashes = registered(wallet).to_vec();
    if let Some(pos) = hashes.iter().rposition(|known| known == h) {
        hashes.remove(pos);
    }
    if hashes.is_empty() {
        wallet.attributes.remove(ATTR_IPFS_HASHES);
    } else {
        wallet
            .attributes
            .insert(ATTR_IPFS_HASHES.to_string(), AttributeValue::List(hashes));
    }
}
