use shared_types::{TransactionAsset, TransactionData, TransactionType};

use super::{invalid_asset, singleton_per_sender, TransactionHandler};
use crate::domain::{LedgerError, Wallet, WalletIndex};

pub(super) const HANDLER: TransactionHandler = TransactionHandler {
    transaction_type: TransactionType::Vote,
    can_be_applied,
    apply,
    revert,
    can_enter_pool: singleton_per_sender,
};

enum Ballot<'a> {
    Vote(&'a str),
    Unvote(&'a str),
}

/// A vote transaction carries exactly one `+pk` or `-pk` entry.
fn ballot(tx: &TransactionData) -> Option<Ballot<'_>> {
    let TransactionAsset::Votes(votes) = &tx.asset else {
        return None;
    };
    let [entry] = votes.as_slice() else {
        return None;
    };
    if let Some(pk) = entry.strip_prefix('+') {
        Some(Ballot::Vote(pk))
    } else {
        entry.strip_prefix('-').map(Ballot::Unvote)
    }
}

fn can_be_applied(
    tx: &TransactionData,
    wallet: &Wallet,
    ledger: &WalletIndex,
) -> Result<(), LedgerError> {
    match ballot(tx) {
        None => Err(invalid_asset(tx, "expected a single +pk or -pk entry")),
        Some(Ballot::Vote(delegate)) => {
            if let Some(current) = &wallet.vote {
                return Err(LedgerError::AlreadyVoted(current.clone()));
            }
            if !ledger.is_delegate(delegate) {
                return Err(LedgerError::VotedForNonDelegate(delegate.to_string()));
            }
            Ok(())
        }
        Some(Ballot::Unvote(delegate)) => match &wallet.vote {
            None => Err(LedgerError::NoVote),
            Some(current) if current != delegate => Err(LedgerError::UnvoteMismatch {
                voted: current.clone(),
                requested: delegate.to_string(),
            }),
            Some(_) => Ok(()),
        },
    }
}

fn apply(tx: &TransactionData, wallet: &mut Wallet) {
    match ballot(tx) {
        Some(Ballot::Vote(delegate)) => wallet.vote = Some(delegate.to_string()),
        Some(Ballot::Unvote(_)) => wallet.vote = None,
        None => {}
    }
}

fn revert(tx: &TransactionData, wallet: &mut Wallet) {
    match ballot(tx) {
        Some(Ballot::Vote(_)) => wallet.vote = None,
        Some(Ballot::Unvote(delegate)) => wallet.vote = Some(delegate.to_string()),
        None => {}
    }
}
