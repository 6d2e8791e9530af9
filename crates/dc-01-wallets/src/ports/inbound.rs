//! Inbound (Driving) ports for the wallet ledger.

use crate::domain::{Wallet, WalletIndex};

/// Read-only wallet lookups exposed to collaborators.
pub trait WalletReader {
    fn wallet_by_address(&self, address: &str) -> Option<Wallet>;

    fn wallet_by_public_key(&self, public_key: &str) -> Option<Wallet>;

    fn wallet_by_username(&self, username: &str) -> Option<Wallet>;

    fn local_wallets(&self) -> Vec<Wallet>;

    fn delegates(&self) -> Vec<Wallet>;
}

impl WalletReader for WalletIndex {
    fn wallet_by_address(&self, address: &str) -> Option<Wallet> {
        self.get_by_address(address).cloned()
    }

    fn wallet_by_public_key(&self, public_key: &str) -> Option<Wallet> {
        self.get_by_public_key(public_key).cloned()
    }

    fn wallet_by_username(&self, username: &str) -> Option<Wallet> {
        self.get_by_username(username).cloned()
    }

    fn local_wallets(&self) -> Vec<Wallet> {
        self.get_local_wallets().cloned().collect()
    }

    fn delegates(&self) -> Vec<Wallet> {
        self.get_delegates().cloned().collect()
    }
}

/// Readers over the lock-protected chain index take a read lock per call,
/// so each lookup observes one consistent height.
impl WalletReader for crate::SharedWalletIndex {
    fn wallet_by_address(&self, address: &str) -> Option<Wallet> {
        self.read().wallet_by_address(address)
    }

    fn wallet_by_public_key(&self, public_key: &str) -> Option<Wallet> {
        self.read().wallet_by_public_key(public_key)
    }

    fn wallet_by_username(&self, username: &str) -> Option<Wallet> {
        self.read().wallet_by_username(username)
    }

    fn local_wallets(&self) -> Vec<Wallet> {
        self.read().local_wallets()
    }

    fn delegates(&self) -> Vec<Wallet> {
        self.read().delegates()
    }
}
