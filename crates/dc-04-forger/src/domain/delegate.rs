//! Local delegates able to sign blocks.

use shared_crypto::{address_from_public_key, Ed25519KeyPair};
use shared_types::{Address, Block, BlockBuilder, PublicKey, Transaction};

use super::round::RoundInfo;
use crate::error::{ForgerError, Result};

pub struct Delegate {
    keys: Ed25519KeyPair,
    public_key: PublicKey,
    address: Address,
}

impl Delegate {
    pub fn from_passphrase(passphrase: &str, network_version: u8) -> Result<Self> {
        let keys = Ed25519KeyPair::from_passphrase(passphrase);
        let public_key = keys.public_key().to_hex();
        let address = address_from_public_key(&public_key, network_version)
            .map_err(|e| ForgerError::Node(e.to_string()))?;
        Ok(Self {
            keys,
            public_key,
            address,
        })
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Sign a block on top of the round's last block, in the round's slot.
    pub fn forge(&self, transactions: Vec<Transaction>, round: &RoundInfo) -> Result<Block> {
        let block = BlockBuilder::on_top_of(&round.last_block)
            .timestamp(round.timestamp)
            .reward(round.reward.clone())
            .transactions(transactions)
            .sign(&self.keys)?;
        Ok(block)
    }
}

impl std::fmt::Debug for Delegate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delegate")
            .field("public_key", &self.public_key)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Delegates for every configured passphrase.
pub fn load_delegates(secrets: &[String], network_version: u8) -> Result<Vec<Delegate>> {
    if secrets.is_empty() {
        return Err(ForgerError::NoDelegate);
    }
    secrets
        .iter()
        .map(|secret| Delegate::from_passphrase(secret, network_version))
        .collect()
}
