//! # Genesis Block Builder
//!
//! Creates the genesis block of a fresh network from [`GenesisConfig`].
//!
//! The block is signed by the genesis wallet and carries, in order:
//!
//! 1. one transfer per funded account, sent by the genesis wallet
//! 2. one delegate registration per genesis delegate
//! 3. one self-vote per genesis delegate
//!
//! Genesis transactions are applied without balance checks, so the genesis
//! wallet may distribute more than it holds.

use std::collections::HashSet;

use dc_01_wallets::handlers::is_valid_username;
use serde::Deserialize;
use shared_crypto::{address_from_public_key, is_valid_address, Ed25519KeyPair};
use shared_types::{BigAmount, Block, BlockBuilder, CodecError, Transaction, TransactionBuilder};
use thiserror::Error;

/// Genesis block creation errors.
#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("Invalid genesis configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to encode genesis block: {0}")]
    Codec(#[from] CodecError),
}

/// Genesis block configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// Passphrase of the wallet that signs the block and funds the accounts.
    pub secret: String,

    /// Epoch time of the block, in seconds.
    pub timestamp: u32,

    pub accounts: Vec<GenesisAccount>,
    pub delegates: Vec<GenesisDelegate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenesisAccount {
    pub address: String,
    pub amount: BigAmount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenesisDelegate {
    pub username: String,
    /// Passphrase of the delegate wallet.
    pub secret: String,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            secret: "genesis".to_string(),
            timestamp: 0,
            accounts: Vec::new(),
            delegates: Vec::new(),
        }
    }
}

impl GenesisConfig {
    /// Development network: `count` delegates named `genesis_N`, each funded
    /// with `stake` and forging with the passphrase `delegate N`.
    pub fn devnet(count: usize, stake: BigAmount, network_version: u8) -> Result<Self, GenesisError> {
        let mut config = Self::default();
        for n in 1..=count {
            let secret = format!("delegate {n}");
            let public_key = Ed25519KeyPair::from_passphrase(&secret).public_key().to_hex();
            let address = address_from_public_key(&public_key, network_version)
                .map_err(|e| GenesisError::InvalidConfig(e.to_string()))?;
            config.accounts.push(GenesisAccount {
                address,
                amount: stake.clone(),
            });
            config.delegates.push(GenesisDelegate {
                username: format!("genesis_{n}"),
                secret,
            });
        }
        Ok(config)
    }

    /// Passphrases of the genesis delegates.
    pub fn delegate_secrets(&self) -> Vec<String> {
        self.delegates.iter().map(|d| d.secret.clone()).collect()
    }
}

/// Builder for the genesis block.
pub struct GenesisBuilder {
    config: GenesisConfig,
    network_version: u8,
}

impl GenesisBuilder {
    pub fn new(config: GenesisConfig, network_version: u8) -> Self {
        Self {
            config,
            network_version,
        }
    }

    pub fn build(&self) -> Result<Block, GenesisError> {
        self.validate()?;

        let genesis_keys = Ed25519KeyPair::from_passphrase(&self.config.secret);
        let mut transactions: Vec<Transaction> = Vec::new();

        for account in &self.config.accounts {
            transactions.push(
                TransactionBuilder::transfer(account.address.clone(), account.amount.clone())
                    .timestamp(self.config.timestamp)
                    .sign(&genesis_keys)
                    .build()?,
            );
        }

        let delegate_keys: Vec<Ed25519KeyPair> = self
            .config
            .delegates
            .iter()
            .map(|d| Ed25519KeyPair::from_passphrase(&d.secret))
            .collect();

        for (delegate, keys) in self.config.delegates.iter().zip(&delegate_keys) {
            transactions.push(
                TransactionBuilder::delegate_registration(delegate.username.clone())
                    .timestamp(self.config.timestamp)
                    .sign(keys)
                    .build()?,
            );
        }

        for keys in &delegate_keys {
            transactions.push(
                TransactionBuilder::vote(vec![format!("+{}", keys.public_key().to_hex())])
                    .timestamp(self.config.timestamp)
                    .sign(keys)
                    .build()?,
            );
        }

        let block = BlockBuilder::new(1, None)
            .timestamp(self.config.timestamp)
            .transactions(transactions)
            .sign(&genesis_keys)?;
        Ok(block)
    }

    fn validate(&self) -> Result<(), GenesisError> {
        if self.config.secret.is_empty() {
            return Err(GenesisError::InvalidConfig("empty genesis secret".into()));
        }

        let mut addresses = HashSet::new();
        for account in &self.config.accounts {
            if !is_valid_address(&account.address, self.network_version) {
                return Err(GenesisError::InvalidConfig(format!(
                    "invalid address {}",
                    account.address
                )));
            }
            if account.amount.is_zero() {
                return Err(GenesisError::InvalidConfig(format!(
                    "zero amount for {}",
                    account.address
                )));
            }
            if !addresses.insert(account.address.as_str()) {
                return Err(GenesisError::InvalidConfig(format!(
                    "duplicate account {}",
                    account.address
                )));
            }
        }

        let mut usernames = HashSet::new();
        let mut secrets = HashSet::new();
        for delegate in &self.config.delegates {
            if !is_valid_username(&delegate.username) {
                return Err(GenesisError::InvalidConfig(format!(
                    "invalid delegate username {}",
                    delegate.username
                )));
            }
            if !usernames.insert(delegate.username.as_str()) || !secrets.insert(delegate.secret.as_str()) {
                return Err(GenesisError::InvalidConfig(format!(
                    "duplicate delegate {}",
                    delegate.username
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dc_01_wallets::WalletIndex;
    use shared_types::{TransactionType, DEFAULT_NETWORK_VERSION};

    fn devnet(count: usize) -> GenesisConfig {
        GenesisConfig::devnet(count, BigAmount::from(1_000u64), DEFAULT_NETWORK_VERSION).unwrap()
    }

    // =========================================================================
    // Block content
    // =========================================================================

    #[test]
    fn test_default_genesis_is_empty_and_valid() {
        let block = GenesisBuilder::new(GenesisConfig::default(), DEFAULT_NETWORK_VERSION)
            .build()
            .unwrap();

        assert!(block.is_genesis());
        assert_eq!(block.height(), 1);
        assert!(block.transactions.is_empty());
        assert!(block.verification_errors().is_empty());
    }

    #[test]
    fn test_devnet_funds_registers_and_votes() {
        let block = GenesisBuilder::new(devnet(3), DEFAULT_NETWORK_VERSION)
            .build()
            .unwrap();

        let types: Vec<TransactionType> = block
            .transactions
            .iter()
            .map(|t| t.data.transaction_type)
            .collect();
        assert_eq!(
            types,
            vec![
                TransactionType::Transfer,
                TransactionType::Transfer,
                TransactionType::Transfer,
                TransactionType::DelegateRegistration,
                TransactionType::DelegateRegistration,
                TransactionType::DelegateRegistration,
                TransactionType::Vote,
                TransactionType::Vote,
                TransactionType::Vote,
            ]
        );
        assert!(block.verification_errors().is_empty());
    }

    #[test]
    fn test_devnet_genesis_applies_to_a_fresh_index() {
        let block = GenesisBuilder::new(devnet(3), DEFAULT_NETWORK_VERSION)
            .build()
            .unwrap();

        let mut index = WalletIndex::default();
        index.apply_block(&block).unwrap();

        assert_eq!(index.get_delegates().count(), 3);
        let round = index.build_round(1, 1, 3);
        assert_eq!(round.delegates.len(), 3);
        assert!(round
            .delegates
            .iter()
            .all(|d| d.vote_balance == BigAmount::from(1_000u64)));
    }

    #[test]
    fn test_same_config_same_payload_hash() {
        let a = GenesisBuilder::new(devnet(2), DEFAULT_NETWORK_VERSION).build().unwrap();
        let b = GenesisBuilder::new(devnet(2), DEFAULT_NETWORK_VERSION).build().unwrap();
        assert_eq!(a.data.payload_hash, b.data.payload_hash);
        assert_eq!(a.id(), b.id());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn test_rejects_invalid_address() {
        let mut config = GenesisConfig::default();
        config.accounts.push(GenesisAccount {
            address: "nope".into(),
            amount: BigAmount::from(1u64),
        });
        let err = GenesisBuilder::new(config, DEFAULT_NETWORK_VERSION).build().unwrap_err();
        assert!(matches!(err, GenesisError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_duplicate_delegates() {
        let mut config = devnet(1);
        config.delegates.push(config.delegates[0].clone());
        config.accounts.clear();
        let err = GenesisBuilder::new(config, DEFAULT_NETWORK_VERSION).build().unwrap_err();
        assert!(matches!(err, GenesisError::InvalidConfig(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_rejects_bad_username() {
        let mut config = GenesisConfig::default();
        config.delegates.push(GenesisDelegate {
            username: "Upper Case".into(),
            secret: "x".into(),
        });
        assert!(GenesisBuilder::new(config, DEFAULT_NETWORK_VERSION).build().is_err());
    }
}
