//! # Wallet
//!
//! One account's mutable ledger record. A wallet belongs to exactly one
//! [`WalletIndex`](super::WalletIndex); the pool works on its own copies.

use serde::{Deserialize, Serialize};
use shared_types::{Address, BigAmount, BlockData, MultiSignatureAsset, PublicKey};
use std::collections::BTreeMap;

/// Attribute key for a delegate's accumulated vote weight.
pub const ATTR_VOTE_BALANCE: &str = "delegate.voteBalance";
/// Attribute key for the round a delegate was last scheduled in.
pub const ATTR_DELEGATE_ROUND: &str = "delegate.round";
/// Attribute key for IPFS hashes registered by the wallet.
pub const ATTR_IPFS_HASHES: &str = "ipfs.hashes";

/// Value stored in the open attribute map. Tagged so that a numeric
/// looking `Text` reads back as `Text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    Amount(BigAmount),
    Number(u64),
    Text(String),
    List(Vec<String>),
}

/// Account state: balance, keys and delegate/vote attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub address: Address,
    pub public_key: Option<PublicKey>,
    pub second_public_key: Option<PublicKey>,
    pub balance: BigAmount,
    /// Public key of the delegate this wallet votes for.
    pub vote: Option<PublicKey>,
    pub username: Option<String>,
    pub multisignature: Option<MultiSignatureAsset>,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub produced_blocks: u64,
    pub forged_fees: BigAmount,
    pub forged_rewards: BigAmount,
    /// Set whenever a transaction touches the wallet; cleared on persist.
    pub dirty: bool,
}

impl Wallet {
    /// Zero-balance wallet for an address.
    pub fn new(address: impl Into<Address>) -> Self {
        Self {
            address: address.into(),
            public_key: None,
            second_public_key: None,
            balance: BigAmount::zero(),
            vote: None,
            username: None,
            multisignature: None,
            attributes: BTreeMap::new(),
            produced_blocks: 0,
            forged_fees: BigAmount::zero(),
            forged_rewards: BigAmount::zero(),
            dirty: false,
        }
    }

    pub fn is_delegate(&self) -> bool {
        self.username.is_some()
    }

    /// True iff the wallet carries nothing worth keeping: zero balance and no
    /// second key, multisignature or username.
    pub fn can_be_purged(&self) -> bool {
        self.balance.is_zero()
            && self.second_public_key.is_none()
            && self.multisignature.is_none()
            && self.username.is_none()
    }

    pub fn vote_balance(&self) -> BigAmount {
        match self.attributes.get(ATTR_VOTE_BALANCE) {
            Some(AttributeValue::Amount(amount)) => amount.clone(),
            _ => BigAmount::zero(),
        }
    }

    /// Credit the generator with the block reward and fees.
    ///
    /// Returns false if this wallet did not forge the block.
    pub fn apply_block(&mut self, block: &BlockData) -> bool {
        if !self.forged(block) {
            return false;
        }
        self.balance += &block.reward;
        self.balance += &block.total_fee;
        self.forged_fees += &block.total_fee;
        self.forged_rewards += &block.reward;
        self.produced_blocks += 1;
        self.dirty = true;
        true
    }

    /// Exact inverse of [`Wallet::apply_block`].
    pub fn revert_block(&mut self, block: &BlockData) -> bool {
        if !self.forged(block) {
            return false;
        }
        self.balance -= &block.reward;
        self.balance -= &block.total_fee;
        self.forged_fees -= &block.total_fee;
        self.forged_rewards -= &block.reward;
        self.produced_blocks = self.produced_blocks.saturating_sub(1);
        self.dirty = true;
        true
    }

    fn forged(&self, block: &BlockData) -> bool {
        self.public_key.as_deref() == Some(block.generator_public_key.as_str())
    }
}
