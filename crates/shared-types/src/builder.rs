//! Fluent builders for signed transactions and blocks.
//!
//! Used by the forger to assemble blocks and by tests and tools to produce
//! correctly signed payloads.

use shared_crypto::Ed25519KeyPair;

use crate::amount::BigAmount;
use crate::entities::{
    Address, Block, BlockData, Id, MultiSignatureAsset, Payment, Transaction, TransactionAsset,
    TransactionData, TransactionType,
};
use crate::errors::CodecError;
use crate::network::DEFAULT_NETWORK_VERSION;

/// Builder for a single transaction.
pub struct TransactionBuilder {
    data: TransactionData,
}

impl TransactionBuilder {
    fn new(transaction_type: TransactionType, asset: TransactionAsset) -> Self {
        Self {
            data: TransactionData {
                id: String::new(),
                version: 1,
                network: DEFAULT_NETWORK_VERSION,
                transaction_type,
                timestamp: 0,
                sender_public_key: String::new(),
                recipient_id: None,
                amount: BigAmount::zero(),
                fee: BigAmount::zero(),
                vendor_field: None,
                asset,
                signature: None,
                second_signature: None,
            },
        }
    }

    pub fn transfer(recipient: impl Into<Address>, amount: impl Into<BigAmount>) -> Self {
        let mut builder = Self::new(TransactionType::Transfer, TransactionAsset::None);
        builder.data.recipient_id = Some(recipient.into());
        builder.data.amount = amount.into();
        builder
    }

    pub fn second_signature(second_public_key: impl Into<String>) -> Self {
        Self::new(
            TransactionType::SecondSignature,
            TransactionAsset::Signature {
                public_key: second_public_key.into(),
            },
        )
    }

    pub fn delegate_registration(username: impl Into<String>) -> Self {
        Self::new(
            TransactionType::DelegateRegistration,
            TransactionAsset::Delegate {
                username: username.into(),
            },
        )
    }

    /// `votes` entries are `+<pk>` or `-<pk>`.
    pub fn vote(votes: Vec<String>) -> Self {
        Self::new(TransactionType::Vote, TransactionAsset::Votes(votes))
    }

    pub fn multi_signature(asset: MultiSignatureAsset) -> Self {
        Self::new(
            TransactionType::MultiSignature,
            TransactionAsset::MultiSignature(asset),
        )
    }

    pub fn ipfs(hash: impl Into<String>) -> Self {
        Self::new(TransactionType::Ipfs, TransactionAsset::Ipfs(hash.into()))
    }

    pub fn timelock_transfer(
        recipient: impl Into<Address>,
        amount: impl Into<BigAmount>,
        timelock: u64,
    ) -> Self {
        let mut builder = Self::new(
            TransactionType::TimelockTransfer,
            TransactionAsset::Timelock {
                timelock_type: 0,
                value: timelock,
            },
        );
        builder.data.recipient_id = Some(recipient.into());
        builder.data.amount = amount.into();
        builder
    }

    /// The declared amount is the sum of the payments.
    pub fn multi_payment(payments: Vec<Payment>) -> Self {
        let total: BigAmount = payments.iter().map(|p| &p.amount).sum();
        let mut builder = Self::new(
            TransactionType::MultiPayment,
            TransactionAsset::Payments(payments),
        );
        builder.data.amount = total;
        builder
    }

    pub fn fee(mut self, fee: impl Into<BigAmount>) -> Self {
        self.data.fee = fee.into();
        self
    }

    pub fn amount(mut self, amount: impl Into<BigAmount>) -> Self {
        self.data.amount = amount.into();
        self
    }

    pub fn timestamp(mut self, timestamp: u32) -> Self {
        self.data.timestamp = timestamp;
        self
    }

    pub fn network(mut self, network: u8) -> Self {
        self.data.network = network;
        self
    }

    pub fn vendor_field(mut self, vendor_field: impl Into<String>) -> Self {
        self.data.vendor_field = Some(vendor_field.into());
        self
    }

    /// Set the sender key and sign with it. Call after every other field.
    pub fn sign(mut self, keys: &Ed25519KeyPair) -> Self {
        self.data.sender_public_key = keys.public_key().to_hex();
        self.data.signature = None;
        self.data.second_signature = None;
        if let Ok(hash) = self.data.signing_hash() {
            self.data.signature = Some(keys.sign(&hash).to_hex());
        }
        self
    }

    /// Add a second signature. Call after [`TransactionBuilder::sign`].
    pub fn second_sign(mut self, keys: &Ed25519KeyPair) -> Self {
        if let Ok(hash) = self.data.second_signing_hash() {
            self.data.second_signature = Some(keys.sign(&hash).to_hex());
        }
        self
    }

    /// Raw payload with its id filled in.
    pub fn build_data(self) -> Result<TransactionData, CodecError> {
        Ok(self.build()?.data)
    }

    pub fn build(self) -> Result<Transaction, CodecError> {
        Transaction::from_data(self.data)
    }
}

/// Builder for a signed block.
pub struct BlockBuilder {
    height: u64,
    previous_block: Option<Id>,
    timestamp: u32,
    reward: BigAmount,
    transactions: Vec<Transaction>,
}

impl BlockBuilder {
    pub fn new(height: u64, previous_block: Option<Id>) -> Self {
        Self {
            height,
            previous_block,
            timestamp: 0,
            reward: BigAmount::zero(),
            transactions: Vec::new(),
        }
    }

    /// Start a block on top of `parent`.
    pub fn on_top_of(parent: &BlockData) -> Self {
        Self::new(parent.height + 1, Some(parent.id.clone()))
    }

    pub fn timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn reward(mut self, reward: impl Into<BigAmount>) -> Self {
        self.reward = reward.into();
        self
    }

    pub fn transactions(mut self, transactions: Vec<Transaction>) -> Self {
        self.transactions = transactions;
        self
    }

    pub fn sign(self, generator: &Ed25519KeyPair) -> Result<Block, CodecError> {
        let total_amount: BigAmount = self.transactions.iter().map(|t| &t.data.amount).sum();
        let total_fee: BigAmount = self.transactions.iter().map(|t| &t.data.fee).sum();
        let payload_length = self
            .transactions
            .iter()
            .map(|t| t.serialized.len() as u32)
            .sum();

        let mut data = BlockData {
            id: String::new(),
            version: 0,
            height: self.height,
            previous_block: self.previous_block,
            timestamp: self.timestamp,
            number_of_transactions: self.transactions.len() as u32,
            total_amount,
            total_fee,
            reward: self.reward,
            payload_length,
            payload_hash: Block::payload_hash_of(&self.transactions),
            generator_public_key: generator.public_key().to_hex(),
            block_signature: None,
        };
        data.block_signature = Some(generator.sign(&data.signing_hash()?).to_hex());
        data.id = data.compute_id()?;

        Ok(Block {
            data,
            transactions: self.transactions,
        })
    }
}
