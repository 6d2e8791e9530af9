//! # Core Ledger Entities
//!
//! Transactions and blocks as they travel between the pool, the wallet
//! ledger and durable storage.
//!
//! - [`TransactionData`] is the raw, serde-friendly payload.
//! - [`Transaction`] is a payload whose id has been computed and whose primary
//!   signature has been checked, along with its canonical serialized bytes.
//! - [`Block`] bundles a [`BlockData`] header with its transactions.
//!
//! Canonical bytes are bincode over the payload. The signing digest excludes the
//! id and signatures; the second signature additionally covers the first.

use serde::{Deserialize, Serialize};
use shared_crypto::{address_from_public_key, sha256, sha256_hex, Ed25519PublicKey};
use std::fmt;

use crate::amount::BigAmount;
use crate::errors::CodecError;

/// Hex public key.
pub type PublicKey = String;

/// Hex address derived from a public key.
pub type Address = String;

/// Hex transaction or block id.
pub type Id = String;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

// =============================================================================
// TRANSACTION TYPES
// =============================================================================

/// Closed set of transaction types understood by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Transfer,
    SecondSignature,
    DelegateRegistration,
    Vote,
    MultiSignature,
    Ipfs,
    TimelockTransfer,
    MultiPayment,
}

impl TransactionType {
    /// Every type, in type-id order.
    pub const ALL: [TransactionType; 8] = [
        TransactionType::Transfer,
        TransactionType::SecondSignature,
        TransactionType::DelegateRegistration,
        TransactionType::Vote,
        TransactionType::MultiSignature,
        TransactionType::Ipfs,
        TransactionType::TimelockTransfer,
        TransactionType::MultiPayment,
    ];

    /// Numeric type id.
    pub fn id(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for TransactionType {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(CodecError::UnknownType(value))
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionType::Transfer => "transfer",
            TransactionType::SecondSignature => "second-signature",
            TransactionType::DelegateRegistration => "delegate-registration",
            TransactionType::Vote => "vote",
            TransactionType::MultiSignature => "multi-signature",
            TransactionType::Ipfs => "ipfs",
            TransactionType::TimelockTransfer => "timelock-transfer",
            TransactionType::MultiPayment => "multi-payment",
        };
        f.write_str(name)
    }
}

// =============================================================================
// ASSETS
// =============================================================================

/// Multisignature configuration registered on a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSignatureAsset {
    pub min: u8,
    pub lifetime: u8,
    pub keysgroup: Vec<String>,
}

/// One leg of a multi-payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub amount: BigAmount,
    pub recipient_id: Address,
}

/// Type-specific payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionAsset {
    #[default]
    None,
    Signature {
        public_key: PublicKey,
    },
    Delegate {
        username: String,
    },
    /// Entries of the form `+<pk>` (vote) or `-<pk>` (unvote).
    Votes(Vec<String>),
    MultiSignature(MultiSignatureAsset),
    Ipfs(String),
    Timelock {
        timelock_type: u8,
        value: u64,
    },
    Payments(Vec<Payment>),
}

// =============================================================================
// TRANSACTION DATA
// =============================================================================

/// Raw transaction payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionData {
    /// Empty until computed.
    #[serde(default)]
    pub id: Id,
    pub version: u8,
    pub network: u8,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Seconds since the network epoch.
    pub timestamp: u32,
    pub sender_public_key: PublicKey,
    #[serde(default)]
    pub recipient_id: Option<Address>,
    pub amount: BigAmount,
    pub fee: BigAmount,
    #[serde(default)]
    pub vendor_field: Option<String>,
    #[serde(default)]
    pub asset: TransactionAsset,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub second_signature: Option<String>,
}

/// Borrowed view over the fields that feed a digest.
#[derive(Serialize)]
struct DigestView<'a> {
    version: u8,
    network: u8,
    transaction_type: TransactionType,
    timestamp: u32,
    sender_public_key: &'a str,
    recipient_id: Option<&'a str>,
    amount: &'a BigAmount,
    fee: &'a BigAmount,
    vendor_field: Option<&'a str>,
    asset: &'a TransactionAsset,
    signature: Option<&'a str>,
    second_signature: Option<&'a str>,
}

impl TransactionData {
    fn digest_view(&self, with_signature: bool, with_second: bool) -> DigestView<'_> {
        DigestView {
            version: self.version,
            network: self.network,
            transaction_type: self.transaction_type,
            timestamp: self.timestamp,
            sender_public_key: &self.sender_public_key,
            recipient_id: self.recipient_id.as_deref(),
            amount: &self.amount,
            fee: &self.fee,
            vendor_field: self.vendor_field.as_deref(),
            asset: &self.asset,
            signature: self.signature.as_deref().filter(|_| with_signature),
            second_signature: self.second_signature.as_deref().filter(|_| with_second),
        }
    }

    /// Digest signed by the sender's primary key.
    pub fn signing_hash(&self) -> Result<[u8; 32], CodecError> {
        let bytes = bincode::serialize(&self.digest_view(false, false))?;
        Ok(sha256(&bytes))
    }

    /// Digest signed by the sender's second key (covers the first signature).
    pub fn second_signing_hash(&self) -> Result<[u8; 32], CodecError> {
        let bytes = bincode::serialize(&self.digest_view(true, false))?;
        Ok(sha256(&bytes))
    }

    /// Id over every field including both signatures.
    pub fn compute_id(&self) -> Result<Id, CodecError> {
        let bytes = bincode::serialize(&self.digest_view(true, true))?;
        Ok(sha256_hex(&bytes))
    }

    /// Verify the primary signature against the sender public key.
    pub fn verify_signature(&self) -> bool {
        let Some(signature) = self.signature.as_deref() else {
            return false;
        };
        match self.signing_hash() {
            Ok(hash) => Ed25519PublicKey::verify_hex(&self.sender_public_key, &hash, signature),
            Err(_) => false,
        }
    }

    /// Verify the second signature against a registered second public key.
    pub fn verify_second_signature(&self, second_public_key: &str) -> bool {
        let Some(signature) = self.second_signature.as_deref() else {
            return false;
        };
        match self.second_signing_hash() {
            Ok(hash) => Ed25519PublicKey::verify_hex(second_public_key, &hash, signature),
            Err(_) => false,
        }
    }

    /// Sender address under this transaction's network version.
    pub fn sender_address(&self) -> Result<Address, CodecError> {
        Ok(address_from_public_key(&self.sender_public_key, self.network)?)
    }

    /// Every `(recipient, amount)` credit this transaction produces.
    pub fn recipients(&self) -> Vec<(Address, BigAmount)> {
        match (&self.transaction_type, &self.asset) {
            (TransactionType::MultiPayment, TransactionAsset::Payments(payments)) => payments
                .iter()
                .map(|p| (p.recipient_id.clone(), p.amount.clone()))
                .collect(),
            (TransactionType::Transfer | TransactionType::TimelockTransfer, _) => self
                .recipient_id
                .iter()
                .map(|r| (r.clone(), self.amount.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

// =============================================================================
// VERIFIED TRANSACTION
// =============================================================================

/// A transaction with a computed id, canonical bytes and signature status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TransactionData", into = "TransactionData")]
pub struct Transaction {
    pub data: TransactionData,
    pub serialized: Vec<u8>,
    pub verified: bool,
}

impl Transaction {
    /// Compute the id and bytes for a payload and check its signature.
    ///
    /// A payload that already carries an id must carry the correct one.
    pub fn from_data(mut data: TransactionData) -> Result<Self, CodecError> {
        let id = data.compute_id()?;
        if !data.id.is_empty() && data.id != id {
            return Err(CodecError::IdMismatch {
                claimed: data.id,
                computed: id,
            });
        }
        data.id = id;
        let verified = data.verify_signature();
        let serialized = bincode::serialize(&data)?;
        Ok(Self {
            data,
            serialized,
            verified,
        })
    }

    /// Rebuild a transaction from its canonical bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let data: TransactionData = bincode::deserialize(bytes)?;
        Self::from_data(data)
    }

    pub fn id(&self) -> &str {
        &self.data.id
    }

    pub fn fee(&self) -> &BigAmount {
        &self.data.fee
    }

    pub fn sender_public_key(&self) -> &str {
        &self.data.sender_public_key
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.data.transaction_type
    }

    /// Hex rendering of the canonical bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.serialized)
    }
}

impl TryFrom<TransactionData> for Transaction {
    type Error = CodecError;

    fn try_from(data: TransactionData) -> Result<Self, Self::Error> {
        Transaction::from_data(data)
    }
}

impl From<Transaction> for TransactionData {
    fn from(tx: Transaction) -> Self {
        tx.data
    }
}

// =============================================================================
// BLOCKS
// =============================================================================

/// Block header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockData {
    #[serde(default)]
    pub id: Id,
    pub version: u8,
    pub height: u64,
    pub previous_block: Option<Id>,
    /// Seconds since the network epoch.
    pub timestamp: u32,
    pub number_of_transactions: u32,
    pub total_amount: BigAmount,
    pub total_fee: BigAmount,
    pub reward: BigAmount,
    pub payload_length: u32,
    pub payload_hash: String,
    pub generator_public_key: PublicKey,
    #[serde(default)]
    pub block_signature: Option<String>,
}

#[derive(Serialize)]
struct BlockDigestView<'a> {
    version: u8,
    height: u64,
    previous_block: Option<&'a str>,
    timestamp: u32,
    number_of_transactions: u32,
    total_amount: &'a BigAmount,
    total_fee: &'a BigAmount,
    reward: &'a BigAmount,
    payload_length: u32,
    payload_hash: &'a str,
    generator_public_key: &'a str,
    block_signature: Option<&'a str>,
}

impl BlockData {
    fn digest_view(&self, with_signature: bool) -> BlockDigestView<'_> {
        BlockDigestView {
            version: self.version,
            height: self.height,
            previous_block: self.previous_block.as_deref(),
            timestamp: self.timestamp,
            number_of_transactions: self.number_of_transactions,
            total_amount: &self.total_amount,
            total_fee: &self.total_fee,
            reward: &self.reward,
            payload_length: self.payload_length,
            payload_hash: &self.payload_hash,
            generator_public_key: &self.generator_public_key,
            block_signature: self.block_signature.as_deref().filter(|_| with_signature),
        }
    }

    /// Digest signed by the generator.
    pub fn signing_hash(&self) -> Result<[u8; 32], CodecError> {
        Ok(sha256(&bincode::serialize(&self.digest_view(false))?))
    }

    pub fn compute_id(&self) -> Result<Id, CodecError> {
        Ok(sha256_hex(&bincode::serialize(&self.digest_view(true))?))
    }

    pub fn verify_signature(&self) -> bool {
        let Some(signature) = self.block_signature.as_deref() else {
            return false;
        };
        match self.signing_hash() {
            Ok(hash) => Ed25519PublicKey::verify_hex(&self.generator_public_key, &hash, signature),
            Err(_) => false,
        }
    }
}

/// A block and its transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub data: BlockData,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn id(&self) -> &str {
        &self.data.id
    }

    pub fn height(&self) -> u64 {
        self.data.height
    }

    pub fn is_genesis(&self) -> bool {
        self.data.height == 1
    }

    /// Payload hash over the concatenated transaction ids.
    pub fn payload_hash_of(transactions: &[Transaction]) -> String {
        let mut joined = Vec::with_capacity(transactions.len() * 32);
        for tx in transactions {
            joined.extend_from_slice(tx.id().as_bytes());
        }
        sha256_hex(&joined)
    }

    /// Structural checks: id, payload hash, totals, signature and transaction
    /// signatures. Returns every problem found.
    pub fn verification_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        match self.data.compute_id() {
            Ok(id) if id == self.data.id => {}
            Ok(_) => errors.push("Invalid block id".to_string()),
            Err(e) => errors.push(format!("Block encoding failed: {e}")),
        }
        if Self::payload_hash_of(&self.transactions) != self.data.payload_hash {
            errors.push("Invalid payload hash".to_string());
        }
        if self.data.number_of_transactions as usize != self.transactions.len() {
            errors.push("Invalid number of transactions".to_string());
        }
        let total_fee: BigAmount = self.transactions.iter().map(|t| &t.data.fee).sum();
        if total_fee != self.data.total_fee {
            errors.push("Invalid total fee".to_string());
        }
        let total_amount: BigAmount = self.transactions.iter().map(|t| &t.data.amount).sum();
        if total_amount != self.data.total_amount {
            errors.push("Invalid total amount".to_string());
        }
        if !self.data.verify_signature() {
            errors.push("Failed to verify block signature".to_string());
        }
        for tx in self.transactions.iter().filter(|t| !t.verified) {
            errors.push(format!("Failed to verify transaction {}", tx.id()));
        }
        errors
    }
}
