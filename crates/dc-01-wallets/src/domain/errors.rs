use shared_types::{BigAmount, CodecError, TransactionType};
use thiserror::Error;

/// Ledger feasibility and application failures.
///
/// Every variant is detected before any wallet is mutated, except
/// `BlockApply`, which is reported after the partial block has been rolled
/// back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Insufficient balance: balance {balance}, required {required}")]
    InsufficientBalance {
        balance: BigAmount,
        required: BigAmount,
    },

    #[error("Sender public key {sender} does not match wallet {address}")]
    SenderWalletMismatch { sender: String, address: String },

    #[error("Failed to verify second signature")]
    InvalidSecondSignature,

    #[error("Missing second signature")]
    MissingSecondSignature,

    #[error("Wallet does not allow second signatures")]
    UnexpectedSecondSignature,

    #[error("Multi-signature wallets cannot send this transaction")]
    UnexpectedMultiSignature,

    #[error("Wallet already has a second signature")]
    SecondSignatureAlreadyRegistered,

    #[error("Wallet already voted for {0}")]
    AlreadyVoted(String),

    #[error("Wallet has not voted")]
    NoVote,

    #[error("Wallet voted for {voted}, cannot unvote {requested}")]
    UnvoteMismatch { voted: String, requested: String },

    #[error("Vote for {0} which is not a delegate")]
    VotedForNonDelegate(String),

    #[error("Username {0} is already registered")]
    UsernameAlreadyRegistered(String),

    #[error("Wallet is already a delegate")]
    WalletAlreadyDelegate,

    #[error("Payments sum to {sum} but transaction declares {declared}")]
    MultiPaymentAmountMismatch { sum: BigAmount, declared: BigAmount },

    #[error("Invalid {transaction_type} asset: {reason}")]
    InvalidAsset {
        transaction_type: TransactionType,
        reason: String,
    },

    #[error("Cold wallet is not allowed to send until receiving transaction is confirmed.")]
    ColdWallet,

    #[error("Block generator {0} is not known")]
    UnknownGenerator(String),

    #[error("Transaction {index} of block failed: {source}")]
    BlockApply {
        index: usize,
        #[source]
        source: Box<LedgerError>,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
