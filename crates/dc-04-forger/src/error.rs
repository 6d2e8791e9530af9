//! Error types for the forger

use shared_types::CodecError;
use thiserror::Error;

/// Result type alias for forger operations
pub type Result<T> = std::result::Result<T, ForgerError>;

#[derive(Debug, Error)]
pub enum ForgerError {
    /// No delegate secrets configured
    #[error("No delegate found")]
    NoDelegate,

    /// The node has no schedule for the current round
    #[error("No round schedule for round {round}")]
    NoRound { round: u64 },

    /// The node has no last block to build on
    #[error("Node has no last block")]
    NoLastBlock,

    /// A pool transaction could not be decoded
    #[error("Invalid pool transaction: {0}")]
    InvalidTransaction(String),

    /// The node refused the forged block
    #[error("Broadcast of block {id} refused")]
    BroadcastRefused { id: String },

    /// Node query failed
    #[error("Node error: {0}")]
    Node(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
