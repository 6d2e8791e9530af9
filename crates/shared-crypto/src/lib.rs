//! # Shared Crypto - Ledger Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 | Transaction ids, payload hashes, signing digests |
//! | `signatures` | Ed25519 | Transaction and block signatures |
//! | `identity` | SHA-256 | Address derivation from public keys |
//!
//! Keys and signatures travel as lowercase hex strings on the ledger, so every
//! type here parses from and renders to hex.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod identity;
pub mod signatures;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{sha256, sha256_hex, Sha256Hasher};
pub use identity::{address_from_public_key, is_valid_address};
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
