//! # Shared Types Crate
//!
//! Ledger entities shared by every Delegate-Chain subsystem.
//!
//! ## Contents
//!
//! - [`BigAmount`]: exact integer arithmetic for balances, fees and rewards.
//! - [`TransactionData`] / [`Transaction`]: raw and verified transactions.
//! - [`Block`] / [`BlockData`]: blocks and headers.
//! - [`TransactionBuilder`] / [`BlockBuilder`]: signed payload construction.
//! - [`NetworkConfig`] / [`Slots`]: network constants and slot arithmetic.
//! - [`TimeSource`]: injectable clock.
//! - [`AdmissionError`]: pool admission codes (`ERR_*`).

pub mod amount;
pub mod builder;
pub mod entities;
pub mod errors;
pub mod network;
pub mod time;

pub use amount::{BigAmount, ParseAmountError};
pub use builder::{BlockBuilder, TransactionBuilder};
pub use entities::*;
pub use errors::*;
pub use network::{NetworkConfig, Slots, DEFAULT_NETWORK_VERSION};
pub use time::{MockTimeSource, SystemTimeSource, TimeSource};
