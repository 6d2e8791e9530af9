//! Ports for the wallet ledger.
//!
//! - Inbound: read access offered to the API layer and the pool
//! - Outbound: what the handlers need to know about pending transactions

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
