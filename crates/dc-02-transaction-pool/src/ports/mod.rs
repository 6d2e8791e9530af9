//! Ports layer for the transaction pool.
//!
//! - Inbound (Driving) ports: API exposed to the forger and API layer
//! - Outbound (Driven) ports: persistent storage and confirmed-chain lookups

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
