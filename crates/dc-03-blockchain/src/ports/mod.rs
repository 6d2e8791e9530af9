//! Ports for the blockchain subsystem.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
