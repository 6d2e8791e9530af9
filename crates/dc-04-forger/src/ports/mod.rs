//! Ports layer for the forger.

pub mod outbound;

pub use outbound::*;
