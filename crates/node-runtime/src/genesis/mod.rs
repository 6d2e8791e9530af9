//! # Genesis Module
//!
//! Builds the first block of a network from configuration. Its payload hash
//! is the network's `nethash`.

pub mod builder;

pub use builder::{GenesisAccount, GenesisBuilder, GenesisConfig, GenesisDelegate, GenesisError};
