//! # Node Runtime Library
//!
//! Configuration, genesis construction and subsystem wiring of the
//! Delegate-Chain node. The main entry point is the `main.rs` binary.
//!
//! ## Subsystems
//!
//! | ID | Crate | Role |
//! |----|-------|------|
//! | 1 | `dc-01-wallets` | wallet ledger, rounds |
//! | 2 | `dc-02-transaction-pool` | unconfirmed transactions |
//! | 3 | `dc-03-blockchain` | sync state machine, block application |
//! | 4 | `dc-04-forger` | block production for local delegates |

pub mod container;
pub mod genesis;

pub use container::{ConfigError, ContainerError, NodeConfig, SubsystemContainer};
pub use genesis::{GenesisBuilder, GenesisConfig, GenesisError};
