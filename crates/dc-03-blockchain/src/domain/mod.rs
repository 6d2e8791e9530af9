//! # Domain Layer - Blockchain
//!
//! ## Components
//!
//! - `state`: chain states, events, transition and entry-action tables
//! - `machine`: BlockchainStateMachine driving the actions
//! - `processor`: block acceptance, application and rollback
//! - `queue`: process and rebuild queues with their workers
//! - `rollback`: fork recovery depth policy
//! - `config`: BlockchainConfig
//! - `errors`: BlockchainError

pub mod config;
pub mod errors;
pub mod machine;
pub mod processor;
pub mod queue;
pub mod rollback;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::*;
pub use errors::*;
pub use machine::*;
pub use processor::*;
pub use queue::*;
pub use rollback::*;
pub use state::*;
