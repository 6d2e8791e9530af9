//! # Forger Subsystem
//!
//! **Subsystem ID:** 4
//!
//! ## Purpose
//!
//! Watches the delegate schedule and, whenever a delegate configured on this
//! node owns the current slot, assembles a block from the pool, signs it and
//! hands it to the node for processing and relay.
//!
//! ## Timing
//!
//! | Outcome | Next check |
//! |---------|------------|
//! | slot not forgeable | `can_forge_poll` (100 ms) |
//! | slot owned by another delegate | `no_delegate_delay` (7.9 s) |
//! | block forged | `after_forge_delay` (7.8 s) |
//! | error | `error_backoff` (2 s) |
//!
//! ## Module Structure
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/ - LocalNode (state machine, block store, pool)       │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/outbound.rs - ForgerClient                               │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/ - ForgerManager, Delegate, RoundInfo                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

pub use adapters::*;
pub use config::ForgerConfig;
pub use domain::*;
pub use error::{ForgerError, Result};
pub use ports::*;
