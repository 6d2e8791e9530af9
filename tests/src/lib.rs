//! # Delegate-Chain Test Suite
//!
//! Cross-subsystem tests that wire real wallets, pool, blockchain and
//! forger instances together.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs          # Keys, transfers, a single-node harness
//! └── integration/
//!     ├── ledger_flows.rs  # Transfers through pool, block and rollback
//!     ├── pool_flows.rs    # Eviction, capacity and double-spend blocking
//!     ├── restart.rs       # Pool recovery from file storage
//!     └── node_flows.rs    # Full node: genesis, sync and forging
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p dc-tests
//! cargo test -p dc-tests integration::pool_flows
//! ```

pub mod fixtures;
pub mod integration;
