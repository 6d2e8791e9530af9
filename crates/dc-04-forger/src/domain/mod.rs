//! # Domain Layer - Forger
//!
//! - `delegate`: local signing delegates
//! - `round`: RoundInfo, ForgingTransactions
//! - `manager`: ForgerManager monitor loop

pub mod delegate;
pub mod manager;
pub mod round;

pub use delegate::*;
pub use manager::*;
pub use round::*;
