//! Dynamic fee policy.
//!
//! With dynamic fees on, a transaction pays for its size: the minimum is
//! `(addon_bytes[type] + serialized_len) * min_fee_per_byte`, with separate
//! per-byte rates for pool entry and for relaying. With them off, the fee
//! must equal the static fee for the type.

use shared_types::{BigAmount, Transaction};

use super::entities::DynamicFeeConfig;
use super::value_objects::FeeMatch;

/// Minimum fee at `fee_per_byte` for `tx`.
pub fn calculate_fee(config: &DynamicFeeConfig, fee_per_byte: u64, tx: &Transaction) -> BigAmount {
    let addon = *config.addon_bytes.get(tx.transaction_type());
    let bytes = addon + tx.serialized.len() as u64;
    BigAmount::from(bytes) * BigAmount::from(fee_per_byte)
}

pub fn dynamic_fee_match(config: &DynamicFeeConfig, tx: &Transaction) -> FeeMatch {
    let fee = tx.fee();
    if config.enabled {
        FeeMatch {
            enter_pool: *fee >= calculate_fee(config, config.min_fee_pool, tx),
            broadcast: *fee >= calculate_fee(config, config.min_fee_broadcast, tx),
        }
    } else {
        let matches = *fee == BigAmount::from(*config.fees.get(tx.transaction_type()));
        FeeMatch {
            enter_pool: matches,
            broadcast: matches,
        }
    }
}

/// The fee the pool requires of `tx`, for error reporting.
pub fn minimum_pool_fee(config: &DynamicFeeConfig, tx: &Transaction) -> BigAmount {
    if config.enabled {
        calculate_fee(config, config.min_fee_pool, tx)
    } else {
        BigAmount::from(*config.fees.get(tx.transaction_type()))
    }
}
