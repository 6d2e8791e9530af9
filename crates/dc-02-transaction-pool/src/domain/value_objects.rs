//! Value objects for the transaction pool.

use shared_types::{BigAmount, Id};
use std::cmp::Ordering;

/// Fee-ordering key.
///
/// Sorts highest fee first; equal fees go to the earlier arrival.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeeOrderedKey {
    pub fee: BigAmount,
    pub sequence: u64,
    pub id: Id,
}

impl FeeOrderedKey {
    pub fn new(fee: BigAmount, sequence: u64, id: Id) -> Self {
        Self { fee, sequence, id }
    }
}

impl Ord for FeeOrderedKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fee
            .cmp(&self.fee)
            .then_with(|| self.sequence.cmp(&other.sequence))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for FeeOrderedKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Outcome of a fee check against the dynamic fee policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeeMatch {
    pub enter_pool: bool,
    pub broadcast: bool,
}
