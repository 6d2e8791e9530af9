//! Delegate rounds.
//!
//! Heights are grouped into rounds of `active` blocks. Round 1 covers
//! heights `1..=active`; the schedule for a round is derived from the
//! wallet index at the last height of the previous round.

use serde::{Deserialize, Serialize};
use shared_types::{BigAmount, PublicKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateEntry {
    pub public_key: PublicKey,
    pub username: String,
    pub vote_balance: BigAmount,
}

/// Active delegate schedule for one round, heaviest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub round: u64,
    /// Height the schedule was computed at.
    pub height: u64,
    pub delegates: Vec<DelegateEntry>,
}

impl Round {
    pub fn public_keys(&self) -> impl Iterator<Item = &str> {
        self.delegates.iter().map(|d| d.public_key.as_str())
    }

    /// Delegate scheduled for `slot`.
    pub fn forger_for_slot(&self, slot: u64) -> Option<&DelegateEntry> {
        if self.delegates.is_empty() {
            return None;
        }
        self.delegates.get((slot % self.delegates.len() as u64) as usize)
    }
}

pub fn round_of_height(height: u64, active: u64) -> u64 {
    if height == 0 || active == 0 {
        1
    } else {
        (height - 1) / active + 1
    }
}

pub fn is_round_end(height: u64, active: u64) -> bool {
    active != 0 && height % active == 0
}

/// True when the round following `height` must be computed and saved.
pub fn needs_round_save(height: u64, active: u64) -> bool {
    height == 1 || is_round_end(height, active)
}
