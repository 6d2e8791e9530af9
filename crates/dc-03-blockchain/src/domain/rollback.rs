//! Fork-recovery rollback depth.

use rand::Rng;
use serde::Deserialize;

/// Cap applied to the randomized depth: one round of the default network.
pub const DEFAULT_MAX_ROLLBACK: u64 = 51;

/// How many blocks to remove when a fork is detected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackPolicy {
    /// `floor(4 / u)` for `u` uniform in `(0, 1]`, capped at `max_depth`.
    /// Never below 4, usually close to it.
    RandomInverse { max_depth: u64 },
    Fixed(u64),
}

impl Default for RollbackPolicy {
    fn default() -> Self {
        Self::RandomInverse {
            max_depth: DEFAULT_MAX_ROLLBACK,
        }
    }
}

impl RollbackPolicy {
    pub fn depth(&self) -> u64 {
        self.depth_with(&mut rand::thread_rng())
    }

    pub fn depth_with<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        match *self {
            Self::Fixed(n) => n,
            Self::RandomInverse { max_depth } => {
                // gen() is in [0, 1); flip to (0, 1] so the division is finite.
                let u: f64 = 1.0 - rng.gen::<f64>();
                let depth = (4.0 / u).floor();
                if depth >= max_depth as f64 {
                    max_depth
                } else {
                    depth as u64
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fixed_depth() {
        assert_eq!(RollbackPolicy::Fixed(7).depth(), 7);
    }

    #[test]
    fn test_random_inverse_bounds() {
        let policy = RollbackPolicy::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1_000 {
            let depth = policy.depth_with(&mut rng);
            assert!((4..=DEFAULT_MAX_ROLLBACK).contains(&depth));
        }
    }

    #[test]
    fn test_random_inverse_biased_low() {
        let policy = RollbackPolicy::RandomInverse { max_depth: 1_000 };
        let mut rng = StdRng::seed_from_u64(7);
        let small = (0..1_000)
            .filter(|_| policy.depth_with(&mut rng) < 8)
            .count();
        // u > 0.5 always yields 4..=7
        assert!(small > 400);
    }
}
