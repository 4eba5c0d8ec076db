use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::BranchPolicy;

/// Picks the branch an `RJMP` takes.
///
/// `weights` are the declared weights in table order. Returning an index
/// outside the table makes the instruction fall through.
pub trait BranchSelector: Send + std::fmt::Debug {
    fn select(&mut self, weights: &[u16]) -> usize;
}

/// Always the first entry, whatever the weights say.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstBranch;

impl BranchSelector for FirstBranch {
    fn select(&mut self, _weights: &[u16]) -> usize {
        0
    }
}

/// Random pick proportional to the declared weights.
#[derive(Debug, Clone)]
pub struct WeightedBranch {
    rng: SmallRng,
}

impl WeightedBranch {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl Default for WeightedBranch {
    fn default() -> Self {
        Self::new()
    }
}

impl BranchSelector for WeightedBranch {
    fn select(&mut self, weights: &[u16]) -> usize {
        match WeightedIndex::new(weights.iter().map(|&w| u32::from(w))) {
            Ok(dist) => dist.sample(&mut self.rng),
            // empty table or all weights zero
            Err(_) => 0,
        }
    }
}

impl BranchPolicy {
    pub fn selector(self) -> Box<dyn BranchSelector> {
        match self {
            BranchPolicy::First => Box::new(FirstBranch),
            BranchPolicy::Weighted { seed: Some(seed) } => Box::new(WeightedBranch::seeded(seed)),
            BranchPolicy::Weighted { seed: None } => Box::new(WeightedBranch::new()),
        }
    }
}
