// goal_id.rs — Goal identifier generation.
//
// Identifiers look like `<actionType>.<8 hex chars>`. The suffix comes from a
// non-cryptographic RNG and is never checked against goals already issued:
// two goals from the same client can collide with probability ~n²/2³³. That
// risk is accepted; callers that need a hard guarantee pass their own GoalId.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const HEX: &[u8; 16] = b"0123456789abcdef";
const SUFFIX_LEN: usize = 8;

/// Produces `<actionType>.<random hex>` identifiers for one client.
pub struct GoalIdGenerator {
    action_type: String,
    rng: SmallRng,
}

impl GoalIdGenerator {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            rng: SmallRng::from_entropy(),
        }
    }

    /// Deterministic generator for tests.
    pub fn with_seed(action_type: impl Into<String>, seed: u64) -> Self {
        Self {
            action_type: action_type.into(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    pub fn generate(&mut self) -> String {
        let mut id = String::with_capacity(self.action_type.len() + 1 + SUFFIX_LEN);
        id.push_str(&self.action_type);
        id.push('.');
        for _ in 0..SUFFIX_LEN {
            id.push(HEX[self.rng.gen_range(0..HEX.len())] as char);
        }
        id
    }
}
